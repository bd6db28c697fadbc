//! Property-based test generators using proptest.
//!
//! Generated catalogs keep the shape real catalogs have and the engine
//! relies on: unique friendly ids, acyclic bundle nesting, and item prices
//! at most one item deep.

use crate::fixtures::CatalogBuilder;
use catsync_model::{CatalogEntity, EntityKind};
use proptest::prelude::*;
use proptest::sample::Index;

/// Strategy for generating friendly ids.
pub fn friendly_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating price amounts.
pub fn amount_strategy() -> impl Strategy<Value = i64> {
    1i64..1000
}

/// Raw choices a catalog is built from.
#[derive(Debug, Clone)]
struct CatalogShape {
    currencies: usize,
    base_items: Vec<(Index, i64)>,
    premium_items: Vec<(Index, i64)>,
    bundles: Vec<Vec<(Index, i64)>>,
    stores: Vec<Vec<(Index, Index, i64)>>,
}

fn shape_strategy() -> impl Strategy<Value = CatalogShape> {
    (
        1usize..4,
        prop::collection::vec((any::<Index>(), amount_strategy()), 1..6),
        prop::collection::vec((any::<Index>(), 1i64..10), 0..3),
        prop::collection::vec(prop::collection::vec((any::<Index>(), 1i64..5), 1..4), 0..4),
        prop::collection::vec(
            prop::collection::vec((any::<Index>(), any::<Index>(), amount_strategy()), 1..4),
            0..3,
        ),
    )
        .prop_map(
            |(currencies, base_items, premium_items, bundles, stores)| CatalogShape {
                currencies,
                base_items,
                premium_items,
                bundles,
                stores,
            },
        )
}

fn build(shape: CatalogShape) -> Vec<CatalogEntity> {
    let mut builder = CatalogBuilder::new("src-");

    let currencies: Vec<String> = (0..shape.currencies).map(|i| format!("cur{i}")).collect();
    for currency in &currencies {
        builder.currency(currency);
    }

    let mut items = Vec::new();
    for (i, (currency, amount)) in shape.base_items.iter().enumerate() {
        let name = format!("item{i}");
        builder.priced_item(&name, &[(currency.get(&currencies).as_str(), *amount)]);
        items.push(name);
    }

    let base = items.clone();
    for (i, (item, amount)) in shape.premium_items.iter().enumerate() {
        let name = format!("premium{i}");
        builder.priced_item(&name, &[(item.get(&base).as_str(), *amount)]);
        items.push(name);
    }

    let mut pool = items;
    for (i, contents) in shape.bundles.iter().enumerate() {
        let name = format!("bundle{i}");
        let refs: Vec<(&str, i64)> = contents
            .iter()
            .map(|(target, amount)| (target.get(&pool).as_str(), *amount))
            .collect();
        builder.bundle(&name, &refs);
        pool.push(name);
    }

    for (i, slots) in shape.stores.iter().enumerate() {
        let name = format!("store{i}");
        let slots: Vec<(&str, &str, i64)> = slots
            .iter()
            .map(|(target, currency, amount)| {
                (
                    target.get(&pool).as_str(),
                    currency.get(&currencies).as_str(),
                    *amount,
                )
            })
            .collect();
        builder.store(&name, &slots);
    }

    builder.build()
}

/// Strategy for generating a complete, well-formed source catalog.
pub fn catalog_strategy() -> impl Strategy<Value = Vec<CatalogEntity>> {
    shape_strategy().prop_map(build)
}

/// Strategy for generating target entities that no source catalog from
/// [`catalog_strategy`] contains.
pub fn stale_entities_strategy() -> impl Strategy<Value = Vec<CatalogEntity>> {
    prop::collection::vec(
        (
            prop::sample::select(vec![
                EntityKind::Currency,
                EntityKind::Item,
                EntityKind::Bundle,
                EntityKind::Store,
            ]),
            0usize..3,
        ),
        0..6,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (kind, name))| {
                // repeated friendly ids exercise duplicate cleanup
                CatalogEntity::new(format!("old-{i}"), kind, format!("stale{name}"))
            })
            .collect()
    })
}

/// Strategy for generating a target that already holds some of `source`'s
/// friendly ids, under different ids and without prices or references.
pub fn overlapping_target_strategy(
    source: Vec<CatalogEntity>,
) -> impl Strategy<Value = Vec<CatalogEntity>> {
    let len = source.len();
    prop::collection::vec(any::<bool>(), len).prop_map(move |mask| {
        source
            .iter()
            .zip(mask)
            .filter(|(_, keep)| *keep)
            .enumerate()
            .map(|(i, (entity, _))| {
                CatalogEntity::new(
                    format!("tgt-old-{i}"),
                    entity.kind.clone(),
                    entity.friendly_id.clone(),
                )
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catsync_model::{dependency_waves, CatalogIndex};
    use std::collections::HashSet;

    proptest! {
        #[test]
        fn generated_catalogs_have_unique_friendly_ids(catalog in catalog_strategy()) {
            let mut seen = HashSet::new();
            for entity in &catalog {
                prop_assert!(seen.insert(entity.friendly_id.clone()));
            }
        }

        #[test]
        fn generated_references_resolve_in_source(catalog in catalog_strategy()) {
            let index = CatalogIndex::new(catalog.clone());
            for entity in &catalog {
                for id in entity.referenced_ids() {
                    prop_assert!(index.get(id).is_some());
                }
            }
        }

        #[test]
        fn generated_bundles_are_acyclic(catalog in catalog_strategy()) {
            let bundles: Vec<CatalogEntity> = catalog
                .iter()
                .filter(|e| e.kind == EntityKind::Bundle)
                .cloned()
                .collect();
            let index = CatalogIndex::new(catalog);
            let waves = dependency_waves(&bundles, &index);
            let placed: usize = waves.iter().map(Vec::len).sum();
            prop_assert_eq!(placed, bundles.len());
            // bundles only nest bundles defined before them
            for (pos, bundle) in bundles.iter().enumerate() {
                for reference in &bundle.references {
                    if let Some(other) = bundles.iter().position(|b| b.id == reference.id) {
                        prop_assert!(other < pos);
                    }
                }
            }
        }

        #[test]
        fn friendly_ids_are_non_empty(id in friendly_id_strategy()) {
            prop_assert!(!id.is_empty());
        }
    }
}
