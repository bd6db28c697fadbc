//! Cross-instance reference remapping.

use crate::entity::{CatalogEntity, EntityReference, Price, PriceAmount};
use crate::error::{RemapError, ResolveError};
use crate::index::{resolve_strict, CatalogIndex};
use std::collections::{HashMap, HashSet};

/// Where in an entity an unresolved id was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSite {
    /// The n-th entity reference.
    Reference {
        /// Reference position.
        index: usize,
    },
    /// An amount of the n-th entity-level price.
    Price {
        /// Price position.
        price: usize,
    },
    /// An amount of a per-reference price.
    ReferencePrice {
        /// Reference position.
        reference: usize,
        /// Price position within the reference.
        price: usize,
    },
}

/// An id that was dropped during remapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Where the id was found.
    pub site: ReferenceSite,
    /// Why it could not be resolved.
    pub error: ResolveError,
}

/// A remapped entity plus everything that was dropped on the way.
#[derive(Debug, Clone)]
pub struct Remapped {
    /// The entity with target-space ids only.
    pub entity: CatalogEntity,
    /// Ids that could not be resolved.
    pub unresolved: Vec<UnresolvedReference>,
    /// Prices dropped because none of their amounts resolved.
    pub dropped_prices: usize,
    /// References dropped because their own price list emptied out.
    pub dropped_references: usize,
}

impl Remapped {
    /// Number of ids that could not be resolved.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    /// Returns true if every id resolved.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Friendly ids that exist in source but have no target counterpart yet.
    pub fn pending_friendly_ids(&self) -> impl Iterator<Item = &str> {
        self.unresolved.iter().filter_map(|u| u.error.friendly_id())
    }
}

/// Rewrites a bundle's or store's references and prices into target space.
///
/// Unresolvable references are dropped and reported, never fatal. Prices
/// left without amounts are dropped. A reference whose source price list
/// was non-empty and resolves to nothing is dropped as well. A reference
/// that carried no prices in source is kept without prices, store slots
/// included.
///
/// Fails with [`RemapError::NoReferences`] when the entity declares no
/// references at all.
pub fn remap_references(
    entity: &CatalogEntity,
    source: &CatalogIndex,
    target: &CatalogIndex,
) -> Result<Remapped, RemapError> {
    if !entity.has_references() {
        return Err(RemapError::NoReferences {
            kind: entity.kind.clone(),
            friendly_id: entity.friendly_id.clone(),
        });
    }

    let mut unresolved = Vec::new();
    let mut dropped_prices = 0;
    let mut dropped_references = 0;
    let mut references = Vec::with_capacity(entity.references.len());

    for (index, reference) in entity.references.iter().enumerate() {
        let id = match resolve_strict(&reference.id, source, target) {
            Ok(id) => id,
            Err(error) => {
                unresolved.push(UnresolvedReference {
                    site: ReferenceSite::Reference { index },
                    error,
                });
                continue;
            }
        };

        let (price_options, dropped) = remap_prices(
            &reference.price_options,
            source,
            target,
            |price| ReferenceSite::ReferencePrice {
                reference: index,
                price,
            },
            &mut unresolved,
        );
        dropped_prices += dropped;

        if !reference.price_options.is_empty() && price_options.is_empty() {
            dropped_references += 1;
            continue;
        }

        references.push(EntityReference {
            id,
            amount: reference.amount,
            price_options,
        });
    }

    let (price_options, dropped) = remap_prices(
        &entity.price_options,
        source,
        target,
        |price| ReferenceSite::Price { price },
        &mut unresolved,
    );
    dropped_prices += dropped;

    Ok(Remapped {
        entity: CatalogEntity {
            references,
            price_options,
            ..entity.clone()
        },
        unresolved,
        dropped_prices,
        dropped_references,
    })
}

/// Rewrites only the entity-level prices, for entities without references.
pub fn remap_price_options(
    entity: &CatalogEntity,
    source: &CatalogIndex,
    target: &CatalogIndex,
) -> Remapped {
    let mut unresolved = Vec::new();
    let (price_options, dropped_prices) = remap_prices(
        &entity.price_options,
        source,
        target,
        |price| ReferenceSite::Price { price },
        &mut unresolved,
    );

    Remapped {
        entity: CatalogEntity {
            price_options,
            ..entity.clone()
        },
        unresolved,
        dropped_prices,
        dropped_references: 0,
    }
}

fn remap_prices(
    prices: &[Price],
    source: &CatalogIndex,
    target: &CatalogIndex,
    site: impl Fn(usize) -> ReferenceSite,
    unresolved: &mut Vec<UnresolvedReference>,
) -> (Vec<Price>, usize) {
    let mut remapped = Vec::with_capacity(prices.len());
    let mut dropped = 0;

    for (pos, price) in prices.iter().enumerate() {
        let mut amounts = Vec::with_capacity(price.amounts.len());
        for amount in &price.amounts {
            match resolve_strict(&amount.item_id, source, target) {
                Ok(item_id) => amounts.push(PriceAmount {
                    item_id,
                    amount: amount.amount,
                }),
                Err(error) => unresolved.push(UnresolvedReference {
                    site: site(pos),
                    error,
                }),
            }
        }

        if amounts.is_empty() {
            dropped += 1;
            continue;
        }

        remapped.push(Price {
            amounts,
            unit_amount: price.unit_amount,
            unit_duration_secs: price.unit_duration_secs,
        });
    }

    (remapped, dropped)
}

/// Orders entities so that referenced entities come before their referrers.
///
/// Returns positions into `entities`, grouped in waves: nothing in a wave
/// references anything in the same or a later wave. Entities caught in a
/// reference cycle are returned together in a final wave.
pub fn dependency_waves(entities: &[CatalogEntity], source: &CatalogIndex) -> Vec<Vec<usize>> {
    let positions: HashMap<&str, usize> = entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.has_friendly_id())
        .map(|(pos, e)| (e.friendly_id.as_str(), pos))
        .collect();

    let dependencies: Vec<HashSet<usize>> = entities
        .iter()
        .enumerate()
        .map(|(pos, entity)| {
            entity
                .references
                .iter()
                .filter_map(|r| source.get(&r.id))
                .filter_map(|referenced| positions.get(referenced.friendly_id.as_str()))
                .copied()
                .filter(|&dep| dep != pos)
                .collect()
        })
        .collect();

    let mut placed = vec![false; entities.len()];
    let mut remaining = entities.len();
    let mut waves = Vec::new();

    while remaining > 0 {
        let wave: Vec<usize> = (0..entities.len())
            .filter(|&pos| !placed[pos])
            .filter(|&pos| dependencies[pos].iter().all(|&dep| placed[dep]))
            .collect();

        if wave.is_empty() {
            waves.push((0..entities.len()).filter(|&pos| !placed[pos]).collect());
            break;
        }

        for &pos in &wave {
            placed[pos] = true;
        }
        remaining -= wave.len();
        waves.push(wave);
    }

    waves
}
