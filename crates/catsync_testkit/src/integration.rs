//! Cross-instance integration test helpers.
//!
//! Provides a harness that runs reconciliations between two in-memory
//! instances, and structural comparison of catalogs across instances.

use crate::fixtures::test_config;
use catsync_engine::{
    MemoryCatalog, ReconcileConfig, ReconcileEvent, ReconcilePlan, ReconcileResult, Reconciler,
    RecordingSink, RunReport,
};
use catsync_model::{CatalogEntity, CatalogIndex, EntityId, EntityKind, Payload, Price};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A price with every id replaced by its friendly id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalPrice {
    /// `(friendly id, amount)` pairs.
    pub amounts: Vec<(String, i64)>,
    /// Recurrence units.
    pub unit_amount: Option<i64>,
    /// Recurrence duration.
    pub unit_duration_secs: Option<u64>,
}

/// A reference with every id replaced by its friendly id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalReference {
    /// Referenced friendly id.
    pub friendly_id: String,
    /// Quantity.
    pub amount: i64,
    /// Per-reference prices.
    pub prices: Vec<NormalPrice>,
}

/// An entity in instance-independent form.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEntity {
    /// References.
    pub references: Vec<NormalReference>,
    /// Entity-level prices.
    pub prices: Vec<NormalPrice>,
    /// Descriptive payload.
    pub payload: Payload,
}

/// A catalog keyed by `(kind, friendly id)`.
pub type NormalCatalog = BTreeMap<(String, String), NormalEntity>;

fn normal_prices(prices: &[Price], index: &CatalogIndex) -> Vec<NormalPrice> {
    prices
        .iter()
        .filter_map(|price| {
            let amounts: Vec<(String, i64)> = price
                .amounts
                .iter()
                .filter_map(|a| friendly_id_of(&a.item_id, index).map(|f| (f, a.amount)))
                .collect();
            (!amounts.is_empty()).then(|| NormalPrice {
                amounts,
                unit_amount: price.unit_amount,
                unit_duration_secs: price.unit_duration_secs,
            })
        })
        .collect()
}

fn friendly_id_of(id: &EntityId, index: &CatalogIndex) -> Option<String> {
    index
        .get(id)
        .filter(|e| e.has_friendly_id())
        .map(|e| e.friendly_id.clone())
}

/// Normalizes a catalog into what a faithful copy of it looks like.
///
/// Mirrors what reconciliation promises: ids become friendly ids, ids that
/// point nowhere are dropped along with prices and references they empty
/// out, currencies are bare, items carry only prices, and bundles and
/// stores without references do not exist. Only the first entity of each
/// friendly id counts.
pub fn normalize(entities: &[CatalogEntity]) -> NormalCatalog {
    let index = CatalogIndex::new(entities.to_vec());
    let mut catalog = NormalCatalog::new();

    for entity in entities {
        if !entity.has_friendly_id() || !entity.kind.is_reconciled() {
            continue;
        }
        if entity.kind.carries_references() && !entity.has_references() {
            continue;
        }
        let key = (
            entity.kind.wire_name().to_string(),
            entity.friendly_id.clone(),
        );
        if catalog.contains_key(&key) {
            continue;
        }

        let (references, prices) = match entity.kind {
            EntityKind::Currency => (Vec::new(), Vec::new()),
            EntityKind::Item => (Vec::new(), normal_prices(&entity.price_options, &index)),
            _ => {
                let references = entity
                    .references
                    .iter()
                    .filter_map(|r| {
                        let friendly_id = friendly_id_of(&r.id, &index)?;
                        let prices = normal_prices(&r.price_options, &index);
                        if !r.price_options.is_empty() && prices.is_empty() {
                            return None;
                        }
                        Some(NormalReference {
                            friendly_id,
                            amount: r.amount,
                            prices,
                        })
                    })
                    .collect();
                (references, normal_prices(&entity.price_options, &index))
            }
        };

        catalog.insert(
            key,
            NormalEntity {
                references,
                prices,
                payload: entity.payload.clone(),
            },
        );
    }

    catalog
}

/// Returns true if `target` is a faithful copy of `source`.
pub fn catalogs_equivalent(source: &[CatalogEntity], target: &[CatalogEntity]) -> bool {
    normalize(source) == normalize(target)
}

/// Asserts that `target` is a faithful copy of `source`.
pub fn assert_catalogs_equivalent(source: &[CatalogEntity], target: &[CatalogEntity]) {
    let expected = normalize(source);
    let actual = normalize(target);

    for (key, entity) in &expected {
        match actual.get(key) {
            Some(copy) => assert_eq!(copy, entity, "{} {} differs on target", key.0, key.1),
            None => panic!("{} {} is missing on target", key.0, key.1),
        }
    }
    for key in actual.keys() {
        assert!(
            expected.contains_key(key),
            "{} {} exists on target but not on source",
            key.0,
            key.1
        );
    }
}

/// Asserts that every id referenced on an instance exists on it.
pub fn assert_references_resolve(entities: &[CatalogEntity]) {
    let index = CatalogIndex::new(entities.to_vec());
    for entity in entities {
        for id in entity.referenced_ids() {
            assert!(
                index.get(id).is_some(),
                "{} {} references missing id {}",
                entity.kind,
                entity.friendly_id,
                id
            );
        }
    }
}

/// Returns the instance ids of an instance, keyed by friendly id.
pub fn ids_by_friendly_id(entities: &[CatalogEntity]) -> BTreeMap<String, EntityId> {
    let mut ids = BTreeMap::new();
    for entity in entities.iter().filter(|e| e.has_friendly_id()) {
        ids.entry(entity.friendly_id.clone())
            .or_insert_with(|| entity.id.clone());
    }
    ids
}

/// A test harness reconciling two in-memory instances.
///
/// The target survives across runs, so repeated runs observe the state
/// earlier runs left behind.
pub struct ReconcileHarness {
    source: Arc<MemoryCatalog>,
    target: Arc<MemoryCatalog>,
    sink: Arc<RecordingSink>,
    config: ReconcileConfig,
}

impl ReconcileHarness {
    /// Creates a harness over the given source and target snapshots.
    pub fn new(source: Vec<CatalogEntity>, target: Vec<CatalogEntity>) -> Self {
        Self::from_catalogs(
            MemoryCatalog::with_entities("source", source),
            MemoryCatalog::with_entities("target", target),
        )
    }

    /// Creates a harness over prepared instances.
    pub fn from_catalogs(source: MemoryCatalog, target: MemoryCatalog) -> Self {
        Self {
            source: Arc::new(source),
            target: Arc::new(target),
            sink: Arc::new(RecordingSink::new()),
            config: test_config(),
        }
    }

    /// Replaces the configuration used by later runs.
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a reconciler over the harness instances.
    pub fn reconciler(
        &self,
        config: ReconcileConfig,
    ) -> Reconciler<Arc<MemoryCatalog>, Arc<MemoryCatalog>> {
        Reconciler::new(self.source.clone(), self.target.clone(), config)
            .with_sink(self.sink.clone())
    }

    /// Runs a reconciliation, panicking if it fails.
    pub fn run(&mut self) -> RunReport {
        self.try_run().expect("Reconciliation failed")
    }

    /// Runs a reconciliation.
    pub fn try_run(&mut self) -> ReconcileResult<RunReport> {
        self.run_with(self.config.clone())
    }

    /// Runs a reconciliation with a one-off configuration.
    pub fn run_with(&mut self, config: ReconcileConfig) -> ReconcileResult<RunReport> {
        self.target.clear_calls();
        self.reconciler(config).run()
    }

    /// Computes the plan without touching the target.
    pub fn plan(&self) -> ReconcilePlan {
        self.reconciler(self.config.clone())
            .plan()
            .expect("Planning failed")
    }

    /// Returns the source instance.
    pub fn source(&self) -> &MemoryCatalog {
        &self.source
    }

    /// Returns the target instance.
    pub fn target(&self) -> &MemoryCatalog {
        &self.target
    }

    /// Returns the current target entities.
    pub fn target_entities(&self) -> Vec<CatalogEntity> {
        self.target.entities()
    }

    /// Returns every event recorded so far.
    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.sink.events()
    }

    /// Returns the event sink.
    pub fn sink(&self) -> &RecordingSink {
        &self.sink
    }
}

/// Reconciles `source` into `target` once and returns the report and the
/// resulting target entities.
pub fn reconcile(
    source: Vec<CatalogEntity>,
    target: Vec<CatalogEntity>,
    config: ReconcileConfig,
) -> (RunReport, Vec<CatalogEntity>) {
    let mut harness = ReconcileHarness::new(source, target).with_config(config);
    let report = harness.run();
    (report, harness.target_entities())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use catsync_model::EntityReference;

    #[test]
    fn normalize_drops_dangling_references() {
        let catalog = starter_pack_catalog();
        let normal = normalize(&catalog);

        let pack = &normal[&("bundle".to_string(), "starter-pack".to_string())];
        assert_eq!(pack.references.len(), 1);
        assert_eq!(pack.references[0].friendly_id, "sword");
    }

    #[test]
    fn normalize_ignores_instance_ids() {
        let source = gold_sword_catalog();
        let mut builder = CatalogBuilder::new("other-");
        builder.item("padding");
        builder.currency("gold").priced_item("sword", &[("gold", 5)]);
        let mut copy = builder.build();
        copy.remove(0);

        assert!(catalogs_equivalent(&source, &copy));
    }

    #[test]
    fn normalize_skips_reference_less_bundles() {
        let catalog = vec![CatalogEntity::bundle("1", "empty")];
        assert!(normalize(&catalog).is_empty());
    }

    #[test]
    fn differing_quantities_are_not_equivalent() {
        let a = CatalogBuilder::new("a-")
            .item("sword")
            .bundle("pack", &[("sword", 1)])
            .build();
        let b = CatalogBuilder::new("b-")
            .item("sword")
            .bundle("pack", &[("sword", 2)])
            .build();
        assert!(!catalogs_equivalent(&a, &b));
    }

    #[test]
    #[should_panic(expected = "references missing id")]
    fn broken_reference_is_detected() {
        let catalog = vec![
            CatalogEntity::bundle("1", "pack").with_reference(EntityReference::new("404", 1)),
        ];
        assert_references_resolve(&catalog);
    }

    #[test]
    fn harness_copies_and_second_run_is_noop() {
        let source = gold_sword_catalog();
        let mut harness = ReconcileHarness::new(source.clone(), Vec::new());

        let first = harness.run();
        assert_eq!(first.created(), 2);
        assert_catalogs_equivalent(&source, &harness.target_entities());
        assert_references_resolve(&harness.target_entities());

        let second = harness.run();
        assert_eq!(second.created(), 0);
        assert_eq!(second.deleted(), 0);
        assert_eq!(harness.target().created_total(), 0);
    }
}
