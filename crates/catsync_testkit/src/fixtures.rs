//! Catalog fixtures.
//!
//! [`CatalogBuilder`] assigns instance ids automatically and wires
//! references by friendly id, so fixtures read like the catalog they
//! describe. A reference to a friendly id that was never added becomes a
//! dangling id (`dangling:<friendly id>`).

use catsync_engine::{MemoryCatalog, ReconcileConfig, RetryConfig};
use catsync_model::{CatalogEntity, EntityId, EntityReference, Payload, Price, PriceAmount};
use serde_json::json;
use std::collections::HashMap;

/// Builds a catalog snapshot for one instance.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    prefix: String,
    next: u64,
    entities: Vec<CatalogEntity>,
    ids: HashMap<String, EntityId>,
}

impl CatalogBuilder {
    /// Creates a builder whose ids start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
            entities: Vec::new(),
            ids: HashMap::new(),
        }
    }

    fn next_id(&mut self) -> EntityId {
        let id = EntityId::new(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }

    /// Returns the id of `friendly_id`, or a dangling id if it is unknown.
    pub fn id_of(&self, friendly_id: &str) -> EntityId {
        self.ids
            .get(friendly_id)
            .cloned()
            .unwrap_or_else(|| EntityId::new(format!("dangling:{friendly_id}")))
    }

    fn price(&self, amounts: &[(&str, i64)]) -> Price {
        Price::new(
            amounts
                .iter()
                .map(|(currency, amount)| PriceAmount::new(self.id_of(currency), *amount))
                .collect(),
        )
    }

    fn push(&mut self, entity: CatalogEntity) -> &mut Self {
        let payload = display_payload(&entity.friendly_id);
        let entity = if entity.payload.is_empty() {
            entity.with_payload(payload)
        } else {
            entity
        };
        self.ids
            .entry(entity.friendly_id.clone())
            .or_insert_with(|| entity.id.clone());
        self.entities.push(entity);
        self
    }

    /// Adds a currency.
    pub fn currency(&mut self, friendly_id: &str) -> &mut Self {
        let id = self.next_id();
        self.push(CatalogEntity::currency(id, friendly_id))
    }

    /// Adds an item without prices.
    pub fn item(&mut self, friendly_id: &str) -> &mut Self {
        let id = self.next_id();
        self.push(CatalogEntity::item(id, friendly_id))
    }

    /// Adds an item with one price made of `amounts`.
    pub fn priced_item(&mut self, friendly_id: &str, amounts: &[(&str, i64)]) -> &mut Self {
        let id = self.next_id();
        let price = self.price(amounts);
        self.push(CatalogEntity::item(id, friendly_id).with_price(price))
    }

    /// Adds a bundle of `(friendly id, quantity)` references.
    pub fn bundle(&mut self, friendly_id: &str, contents: &[(&str, i64)]) -> &mut Self {
        let id = self.next_id();
        let mut bundle = CatalogEntity::bundle(id, friendly_id);
        for (referenced, amount) in contents {
            bundle = bundle.with_reference(EntityReference::new(self.id_of(referenced), *amount));
        }
        self.push(bundle)
    }

    /// Adds a store of `(friendly id, currency, price)` slots.
    pub fn store(&mut self, friendly_id: &str, slots: &[(&str, &str, i64)]) -> &mut Self {
        let id = self.next_id();
        let mut store = CatalogEntity::store(id, friendly_id);
        for (referenced, currency, amount) in slots {
            store = store.with_reference(
                EntityReference::new(self.id_of(referenced), 1)
                    .with_price(self.price(&[(*currency, *amount)])),
            );
        }
        self.push(store)
    }

    /// Adds an entity verbatim.
    pub fn raw(&mut self, entity: CatalogEntity) -> &mut Self {
        self.push(entity)
    }

    /// Returns the snapshot.
    pub fn build(&self) -> Vec<CatalogEntity> {
        self.entities.clone()
    }

    /// Returns an in-memory instance holding the snapshot.
    pub fn to_memory(&self, instance: &str) -> MemoryCatalog {
        MemoryCatalog::with_entities(instance, self.build())
    }
}

/// Display fields carried by fixture entities, the way real catalog items
/// carry titles and stack ids.
pub fn display_payload(friendly_id: &str) -> Payload {
    Payload::new()
        .with(
            "AlternateIds",
            json!([{ "Type": "FriendlyId", "Value": friendly_id }]),
        )
        .with("DefaultStackId", json!(friendly_id))
        .with("Title", json!({ "NEUTRAL": friendly_id }))
}

/// One currency `gold` and one item `sword` priced 5 gold.
pub fn gold_sword_catalog() -> Vec<CatalogEntity> {
    CatalogBuilder::new("src-")
        .currency("gold")
        .priced_item("sword", &[("gold", 5)])
        .build()
}

/// `gold`/`sword` plus a bundle `starter-pack` holding the sword and a
/// `shield` that does not exist in the catalog.
pub fn starter_pack_catalog() -> Vec<CatalogEntity> {
    CatalogBuilder::new("src-")
        .currency("gold")
        .priced_item("sword", &[("gold", 5)])
        .bundle("starter-pack", &[("sword", 1), ("shield", 1)])
        .build()
}

/// A catalog exercising every phase: two currencies, items priced in
/// currencies and in another item, nested bundles and a store.
pub fn layered_catalog() -> Vec<CatalogEntity> {
    CatalogBuilder::new("src-")
        .currency("gold")
        .currency("gems")
        .priced_item("sword", &[("gold", 5)])
        .priced_item("bow", &[("gold", 3), ("gems", 1)])
        .priced_item("key", &[("gems", 2)])
        .priced_item("chest", &[("key", 1)])
        .bundle("archer-pack", &[("bow", 1), ("gold", 100)])
        .bundle("mega-pack", &[("archer-pack", 1), ("sword", 2)])
        .store(
            "main-store",
            &[("sword", "gold", 4), ("mega-pack", "gems", 10)],
        )
        .build()
}

/// Reconciliation config for tests: no retry delays.
pub fn test_config() -> ReconcileConfig {
    ReconcileConfig::new().with_retry(RetryConfig::no_retry())
}
