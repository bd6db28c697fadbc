//! Catalog entities.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Instance-local entity identifier.
///
/// Assigned by the catalog instance that owns the entity. An id taken from
/// one instance means nothing on another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    /// A virtual currency.
    Currency,
    /// A purchasable item.
    Item,
    /// A bundle of other entities.
    Bundle,
    /// A store listing other entities with their own prices.
    Store,
    /// A kind this crate does not know. Preserved, never reconciled.
    Other(String),
}

impl EntityKind {
    /// Kinds handled by reconciliation, in phase order.
    pub const RECONCILED: [EntityKind; 4] = [
        EntityKind::Currency,
        EntityKind::Item,
        EntityKind::Bundle,
        EntityKind::Store,
    ];

    /// Returns the name used by the Economy catalog API.
    pub fn wire_name(&self) -> &str {
        match self {
            EntityKind::Currency => "currency",
            EntityKind::Item => "catalogItem",
            EntityKind::Bundle => "bundle",
            EntityKind::Store => "store",
            EntityKind::Other(name) => name,
        }
    }

    /// Parses an Economy catalog API type name.
    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "currency" => EntityKind::Currency,
            "catalogItem" => EntityKind::Item,
            "bundle" => EntityKind::Bundle,
            "store" => EntityKind::Store,
            other => EntityKind::Other(other.to_string()),
        }
    }

    /// Returns true for kinds the engine reconciles.
    pub fn is_reconciled(&self) -> bool {
        !matches!(self, EntityKind::Other(_))
    }

    /// Returns true for kinds whose payload is their reference list.
    pub fn carries_references(&self) -> bool {
        matches!(self, EntityKind::Bundle | EntityKind::Store)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Currency => f.write_str("currency"),
            EntityKind::Item => f.write_str("item"),
            EntityKind::Bundle => f.write_str("bundle"),
            EntityKind::Store => f.write_str("store"),
            EntityKind::Other(name) => write!(f, "other({name})"),
        }
    }
}

impl From<String> for EntityKind {
    fn from(name: String) -> Self {
        EntityKind::from_wire_name(&name)
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.wire_name().to_string()
    }
}

/// One payment component of a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAmount {
    /// Currency or item paid with.
    pub item_id: EntityId,
    /// Quantity paid.
    pub amount: i64,
}

impl PriceAmount {
    /// Creates a new price amount.
    pub fn new(item_id: impl Into<EntityId>, amount: i64) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
        }
    }
}

/// A price definition: all amounts are paid together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Payment components.
    pub amounts: Vec<PriceAmount>,
    /// Units granted per purchase, for recurring prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_amount: Option<i64>,
    /// Duration of one unit, for recurring prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_duration_secs: Option<u64>,
}

impl Price {
    /// Creates a price from its amounts.
    pub fn new(amounts: Vec<PriceAmount>) -> Self {
        Self {
            amounts,
            unit_amount: None,
            unit_duration_secs: None,
        }
    }

    /// Creates a single-amount price.
    pub fn single(item_id: impl Into<EntityId>, amount: i64) -> Self {
        Self::new(vec![PriceAmount::new(item_id, amount)])
    }

    /// Sets the recurrence metadata.
    pub fn with_recurrence(mut self, unit_amount: i64, unit_duration_secs: u64) -> Self {
        self.unit_amount = Some(unit_amount);
        self.unit_duration_secs = Some(unit_duration_secs);
        self
    }
}

/// A pointer from a bundle or store to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    /// Referenced entity, in the owner's instance.
    pub id: EntityId,
    /// Quantity granted.
    pub amount: i64,
    /// Per-reference prices (stores).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub price_options: Vec<Price>,
}

impl EntityReference {
    /// Creates a reference without prices.
    pub fn new(id: impl Into<EntityId>, amount: i64) -> Self {
        Self {
            id: id.into(),
            amount,
            price_options: Vec::new(),
        }
    }

    /// Adds a per-reference price.
    pub fn with_price(mut self, price: Price) -> Self {
        self.price_options.push(price);
        self
    }
}

/// Instance-agnostic descriptive fields, copied verbatim on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Adds a field.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Returns a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the payload.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One row of a catalog snapshot.
///
/// Entities are never mutated on a remote instance: a change is always
/// expressed as delete-old/create-new.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntity {
    /// Instance-local id.
    pub id: EntityId,
    /// Entity kind.
    pub kind: EntityKind,
    /// Cross-instance identity key.
    pub friendly_id: String,
    /// Outgoing references (bundles, stores).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<EntityReference>,
    /// Entity-level prices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub price_options: Vec<Price>,
    /// Everything else.
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub payload: Payload,
}

impl CatalogEntity {
    /// Creates an entity without references, prices or payload.
    pub fn new(id: impl Into<EntityId>, kind: EntityKind, friendly_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            friendly_id: friendly_id.into(),
            references: Vec::new(),
            price_options: Vec::new(),
            payload: Payload::new(),
        }
    }

    /// Creates a currency.
    pub fn currency(id: impl Into<EntityId>, friendly_id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Currency, friendly_id)
    }

    /// Creates an item.
    pub fn item(id: impl Into<EntityId>, friendly_id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Item, friendly_id)
    }

    /// Creates a bundle.
    pub fn bundle(id: impl Into<EntityId>, friendly_id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Bundle, friendly_id)
    }

    /// Creates a store.
    pub fn store(id: impl Into<EntityId>, friendly_id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Store, friendly_id)
    }

    /// Adds a reference.
    pub fn with_reference(mut self, reference: EntityReference) -> Self {
        self.references.push(reference);
        self
    }

    /// Adds an entity-level price.
    pub fn with_price(mut self, price: Price) -> Self {
        self.price_options.push(price);
        self
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Returns a copy carrying a different instance id.
    pub fn with_id(&self, id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }

    /// Returns true if the entity can take part in identity matching.
    pub fn has_friendly_id(&self) -> bool {
        !self.friendly_id.is_empty()
    }

    /// Returns true if any reference is declared.
    pub fn has_references(&self) -> bool {
        !self.references.is_empty()
    }

    /// Returns true if any price is declared, at entity or reference level.
    pub fn has_prices(&self) -> bool {
        !self.price_options.is_empty()
            || self.references.iter().any(|r| !r.price_options.is_empty())
    }

    /// Iterates over every instance id this entity points at.
    pub fn referenced_ids(&self) -> impl Iterator<Item = &EntityId> {
        let prices = self.price_options.iter().flat_map(|p| &p.amounts);
        let reference_prices = self
            .references
            .iter()
            .flat_map(|r| &r.price_options)
            .flat_map(|p| &p.amounts);

        self.references
            .iter()
            .map(|r| &r.id)
            .chain(prices.map(|a| &a.item_id))
            .chain(reference_prices.map(|a| &a.item_id))
    }

    /// Returns a copy without references.
    pub fn without_references(mut self) -> Self {
        self.references.clear();
        self
    }

    /// Returns a copy without any prices.
    pub fn without_prices(mut self) -> Self {
        self.price_options.clear();
        for reference in &mut self.references {
            reference.price_options.clear();
        }
        self
    }
}
