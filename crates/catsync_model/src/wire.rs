//! Economy catalog item wire format.
//!
//! The catalog API describes every entity as a `CatalogItem` JSON object
//! with PascalCase fields. Only the fields the reconciler has to understand
//! are modelled; everything else is carried through untouched in
//! [`WireCatalogItem::extra`] and ends up in the entity [`Payload`].

use crate::entity::{
    CatalogEntity, EntityId, EntityKind, EntityReference, Payload, Price, PriceAmount,
};
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Alternate id type holding the friendly id.
pub const FRIENDLY_ID_TYPE: &str = "FriendlyId";

/// Fields assigned by the owning instance. Never copied to another one.
pub const INSTANCE_FIELDS: &[&str] = &[
    "CreationDate",
    "LastModifiedDate",
    "ETag",
    "Moderation",
    "Rating",
];

/// Identifies an entity (title, player, ...) in the Economy API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireEntityKey {
    /// Entity id.
    pub id: String,
    /// Entity type, `title` for catalog owners.
    #[serde(rename = "Type")]
    pub key_type: String,
}

impl WireEntityKey {
    /// Key for a title.
    pub fn title(title_id: impl Into<String>) -> Self {
        Self {
            id: title_id.into(),
            key_type: "title".into(),
        }
    }
}

/// One amount of a wire price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WirePriceAmount {
    /// Currency or item id.
    #[serde(default)]
    pub item_id: Option<String>,
    /// Amount.
    #[serde(default)]
    pub amount: i64,
}

/// A wire price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WirePrice {
    /// Amounts paid together.
    #[serde(default)]
    pub amounts: Vec<WirePriceAmount>,
    /// Units per purchase, recurring prices only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_amount: Option<i64>,
    /// Seconds per unit, recurring prices only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_duration_in_seconds: Option<u64>,
}

/// Wire price options container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WirePriceOptions {
    /// Prices.
    #[serde(default)]
    pub prices: Vec<WirePrice>,
}

/// A wire item reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireItemReference {
    /// Referenced item id.
    #[serde(default)]
    pub id: Option<String>,
    /// Quantity.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Per-reference prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_options: Option<WirePriceOptions>,
}

/// A catalog item as sent and received by the Economy API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCatalogItem {
    /// Instance id, absent on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type (`currency`, `catalogItem`, `bundle`, `store`, ...).
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// Outgoing references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_references: Option<Vec<WireItemReference>>,
    /// Prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_options: Option<WirePriceOptions>,
    /// Owning entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_entity: Option<WireEntityKey>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WireCatalogItem {
    /// Returns the friendly id.
    ///
    /// Taken from the `FriendlyId` alternate id, falling back to the default
    /// stack id, which catalogs conventionally keep equal to it.
    pub fn friendly_id(&self) -> Option<&str> {
        let alternate = self
            .extra
            .get("AlternateIds")
            .and_then(Value::as_array)
            .and_then(|ids| {
                ids.iter().find(|id| {
                    id.get("Type").and_then(Value::as_str) == Some(FRIENDLY_ID_TYPE)
                })
            })
            .and_then(|id| id.get("Value"))
            .and_then(Value::as_str);

        alternate
            .or_else(|| self.extra.get("DefaultStackId").and_then(Value::as_str))
            .filter(|id| !id.is_empty())
    }

    /// Converts a fetched item into a catalog entity.
    pub fn into_entity(self) -> ModelResult<CatalogEntity> {
        let friendly_id = self.friendly_id().unwrap_or_default().to_string();
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ModelError::InvalidItem(format!("item {friendly_id:?} has no id")))?;

        let kind = EntityKind::from_wire_name(self.item_type.as_deref().unwrap_or_default());

        let references = self
            .item_references
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                Some(EntityReference {
                    id: EntityId::new(r.id?),
                    amount: r.amount.unwrap_or(1),
                    price_options: prices_from_wire(r.price_options),
                })
            })
            .collect();

        let mut extra = self.extra;
        for field in INSTANCE_FIELDS {
            extra.remove(*field);
        }

        Ok(CatalogEntity {
            id: EntityId::new(id),
            kind,
            friendly_id,
            references,
            price_options: prices_from_wire(self.price_options),
            payload: Payload::from_map(extra),
        })
    }

    /// Builds the item to send when creating `entity` on an instance.
    ///
    /// The instance id is left out; the new owner is `creator`.
    pub fn from_entity(entity: &CatalogEntity, creator: Option<WireEntityKey>) -> Self {
        let item_references = (!entity.references.is_empty()).then(|| {
            entity
                .references
                .iter()
                .map(|r| WireItemReference {
                    id: Some(r.id.to_string()),
                    amount: Some(r.amount),
                    price_options: prices_to_wire(&r.price_options),
                })
                .collect()
        });

        Self {
            id: None,
            item_type: Some(entity.kind.wire_name().to_string()),
            item_references,
            price_options: prices_to_wire(&entity.price_options),
            creator_entity: creator,
            extra: entity.payload.as_map().clone(),
        }
    }
}

fn prices_from_wire(options: Option<WirePriceOptions>) -> Vec<Price> {
    options
        .map(|o| o.prices)
        .unwrap_or_default()
        .into_iter()
        .map(|p| Price {
            amounts: p
                .amounts
                .into_iter()
                .filter_map(|a| Some(PriceAmount::new(a.item_id?, a.amount)))
                .collect(),
            unit_amount: p.unit_amount,
            unit_duration_secs: p.unit_duration_in_seconds,
        })
        .collect()
}

fn prices_to_wire(prices: &[Price]) -> Option<WirePriceOptions> {
    if prices.is_empty() {
        return None;
    }
    Some(WirePriceOptions {
        prices: prices
            .iter()
            .map(|p| WirePrice {
                amounts: p
                    .amounts
                    .iter()
                    .map(|a| WirePriceAmount {
                        item_id: Some(a.item_id.to_string()),
                        amount: a.amount,
                    })
                    .collect(),
                unit_amount: p.unit_amount,
                unit_duration_in_seconds: p.unit_duration_secs,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sword_json() -> Value {
        json!({
            "Id": "a1b2",
            "Type": "catalogItem",
            "AlternateIds": [{"Type": "FriendlyId", "Value": "sword"}],
            "DefaultStackId": "sword",
            "Title": {"NEUTRAL": "Sword"},
            "CreatorEntity": {"Id": "SRC1", "Type": "title"},
            "CreationDate": "2024-01-01T00:00:00Z",
            "ETag": "3",
            "PriceOptions": {
                "Prices": [{"Amounts": [{"ItemId": "c9", "Amount": 5}]}]
            }
        })
    }

    #[test]
    fn friendly_id_prefers_alternate_id() {
        let item: WireCatalogItem = serde_json::from_value(json!({
            "Id": "x",
            "AlternateIds": [{"Type": "FriendlyId", "Value": "gold"}],
            "DefaultStackId": "other"
        }))
        .unwrap();
        assert_eq!(item.friendly_id(), Some("gold"));

        let item: WireCatalogItem =
            serde_json::from_value(json!({"Id": "x", "DefaultStackId": "gems"})).unwrap();
        assert_eq!(item.friendly_id(), Some("gems"));

        let item: WireCatalogItem = serde_json::from_value(json!({"Id": "x"})).unwrap();
        assert_eq!(item.friendly_id(), None);
    }

    #[test]
    fn into_entity_drops_instance_fields() {
        let item: WireCatalogItem = serde_json::from_value(sword_json()).unwrap();
        let entity = item.into_entity().unwrap();

        assert_eq!(entity.id.as_str(), "a1b2");
        assert_eq!(entity.kind, EntityKind::Item);
        assert_eq!(entity.friendly_id, "sword");
        assert_eq!(entity.price_options, vec![Price::single("c9", 5)]);
        assert!(entity.payload.get("CreationDate").is_none());
        assert!(entity.payload.get("ETag").is_none());
        assert!(entity.payload.get("CreatorEntity").is_none());
        assert_eq!(entity.payload.get("Title"), Some(&json!({"NEUTRAL": "Sword"})));
    }

    #[test]
    fn into_entity_requires_id() {
        let item: WireCatalogItem =
            serde_json::from_value(json!({"Type": "currency", "DefaultStackId": "gold"})).unwrap();
        assert!(matches!(item.into_entity(), Err(ModelError::InvalidItem(_))));
    }

    #[test]
    fn from_entity_builds_create_payload() {
        let item: WireCatalogItem = serde_json::from_value(sword_json()).unwrap();
        let entity = item.into_entity().unwrap();

        let wire = WireCatalogItem::from_entity(&entity, Some(WireEntityKey::title("TGT1")));
        let value = serde_json::to_value(&wire).unwrap();

        assert!(value.get("Id").is_none());
        assert_eq!(value["Type"], "catalogItem");
        assert_eq!(value["CreatorEntity"], json!({"Id": "TGT1", "Type": "title"}));
        assert_eq!(value["AlternateIds"][0]["Value"], "sword");
        assert_eq!(
            value["PriceOptions"]["Prices"][0]["Amounts"][0],
            json!({"ItemId": "c9", "Amount": 5})
        );
        assert!(value.get("ItemReferences").is_none());
    }

    #[test]
    fn references_without_id_are_ignored() {
        let item: WireCatalogItem = serde_json::from_value(json!({
            "Id": "b1",
            "Type": "bundle",
            "DefaultStackId": "pack",
            "ItemReferences": [{"Id": "a1", "Amount": 2}, {"Amount": 1}]
        }))
        .unwrap();
        let entity = item.into_entity().unwrap();
        assert_eq!(entity.references, vec![EntityReference::new("a1", 2)]);
    }
}
