//! List command implementation.

use super::{check_format, connect};
use crate::transport::ReqwestClient;
use catsync_engine::{render_catalog, CatalogClient, EconomyConfig};
use catsync_model::{CatalogEntity, EntityKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Catalog listing result.
#[derive(Debug, Serialize)]
pub struct CatalogListing {
    /// Title id.
    pub title: String,
    /// Number of entities per kind.
    pub counts: Vec<KindCount>,
    /// Every entity on the title.
    pub entities: Vec<CatalogEntity>,
}

/// Number of entities of one kind.
#[derive(Debug, Serialize)]
pub struct KindCount {
    /// Kind name.
    pub kind: String,
    /// Entity count.
    pub count: usize,
}

impl CatalogListing {
    fn new(title: &str, entities: Vec<CatalogEntity>) -> Self {
        let mut counts: Vec<KindCount> = EntityKind::RECONCILED
            .iter()
            .map(|kind| KindCount {
                kind: kind.to_string(),
                count: entities.iter().filter(|e| &e.kind == kind).count(),
            })
            .collect();
        let other = entities.iter().filter(|e| !e.kind.is_reconciled()).count();
        if other > 0 {
            counts.push(KindCount {
                kind: "other".into(),
                count: other,
            });
        }

        Self {
            title: title.to_string(),
            counts,
            entities,
        }
    }
}

/// Runs the list command.
pub fn run(
    http: &Arc<ReqwestClient>,
    config: EconomyConfig,
    secret: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    check_format(format)?;

    let title = config.title_id.clone();
    let client = connect(http, config, secret);
    let entities = client.search_all_entities()?;
    info!(title = %title, count = entities.len(), "catalog fetched");

    let listing = CatalogListing::new(&title, entities);
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", render_catalog(&listing.entities));
        println!();
        for count in &listing.counts {
            println!("  {:<9} {}", count.kind, count.count);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_counts_every_kind() {
        let listing = CatalogListing::new(
            "T1",
            vec![
                CatalogEntity::currency("1", "gold"),
                CatalogEntity::item("2", "sword"),
                CatalogEntity::item("3", "bow"),
                CatalogEntity::new("4", EntityKind::Other("ugc".into()), "map"),
            ],
        );

        let counts: Vec<(&str, usize)> = listing
            .counts
            .iter()
            .map(|c| (c.kind.as_str(), c.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("currency", 1),
                ("item", 2),
                ("bundle", 0),
                ("store", 0),
                ("other", 1)
            ]
        );
    }

    #[test]
    fn listing_serializes() {
        let listing = CatalogListing::new("T1", vec![CatalogEntity::currency("1", "gold")]);
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["title"], "T1");
        assert_eq!(json["entities"][0]["friendly_id"], "gold");
    }
}
