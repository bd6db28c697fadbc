//! Presence diff between a source and a target snapshot of one kind.

use crate::entity::CatalogEntity;
use crate::error::{DataQualityWarning, Side};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Diff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMode {
    /// Keep entities matched by friendly id on both sides.
    #[default]
    Incremental,
    /// Delete everything on target and recreate everything from source.
    FullRecreate,
}

/// Result of diffing one kind.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    /// Source entities to create on the target.
    pub to_create: Vec<CatalogEntity>,
    /// Target entities to delete.
    pub to_delete: Vec<CatalogEntity>,
    /// Entities present on both sides and left alone.
    pub unchanged: usize,
    /// Data problems found while diffing.
    pub warnings: Vec<DataQualityWarning>,
}

impl Diff {
    /// Returns true if nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Computes the create and delete sets for entities of a single kind.
///
/// Only presence by friendly id is compared, never field content.
///
/// Source entities without a friendly id, and repeated source friendly ids
/// after their first occurrence, are never create candidates. On the target,
/// every occurrence of a friendly id after the first is deleted; the first
/// occurrence is what counts as "already present".
pub fn diff<'a, S, T>(source: S, target: T, mode: DiffMode) -> Diff
where
    S: IntoIterator<Item = &'a CatalogEntity>,
    T: IntoIterator<Item = &'a CatalogEntity>,
{
    let mut result = Diff::default();

    let candidates = unique_by_friendly_id(source, Side::Source, &mut result.warnings);
    let source_ids: HashSet<&str> = candidates
        .iter()
        .map(|e| e.friendly_id.as_str())
        .collect();

    let target: Vec<&CatalogEntity> = target.into_iter().collect();
    let mut target_counts: HashMap<&str, usize> = HashMap::new();
    let mut present: HashSet<&str> = HashSet::new();

    for entity in &target {
        if !entity.has_friendly_id() {
            result.warnings.push(DataQualityWarning::MissingFriendlyId {
                side: Side::Target,
                kind: entity.kind.clone(),
                id: entity.id.clone(),
            });
            result.to_delete.push((*entity).clone());
            continue;
        }

        let seen = target_counts.entry(entity.friendly_id.as_str()).or_default();
        *seen += 1;
        let first = *seen == 1;

        let keep = first
            && mode == DiffMode::Incremental
            && source_ids.contains(entity.friendly_id.as_str());
        if first {
            present.insert(entity.friendly_id.as_str());
        }
        if keep {
            result.unchanged += 1;
        } else {
            result.to_delete.push((*entity).clone());
        }
    }

    push_duplicate_warnings(&target, &target_counts, Side::Target, &mut result.warnings);

    for entity in candidates {
        let exists =
            mode == DiffMode::Incremental && present.contains(entity.friendly_id.as_str());
        if !exists {
            result.to_create.push(entity.clone());
        }
    }

    result
}

fn unique_by_friendly_id<'a, I>(
    entities: I,
    side: Side,
    warnings: &mut Vec<DataQualityWarning>,
) -> Vec<&'a CatalogEntity>
where
    I: IntoIterator<Item = &'a CatalogEntity>,
{
    let all: Vec<&CatalogEntity> = entities.into_iter().collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut unique = Vec::with_capacity(all.len());

    for entity in &all {
        if !entity.has_friendly_id() {
            warnings.push(DataQualityWarning::MissingFriendlyId {
                side,
                kind: entity.kind.clone(),
                id: entity.id.clone(),
            });
            continue;
        }
        let seen = counts.entry(entity.friendly_id.as_str()).or_default();
        *seen += 1;
        if *seen == 1 {
            unique.push(*entity);
        }
    }

    push_duplicate_warnings(&all, &counts, side, warnings);
    unique
}

fn push_duplicate_warnings(
    entities: &[&CatalogEntity],
    counts: &HashMap<&str, usize>,
    side: Side,
    warnings: &mut Vec<DataQualityWarning>,
) {
    let mut reported = HashSet::new();
    for entity in entities {
        let count = counts.get(entity.friendly_id.as_str()).copied().unwrap_or(0);
        if count > 1 && reported.insert(entity.friendly_id.as_str()) {
            warnings.push(DataQualityWarning::DuplicateFriendlyId {
                side,
                kind: entity.kind.clone(),
                friendly_id: entity.friendly_id.clone(),
                count,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friendly_ids(entities: &[CatalogEntity]) -> Vec<&str> {
        entities.iter().map(|e| e.friendly_id.as_str()).collect()
    }

    fn ids(entities: &[CatalogEntity]) -> Vec<&str> {
        entities.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn incremental_keeps_matched_entities() {
        let source = vec![
            CatalogEntity::item("1", "sword"),
            CatalogEntity::item("2", "bow"),
        ];
        let target = vec![
            CatalogEntity::item("x", "sword"),
            CatalogEntity::item("y", "axe"),
        ];

        let diff = diff(&source, &target, DiffMode::Incremental);
        assert_eq!(friendly_ids(&diff.to_create), vec!["bow"]);
        assert_eq!(friendly_ids(&diff.to_delete), vec!["axe"]);
        assert_eq!(diff.unchanged, 1);
        assert!(diff.warnings.is_empty());
    }

    #[test]
    fn incremental_identical_sets_is_empty() {
        let source = vec![CatalogEntity::currency("1", "gold")];
        let target = vec![CatalogEntity::currency("101", "gold")];

        let diff = diff(&source, &target, DiffMode::Incremental);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn full_recreate_replaces_everything() {
        let source = vec![CatalogEntity::item("1", "sword")];
        let target = vec![
            CatalogEntity::item("x", "sword"),
            CatalogEntity::item("y", "axe"),
        ];

        let diff = diff(&source, &target, DiffMode::FullRecreate);
        assert_eq!(friendly_ids(&diff.to_create), vec!["sword"]);
        assert_eq!(ids(&diff.to_delete), vec!["x", "y"]);
        assert_eq!(diff.unchanged, 0);
    }

    #[test]
    fn target_duplicates_are_deleted_after_first() {
        let source = vec![CatalogEntity::item("1", "sword")];
        let target = vec![
            CatalogEntity::item("x", "sword"),
            CatalogEntity::item("y", "sword"),
            CatalogEntity::item("z", "sword"),
        ];

        let diff = diff(&source, &target, DiffMode::Incremental);
        assert!(diff.to_create.is_empty());
        assert_eq!(ids(&diff.to_delete), vec!["y", "z"]);
        assert_eq!(
            diff.warnings,
            vec![DataQualityWarning::DuplicateFriendlyId {
                side: Side::Target,
                kind: crate::EntityKind::Item,
                friendly_id: "sword".into(),
                count: 3,
            }]
        );
    }

    #[test]
    fn target_duplicates_missing_from_source_are_all_deleted() {
        let source: Vec<CatalogEntity> = Vec::new();
        let target = vec![
            CatalogEntity::item("x", "sword"),
            CatalogEntity::item("y", "sword"),
        ];

        let diff = diff(&source, &target, DiffMode::Incremental);
        assert_eq!(ids(&diff.to_delete), vec!["x", "y"]);
    }

    #[test]
    fn source_duplicates_create_once() {
        let source = vec![
            CatalogEntity::item("1", "sword"),
            CatalogEntity::item("2", "sword"),
        ];
        let target: Vec<CatalogEntity> = Vec::new();

        let diff = diff(&source, &target, DiffMode::Incremental);
        assert_eq!(ids(&diff.to_create), vec!["1"]);
        assert_eq!(diff.warnings.len(), 1);
    }

    #[test]
    fn missing_friendly_ids() {
        let source = vec![CatalogEntity::item("1", "")];
        let target = vec![CatalogEntity::item("x", "")];

        let diff = diff(&source, &target, DiffMode::Incremental);
        assert!(diff.to_create.is_empty());
        assert_eq!(ids(&diff.to_delete), vec!["x"]);
        assert_eq!(diff.warnings.len(), 2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn pool(prefix: &'static str) -> impl Strategy<Value = Vec<CatalogEntity>> {
            prop::collection::vec("[a-e]{0,2}", 0..12).prop_map(move |names| {
                names
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| CatalogEntity::item(format!("{prefix}{i}"), name))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn diff_against_applied_result_is_empty(
                source in pool("s"),
                target in pool("t"),
                full in any::<bool>(),
            ) {
                let mode = if full { DiffMode::FullRecreate } else { DiffMode::Incremental };
                let first = diff(&source, &target, mode);

                let deleted: HashSet<&str> = first.to_delete.iter().map(|e| e.id.as_str()).collect();
                let mut applied: Vec<CatalogEntity> = target
                    .iter()
                    .filter(|e| !deleted.contains(e.id.as_str()))
                    .cloned()
                    .collect();
                applied.extend(first.to_create.iter().cloned());

                let second = diff(&source, &applied, DiffMode::Incremental);
                prop_assert!(second.is_empty());
            }

            #[test]
            fn incremental_never_touches_matched_entities(
                source in pool("s"),
                target in pool("t"),
            ) {
                let result = diff(&source, &target, DiffMode::Incremental);
                let source_ids: HashSet<&str> = source.iter().map(|e| e.friendly_id.as_str()).collect();

                let mut first_seen = HashSet::new();
                for entity in &target {
                    let first = first_seen.insert(entity.friendly_id.as_str());
                    let matched = first && entity.has_friendly_id() && source_ids.contains(entity.friendly_id.as_str());
                    let deleted = result.to_delete.iter().any(|e| e.id == entity.id);
                    prop_assert_eq!(deleted, !matched);
                }
                for created in &result.to_create {
                    prop_assert!(!target.iter().any(|e| e.friendly_id == created.friendly_id));
                }
            }
        }
    }
}
