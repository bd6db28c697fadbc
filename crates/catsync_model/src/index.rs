//! Indexed catalog snapshots and the identity resolver.

use crate::entity::{CatalogEntity, EntityId, EntityKind};
use crate::error::ResolveError;
use std::collections::{HashMap, HashSet};

/// A catalog snapshot with lookup by instance id and by friendly id.
///
/// Built once per snapshot. When a friendly id occurs more than once, the
/// first occurrence wins for lookup; the duplicates stay in the snapshot.
/// Entities with an empty friendly id are reachable by id only.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entities: Vec<CatalogEntity>,
    by_id: HashMap<EntityId, usize>,
    by_friendly_id: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Builds an index over a snapshot.
    pub fn new(entities: Vec<CatalogEntity>) -> Self {
        let mut index = Self {
            entities,
            by_id: HashMap::new(),
            by_friendly_id: HashMap::new(),
        };
        index.reindex();
        index
    }

    /// Creates an empty index.
    pub fn empty() -> Self {
        Self::default()
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_friendly_id.clear();
        for (pos, entity) in self.entities.iter().enumerate() {
            self.by_id.entry(entity.id.clone()).or_insert(pos);
            if entity.has_friendly_id() {
                self.by_friendly_id
                    .entry(entity.friendly_id.clone())
                    .or_insert(pos);
            }
        }
    }

    /// Looks up an entity by instance id.
    pub fn get(&self, id: &EntityId) -> Option<&CatalogEntity> {
        self.by_id.get(id).map(|&pos| &self.entities[pos])
    }

    /// Looks up an entity by friendly id.
    pub fn find_by_friendly_id(&self, friendly_id: &str) -> Option<&CatalogEntity> {
        self.by_friendly_id
            .get(friendly_id)
            .map(|&pos| &self.entities[pos])
    }

    /// Returns true if an entity with this friendly id is indexed.
    pub fn contains_friendly_id(&self, friendly_id: &str) -> bool {
        self.by_friendly_id.contains_key(friendly_id)
    }

    /// Returns all entities in snapshot order.
    pub fn entities(&self) -> &[CatalogEntity] {
        &self.entities
    }

    /// Iterates over entities of one kind.
    pub fn of_kind<'a>(&'a self, kind: &'a EntityKind) -> impl Iterator<Item = &'a CatalogEntity> {
        self.entities.iter().filter(move |e| &e.kind == kind)
    }

    /// Returns the number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Adds an entity, typically one just created on the instance.
    pub fn insert(&mut self, entity: CatalogEntity) {
        let pos = self.entities.len();
        self.by_id.entry(entity.id.clone()).or_insert(pos);
        if entity.has_friendly_id() {
            self.by_friendly_id
                .entry(entity.friendly_id.clone())
                .or_insert(pos);
        }
        self.entities.push(entity);
    }

    /// Removes every entity whose id is in `ids`.
    ///
    /// Returns the number of entities removed.
    pub fn remove_ids(&mut self, ids: &HashSet<EntityId>) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| !ids.contains(&e.id));
        let removed = before - self.entities.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Returns friendly ids that occur more than once, with their counts.
    pub fn duplicate_friendly_ids(&self) -> Vec<(&str, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entity in self.entities.iter().filter(|e| e.has_friendly_id()) {
            *counts.entry(entity.friendly_id.as_str()).or_default() += 1;
        }
        let mut duplicates: Vec<_> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
        duplicates.sort();
        duplicates
    }

    /// Consumes the index, returning the snapshot.
    pub fn into_entities(self) -> Vec<CatalogEntity> {
        self.entities
    }
}

impl FromIterator<CatalogEntity> for CatalogIndex {
    fn from_iter<I: IntoIterator<Item = CatalogEntity>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Translates a source-space id into target space.
///
/// Fails with [`ResolveError::ReferenceNotFound`] when `source_id` is not in
/// the source pool. Returns `None` when the target has no entity with the
/// same friendly id.
pub fn resolve(
    source_id: &EntityId,
    source: &CatalogIndex,
    target: &CatalogIndex,
) -> Result<Option<EntityId>, ResolveError> {
    let entity = source
        .get(source_id)
        .ok_or_else(|| ResolveError::ReferenceNotFound {
            id: source_id.clone(),
        })?;

    Ok(target
        .find_by_friendly_id(&entity.friendly_id)
        .map(|t| t.id.clone()))
}

/// Like [`resolve`], but a missing counterpart is an error too.
pub fn resolve_strict(
    source_id: &EntityId,
    source: &CatalogIndex,
    target: &CatalogIndex,
) -> Result<EntityId, ResolveError> {
    match resolve(source_id, source, target)? {
        Some(id) => Ok(id),
        None => Err(ResolveError::Unresolved {
            id: source_id.clone(),
            friendly_id: source
                .get(source_id)
                .map(|e| e.friendly_id.clone())
                .unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> CatalogIndex {
        CatalogIndex::new(vec![
            CatalogEntity::currency("1", "gold"),
            CatalogEntity::item("10", "sword"),
            CatalogEntity::item("11", "bow"),
        ])
    }

    fn target() -> CatalogIndex {
        CatalogIndex::new(vec![
            CatalogEntity::currency("101", "gold"),
            CatalogEntity::item("110", "sword"),
        ])
    }

    #[test]
    fn resolve_translates_by_friendly_id() {
        let resolved = resolve(&"10".into(), &source(), &target()).unwrap();
        assert_eq!(resolved, Some(EntityId::new("110")));
    }

    #[test]
    fn resolve_missing_counterpart() {
        assert_eq!(resolve(&"11".into(), &source(), &target()).unwrap(), None);

        let err = resolve_strict(&"11".into(), &source(), &target()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Unresolved {
                id: "11".into(),
                friendly_id: "bow".into()
            }
        );
    }

    #[test]
    fn resolve_dangling_reference() {
        let err = resolve(&"99".into(), &source(), &target()).unwrap_err();
        assert_eq!(err, ResolveError::ReferenceNotFound { id: "99".into() });
    }

    #[test]
    fn empty_friendly_id_never_matches() {
        let source = CatalogIndex::new(vec![CatalogEntity::item("1", "")]);
        let target = CatalogIndex::new(vec![CatalogEntity::item("2", "")]);
        assert_eq!(resolve(&"1".into(), &source, &target).unwrap(), None);
    }

    #[test]
    fn first_duplicate_wins() {
        let index = CatalogIndex::new(vec![
            CatalogEntity::item("a", "sword"),
            CatalogEntity::item("b", "sword"),
        ]);
        assert_eq!(index.find_by_friendly_id("sword").unwrap().id.as_str(), "a");
        assert_eq!(index.duplicate_friendly_ids(), vec![("sword", 2)]);
    }

    #[test]
    fn insert_and_remove_keep_lookups_consistent() {
        let mut index = target();
        index.insert(CatalogEntity::item("111", "bow"));
        assert!(index.contains_friendly_id("bow"));

        let removed = index.remove_ids(&HashSet::from([EntityId::new("110")]));
        assert_eq!(removed, 1);
        assert!(index.find_by_friendly_id("sword").is_none());
        assert_eq!(index.get(&"111".into()).unwrap().friendly_id, "bow");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn removing_first_duplicate_exposes_second() {
        let mut index = CatalogIndex::new(vec![
            CatalogEntity::item("a", "sword"),
            CatalogEntity::item("b", "sword"),
        ]);
        index.remove_ids(&HashSet::from([EntityId::new("a")]));
        assert_eq!(index.find_by_friendly_id("sword").unwrap().id.as_str(), "b");
    }

    #[test]
    fn of_kind_filters() {
        let index = source();
        assert_eq!(index.of_kind(&EntityKind::Item).count(), 2);
        assert_eq!(index.of_kind(&EntityKind::Store).count(), 0);
    }
}
