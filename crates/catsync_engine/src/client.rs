//! Catalog client abstraction.

use crate::error::{ReconcileError, ReconcileResult};
use catsync_model::{CatalogEntity, EntityId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Client for one catalog instance.
///
/// This trait abstracts the remote catalog, allowing for different
/// implementations (the Economy HTTP API, an in-memory catalog for tests).
/// Bulk operations are best effort and report one outcome per input, in
/// input order.
pub trait CatalogClient: Send + Sync {
    /// Name of the instance, for logs and errors.
    fn instance(&self) -> &str;

    /// Fetches every entity of the instance, paginating internally.
    ///
    /// Any page failure fails the whole call with [`ReconcileError::Fetch`].
    fn search_all_entities(&self) -> ReconcileResult<Vec<CatalogEntity>>;

    /// Deletes entities by id.
    fn delete_entities(&self, ids: &[EntityId]) -> Vec<ReconcileResult<()>>;

    /// Creates entities, returning the id the instance assigned to each.
    fn create_entities(
        &self,
        entities: &[CatalogEntity],
        options: CreateOptions,
    ) -> Vec<ReconcileResult<EntityId>>;

    /// Largest number of entities accepted by one bulk call.
    fn max_batch_size(&self) -> usize;
}

impl<C: CatalogClient + ?Sized> CatalogClient for Arc<C> {
    fn instance(&self) -> &str {
        (**self).instance()
    }

    fn search_all_entities(&self) -> ReconcileResult<Vec<CatalogEntity>> {
        (**self).search_all_entities()
    }

    fn delete_entities(&self, ids: &[EntityId]) -> Vec<ReconcileResult<()>> {
        (**self).delete_entities(ids)
    }

    fn create_entities(
        &self,
        entities: &[CatalogEntity],
        options: CreateOptions,
    ) -> Vec<ReconcileResult<EntityId>> {
        (**self).create_entities(entities, options)
    }

    fn max_batch_size(&self) -> usize {
        (**self).max_batch_size()
    }
}

/// Which parts of an entity are sent on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    /// Send outgoing references.
    pub include_references: bool,
    /// Send entity-level prices.
    pub include_price_options: bool,
}

impl CreateOptions {
    /// Bare entity: no references, no prices. Used for currencies.
    pub const PLAIN: CreateOptions = CreateOptions {
        include_references: false,
        include_price_options: false,
    };

    /// Prices but no references. Used for items.
    pub const PRICED: CreateOptions = CreateOptions {
        include_references: false,
        include_price_options: true,
    };

    /// Everything. Used for bundles and stores.
    pub const FULL: CreateOptions = CreateOptions {
        include_references: true,
        include_price_options: true,
    };

    /// Strips whatever these options exclude.
    pub fn apply(&self, entity: CatalogEntity) -> CatalogEntity {
        let entity = if self.include_references {
            entity
        } else {
            entity.without_references()
        };
        if self.include_price_options {
            entity
        } else {
            entity.without_prices()
        }
    }
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self::FULL
    }
}

/// An in-memory catalog instance.
///
/// Assigns ids of the form `<instance>-<n>`. Creation is rejected when the
/// entity references an id that does not exist in this catalog, the way a
/// real instance rejects dangling ids. Failures can be injected per call.
#[derive(Debug)]
pub struct MemoryCatalog {
    instance: String,
    max_batch_size: usize,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entities: Vec<CatalogEntity>,
    next_id: u64,
    failing_fetches: u32,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<EntityId>,
    credentials_expired: bool,
    fetch_calls: usize,
    create_calls: Vec<Vec<String>>,
    delete_calls: Vec<Vec<EntityId>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            max_batch_size: 50,
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..MemoryState::default()
            }),
        }
    }

    /// Creates a catalog holding `entities` verbatim, ids included.
    pub fn with_entities(instance: impl Into<String>, entities: Vec<CatalogEntity>) -> Self {
        let catalog = Self::new(instance);
        catalog.state.lock().entities = entities;
        catalog
    }

    /// Sets the largest bulk call size.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    /// Seeds an entity, bypassing validation.
    pub fn insert(&self, entity: CatalogEntity) {
        self.state.lock().entities.push(entity);
    }

    /// Returns a copy of the current contents.
    pub fn entities(&self) -> Vec<CatalogEntity> {
        self.state.lock().entities.clone()
    }

    /// Looks up an entity by friendly id.
    pub fn find(&self, friendly_id: &str) -> Option<CatalogEntity> {
        self.state
            .lock()
            .entities
            .iter()
            .find(|e| e.friendly_id == friendly_id)
            .cloned()
    }

    /// Makes the next `count` fetches fail with a retryable error.
    pub fn fail_next_fetches(&self, count: u32) {
        self.state.lock().failing_fetches = count;
    }

    /// Makes every creation of `friendly_id` fail.
    pub fn fail_creates_of(&self, friendly_id: impl Into<String>) {
        self.state.lock().failing_creates.insert(friendly_id.into());
    }

    /// Makes every deletion of `id` fail.
    pub fn fail_deletes_of(&self, id: impl Into<EntityId>) {
        self.state.lock().failing_deletes.insert(id.into());
    }

    /// Makes every later create and delete fail with an authentication
    /// error. Fetches keep working.
    pub fn expire_credentials(&self) {
        self.state.lock().credentials_expired = true;
    }

    /// Number of fetch calls so far.
    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetch_calls
    }

    /// Friendly ids sent per create call.
    pub fn create_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().create_calls.clone()
    }

    /// Ids sent per delete call.
    pub fn delete_calls(&self) -> Vec<Vec<EntityId>> {
        self.state.lock().delete_calls.clone()
    }

    /// Total number of entities sent for creation through the client.
    pub fn created_total(&self) -> usize {
        self.state.lock().create_calls.iter().map(Vec::len).sum()
    }

    /// Total number of ids sent for deletion through the client.
    pub fn deleted_total(&self) -> usize {
        self.state.lock().delete_calls.iter().map(Vec::len).sum()
    }

    /// Forgets the call logs.
    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.fetch_calls = 0;
        state.create_calls.clear();
        state.delete_calls.clear();
    }
}

impl CatalogClient for MemoryCatalog {
    fn instance(&self) -> &str {
        &self.instance
    }

    fn search_all_entities(&self) -> ReconcileResult<Vec<CatalogEntity>> {
        let mut state = self.state.lock();
        state.fetch_calls += 1;
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(ReconcileError::Fetch {
                instance: self.instance.clone(),
                message: "injected fetch failure".into(),
                fetched: 0,
                retryable: true,
            });
        }
        Ok(state.entities.clone())
    }

    fn delete_entities(&self, ids: &[EntityId]) -> Vec<ReconcileResult<()>> {
        let mut state = self.state.lock();
        state.delete_calls.push(ids.to_vec());

        ids.iter()
            .map(|id| {
                if state.credentials_expired {
                    return Err(ReconcileError::Authentication("token expired".into()));
                }
                if state.failing_deletes.contains(id) {
                    return Err(ReconcileError::DeleteFailed {
                        id: id.clone(),
                        reason: "injected delete failure".into(),
                    });
                }
                let before = state.entities.len();
                state.entities.retain(|e| &e.id != id);
                if state.entities.len() == before {
                    return Err(ReconcileError::DeleteFailed {
                        id: id.clone(),
                        reason: "no such entity".into(),
                    });
                }
                Ok(())
            })
            .collect()
    }

    fn create_entities(
        &self,
        entities: &[CatalogEntity],
        options: CreateOptions,
    ) -> Vec<ReconcileResult<EntityId>> {
        let mut state = self.state.lock();
        state
            .create_calls
            .push(entities.iter().map(|e| e.friendly_id.clone()).collect());

        entities
            .iter()
            .map(|entity| {
                let entity = options.apply(entity.clone());
                let fail = |reason: String| ReconcileError::CreateFailed {
                    kind: entity.kind.clone(),
                    friendly_id: entity.friendly_id.clone(),
                    reason,
                };

                if state.credentials_expired {
                    return Err(ReconcileError::Authentication("token expired".into()));
                }
                if state.failing_creates.contains(&entity.friendly_id) {
                    return Err(fail("injected create failure".into()));
                }
                if let Some(missing) = entity
                    .referenced_ids()
                    .find(|id| !state.entities.iter().any(|e| &e.id == *id))
                {
                    return Err(fail(format!("unknown reference {missing}")));
                }

                let id = loop {
                    let id = EntityId::new(format!("{}-{}", self.instance, state.next_id));
                    state.next_id += 1;
                    if !state.entities.iter().any(|e| e.id == id) {
                        break id;
                    }
                };
                state.entities.push(entity.with_id(id.clone()));
                Ok(id)
            })
            .collect()
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catsync_model::{EntityReference, Price};

    #[test]
    fn create_options_strip_fields() {
        let bundle = CatalogEntity::bundle("b", "pack")
            .with_reference(EntityReference::new("i", 1))
            .with_price(Price::single("c", 3));

        let plain = CreateOptions::PLAIN.apply(bundle.clone());
        assert!(!plain.has_references());
        assert!(plain.price_options.is_empty());

        let priced = CreateOptions::PRICED.apply(bundle.clone());
        assert!(!priced.has_references());
        assert_eq!(priced.price_options.len(), 1);

        assert_eq!(CreateOptions::FULL.apply(bundle.clone()), bundle);
    }

    #[test]
    fn memory_catalog_assigns_ids() {
        let catalog = MemoryCatalog::new("tgt");
        let results = catalog.create_entities(
            &[
                CatalogEntity::currency("x", "gold"),
                CatalogEntity::currency("y", "gems"),
            ],
            CreateOptions::PLAIN,
        );

        let ids: Vec<EntityId> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(ids, vec![EntityId::new("tgt-1"), EntityId::new("tgt-2")]);
        assert_eq!(catalog.find("gold").unwrap().id.as_str(), "tgt-1");
        assert_eq!(catalog.create_calls(), vec![vec!["gold", "gems"]]);
    }

    #[test]
    fn memory_catalog_rejects_dangling_ids() {
        let catalog = MemoryCatalog::new("tgt");
        let sword = CatalogEntity::item("s", "sword").with_price(Price::single("nope", 5));

        let results = catalog.create_entities(&[sword.clone()], CreateOptions::PRICED);
        assert!(matches!(results[0], Err(ReconcileError::CreateFailed { .. })));

        // stripped prices are not checked
        let results = catalog.create_entities(&[sword], CreateOptions::PLAIN);
        assert!(results[0].is_ok());
    }

    #[test]
    fn memory_catalog_deletes() {
        let catalog = MemoryCatalog::with_entities(
            "tgt",
            vec![
                CatalogEntity::item("a", "sword"),
                CatalogEntity::item("b", "bow"),
            ],
        );
        catalog.fail_deletes_of("b");

        let results = catalog.delete_entities(&["a".into(), "b".into(), "c".into()]);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_err());
        assert_eq!(catalog.entities().len(), 1);
        assert_eq!(catalog.deleted_total(), 3);
    }

    #[test]
    fn memory_catalog_injected_fetch_failures() {
        let catalog = MemoryCatalog::new("src");
        catalog.fail_next_fetches(1);

        let err = catalog.search_all_entities().unwrap_err();
        assert!(err.is_retryable());
        assert!(catalog.search_all_entities().is_ok());
        assert_eq!(catalog.fetch_count(), 2);
    }
}
