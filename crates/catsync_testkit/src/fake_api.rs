//! An in-process fake of the Economy catalog API.
//!
//! [`FakeEconomyApi`] implements [`HttpClient`] for one title and answers
//! the endpoints the catalog client uses, with the same envelope, paging
//! and validation behavior a live title shows.

use catsync_engine::{EconomyCatalogClient, EconomyConfig, HttpClient, SecretKeyAuth};
use catsync_model::wire::{WireCatalogItem, WireEntityKey};
use catsync_model::CatalogEntity;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Largest page `SearchItems` returns.
pub const MAX_SEARCH_COUNT: usize = 50;

/// A catalog client talking to a [`FakeEconomyApi`].
pub type FakeEconomyClient = EconomyCatalogClient<FakeEconomyApi, SecretKeyAuth<FakeEconomyApi>>;

/// Fake Economy API for a single title.
#[derive(Debug)]
pub struct FakeEconomyApi {
    title_id: String,
    secret: String,
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    items: Vec<WireCatalogItem>,
    next_id: u64,
    tokens: HashSet<String>,
    issued: u64,
    failing_searches: u32,
    requests: Vec<String>,
}

fn envelope(data: Value) -> Value {
    json!({ "code": 200, "status": "OK", "data": data })
}

fn failure(code: u16, error: &str, message: impl Into<String>) -> Value {
    json!({
        "code": code,
        "status": error,
        "error": error,
        "errorMessage": message.into(),
    })
}

impl FakeEconomyApi {
    /// Creates an empty title accepting `secret`.
    pub fn new(title_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            title_id: title_id.into(),
            secret: secret.into(),
            state: Mutex::new(FakeState {
                next_id: 1,
                ..FakeState::default()
            }),
        }
    }

    /// Seeds the title with `entities`, ids included.
    pub fn with_entities(self, entities: Vec<CatalogEntity>) -> Self {
        {
            let mut state = self.state.lock();
            for entity in &entities {
                let mut item = WireCatalogItem::from_entity(entity, Some(self.owner()));
                item.id = Some(entity.id.to_string());
                state.items.push(item);
            }
        }
        self
    }

    fn owner(&self) -> WireEntityKey {
        WireEntityKey::title(&self.title_id)
    }

    /// Base URL requests are expected on.
    pub fn base_url(&self) -> String {
        format!("http://{}.economy.test", self.title_id.to_lowercase())
    }

    /// Client configuration pointing at this fake.
    pub fn config(&self) -> EconomyConfig {
        EconomyConfig::for_title(&self.title_id).with_base_url(self.base_url())
    }

    /// Builds a catalog client authenticating with the title secret.
    pub fn client(self: &Arc<Self>) -> FakeEconomyClient {
        self.client_with_secret(&self.secret)
    }

    /// Builds a catalog client authenticating with `secret`.
    pub fn client_with_secret(self: &Arc<Self>, secret: &str) -> FakeEconomyClient {
        let auth = SecretKeyAuth::new(self.config(), secret, self.clone());
        EconomyCatalogClient::new(self.config(), self.clone(), auth)
    }

    /// Raw items as stored.
    pub fn items(&self) -> Vec<WireCatalogItem> {
        self.state.lock().items.clone()
    }

    /// Stored items as catalog entities.
    pub fn entities(&self) -> Vec<CatalogEntity> {
        self.items()
            .into_iter()
            .filter_map(|item| item.into_entity().ok())
            .collect()
    }

    /// Number of requests served.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Number of requests served for `path`.
    pub fn requests_to(&self, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    /// Makes the next `count` searches answer 503.
    pub fn fail_searches(&self, count: u32) {
        self.state.lock().failing_searches = count;
    }

    /// Revokes every issued entity token.
    pub fn expire_tokens(&self) {
        self.state.lock().tokens.clear();
    }

    fn route<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(&self.base_url())
    }

    fn handle(&self, path: &str, headers: &[(&str, &str)], body: &Value) -> Value {
        let header = |name: &str| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| *value)
        };

        let mut state = self.state.lock();
        state.requests.push(path.to_string());

        if path == "/Authentication/GetEntityToken" {
            if header("X-SecretKey") != Some(self.secret.as_str()) {
                return failure(401, "NotAuthenticated", "invalid secret key");
            }
            state.issued += 1;
            let token = format!("token-{}-{}", self.title_id, state.issued);
            state.tokens.insert(token.clone());
            return envelope(json!({
                "EntityToken": token,
                "Entity": self.owner(),
            }));
        }

        match header("X-EntityToken") {
            Some(token) if state.tokens.contains(token) => {}
            _ => return failure(401, "NotAuthenticated", "missing or expired entity token"),
        }

        match path {
            "/Catalog/SearchItems" => search(&mut state, body),
            "/Catalog/CreateDraftItem" => self.create(&mut state, body),
            "/Catalog/DeleteItem" => delete(&mut state, body),
            _ => failure(404, "NotFound", format!("no endpoint {path}")),
        }
    }

    fn create(&self, state: &mut FakeState, body: &Value) -> Value {
        let mut item: WireCatalogItem = match body.get("Item").cloned().map(serde_json::from_value)
        {
            Some(Ok(item)) => item,
            Some(Err(e)) => return failure(400, "InvalidRequest", e.to_string()),
            None => return failure(400, "InvalidRequest", "Item is required"),
        };

        if item.creator_entity.as_ref() != Some(&self.owner()) {
            return failure(400, "InvalidCreatorEntity", "item must be owned by the title");
        }

        if let Some(friendly_id) = item.friendly_id() {
            let taken = state
                .items
                .iter()
                .any(|existing| existing.friendly_id() == Some(friendly_id));
            if taken {
                return failure(
                    409,
                    "AlternateIdConflict",
                    format!("friendly id {friendly_id} is already in use"),
                );
            }
        }

        let id = loop {
            let id = format!("{}-{}", self.title_id, state.next_id);
            state.next_id += 1;
            if !state.items.iter().any(|i| i.id.as_deref() == Some(id.as_str())) {
                break id;
            }
        };
        item.id = Some(id);

        let entity = match item.clone().into_entity() {
            Ok(entity) => entity,
            Err(e) => return failure(400, "InvalidRequest", e.to_string()),
        };
        let known: HashSet<&str> = state.items.iter().filter_map(|i| i.id.as_deref()).collect();
        if let Some(missing) = entity.referenced_ids().find(|id| !known.contains(id.as_str())) {
            return failure(
                400,
                "ItemReferenceNotFound",
                format!("referenced item {missing} does not exist"),
            );
        }

        item.extra
            .insert("CreationDate".into(), json!("2024-01-01T00:00:00Z"));
        item.extra
            .insert("ETag".into(), json!(format!("etag-{}", state.next_id)));
        state.items.push(item.clone());
        envelope(json!({ "Item": item }))
    }
}

fn search(state: &mut FakeState, body: &Value) -> Value {
    if state.failing_searches > 0 {
        state.failing_searches -= 1;
        return failure(503, "ServiceUnavailable", "try again later");
    }

    let count = body
        .get("Count")
        .and_then(Value::as_u64)
        .map_or(10, |c| c as usize)
        .clamp(1, MAX_SEARCH_COUNT);
    let offset = match body.get("ContinuationToken").and_then(Value::as_str) {
        Some(token) => match token.parse::<usize>() {
            Ok(offset) => offset,
            Err(_) => return failure(400, "InvalidContinuationToken", token.to_string()),
        },
        None => 0,
    };

    let page: Vec<&WireCatalogItem> = state.items.iter().skip(offset).take(count).collect();
    let mut data = json!({ "Items": page });
    let next = offset + page.len();
    if next < state.items.len() {
        data["ContinuationToken"] = json!(next.to_string());
    }
    envelope(data)
}

fn delete(state: &mut FakeState, body: &Value) -> Value {
    let Some(id) = body.get("Id").and_then(Value::as_str) else {
        return failure(400, "InvalidRequest", "Id is required");
    };
    let before = state.items.len();
    state.items.retain(|item| item.id.as_deref() != Some(id));
    if state.items.len() == before {
        return failure(404, "ItemNotFound", format!("item {id} not found"));
    }
    envelope(json!({}))
}

impl HttpClient for FakeEconomyApi {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, String> {
        let path = self
            .route(url)
            .ok_or_else(|| format!("connection refused: {url}"))?;
        Ok(self.handle(path, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use catsync_engine::{AuthProvider, CatalogClient, CreateOptions, ReconcileError};
    use catsync_model::EntityKind;

    fn api() -> Arc<FakeEconomyApi> {
        Arc::new(FakeEconomyApi::new("SRC", "secret").with_entities(gold_sword_catalog()))
    }

    #[test]
    fn search_returns_seeded_entities() {
        let api = api();
        let entities = api.client().search_all_entities().unwrap();

        assert_eq!(entities, gold_sword_catalog());
        assert_eq!(api.requests_to("/Authentication/GetEntityToken"), 1);
    }

    #[test]
    fn search_pages_through_continuation_tokens() {
        let mut builder = CatalogBuilder::new("src-");
        for i in 0..120 {
            builder.item(&format!("item{i}"));
        }
        let api = Arc::new(FakeEconomyApi::new("SRC", "secret").with_entities(builder.build()));

        let entities = api.client().search_all_entities().unwrap();

        assert_eq!(entities.len(), 120);
        assert_eq!(api.requests_to("/Catalog/SearchItems"), 3);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let api = api();
        let err = api
            .client_with_secret("nope")
            .search_all_entities()
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Authentication(_)));
        assert_eq!(api.requests_to("/Catalog/SearchItems"), 0);
    }

    #[test]
    fn expired_token_is_rejected() {
        let api = api();
        let auth = SecretKeyAuth::new(api.config(), "secret", api.clone());
        auth.token().unwrap();
        api.expire_tokens();

        let client = EconomyCatalogClient::new(api.config(), api.clone(), auth);
        let err = client.search_all_entities().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn failing_search_is_retryable() {
        let api = api();
        api.fail_searches(1);

        let err = api.client().search_all_entities().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(api.client().search_all_entities().unwrap().len(), 2);
    }

    #[test]
    fn create_assigns_id_and_strips_instance_fields_on_read() {
        let api = Arc::new(FakeEconomyApi::new("TGT", "secret"));
        let client = api.client();
        let gold = &gold_sword_catalog()[0];

        let ids = client.create_entities(std::slice::from_ref(gold), CreateOptions::PLAIN);
        let id = ids[0].as_ref().unwrap();
        assert_eq!(id.as_str(), "TGT-1");

        let stored = &api.items()[0];
        assert!(stored.extra.contains_key("ETag"));
        let entity = &api.entities()[0];
        assert!(!entity.payload.as_map().contains_key("ETag"));
        assert_eq!(entity.kind, EntityKind::Currency);
        assert_eq!(entity.friendly_id, "gold");
    }

    #[test]
    fn create_rejects_unknown_references() {
        let api = Arc::new(FakeEconomyApi::new("TGT", "secret"));
        let sword = &gold_sword_catalog()[1];

        let result = api
            .client()
            .create_entities(std::slice::from_ref(sword), CreateOptions::PRICED);

        match &result[0] {
            Err(ReconcileError::CreateFailed { reason, .. }) => {
                assert!(reason.contains("src-1"), "{reason}")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(api.items().is_empty());
    }

    #[test]
    fn create_rejects_taken_friendly_id() {
        let api = api();
        let gold = &gold_sword_catalog()[0];

        let result = api
            .client()
            .create_entities(std::slice::from_ref(gold), CreateOptions::PLAIN);
        assert!(result[0].is_err());
        assert_eq!(api.items().len(), 2);
    }

    #[test]
    fn delete_missing_item_fails() {
        let api = api();
        let client = api.client();

        let results = client.delete_entities(&["src-1".into(), "missing".into()]);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ReconcileError::DeleteFailed { .. })
        ));
        assert_eq!(api.items().len(), 1);
    }

    #[test]
    fn unknown_host_is_a_transport_error() {
        let api = api();
        let err = api
            .post_json("http://elsewhere.test/Catalog/SearchItems", &[], &json!({}))
            .unwrap_err();
        assert!(err.contains("connection refused"));
    }
}
