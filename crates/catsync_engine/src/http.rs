//! Economy catalog client over HTTP.
//!
//! The HTTP library is abstracted behind [`HttpClient`] so the engine does
//! not pull one in; the command line plugs in `reqwest`, tests plug in a
//! scripted or fake server.

use crate::auth::AuthProvider;
use crate::client::{CatalogClient, CreateOptions};
use crate::config::EconomyConfig;
use crate::error::{ReconcileError, ReconcileResult};
use catsync_model::wire::{WireCatalogItem, WireEntityKey};
use catsync_model::{CatalogEntity, EntityId};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a JSON POST request and returns the decoded JSON response body.
    ///
    /// Non-2xx responses that still carry a JSON body must be returned as
    /// `Ok`; the API reports errors inside the body.
    fn post_json(&self, url: &str, headers: &[(&str, &str)], body: &Value)
        -> Result<Value, String>;
}

/// Response envelope shared by every Economy endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope {
    /// HTTP-like status code.
    pub code: u16,
    /// Status text.
    #[serde(default)]
    pub status: String,
    /// Payload on success.
    #[serde(default)]
    pub data: Option<Value>,
    /// Error name on failure.
    #[serde(default)]
    pub error: Option<String>,
    /// Error description on failure.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ApiEnvelope {
    /// Parses a response body.
    pub fn from_value(value: Value) -> ReconcileResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| ReconcileError::Protocol(format!("malformed response envelope: {e}")))
    }

    /// Returns true for code 200.
    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    /// Returns the payload, or the error the envelope carries.
    pub fn into_data(self) -> ReconcileResult<Value> {
        if self.is_success() {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let message = self.error_message.or(self.error).unwrap_or(self.status);
        match self.code {
            401 | 403 => Err(ReconcileError::Authentication(message)),
            code => Err(ReconcileError::Rejected { code, message }),
        }
    }
}

/// [`CatalogClient`] for one title of the Economy v2 catalog API.
pub struct EconomyCatalogClient<C: HttpClient, A: AuthProvider> {
    config: EconomyConfig,
    http: Arc<C>,
    auth: A,
}

impl<C: HttpClient, A: AuthProvider> EconomyCatalogClient<C, A> {
    /// Entities sent per bulk operation. Every entity is still one request.
    pub const MAX_BATCH_SIZE: usize = 50;

    /// Creates a client.
    pub fn new(config: EconomyConfig, http: Arc<C>, auth: A) -> Self {
        Self { config, http, auth }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    fn call(&self, path: &str, body: &Value) -> ReconcileResult<Value> {
        let token = self.auth.token()?;
        let response = self
            .http
            .post_json(
                &self.config.endpoint(path),
                &[("X-EntityToken", token.as_str())],
                body,
            )
            .map_err(|e| ReconcileError::transport_retryable(e))?;
        ApiEnvelope::from_value(response)?.into_data()
    }

    fn search_page(
        &self,
        continuation: Option<&str>,
    ) -> ReconcileResult<(Vec<WireCatalogItem>, Option<String>)> {
        let mut body = json!({ "Count": self.config.page_size });
        if let Some(token) = continuation {
            body["ContinuationToken"] = json!(token);
        }

        let data = self.call("/Catalog/SearchItems", &body)?;
        let items = match data.get("Items") {
            Some(items) => serde_json::from_value(items.clone())
                .map_err(|e| ReconcileError::Protocol(format!("malformed items: {e}")))?,
            None => Vec::new(),
        };
        let next = data
            .get("ContinuationToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Ok((items, next))
    }

    fn creator(&self) -> WireEntityKey {
        WireEntityKey::title(&self.config.title_id)
    }

    fn create_one(&self, entity: &CatalogEntity) -> ReconcileResult<EntityId> {
        let item = WireCatalogItem::from_entity(entity, Some(self.creator()));
        let body = json!({ "Item": item, "Publish": self.config.publish });
        let data = self.call("/Catalog/CreateDraftItem", &body)?;

        data.pointer("/Item/Id")
            .and_then(Value::as_str)
            .map(EntityId::new)
            .ok_or_else(|| ReconcileError::Protocol("created item has no id".into()))
    }
}

impl<C: HttpClient, A: AuthProvider> CatalogClient for EconomyCatalogClient<C, A> {
    fn instance(&self) -> &str {
        &self.config.title_id
    }

    fn search_all_entities(&self) -> ReconcileResult<Vec<CatalogEntity>> {
        let mut entities = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let (items, next) = self
                .search_page(continuation.as_deref())
                .map_err(|e| e.into_fetch(self.instance(), entities.len()))?;

            for item in items {
                match item.into_entity() {
                    Ok(entity) => entities.push(entity),
                    Err(err) => {
                        warn!(instance = %self.config.title_id, error = %err, "skipping catalog item")
                    }
                }
            }

            match next {
                Some(token) if continuation.as_deref() != Some(token.as_str()) => {
                    continuation = Some(token)
                }
                _ => break,
            }
        }

        debug!(instance = %self.config.title_id, count = entities.len(), "catalog searched");
        Ok(entities)
    }

    fn delete_entities(&self, ids: &[EntityId]) -> Vec<ReconcileResult<()>> {
        ids.iter()
            .map(|id| {
                let body = json!({ "Entity": self.creator(), "Id": id });
                self.call("/Catalog/DeleteItem", &body)
                    .map(|_| ())
                    .map_err(|err| match err {
                        ReconcileError::Authentication(_) => err,
                        other => ReconcileError::DeleteFailed {
                            id: id.clone(),
                            reason: other.to_string(),
                        },
                    })
            })
            .collect()
    }

    fn create_entities(
        &self,
        entities: &[CatalogEntity],
        options: CreateOptions,
    ) -> Vec<ReconcileResult<EntityId>> {
        entities
            .iter()
            .map(|entity| {
                let entity = options.apply(entity.clone());
                self.create_one(&entity).map_err(|err| match err {
                    ReconcileError::Authentication(_) => err,
                    other => ReconcileError::CreateFailed {
                        kind: entity.kind.clone(),
                        friendly_id: entity.friendly_id.clone(),
                        reason: other.to_string(),
                    },
                })
            })
            .collect()
    }

    fn max_batch_size(&self) -> usize {
        Self::MAX_BATCH_SIZE
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{error, ok, ScriptedClient};
    use super::*;
    use crate::auth::StaticToken;
    use catsync_model::{EntityKind, Price};

    fn client(
        responses: Vec<Result<Value, String>>,
    ) -> (
        Arc<ScriptedClient>,
        EconomyCatalogClient<ScriptedClient, StaticToken>,
    ) {
        let http = Arc::new(ScriptedClient::new(responses));
        let config = EconomyConfig::for_title("TGT").with_base_url("http://economy.test");
        let client = EconomyCatalogClient::new(config, http.clone(), StaticToken::new("tok"));
        (http, client)
    }

    fn item(id: &str, kind: &str, friendly_id: &str) -> Value {
        json!({
            "Id": id,
            "Type": kind,
            "AlternateIds": [{"Type": "FriendlyId", "Value": friendly_id}]
        })
    }

    #[test]
    fn envelope_errors() {
        let err = ApiEnvelope::from_value(json!({"code": 403, "status": "Forbidden"}))
            .unwrap()
            .into_data()
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Authentication(m) if m == "Forbidden"));

        let err = ApiEnvelope::from_value(json!({"code": 500, "errorMessage": "boom"}))
            .unwrap()
            .into_data()
            .unwrap_err();
        assert!(err.is_retryable());

        assert!(ApiEnvelope::from_value(json!("nope")).is_err());
    }

    #[test]
    fn search_follows_continuation_tokens() {
        let (http, client) = client(vec![
            ok(json!({
                "Items": [item("1", "currency", "gold"), {"Type": "catalogItem"}],
                "ContinuationToken": "page-2"
            })),
            ok(json!({ "Items": [item("2", "catalogItem", "sword")] })),
        ]);

        let entities = client.search_all_entities().unwrap();
        let names: Vec<&str> = entities.iter().map(|e| e.friendly_id.as_str()).collect();
        assert_eq!(names, vec!["gold", "sword"]);
        assert_eq!(entities[1].kind, EntityKind::Item);

        let requests = http.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "http://economy.test/Catalog/SearchItems");
        assert_eq!(requests[0].body, json!({"Count": 50}));
        assert_eq!(requests[1].body["ContinuationToken"], "page-2");
        assert_eq!(
            requests[0].headers,
            vec![("X-EntityToken".to_string(), "tok".to_string())]
        );
    }

    #[test]
    fn search_failure_reports_partial_progress() {
        let (_, client) = client(vec![
            ok(json!({
                "Items": [item("1", "currency", "gold"), item("2", "currency", "gems")],
                "ContinuationToken": "page-2"
            })),
            Err("connection reset".into()),
        ]);

        match client.search_all_entities().unwrap_err() {
            ReconcileError::Fetch {
                instance,
                fetched,
                retryable,
                ..
            } => {
                assert_eq!(instance, "TGT");
                assert_eq!(fetched, 2);
                assert!(retryable);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn create_sends_target_owned_item() {
        let (http, client) = client(vec![ok(json!({ "Item": { "Id": "new-1" } }))]);
        let sword = CatalogEntity::item("src-9", "sword").with_price(Price::single("c1", 5));

        let results = client.create_entities(&[sword], CreateOptions::PLAIN);
        assert_eq!(results[0].as_ref().unwrap().as_str(), "new-1");

        let requests = http.requests.lock();
        let body = &requests[0].body;
        assert_eq!(requests[0].url, "http://economy.test/Catalog/CreateDraftItem");
        assert_eq!(body["Publish"], true);
        assert!(body["Item"].get("Id").is_none());
        assert!(body["Item"].get("PriceOptions").is_none());
        assert_eq!(body["Item"]["CreatorEntity"], json!({"Id": "TGT", "Type": "title"}));
        assert_eq!(body["Item"]["Type"], "catalogItem");
    }

    #[test]
    fn create_failure_is_per_entity() {
        let (_, client) = client(vec![
            error(400, "AlternateId already in use"),
            ok(json!({ "Item": { "Id": "new-2" } })),
        ]);

        let results = client.create_entities(
            &[
                CatalogEntity::currency("a", "gold"),
                CatalogEntity::currency("b", "gems"),
            ],
            CreateOptions::PLAIN,
        );
        assert!(matches!(
            &results[0],
            Err(ReconcileError::CreateFailed { friendly_id, .. }) if friendly_id == "gold"
        ));
        assert!(results[1].is_ok());
    }

    #[test]
    fn delete_maps_errors() {
        let (http, client) = client(vec![ok(json!({})), error(404, "ItemNotFound")]);

        let results = client.delete_entities(&["x".into(), "y".into()]);
        assert!(results[0].is_ok());
        assert!(matches!(
            &results[1],
            Err(ReconcileError::DeleteFailed { id, .. }) if id.as_str() == "y"
        ));
        assert_eq!(http.requests.lock()[0].body, json!({
            "Entity": {"Id": "TGT", "Type": "title"},
            "Id": "x"
        }));
    }
}
