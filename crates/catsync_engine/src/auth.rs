//! Title authentication for the Economy API.

use crate::config::EconomyConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::http::{ApiEnvelope, HttpClient};
use catsync_model::wire::WireEntityKey;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Supplies the credential sent with every catalog call of one instance.
pub trait AuthProvider: Send + Sync {
    /// Returns the entity token.
    fn token(&self) -> ReconcileResult<String>;
}

/// A token obtained elsewhere.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl AuthProvider for StaticToken {
    fn token(&self) -> ReconcileResult<String> {
        Ok(self.0.clone())
    }
}

/// Exchanges a title secret key for an entity token.
///
/// The token is fetched on first use and reused for the lifetime of the
/// provider.
pub struct SecretKeyAuth<C: HttpClient> {
    config: EconomyConfig,
    secret: String,
    http: Arc<C>,
    token: RwLock<Option<String>>,
}

impl<C: HttpClient> SecretKeyAuth<C> {
    /// Creates a provider for the title in `config`.
    pub fn new(config: EconomyConfig, secret: impl Into<String>, http: Arc<C>) -> Self {
        Self {
            config,
            secret: secret.into(),
            http,
            token: RwLock::new(None),
        }
    }

    /// Forgets the cached token.
    pub fn invalidate(&self) {
        *self.token.write() = None;
    }

    fn fetch_token(&self) -> ReconcileResult<String> {
        let url = self.config.endpoint("/Authentication/GetEntityToken");
        let body = json!({ "Entity": WireEntityKey::title(&self.config.title_id) });
        debug!(title = %self.config.title_id, "requesting entity token");

        let response = self
            .http
            .post_json(&url, &[("X-SecretKey", self.secret.as_str())], &body)
            .map_err(|e| ReconcileError::transport_retryable(e))?;

        let data = ApiEnvelope::from_value(response)
            .and_then(ApiEnvelope::into_data)
            .map_err(|e| match e {
                ReconcileError::Authentication(_) => e,
                other => ReconcileError::Authentication(other.to_string()),
            })?;

        data.get("EntityToken")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ReconcileError::Authentication("response has no EntityToken".into()))
    }
}

impl<C: HttpClient> AuthProvider for SecretKeyAuth<C> {
    fn token(&self) -> ReconcileResult<String> {
        if let Some(token) = self.token.read().as_ref() {
            return Ok(token.clone());
        }
        let token = self.fetch_token()?;
        *self.token.write() = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{error, ok, ScriptedClient};

    fn config() -> EconomyConfig {
        EconomyConfig::for_title("T1").with_base_url("http://economy.test")
    }

    #[test]
    fn token_is_cached() {
        let http = Arc::new(ScriptedClient::new(vec![ok(json!({"EntityToken": "tok-1"}))]));
        let auth = SecretKeyAuth::new(config(), "s3cret", http.clone());

        assert_eq!(auth.token().unwrap(), "tok-1");
        assert_eq!(auth.token().unwrap(), "tok-1");

        let requests = http.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "http://economy.test/Authentication/GetEntityToken"
        );
        assert_eq!(
            requests[0].headers,
            vec![("X-SecretKey".to_string(), "s3cret".to_string())]
        );
        assert_eq!(requests[0].body["Entity"]["Id"], "T1");
    }

    #[test]
    fn invalidate_fetches_again() {
        let http = Arc::new(ScriptedClient::new(vec![
            ok(json!({"EntityToken": "tok-1"})),
            ok(json!({"EntityToken": "tok-2"})),
        ]));
        let auth = SecretKeyAuth::new(config(), "s3cret", http);

        assert_eq!(auth.token().unwrap(), "tok-1");
        auth.invalidate();
        assert_eq!(auth.token().unwrap(), "tok-2");
    }

    #[test]
    fn rejected_secret_is_an_authentication_error() {
        let http = Arc::new(ScriptedClient::new(vec![error(401, "Invalid secret key")]));
        let auth = SecretKeyAuth::new(config(), "wrong", http);

        let err = auth.token().unwrap_err();
        assert!(matches!(err, ReconcileError::Authentication(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_token_is_an_authentication_error() {
        let http = Arc::new(ScriptedClient::new(vec![ok(json!({}))]));
        let auth = SecretKeyAuth::new(config(), "s3cret", http);
        assert!(matches!(
            auth.token(),
            Err(ReconcileError::Authentication(_))
        ));
    }

    #[test]
    fn static_token() {
        assert_eq!(StaticToken::new("abc").token().unwrap(), "abc");
    }
}
