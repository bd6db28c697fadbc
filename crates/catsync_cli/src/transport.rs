//! Blocking `reqwest` transport for the Economy client.

use catsync_engine::HttpClient;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

/// [`HttpClient`] backed by a blocking `reqwest` client.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("catsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, String> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status();
        trace!(%url, %status, "response received");

        // error responses still carry the JSON envelope
        response
            .json::<Value>()
            .map_err(|e| format!("HTTP {status}: unreadable response body: {e}"))
    }
}
