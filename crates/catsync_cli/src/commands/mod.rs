//! CLI command implementations.

pub mod copy;
pub mod list;

use crate::transport::ReqwestClient;
use catsync_engine::{EconomyCatalogClient, EconomyConfig, SecretKeyAuth};
use std::sync::Arc;

/// Catalog client for one title over `reqwest`.
pub type TitleClient = EconomyCatalogClient<ReqwestClient, SecretKeyAuth<ReqwestClient>>;

/// Connects to a title. The entity token is requested on first use.
pub fn connect(http: &Arc<ReqwestClient>, config: EconomyConfig, secret: &str) -> TitleClient {
    let auth = SecretKeyAuth::new(config.clone(), secret, Arc::clone(http));
    EconomyCatalogClient::new(config, Arc::clone(http), auth)
}

/// Fails on output formats other than `text` and `json`.
pub fn check_format(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "text" | "json" => Ok(()),
        other => Err(format!("Unknown format {other:?}, expected text or json").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats() {
        assert!(check_format("text").is_ok());
        assert!(check_format("json").is_ok());
        assert!(check_format("yaml").is_err());
    }
}
