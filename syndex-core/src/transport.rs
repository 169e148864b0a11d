use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::error::{BridgeError, Result};

/// Minimal, async-capable view of the sync daemon's REST API.
///
/// The bridge only issues authenticated GETs and consumes bodies as text,
/// so this is the whole seam; tests script a daemon by implementing it
/// in memory.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `{base}{path}` and return the response body.
    async fn fetch(&self, path: &str) -> Result<String>;
}

/// Connection settings for [`SyncthingClient`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the daemon's REST API.
    pub base_url: Url,
    /// Shared secret sent as the `X-API-Key` header on every request.
    pub api_key: String,
    /// Accept self-signed TLS certificates.
    pub insecure: bool,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout. The event endpoint long-polls, so this has
    /// to comfortably exceed the daemon's poll window.
    pub request_timeout: Duration,
}

impl TransportConfig {
    pub fn new(base_url: Url, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            insecure: false,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Production [`Transport`] backed by reqwest.
pub struct SyncthingClient {
    client: Client,
    base: String,
    api_key: String,
}

impl fmt::Debug for SyncthingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncthingClient")
            .field("base", &self.base)
            .finish()
    }
}

impl SyncthingClient {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            client,
            base: config.base_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for SyncthingClient {
    async fn fetch(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(BridgeError::AuthRejected);
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_daemon_expectations() {
        let config = TransportConfig::new(
            Url::parse("http://localhost:8384").unwrap(),
            "secret".to_string(),
        );
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert!(!config.insecure);
    }

    #[test]
    fn client_strips_trailing_slash_from_base() {
        let config = TransportConfig::new(
            Url::parse("http://localhost:8384/").unwrap(),
            "secret".to_string(),
        );
        let client = SyncthingClient::new(&config).unwrap();
        assert_eq!(client.base, "http://localhost:8384");
    }
}
