//! Remote API client
//!
//! Thin JSON-over-HTTP wrapper used by the reconciler, the online domain
//! operations and the cache refresh. Responses are returned as raw
//! [`serde_json::Value`] because the backend is loose about where it puts ids.

use crate::client::config::Config;
use crate::client::offline::queue::JsonObject;
use crate::shared::error::{Result, SyncError};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

/// Upper bound for a single replayed or online request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Config,
    client: Client,
}

impl ApiClient {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send one request and return the parsed response body
    ///
    /// A 2xx with an empty or non-JSON body yields `Ok(None)`. Non-2xx
    /// statuses become [`SyncError::Status`]; transport failures
    /// [`SyncError::Http`].
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonObject>,
        token: Option<&str>,
    ) -> Result<Option<Value>> {
        let url = self.config.api_url(path);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(SyncError::status(method.as_str(), url, status.as_u16(), text));
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(%url, error = %e, "Response body is not JSON, ignoring");
                Ok(None)
            }
        }
    }

    /// Whether anything answers at `url` within `timeout`
    ///
    /// Any HTTP status counts as reachable.
    pub async fn probe(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                tracing::trace!(%url, status = %response.status(), "Probe answered");
                true
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "Probe failed");
                false
            }
        }
    }
}
