//! # Network Monitor
//!
//! Decides whether the backend is reachable by issuing a bounded `GET` to the
//! health URL. Any HTTP answer, error statuses included, counts as online;
//! a transport failure or timeout counts as offline.

use crate::client::api::ApiClient;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    api: ApiClient,
    health_url: String,
    timeout: Duration,
}

impl NetworkMonitor {
    pub fn new(api: ApiClient) -> Self {
        let health_url = api.config().health_url().to_string();
        let timeout = api.config().probe_timeout();
        Self {
            api,
            health_url,
            timeout,
        }
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    /// Probe once; never fails
    pub async fn probe(&self) -> bool {
        self.api.probe(&self.health_url, self.timeout).await
    }
}
