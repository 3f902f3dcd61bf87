use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Default for Config {
    fn default() -> Self {
        let app = AppConfig::builder()
            .with_env_overrides()
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid configuration from environment, using defaults");
                AppConfig::default()
            });
        Self { app }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self { app: builder.build()? })
    }

    pub fn from_app(app: AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;
        Ok(Self { app })
    }

    /// Get the full URL for an API path, adding the leading slash if missing
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.server_url(), path)
        } else {
            format!("{}/{}", self.server_url(), path)
        }
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn health_url(&self) -> &str {
        &self.app.health_url
    }

    pub fn probe_timeout(&self) -> Duration {
        self.app.probe_timeout
    }

    pub fn probe_interval(&self) -> Duration {
        self.app.probe_interval
    }

    pub fn refresh_interval(&self) -> Duration {
        self.app.refresh_interval
    }

    /// Whether reconnecting should drain the queue without a user action
    pub fn auto_sync(&self) -> bool {
        self.app.auto_sync
    }

    /// Local database file, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        match &self.app.database_path {
            Some(path) => path.clone(),
            None => {
                let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
                path.push("eventsync");
                path.push("local.db");
                path
            }
        }
    }
}
