//! Application configuration module
//!
//! Provides configuration types for the sync core: backend origin, health-check
//! probe, timer intervals and local database location. Values come from the
//! builder, an optional TOML file, and `EVENTSYNC_*` environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default backend origin
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
/// Default timeout for one connectivity probe
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2500;
/// Default interval between connectivity probes
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;
/// Default interval between local cache refreshes
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Backend origin every queued path is appended to
    pub server_url: String,
    /// URL probed by the connectivity monitor (defaults to `server_url`)
    pub health_url: String,
    /// Upper bound for a single probe
    pub probe_timeout: Duration,
    /// Interval of the background probe tick
    pub probe_interval: Duration,
    /// Interval between cache refreshes while online
    pub refresh_interval: Duration,
    /// Drain the queue automatically when connectivity returns
    pub auto_sync: bool,
    /// Local database file; `None` uses the platform data directory
    pub database_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            health_url: DEFAULT_SERVER_URL.to_string(),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            auto_sync: true,
            database_path: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load a TOML file and apply environment overrides on top of it
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text and apply environment overrides on top of it
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        file.into_builder().with_env_overrides().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.server_url)?;
        validate_url(&self.health_url)?;
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration("probe_timeout"));
        }
        if self.probe_interval.is_zero() {
            return Err(ConfigError::InvalidDuration("probe_interval"));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::InvalidDuration("refresh_interval"));
        }
        Ok(())
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl(url.to_string()))
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    health_url: Option<String>,
    probe_timeout: Option<Duration>,
    probe_interval: Option<Duration>,
    refresh_interval: Option<Duration>,
    auto_sync: Option<bool>,
    database_path: Option<PathBuf>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the health-check URL
    pub fn health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url = Some(url.into());
        self
    }

    /// Set the probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Set the probe interval
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = Some(interval);
        self
    }

    /// Set the cache refresh interval
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Enable or disable draining on reconnect
    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = Some(enabled);
        self
    }

    /// Set the local database file
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Apply `EVENTSYNC_API_URL` and `EVENTSYNC_HEALTH_URL` when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("EVENTSYNC_API_URL") {
            self.server_url = Some(url);
        }
        if let Ok(url) = std::env::var("EVENTSYNC_HEALTH_URL") {
            self.health_url = Some(url);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let server_url = self
            .server_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.server_url);
        let health_url = self.health_url.unwrap_or_else(|| server_url.clone());

        let config = AppConfig {
            server_url,
            health_url,
            probe_timeout: self.probe_timeout.unwrap_or(defaults.probe_timeout),
            probe_interval: self.probe_interval.unwrap_or(defaults.probe_interval),
            refresh_interval: self.refresh_interval.unwrap_or(defaults.refresh_interval),
            auto_sync: self.auto_sync.unwrap_or(defaults.auto_sync),
            database_path: self.database_path,
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk TOML layout
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    server_url: Option<String>,
    health_url: Option<String>,
    probe_timeout_ms: Option<u64>,
    probe_interval_secs: Option<u64>,
    refresh_interval_secs: Option<u64>,
    auto_sync: Option<bool>,
    database_path: Option<PathBuf>,
}

impl FileConfig {
    fn into_builder(self) -> AppConfigBuilder {
        AppConfigBuilder {
            server_url: self.server_url,
            health_url: self.health_url,
            probe_timeout: self.probe_timeout_ms.map(Duration::from_millis),
            probe_interval: self.probe_interval_secs.map(Duration::from_secs),
            refresh_interval: self.refresh_interval_secs.map(Duration::from_secs),
            auto_sync: self.auto_sync,
            database_path: self.database_path,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("duration must be non-zero: {0}")]
    InvalidDuration(&'static str),
    #[error("cannot read config file {0}")]
    Io(String),
    #[error("invalid config file: {0}")]
    Parse(String),
}
