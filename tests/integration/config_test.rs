//! Configuration loading

use eventsync::client::config::Config;
use eventsync::shared::config::{AppConfig, ConfigError, DEFAULT_SERVER_URL};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

#[test]
#[serial]
fn test_env_overrides_server_url() {
    std::env::set_var("EVENTSYNC_API_URL", "http://env.example:8000/");
    let config = AppConfig::builder().with_env_overrides().build();
    std::env::remove_var("EVENTSYNC_API_URL");

    let config = config.unwrap();
    assert_eq!(config.server_url, "http://env.example:8000");
    assert_eq!(config.health_url, "http://env.example:8000");
}

#[test]
#[serial]
fn test_default_config_without_env() {
    std::env::remove_var("EVENTSYNC_API_URL");
    std::env::remove_var("EVENTSYNC_HEALTH_URL");
    let config = Config::new();
    assert_eq!(config.api_url("usuarios"), format!("{}/usuarios", config.server_url()));
}

#[test]
#[serial]
fn test_invalid_env_url_falls_back_to_defaults() {
    std::env::set_var("EVENTSYNC_API_URL", "ftp://typo.example");
    let config = Config::new();
    std::env::remove_var("EVENTSYNC_API_URL");

    assert_eq!(config.server_url(), DEFAULT_SERVER_URL);
    assert!(matches!(
        AppConfig::builder().server_url("ftp://typo.example").build(),
        Err(ConfigError::InvalidUrl(_))
    ));
}

#[test]
#[serial]
fn test_toml_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "server_url = \"https://api.example.org\"\nprobe_timeout_ms = 1000\nauto_sync = false"
    )
    .unwrap();

    let config = AppConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.server_url, "https://api.example.org");
    assert_eq!(config.probe_timeout, Duration::from_millis(1000));
    assert!(!config.auto_sync);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = AppConfig::from_toml_file("/nonexistent/eventsync.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
