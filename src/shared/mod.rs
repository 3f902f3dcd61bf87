//! Shared Module
//!
//! Types used by every part of the sync core: the cached domain records, the
//! error type, configuration, and tracing setup. Nothing in here touches the
//! network or the local store.

/// Cached domain records and request shapes
pub mod models;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Tracing subscriber setup
pub mod logging;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::{Result, SyncError};
pub use models::{CheckIn, Event, NewUser, Registration, User, UserUpdate};
