//! Shared Error Types
//!
//! This module defines the error type returned by every fallible operation of the
//! sync core: local store access, HTTP replay, configuration and payload handling.
//!
//! # Error Categories
//!
//! - `Database` - SQLite failures from the local store
//! - `Http` - transport failures (connection refused, timeout, TLS)
//! - `Status` - the server answered with a non-2xx status
//! - `Serialization` - JSON encoding/decoding failures
//! - `UnresolvedPlaceholder` - an action still references a local-only id
//!
//! # Usage
//!
//! ```rust
//! use eventsync::shared::error::SyncError;
//!
//! let error = SyncError::invalid_method("PATCH");
//! assert!(error.to_string().contains("PATCH"));
//! ```
use thiserror::Error;

use crate::shared::config::ConfigError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors produced by the offline queue, the reconciler and the local store
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local store failure
    #[error("Local database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport-level HTTP failure (no response received)
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} for {method} {url}: {body}")]
    Status {
        /// Request method
        method: String,
        /// Full request URL
        url: String,
        /// Response status code
        status: u16,
        /// Response body text (may be empty)
        body: String,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A queued action still carries a placeholder id nobody resolved
    #[error("Pending action {action_id} references unresolved local id {placeholder}")]
    UnresolvedPlaceholder {
        /// Queue id of the offending action
        action_id: i64,
        /// The local-only id that would have been sent
        placeholder: i64,
    },

    /// HTTP method not accepted by the queue
    #[error("Unsupported pending action method: {0}")]
    InvalidMethod(String),

    /// Request body is not a JSON object
    #[error("Pending action body must be a JSON object, got {0}")]
    InvalidBody(String),

    /// A create call succeeded but the response carried no usable id
    #[error("Server response to {0} carried no id")]
    MissingId(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Create an error for a non-success HTTP status
    pub fn status(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Status {
            method: method.into(),
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Create an error for an unsupported action method
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod(method.into())
    }

    /// Whether this error means the backend could not be reached at all
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
