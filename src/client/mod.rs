//! # Client Module
//!
//! The offline-first side of the event client.
//!
//! ## Key Components
//!
//! - `config.rs`: resolved configuration and URL helpers
//! - `api.rs`: JSON HTTP client with bearer auth
//! - `local_db/`: SQLite cache and pending action log
//! - `offline/`: queue, optimistic writes, reconciliation and `OfflineManager`
//! - `sync/`: connectivity probe, status, background service, cache refresh

pub mod api;
pub mod config;
pub mod local_db;
pub mod offline;
pub mod sync;

pub use config::Config;
pub use offline::{OfflineManager, SyncOutcome};
pub use sync::{SyncService, SyncStatus};
