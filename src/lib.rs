//! eventsync - Offline Sync Core
//!
//! Client-side core of an event-management application (events,
//! registrations, check-ins, users) backed by a remote HTTP+JSON API. It lets
//! the application keep mutating data while disconnected and replays the
//! recorded requests once the backend is reachable again.
//!
//! # Overview
//!
//! - Durable SQLite cache of server entities and of pending actions
//! - Optimistic local writes keyed by placeholder ids
//! - Ordered replay that resolves placeholder ids into server ids across the
//!   user -> registration -> check-in chain
//! - Background connectivity probing, automatic drain on reconnect and
//!   periodic cache refresh
//!
//! # Module Structure
//!
//! - **`shared`** - Types with no I/O
//!   - Domain records, error type, configuration, tracing setup
//!
//! - **`client`** - Everything that talks to the store or the network
//!   - `local_db`: SQLite store
//!   - `api`: HTTP client
//!   - `offline`: queue, optimistic writes, reconciliation, `OfflineManager`
//!   - `sync`: connectivity state, probe, background service, cache refresh
//!
//! # Usage
//!
//! ```rust,no_run
//! use eventsync::client::config::Config;
//! use eventsync::client::offline::OfflineManager;
//! use eventsync::client::sync::SyncService;
//! use std::sync::Arc;
//!
//! # async fn example() -> eventsync::shared::Result<()> {
//! eventsync::shared::logging::init_tracing();
//!
//! let manager = Arc::new(OfflineManager::open(Config::new()).await?);
//! let _service = SyncService::start(Arc::clone(&manager));
//!
//! manager.register_pending("POST", "/inscricoes/12/checkin", None).await?;
//! println!("pending: {}", manager.pending_sync().await);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `OfflineManager` is `Send + Sync` and meant to be shared as
//! `Arc<OfflineManager>`. Connectivity state sits behind `Arc<RwLock<_>>`;
//! drain passes and enqueues are serialized by one async mutex.

/// Shared types and data structures
pub mod shared;

/// Local store, HTTP client, offline queue and background sync
pub mod client;
