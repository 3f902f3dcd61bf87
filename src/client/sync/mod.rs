//! # Background Sync Service
//!
//! Keeps the offline context current without user interaction: a single tokio
//! task probes connectivity on a fixed interval, recounts the queue, drains it
//! whenever the backend is reachable, and refreshes the local cache while idle.
//!
//! ## Key Components
//!
//! - `network_monitor.rs`: bounded health probe
//! - `sync_state.rs`: connectivity and queue status for the UI
//! - `refresh.rs`: server snapshot download into the local store
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventsync::client::config::Config;
//! use eventsync::client::offline::OfflineManager;
//! use eventsync::client::sync::SyncService;
//! use std::sync::Arc;
//!
//! # async fn example() -> eventsync::shared::Result<()> {
//! let manager = Arc::new(OfflineManager::open(Config::new()).await?);
//! let mut service = SyncService::start(Arc::clone(&manager));
//!
//! // ... application runs ...
//!
//! service.stop();
//! # Ok(())
//! # }
//! ```

pub mod network_monitor;
pub mod refresh;
pub mod sync_state;

pub use network_monitor::NetworkMonitor;
pub use refresh::{refresh_local_cache, RefreshReport};
pub use sync_state::SyncStatus;

use crate::client::offline::OfflineManager;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub online: bool,
    pub pending: usize,
    /// A drain pass was started
    pub drained: bool,
    /// The local cache was replaced
    pub refreshed: bool,
}

/// Per-tick logic of the background service
///
/// Exposed so callers can drive ticks themselves.
#[derive(Debug)]
pub struct SyncWorker {
    manager: Arc<OfflineManager>,
    last_refresh: Option<Instant>,
}

impl SyncWorker {
    pub fn new(manager: Arc<OfflineManager>) -> Self {
        Self {
            manager,
            last_refresh: None,
        }
    }

    /// Probe, recount, drain queued work while online, refresh when due
    ///
    /// A pass that failed on an earlier tick is retried on the next one.
    pub async fn tick(&mut self) -> TickReport {
        let manager = &self.manager;
        let online = manager.monitor().probe().await;
        manager.set_online(online).await;

        let mut report = TickReport {
            online,
            pending: self.recount().await,
            ..Default::default()
        };

        if !online {
            return report;
        }

        if report.pending > 0 && manager.config().auto_sync() {
            tracing::info!(pending = report.pending, "Online with queued actions, draining");
            report.drained = true;
            if let Err(e) = manager.sync_now().await {
                tracing::warn!(error = %e, "Automatic sync failed");
            }
            report.pending = manager.pending_sync().await;
        }

        let refresh_due = self
            .last_refresh
            .map_or(true, |at| at.elapsed() >= manager.config().refresh_interval());
        if refresh_due && report.pending == 0 {
            match manager.refresh_cache().await {
                Ok(Some(_)) => {
                    self.last_refresh = Some(Instant::now());
                    report.refreshed = true;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Cache refresh failed"),
            }
        }

        report
    }

    async fn recount(&self) -> usize {
        match self.manager.refresh_pending_count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count pending actions");
                self.manager.pending_sync().await
            }
        }
    }
}

/// Handle to the spawned background task
#[derive(Debug)]
pub struct SyncService {
    handle: Option<JoinHandle<()>>,
}

impl SyncService {
    /// Spawn the ticker on the current tokio runtime
    pub fn start(manager: Arc<OfflineManager>) -> Self {
        let interval = manager.config().probe_interval();
        let mut worker = SyncWorker::new(manager);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = worker.tick().await;
                tracing::trace!(?report, "Sync tick");
            }
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "Background sync started");
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Background sync stopped");
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
