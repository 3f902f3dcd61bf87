//! # Sync State
//!
//! Runtime connectivity and queue status shown by the UI. Never persisted;
//! rebuilt from the probe and the queue length after a restart.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Result of the most recent connectivity probe
    pub is_online: bool,
    /// Number of queued actions
    pub pending_count: usize,
    /// A drain pass is running
    pub is_syncing: bool,
    /// RFC 3339 time of the last fully successful pass
    pub last_sync: Option<String>,
    /// Error of the last failed pass, cleared by the next success
    pub last_error: Option<String>,
}

impl SyncStatus {
    /// Whether there is queued work the UI should flag
    pub fn has_pending(&self) -> bool {
        self.pending_count > 0
    }

    pub(crate) fn mark_synced(&mut self) {
        self.pending_count = 0;
        self.is_syncing = false;
        self.last_sync = Some(chrono::Utc::now().to_rfc3339());
        self.last_error = None;
    }

    pub(crate) fn mark_failed(&mut self, error: &str) {
        self.is_syncing = false;
        self.last_error = Some(error.to_string());
    }
}
