//! # Offline-First Operations
//!
//! Lets the event client keep working without the backend: mutations are
//! applied to the local store immediately and queued, then replayed in order
//! once connectivity returns.
//!
//! ## Architecture
//!
//! - **Queue**: durable FIFO of pending requests (`queue.rs`)
//! - **Optimistic Writes**: placeholder ids and local entities (`optimistic.rs`)
//! - **Reconciliation**: replay with placeholder translation (`reconciliation.rs`)
//! - **OfflineManager**: the shared context the UI talks to
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventsync::client::config::Config;
//! use eventsync::client::offline::{OfflineManager, SyncOutcome};
//! use std::sync::Arc;
//!
//! # async fn example() -> eventsync::shared::Result<()> {
//! let manager = Arc::new(OfflineManager::open(Config::new()).await?);
//!
//! let quick = manager.quick_register("Ana", "ana@example.org", 3).await?;
//! println!("queued: {}", manager.pending_sync().await);
//!
//! if let SyncOutcome::Completed(report) = manager.sync_now().await? {
//!     println!("replayed {}", report.replayed);
//! }
//! # Ok(())
//! # }
//! ```

pub mod optimistic;
pub mod queue;
pub mod reconciliation;

pub use optimistic::{OptimisticWriter, PlaceholderGenerator, QuickRegistration};
pub use queue::{ActionKind, ActionMethod, ActionPayload, IdRef, PendingAction, PendingQueue, PendingRequest};
pub use reconciliation::{DrainReport, Reconciler, TranslationTable};

use crate::client::api::ApiClient;
use crate::client::config::Config;
use crate::client::local_db::LocalDatabase;
use crate::client::sync::network_monitor::NetworkMonitor;
use crate::client::sync::refresh::{refresh_local_cache, RefreshReport};
use crate::client::sync::sync_state::SyncStatus;
use crate::shared::error::{Result, SyncError};
use crate::shared::models::{CheckIn, NewUser, Registration, User, UserUpdate, REGISTRATION_ACTIVE};
use optimistic::quick_user;
use queue::json_id;
use reconciliation::{created_registration_id, created_user_id};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Result of a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass ran and the queue is now empty
    Completed(DrainReport),
    /// Another pass was already running; nothing was done
    AlreadyRunning,
}

/// Application-wide offline context
///
/// Construct once and share as `Arc<OfflineManager>`.
#[derive(Debug)]
pub struct OfflineManager {
    config: Config,
    db: LocalDatabase,
    queue: PendingQueue,
    api: ApiClient,
    reconciler: Reconciler,
    writer: OptimisticWriter,
    monitor: NetworkMonitor,
    status: Arc<RwLock<SyncStatus>>,
    /// Held for the whole drain pass and around every enqueue
    drain_guard: Mutex<()>,
}

impl OfflineManager {
    /// Build a manager over an already opened store
    pub async fn new(config: Config, db: LocalDatabase) -> Result<Self> {
        let api = ApiClient::new(config.clone())?;
        let queue = PendingQueue::new(db.clone());
        let pending_count = queue.len().await?;

        Ok(Self {
            reconciler: Reconciler::new(api.clone(), db.clone()),
            writer: OptimisticWriter::new(db.clone(), queue.clone()),
            monitor: NetworkMonitor::new(api.clone()),
            status: Arc::new(RwLock::new(SyncStatus {
                pending_count,
                ..Default::default()
            })),
            drain_guard: Mutex::new(()),
            config,
            db,
            queue,
            api,
        })
    }

    /// Open the store at the configured path and build a manager over it
    pub async fn open(config: Config) -> Result<Self> {
        let db = LocalDatabase::open(config.database_path()).await?;
        Self::new(config, db).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &LocalDatabase {
        &self.db
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    /// Shared handle to the connectivity state
    pub fn status_handle(&self) -> Arc<RwLock<SyncStatus>> {
        Arc::clone(&self.status)
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    pub async fn is_online(&self) -> bool {
        self.status.read().await.is_online
    }

    pub async fn set_online(&self, online: bool) {
        let mut status = self.status.write().await;
        if status.is_online != online {
            tracing::info!(online, "Connectivity changed");
        }
        status.is_online = online;
    }

    /// Number of queued actions as last counted
    pub async fn pending_sync(&self) -> usize {
        self.status.read().await.pending_count
    }

    /// Recount the queue, waiting for any running pass to finish first
    pub async fn refresh_pending_count(&self) -> Result<usize> {
        let _guard = self.drain_guard.lock().await;
        self.recount().await
    }

    async fn recount(&self) -> Result<usize> {
        let count = self.queue.len().await?;
        self.status.write().await.pending_count = count;
        Ok(count)
    }

    /// Queue an arbitrary mutating request
    ///
    /// `method` must be POST, PUT or DELETE; `body`, when present, must be a
    /// JSON object. Returns the id of the queued action.
    pub async fn register_pending(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<i64> {
        let method: ActionMethod = method.parse()?;
        let body = match body {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => return Err(SyncError::InvalidBody(other.to_string())),
        };

        let _guard = self.drain_guard.lock().await;
        let id = self.queue.enqueue(method, path, body).await?;
        self.recount().await?;
        Ok(id)
    }

    /// Drain the queue unless a pass is already running
    ///
    /// Failures are recorded in [`SyncStatus::last_error`] and returned.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let Ok(_guard) = self.drain_guard.try_lock() else {
            tracing::debug!("Sync already in progress, skipping");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        self.status.write().await.is_syncing = true;

        match self.reconciler.drain(&self.queue).await {
            Ok(report) => {
                self.status.write().await.mark_synced();
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                let remaining = self.queue.len().await.ok();
                let mut status = self.status.write().await;
                status.mark_failed(&e.to_string());
                if let Some(remaining) = remaining {
                    status.pending_count = remaining;
                }
                drop(status);

                tracing::error!(error = %e, "Sync pass failed");
                Err(e)
            }
        }
    }

    /// Refresh the local cache from the server when nothing is queued
    ///
    /// Returns `None` when skipped because of pending work.
    pub async fn refresh_cache(&self) -> Result<Option<RefreshReport>> {
        let _guard = self.drain_guard.lock().await;
        if !self.queue.is_empty().await? {
            tracing::debug!("Pending actions queued, skipping cache refresh");
            return Ok(None);
        }
        refresh_local_cache(&self.api, &self.db).await.map(Some)
    }

    async fn token(&self) -> Option<String> {
        match self.db.auth_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read auth token");
                None
            }
        }
    }

    /// Whether `id` names a registration that only exists locally
    async fn is_local_registration(&self, id: i64) -> bool {
        matches!(
            self.db.get_registration(id).await,
            Ok(Some(registration)) if registration.sync_pending
        )
    }

    async fn cache<F, Fut>(&self, what: &str, write: F)
    where
        F: FnOnce(LocalDatabase) -> Fut,
        Fut: std::future::Future<Output = sqlx::Result<()>>,
    {
        if let Err(e) = write(self.db.clone()).await {
            tracing::warn!(what, error = %e, "Failed to cache confirmed entity");
        }
    }

    /// Create a user on the server, or locally while offline
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User> {
        if !self.is_online().await {
            let _guard = self.drain_guard.lock().await;
            let user = self.writer.create_user(new_user).await?;
            self.recount().await?;
            return Ok(user);
        }

        let body = serde_json::to_value(new_user)?;
        let response = self
            .api
            .send(Method::POST, queue::USERS_PATH, body.as_object(), self.token().await.as_deref())
            .await?;
        let id = response
            .as_ref()
            .and_then(created_user_id)
            .ok_or_else(|| SyncError::MissingId(format!("POST {}", queue::USERS_PATH)))?;

        let user = User::from_new(id, new_user, false);
        let cached = user.clone();
        self.cache("user", |db| async move { db.put_user(&cached).await })
            .await;
        Ok(user)
    }

    /// Register a user for an event
    ///
    /// A user that only exists locally is registered through the queue even
    /// when online, so the request replays after the user's creation.
    pub async fn create_registration(&self, user: IdRef, event_id: i64) -> Result<Registration> {
        if !self.is_online().await || user.is_placeholder() {
            let _guard = self.drain_guard.lock().await;
            let registration = self.writer.create_registration(user, event_id).await?;
            self.recount().await?;
            return Ok(registration);
        }

        let body = serde_json::json!({
            "id_usuario": user.value(),
            "id_evento": event_id,
        });
        let response = self
            .api
            .send(
                Method::POST,
                queue::REGISTRATIONS_PATH,
                body.as_object(),
                self.token().await.as_deref(),
            )
            .await?;
        let id = response
            .as_ref()
            .and_then(created_registration_id)
            .ok_or_else(|| SyncError::MissingId(format!("POST {}", queue::REGISTRATIONS_PATH)))?;

        let registration = Registration {
            id_inscricao: id,
            id_usuario: user.value(),
            id_evento: event_id,
            data_inscricao: chrono::Utc::now().to_rfc3339(),
            data_cancelamento: None,
            status: REGISTRATION_ACTIVE,
            sync_pending: false,
        };
        let cached = registration.clone();
        self.cache("registration", |db| async move {
            db.put_registration(&cached).await
        })
        .await;
        Ok(registration)
    }

    /// Check a registration in
    ///
    /// Registrations still waiting in the queue are checked in through the
    /// queue as well.
    pub async fn check_in(&self, registration_id: i64) -> Result<CheckIn> {
        if !self.is_online().await || self.is_local_registration(registration_id).await {
            let _guard = self.drain_guard.lock().await;
            let checkin = self.writer.check_in(registration_id).await?;
            self.recount().await?;
            return Ok(checkin);
        }

        let request = PendingRequest::check_in(registration_id);
        let response = self
            .api
            .send(
                Method::POST,
                &request.payload.url,
                None,
                self.token().await.as_deref(),
            )
            .await?;

        let id = response
            .as_ref()
            .and_then(|r| {
                r.get("id_checkin")
                    .or_else(|| r.get("data").and_then(|d| d.get("id_checkin")))
                    .or_else(|| r.get("id"))
            })
            .and_then(json_id)
            .unwrap_or_else(|| self.writer.placeholders().next_id());

        let checkin = CheckIn {
            id_checkin: id,
            id_inscricao: registration_id,
            data_checkin: chrono::Utc::now().to_rfc3339(),
            sync_pending: false,
        };
        let cached = checkin.clone();
        self.cache("check-in", |db| async move { db.put_checkin(&cached).await })
            .await;
        Ok(checkin)
    }

    /// Create a user with the default password, register and check it in
    pub async fn quick_register(
        &self,
        nome: &str,
        email: &str,
        event_id: i64,
    ) -> Result<QuickRegistration> {
        if !self.is_online().await {
            let _guard = self.drain_guard.lock().await;
            let quick = self.writer.quick_register(nome, email, event_id).await?;
            self.recount().await?;
            return Ok(quick);
        }

        let user = self.create_user(&quick_user(nome, email)).await?;
        let registration = self
            .create_registration(IdRef::Resolved(user.id), event_id)
            .await?;
        let checkin = self.check_in(registration.id_inscricao).await?;

        Ok(QuickRegistration {
            user,
            registration,
            checkin,
        })
    }

    /// Update a user; returns the cached user after the update, if any
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if !self.is_online().await {
            let _guard = self.drain_guard.lock().await;
            let user = self.writer.update_user(id, update).await?;
            self.recount().await?;
            return Ok(user);
        }

        let request = PendingRequest::update_user(id, update)?;
        self.api
            .send(
                Method::PUT,
                &request.payload.url,
                request.payload.body.as_ref(),
                self.token().await.as_deref(),
            )
            .await?;

        let updated = match self.db.get_user(id).await {
            Ok(user) => user.map(|mut user| {
                user.apply(update);
                user.sync_pending = false;
                user
            }),
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to read cached user");
                None
            }
        };
        if let Some(user) = updated.clone() {
            self.cache("user", |db| async move { db.put_user(&user).await })
                .await;
        }
        Ok(updated)
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        if !self.is_online().await {
            let _guard = self.drain_guard.lock().await;
            self.writer.delete_user(id).await?;
            self.recount().await?;
            return Ok(());
        }

        let request = PendingRequest::delete_user(id);
        self.api
            .send(
                Method::DELETE,
                &request.payload.url,
                None,
                self.token().await.as_deref(),
            )
            .await?;

        self.cache("user", |db| async move { db.delete_user(id).await.map(|_| ()) })
            .await;
        Ok(())
    }
}
