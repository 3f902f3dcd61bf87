//! # Queue Reconciliation
//!
//! Replays the pending queue against the server once connectivity returns,
//! turning placeholder ids into server ids along the way.
//!
//! ## Features
//!
//! - **Ordered Replay**: one snapshot of the queue, oldest action first
//! - **Id Translation**: ids returned by create calls are recorded in a
//!   [`TranslationTable`] and substituted into every later action
//! - **Forward Persistence**: rewritten later actions are saved, so a failed
//!   pass still leaves them referencing server ids
//! - **Cache Re-keying**: optimistic users, registrations and check-ins are
//!   moved to their server ids and marked confirmed
//!
//! ## Failure Model
//!
//! The first transport error or non-2xx status ends the pass. Actions the
//! server already accepted are removed; the failing action and everything after
//! it stay queued. Nothing is retried inside a pass.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventsync::client::api::ApiClient;
//! use eventsync::client::config::Config;
//! use eventsync::client::local_db::LocalDatabase;
//! use eventsync::client::offline::queue::PendingQueue;
//! use eventsync::client::offline::reconciliation::Reconciler;
//!
//! # async fn example() -> eventsync::shared::Result<()> {
//! let db = LocalDatabase::in_memory().await?;
//! let queue = PendingQueue::new(db.clone());
//! let reconciler = Reconciler::new(ApiClient::new(Config::new())?, db);
//!
//! let report = reconciler.drain(&queue).await?;
//! println!("replayed {} actions", report.replayed);
//! # Ok(())
//! # }
//! ```

use crate::client::api::ApiClient;
use crate::client::local_db::LocalDatabase;
use crate::client::offline::queue::{
    json_id, split_registration_path, ActionKind, ActionPayload, JsonObject, PendingAction,
    PendingQueue, LOCAL_ID_FIELD, LOCAL_USER_FIELD, REGISTRATIONS_PATH, REGISTRATION_FIELD, USER_FIELD,
};
use crate::shared::error::{Result, SyncError};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Path suffix of the check-in endpoint under `/inscricoes/{n}`
const CHECKIN_SUFFIX: &str = "/checkin";

/// Placeholder to server id mappings learned during one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    pub users: HashMap<i64, i64>,
    pub registrations: HashMap<i64, i64>,
}

impl TranslationTable {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.registrations.is_empty()
    }

    fn len(&self) -> usize {
        self.users.len() + self.registrations.len()
    }

    /// Substitute known server ids into a body
    ///
    /// `localId` is removed only when `drop_local_id` is set; a later action
    /// still needs it to record its own mapping once it is replayed.
    pub fn rewrite_body(&self, body: &mut JsonObject, drop_local_id: bool) {
        if drop_local_id {
            body.remove(LOCAL_ID_FIELD);
        }

        let local_user = body
            .get(LOCAL_USER_FIELD)
            .and_then(json_id)
            .and_then(|placeholder| self.users.get(&placeholder))
            .copied();
        let mapped_user = body
            .get(USER_FIELD)
            .and_then(json_id)
            .and_then(|id| self.users.get(&id))
            .copied();

        if let Some(real) = local_user {
            body.insert(USER_FIELD.into(), json!(real));
            body.remove(LOCAL_USER_FIELD);
        } else if let Some(real) = mapped_user {
            body.insert(USER_FIELD.into(), json!(real));
        }

        if let Some(real) = body
            .get(REGISTRATION_FIELD)
            .and_then(json_id)
            .and_then(|id| self.registrations.get(&id))
            .copied()
        {
            body.insert(REGISTRATION_FIELD.into(), json!(real));
        }
    }

    /// Replace a placeholder in `/inscricoes/{n}/...`, keeping the rest of the path
    pub fn rewrite_path(&self, path: &str) -> Option<String> {
        let (registration, rest) = split_registration_path(path)?;
        let real = self.registrations.get(&registration)?;
        Some(format!("{}/{}{}", REGISTRATIONS_PATH, real, rest))
    }

    pub fn rewrite(&self, payload: &ActionPayload, drop_local_id: bool) -> ActionPayload {
        let mut body = payload.body.clone();
        if let Some(body) = body.as_mut() {
            self.rewrite_body(body, drop_local_id);
        }
        ActionPayload {
            url: self
                .rewrite_path(&payload.url)
                .unwrap_or_else(|| payload.url.clone()),
            body,
        }
    }
}

/// Server user id from a `POST /usuarios` response
pub(crate) fn created_user_id(response: &Value) -> Option<i64> {
    response
        .get(USER_FIELD)
        .and_then(json_id)
        .or_else(|| response.get("id").and_then(json_id))
}

/// Server registration id from a `POST /inscricoes` response
pub(crate) fn created_registration_id(response: &Value) -> Option<i64> {
    response
        .get("data")
        .and_then(|data| data.get(REGISTRATION_FIELD))
        .and_then(json_id)
        .or_else(|| response.get(REGISTRATION_FIELD).and_then(json_id))
        .or_else(|| response.get("id").and_then(json_id))
}

/// Outcome of a successful pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Actions sent and accepted
    pub replayed: usize,
    pub users_resolved: usize,
    pub registrations_resolved: usize,
}

/// Replays the pending queue
#[derive(Debug, Clone)]
pub struct Reconciler {
    api: ApiClient,
    db: LocalDatabase,
}

impl Reconciler {
    pub fn new(api: ApiClient, db: LocalDatabase) -> Self {
        Self { api, db }
    }

    /// Run one drain pass over the current queue contents
    ///
    /// On success the queue is empty. On failure the actions accepted before
    /// the failing one are removed and the error is returned.
    pub async fn drain(&self, queue: &PendingQueue) -> Result<DrainReport> {
        let mut actions = queue.list_ordered().await?;
        let token = self.session_token().await;
        let mut tables = TranslationTable::default();
        let mut report = DrainReport::default();
        let mut accepted = Vec::with_capacity(actions.len());

        tracing::info!(count = actions.len(), "Replaying pending actions");

        for i in 0..actions.len() {
            let action = actions[i].clone();
            let payload = tables.rewrite(&action.payload, true);

            if let Some(value) = payload.body.as_ref().and_then(|b| b.get(LOCAL_USER_FIELD)) {
                let error = SyncError::UnresolvedPlaceholder {
                    action_id: action.id,
                    placeholder: json_id(value).unwrap_or_default(),
                };
                tracing::error!(id = action.id, error = %error, "Refusing to send local id");
                self.discard_accepted(queue, &accepted).await;
                return Err(error);
            }

            tracing::debug!(
                id = action.id,
                method = %action.method,
                url = %payload.url,
                "Replaying pending action"
            );

            let response = match self
                .api
                .send(
                    action.method.to_http(),
                    &payload.url,
                    payload.body.as_ref(),
                    token.as_deref(),
                )
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        id = action.id,
                        url = %payload.url,
                        error = %e,
                        "Replay failed, stopping pass"
                    );
                    self.discard_accepted(queue, &accepted).await;
                    return Err(e);
                }
            };

            accepted.push(action.id);
            report.replayed += 1;

            let known = tables.len();
            match (action.kind(), response.as_ref()) {
                (ActionKind::CreateUser { placeholder: Some(placeholder) }, Some(response)) => {
                    if let Some(real) = created_user_id(response) {
                        tables.users.insert(placeholder, real);
                        report.users_resolved += 1;
                        if let Err(e) = self.db.resolve_user_placeholder(placeholder, real).await {
                            tracing::warn!(placeholder, real, error = %e, "Failed to re-key cached user");
                        }
                    }
                }
                (ActionKind::CreateRegistration { placeholder: Some(placeholder), .. }, Some(response)) => {
                    if let Some(real) = created_registration_id(response) {
                        tables.registrations.insert(placeholder, real);
                        report.registrations_resolved += 1;
                        if let Err(e) = self.db.resolve_registration_placeholder(placeholder, real).await {
                            tracing::warn!(placeholder, real, error = %e, "Failed to re-key cached registration");
                        }
                    }
                }
                _ => {}
            }

            if let Some((registration, CHECKIN_SUFFIX)) = split_registration_path(&payload.url) {
                if let Err(e) = self.db.confirm_checkins(registration).await {
                    tracing::warn!(registration, error = %e, "Failed to confirm cached check-in");
                }
            }

            if tables.len() != known {
                self.propagate(queue, &tables, &mut actions[i + 1..]).await;
            }
        }

        queue.clear_all().await?;
        tracing::info!(
            replayed = report.replayed,
            users = report.users_resolved,
            registrations = report.registrations_resolved,
            "Pending queue drained"
        );

        Ok(report)
    }

    /// Rewrite and persist the actions after the one that produced new mappings
    async fn propagate(
        &self,
        queue: &PendingQueue,
        tables: &TranslationTable,
        later: &mut [PendingAction],
    ) {
        for action in later {
            let rewritten = tables.rewrite(&action.payload, false);
            if rewritten == action.payload {
                continue;
            }
            if let Err(e) = queue.rewrite(action.id, &rewritten).await {
                tracing::warn!(id = action.id, error = %e, "Failed to persist rewritten action");
            }
            action.payload = rewritten;
        }
    }

    async fn discard_accepted(&self, queue: &PendingQueue, accepted: &[i64]) {
        if accepted.is_empty() {
            return;
        }
        if let Err(e) = queue.remove(accepted).await {
            tracing::warn!(count = accepted.len(), error = %e, "Failed to remove replayed actions");
        }
    }

    async fn session_token(&self) -> Option<String> {
        match self.db.auth_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read auth token, replaying without it");
                None
            }
        }
    }
}
