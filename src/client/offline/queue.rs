//! # Pending Action Queue
//!
//! Durable FIFO of mutating requests recorded while offline, replayed later by
//! the [`Reconciler`](super::reconciliation::Reconciler).
//!
//! ## Features
//!
//! - **Persistent Queue**: actions live in the `pending` table and survive restarts
//! - **Stable Order**: replay order is the store-assigned id, untouched by rewrites
//! - **Typed View**: [`ActionKind`] classifies stored actions for the reconciler
//! - **Typed Builders**: [`PendingRequest`] writes the local-id field conventions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventsync::client::local_db::LocalDatabase;
//! use eventsync::client::offline::queue::{ActionMethod, PendingQueue};
//!
//! # async fn example() -> eventsync::shared::Result<()> {
//! let db = LocalDatabase::in_memory().await?;
//! let queue = PendingQueue::new(db);
//!
//! queue.enqueue(ActionMethod::Post, "inscricoes/12/checkin", None).await?;
//! for action in queue.list_ordered().await? {
//!     println!("{} {}", action.method, action.payload.url);
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::local_db::LocalDatabase;
use crate::shared::error::{Result, SyncError};
use crate::shared::models::{NewUser, UserUpdate};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// JSON object carried as a request body
pub type JsonObject = serde_json::Map<String, Value>;

/// Body field carrying the placeholder id of the entity being created
pub const LOCAL_ID_FIELD: &str = "localId";
/// Body field carrying a not-yet-resolved user placeholder
pub const LOCAL_USER_FIELD: &str = "idUsuarioLocal";
/// Body field carrying a server user id
pub const USER_FIELD: &str = "id_usuario";
/// Body field carrying a server registration id
pub const REGISTRATION_FIELD: &str = "id_inscricao";

pub const USERS_PATH: &str = "/usuarios";
pub const REGISTRATIONS_PATH: &str = "/inscricoes";

/// HTTP methods accepted for queued actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMethod {
    Post,
    Put,
    Delete,
}

impl ActionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMethod::Post => "POST",
            ActionMethod::Put => "PUT",
            ActionMethod::Delete => "DELETE",
        }
    }

    pub fn to_http(self) -> reqwest::Method {
        match self {
            ActionMethod::Post => reqwest::Method::POST,
            ActionMethod::Put => reqwest::Method::PUT,
            ActionMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl FromStr for ActionMethod {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POST" => Ok(ActionMethod::Post),
            "PUT" => Ok(ActionMethod::Put),
            "DELETE" => Ok(ActionMethod::Delete),
            _ => Err(SyncError::invalid_method(s)),
        }
    }
}

impl fmt::Display for ActionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request target and body of a queued action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPayload {
    /// Backend path, always starting with `/`
    pub url: String,
    pub body: Option<JsonObject>,
}

impl ActionPayload {
    pub fn new(path: impl AsRef<str>, body: Option<JsonObject>) -> Self {
        Self {
            url: normalize_path(path.as_ref()),
            body,
        }
    }

    /// Integer id stored under `field` in the body
    pub fn body_id(&self, field: &str) -> Option<i64> {
        self.body.as_ref().and_then(|body| body.get(field)).and_then(json_id)
    }
}

/// A persisted action
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    /// Store-assigned id, also the replay order
    pub id: i64,
    pub method: ActionMethod,
    pub payload: ActionPayload,
    /// RFC 3339 enqueue time
    pub created_at: String,
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        ActionKind::classify(self.method, &self.payload)
    }
}

/// Reference to a user or registration that may still be local-only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdRef {
    /// Server-assigned id
    Resolved(i64),
    /// Placeholder generated on this device
    Placeholder(i64),
}

impl IdRef {
    pub fn value(&self) -> i64 {
        match self {
            IdRef::Resolved(id) | IdRef::Placeholder(id) => *id,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, IdRef::Placeholder(_))
    }
}

/// What a stored action means to the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// `POST /usuarios`
    CreateUser { placeholder: Option<i64> },
    /// `POST /inscricoes`
    CreateRegistration {
        placeholder: Option<i64>,
        user: Option<IdRef>,
    },
    /// Any request under `/inscricoes/{n}/...`
    RegistrationScoped { registration: i64, rest: String },
    Other,
}

impl ActionKind {
    pub fn classify(method: ActionMethod, payload: &ActionPayload) -> Self {
        let placeholder = || {
            payload
                .body_id(LOCAL_ID_FIELD)
                .or_else(|| payload.body_id("id"))
        };

        if method == ActionMethod::Post && payload.url == USERS_PATH {
            return ActionKind::CreateUser {
                placeholder: placeholder(),
            };
        }

        if method == ActionMethod::Post && payload.url == REGISTRATIONS_PATH {
            let user = payload
                .body_id(LOCAL_USER_FIELD)
                .map(IdRef::Placeholder)
                .or_else(|| payload.body_id(USER_FIELD).map(IdRef::Resolved));
            return ActionKind::CreateRegistration {
                placeholder: placeholder(),
                user,
            };
        }

        match split_registration_path(&payload.url) {
            Some((registration, rest)) => ActionKind::RegistrationScoped {
                registration,
                rest: rest.to_string(),
            },
            None => ActionKind::Other,
        }
    }
}

/// Split `/inscricoes/{n}/rest` into `n` and `/rest`
pub(crate) fn split_registration_path(path: &str) -> Option<(i64, &str)> {
    let tail = path.strip_prefix(REGISTRATIONS_PATH)?.strip_prefix('/')?;
    let (segment, rest) = match tail.find('/') {
        Some(idx) => tail.split_at(idx),
        None => (tail, ""),
    };
    segment.parse().ok().map(|id| (id, rest))
}

/// Read an id from JSON: integers or numeric strings, zero counts as absent
pub(crate) fn json_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (id != 0).then_some(id)
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn to_object(value: Value) -> Result<JsonObject> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SyncError::InvalidBody(other.to_string())),
    }
}

/// An action ready to be enqueued
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub method: ActionMethod,
    pub payload: ActionPayload,
}

impl PendingRequest {
    pub fn new(method: ActionMethod, path: impl AsRef<str>, body: Option<JsonObject>) -> Self {
        Self {
            method,
            payload: ActionPayload::new(path, body),
        }
    }

    /// `POST /usuarios` carrying the user fields and its placeholder
    pub fn create_user(placeholder: i64, user: &NewUser) -> Result<Self> {
        let mut body = to_object(serde_json::to_value(user)?)?;
        body.insert(LOCAL_ID_FIELD.into(), json!(placeholder));
        Ok(Self::new(ActionMethod::Post, USERS_PATH, Some(body)))
    }

    /// `POST /inscricoes` for a user that may only exist locally
    pub fn create_registration(placeholder: i64, user: IdRef, event_id: i64) -> Self {
        let mut body = JsonObject::new();
        body.insert(LOCAL_ID_FIELD.into(), json!(placeholder));
        body.insert("id_evento".into(), json!(event_id));
        match user {
            IdRef::Resolved(id) => body.insert(USER_FIELD.into(), json!(id)),
            IdRef::Placeholder(id) => body.insert(LOCAL_USER_FIELD.into(), json!(id)),
        };
        Self::new(ActionMethod::Post, REGISTRATIONS_PATH, Some(body))
    }

    /// `POST /inscricoes/{id}/checkin`, no body
    pub fn check_in(registration_id: i64) -> Self {
        Self::new(
            ActionMethod::Post,
            format!("{}/{}/checkin", REGISTRATIONS_PATH, registration_id),
            None,
        )
    }

    pub fn update_user(id: i64, update: &UserUpdate) -> Result<Self> {
        let body = to_object(serde_json::to_value(update)?)?;
        Ok(Self::new(
            ActionMethod::Put,
            format!("{}/{}", USERS_PATH, id),
            Some(body),
        ))
    }

    pub fn delete_user(id: i64) -> Self {
        Self::new(ActionMethod::Delete, format!("{}/{}", USERS_PATH, id), None)
    }
}

/// Durable queue of pending actions
#[derive(Debug, Clone)]
pub struct PendingQueue {
    db: LocalDatabase,
}

impl PendingQueue {
    pub fn new(db: LocalDatabase) -> Self {
        Self { db }
    }

    /// Persist an action and return its id
    ///
    /// `path` gains a leading `/` if it lacks one.
    pub async fn enqueue(
        &self,
        method: ActionMethod,
        path: &str,
        body: Option<JsonObject>,
    ) -> Result<i64> {
        self.submit(&PendingRequest::new(method, path, body)).await
    }

    pub async fn submit(&self, request: &PendingRequest) -> Result<i64> {
        let id = self.db.append_pending(request.method, &request.payload).await?;
        tracing::debug!(
            id,
            method = %request.method,
            url = %request.payload.url,
            "Queued pending action"
        );
        Ok(id)
    }

    /// Every pending action, oldest first
    pub async fn list_ordered(&self) -> Result<Vec<PendingAction>> {
        Ok(self.db.list_pending().await?)
    }

    /// Replace an action's payload in place
    pub async fn rewrite(&self, id: i64, payload: &ActionPayload) -> Result<bool> {
        Ok(self.db.replace_pending(id, payload).await?)
    }

    pub async fn remove(&self, ids: &[i64]) -> Result<u64> {
        Ok(self.db.remove_pending(ids).await?)
    }

    pub async fn clear_all(&self) -> Result<u64> {
        Ok(self.db.clear_pending().await?)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.db.count_pending().await? as usize)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
