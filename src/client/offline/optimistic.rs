//! # Optimistic Offline Writes
//!
//! Handlers for mutations made while the backend is unreachable. Each one
//! writes the entity the UI should see right away, marked `sync_pending`, and
//! queues the request that will create it on the server.
//!
//! ## Features
//!
//! - **Placeholder Ids**: strictly increasing local ids from [`PlaceholderGenerator`]
//! - **Immediate Cache**: optimistic entities land in the local store first
//! - **Dependency Chains**: a registration may point at a user placeholder,
//!   a check-in at a registration placeholder
//!
//! Cache write failures are logged and do not block the queued action.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventsync::client::local_db::LocalDatabase;
//! use eventsync::client::offline::optimistic::OptimisticWriter;
//! use eventsync::client::offline::queue::PendingQueue;
//!
//! # async fn example() -> eventsync::shared::Result<()> {
//! let db = LocalDatabase::in_memory().await?;
//! let writer = OptimisticWriter::new(db.clone(), PendingQueue::new(db));
//!
//! let quick = writer.quick_register("Ana", "ana@example.org", 3).await?;
//! println!("check-in {} queued", quick.checkin.id_checkin);
//! # Ok(())
//! # }
//! ```

use crate::client::local_db::LocalDatabase;
use crate::client::offline::queue::{IdRef, PendingQueue, PendingRequest};
use crate::shared::error::Result;
use crate::shared::models::{
    CheckIn, NewUser, Registration, User, UserUpdate, REGISTRATION_ACTIVE,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Password given to users created through quick registration
pub const DEFAULT_PASSWORD: &str = "123";

/// Generates local ids, strictly increasing within the process
///
/// Each id is the current Unix time in milliseconds, bumped past the previous
/// id when two calls land in the same millisecond.
#[derive(Debug, Default)]
pub struct PlaceholderGenerator {
    last: AtomicI64,
}

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Entities produced by one quick registration
#[derive(Debug, Clone, PartialEq)]
pub struct QuickRegistration {
    pub user: User,
    pub registration: Registration,
    pub checkin: CheckIn,
}

/// Offline mutation handlers
#[derive(Debug, Clone)]
pub struct OptimisticWriter {
    db: LocalDatabase,
    queue: PendingQueue,
    placeholders: Arc<PlaceholderGenerator>,
}

impl OptimisticWriter {
    pub fn new(db: LocalDatabase, queue: PendingQueue) -> Self {
        Self::with_generator(db, queue, Arc::new(PlaceholderGenerator::new()))
    }

    pub fn with_generator(
        db: LocalDatabase,
        queue: PendingQueue,
        placeholders: Arc<PlaceholderGenerator>,
    ) -> Self {
        Self {
            db,
            queue,
            placeholders,
        }
    }

    pub fn placeholders(&self) -> &Arc<PlaceholderGenerator> {
        &self.placeholders
    }

    /// Cache a local user and queue `POST /usuarios`
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let placeholder = self.placeholders.next_id();
        let user = User::from_new(placeholder, new_user, true);

        if let Err(e) = self.db.put_user(&user).await {
            tracing::warn!(placeholder, error = %e, "Failed to cache optimistic user");
        }
        self.queue
            .submit(&PendingRequest::create_user(placeholder, new_user)?)
            .await?;

        Ok(user)
    }

    /// Cache a local registration and queue `POST /inscricoes`
    pub async fn create_registration(&self, user: IdRef, event_id: i64) -> Result<Registration> {
        let placeholder = self.placeholders.next_id();
        let registration = Registration {
            id_inscricao: placeholder,
            id_usuario: user.value(),
            id_evento: event_id,
            data_inscricao: chrono::Utc::now().to_rfc3339(),
            data_cancelamento: None,
            status: REGISTRATION_ACTIVE,
            sync_pending: true,
        };

        if let Err(e) = self.db.put_registration(&registration).await {
            tracing::warn!(placeholder, error = %e, "Failed to cache optimistic registration");
        }
        self.queue
            .submit(&PendingRequest::create_registration(placeholder, user, event_id))
            .await?;

        Ok(registration)
    }

    /// Cache a local check-in and queue `POST /inscricoes/{id}/checkin`
    ///
    /// `registration_id` may itself be a placeholder.
    pub async fn check_in(&self, registration_id: i64) -> Result<CheckIn> {
        let placeholder = self.placeholders.next_id();
        let checkin = CheckIn {
            id_checkin: placeholder,
            id_inscricao: registration_id,
            data_checkin: chrono::Utc::now().to_rfc3339(),
            sync_pending: true,
        };

        if let Err(e) = self.db.put_checkin(&checkin).await {
            tracing::warn!(placeholder, error = %e, "Failed to cache optimistic check-in");
        }
        self.queue
            .submit(&PendingRequest::check_in(registration_id))
            .await?;

        Ok(checkin)
    }

    /// Create a user, register it for `event_id` and check it in
    ///
    /// The three actions are queued in dependency order.
    pub async fn quick_register(
        &self,
        nome: &str,
        email: &str,
        event_id: i64,
    ) -> Result<QuickRegistration> {
        let user = self.create_user(&quick_user(nome, email)).await?;
        let registration = self
            .create_registration(IdRef::Placeholder(user.id), event_id)
            .await?;
        let checkin = self.check_in(registration.id_inscricao).await?;

        Ok(QuickRegistration {
            user,
            registration,
            checkin,
        })
    }

    /// Apply an update to the cached user and queue `PUT /usuarios/{id}`
    ///
    /// Returns the cached user after the update, if one was cached.
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        let cached = match self.db.get_user(id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to read cached user");
                None
            }
        };

        let updated = cached.map(|mut user| {
            user.apply(update);
            user.sync_pending = true;
            user
        });
        if let Some(user) = &updated {
            if let Err(e) = self.db.put_user(user).await {
                tracing::warn!(id, error = %e, "Failed to cache optimistic user update");
            }
        }

        self.queue
            .submit(&PendingRequest::update_user(id, update)?)
            .await?;

        Ok(updated)
    }

    /// Queue `DELETE /usuarios/{id}` and drop the cached user
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.queue.submit(&PendingRequest::delete_user(id)).await?;

        if let Err(e) = self.db.delete_user(id).await {
            tracing::warn!(id, error = %e, "Failed to remove cached user");
        }
        Ok(())
    }
}

/// Creation fields for a quick registration
pub(crate) fn quick_user(nome: &str, email: &str) -> NewUser {
    NewUser {
        nome: nome.to_string(),
        email: email.to_string(),
        senha: DEFAULT_PASSWORD.to_string(),
        is_admin: false,
        cpf: None,
        telefone: None,
    }
}
