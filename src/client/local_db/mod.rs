//! # Local Database Module
//!
//! Durable SQLite storage for the offline-first client. It survives restarts and
//! holds the cached server entities plus the pending action log.
//!
//! ## Tables
//!
//! - `users(id)`, `events(id_evento)`, `registrations(id_inscricao)`,
//!   `checkins(id_checkin)`: cached entities, upserted by primary key
//! - `pending(id AUTOINCREMENT)`: mutating actions waiting for replay
//! - `session(key)`: durable string slots (bearer token)
//!
//! ## Key Components
//!
//! - `LocalDatabase`: connection pool and schema management
//! - `schema.rs`: schema version bookkeeping
//! - `users.rs`, `events.rs`, `registrations.rs`, `checkins.rs`: entity tables
//! - `pending.rs`: the pending action log
//! - `session.rs`: token storage
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventsync::client::local_db::LocalDatabase;
//!
//! # async fn example() -> Result<(), sqlx::Error> {
//! let db = LocalDatabase::open("/tmp/eventsync.db").await?;
//! let users = db.get_users().await?;
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod users;
pub mod events;
pub mod registrations;
pub mod checkins;
pub mod pending;
pub mod session;

use crate::shared::models::{CheckIn, Event, Registration, User};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Result as SqlxResult, SqlitePool};
use std::path::Path;

/// Result type for local database operations
pub type Result<T> = SqlxResult<T>;

/// Local database connection manager
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the database file at `path`
    ///
    /// Creates the parent directory and the file if they don't exist, enables
    /// WAL mode and applies the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        tracing::debug!(path = %path.display(), "Local database opened");

        Ok(db)
    }

    /// Open a private in-memory database
    ///
    /// A single pooled connection that never expires, so the data lives as long
    /// as the `LocalDatabase`.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }

    /// Create the migrations table and apply every migration not yet recorded
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        self.run_migrations().await
    }

    /// Apply pending migrations, each in its own transaction
    async fn run_migrations(&self) -> Result<()> {
        let (applied,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        for migration in schema::pending_migrations(applied) {
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(migration.version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(
                version = migration.version,
                description = migration.description,
                "Applied local schema migration"
            );
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace every cached entity with a server snapshot
    ///
    /// All four tables are cleared and refilled in one transaction; the pending
    /// log and session slots are left alone.
    pub async fn replace_snapshot(
        &self,
        users: &[User],
        events: &[Event],
        registrations: &[Registration],
        checkins: &[CheckIn],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM events").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM registrations").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM checkins").execute(&mut *tx).await?;

        for user in users {
            users::upsert_user(&mut *tx, user).await?;
        }
        for event in events {
            events::upsert_event(&mut *tx, event).await?;
        }
        for registration in registrations {
            registrations::upsert_registration(&mut *tx, registration).await?;
        }
        for checkin in checkins {
            checkins::upsert_checkin(&mut *tx, checkin).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get database statistics
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let (events,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        let (registrations,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations")
            .fetch_one(&self.pool)
            .await?;
        let (checkins,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM checkins")
            .fetch_one(&self.pool)
            .await?;
        let pending_actions = self.count_pending().await?;

        Ok(DatabaseStats {
            user_count: users as u64,
            event_count: events as u64,
            registration_count: registrations as u64,
            checkin_count: checkins as u64,
            pending_actions: pending_actions as u64,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub user_count: u64,
    pub event_count: u64,
    pub registration_count: u64,
    pub checkin_count: u64,
    pub pending_actions: u64,
}
