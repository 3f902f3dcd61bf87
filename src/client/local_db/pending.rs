//! # Pending Action Log
//!
//! Durable storage behind [`crate::client::offline::PendingQueue`]. Each row is a
//! mutating request recorded while offline: method, backend path and optional
//! JSON body. The AUTOINCREMENT id fixes replay order.
//!
//! Rows whose method or body cannot be decoded are skipped on read with a
//! warning; they could never be replayed and are dropped by the next clear.

use crate::client::local_db::{LocalDatabase, Result};
use crate::client::offline::queue::{ActionMethod, ActionPayload, JsonObject, PendingAction};
use sqlx::Row;

fn encode_body(body: &Option<JsonObject>) -> Result<Option<String>> {
    body.as_ref()
        .map(|b| {
            serde_json::to_string(b)
                .map_err(|e| sqlx::Error::Protocol(format!("JSON serialization error: {}", e)))
        })
        .transpose()
}

impl LocalDatabase {
    /// Append an action and return its assigned id
    pub async fn append_pending(&self, method: ActionMethod, payload: &ActionPayload) -> Result<i64> {
        let body = encode_body(&payload.body)?;

        let result = sqlx::query(
            "INSERT INTO pending (method, url, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(method.as_str())
        .bind(&payload.url)
        .bind(body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All pending actions, ascending by id
    pub async fn list_pending(&self) -> Result<Vec<PendingAction>> {
        let rows = sqlx::query("SELECT id, method, url, body, created_at FROM pending ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut actions = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let method: String = row.try_get("method")?;
            let body: Option<String> = row.try_get("body")?;

            let method = match method.parse::<ActionMethod>() {
                Ok(method) => method,
                Err(_) => {
                    tracing::warn!(id, %method, "Skipping pending action with unknown method");
                    continue;
                }
            };

            let body = match body.as_deref().map(serde_json::from_str::<JsonObject>).transpose() {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(id, error = %e, "Skipping pending action with malformed body");
                    continue;
                }
            };

            actions.push(PendingAction {
                id,
                method,
                payload: ActionPayload {
                    url: row.try_get("url")?,
                    body,
                },
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(actions)
    }

    /// Replace the payload of an action, keeping its id and position
    ///
    /// Returns `false` when no action has that id.
    pub async fn replace_pending(&self, id: i64, payload: &ActionPayload) -> Result<bool> {
        let body = encode_body(&payload.body)?;

        let result = sqlx::query("UPDATE pending SET url = ?, body = ? WHERE id = ?")
            .bind(&payload.url)
            .bind(body)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete the given actions in one transaction
    pub async fn remove_pending(&self, ids: &[i64]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for id in ids {
            removed += sqlx::query("DELETE FROM pending WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }

    /// Delete every pending action
    pub async fn clear_pending(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count_pending(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
