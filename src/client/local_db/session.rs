//! Durable session slots. The sync core only reads the bearer token; the
//! application shell writes it after login and clears it on logout.

use crate::client::local_db::{LocalDatabase, Result};
use sqlx::Row;

/// Slot holding the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

impl LocalDatabase {
    pub async fn set_session_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO session (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_session_value(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM session WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    pub async fn remove_session_value(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Bearer token, if one is stored and non-empty
    pub async fn auth_token(&self) -> Result<Option<String>> {
        Ok(self
            .get_session_value(AUTH_TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty()))
    }

    pub async fn set_auth_token(&self, token: &str) -> Result<()> {
        self.set_session_value(AUTH_TOKEN_KEY, token).await
    }

    pub async fn clear_auth_token(&self) -> Result<()> {
        self.remove_session_value(AUTH_TOKEN_KEY).await
    }
}
