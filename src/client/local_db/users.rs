//! # Local User Operations
//!
//! Cached users keyed by `id`. Optimistic rows created offline are keyed by a
//! placeholder id until the reconciler learns the server id and re-keys them.

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::models::User;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

pub(crate) async fn upsert_user<'e, E>(executor: E, user: &User) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT OR REPLACE INTO users (id, nome, email, senha, is_admin, cpf, telefone, sync_pending)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(&user.nome)
    .bind(&user.email)
    .bind(&user.senha)
    .bind(user.is_admin)
    .bind(&user.cpf)
    .bind(&user.telefone)
    .bind(user.sync_pending)
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        nome: row.try_get("nome")?,
        email: row.try_get("email")?,
        senha: row.try_get("senha")?,
        is_admin: row.try_get("is_admin")?,
        cpf: row.try_get("cpf")?,
        telefone: row.try_get("telefone")?,
        sync_pending: row.try_get("sync_pending")?,
    })
}

impl LocalDatabase {
    /// Upsert a user by id
    pub async fn put_user(&self, user: &User) -> Result<()> {
        upsert_user(&self.pool, user).await
    }

    /// Upsert several users in one transaction
    pub async fn put_users(&self, users: &[User]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for user in users {
            upsert_user(&mut *tx, user).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// All cached users
    pub async fn get_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, nome, email, senha, is_admin, cpf, telefone, sync_pending
             FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    /// A single cached user
    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, nome, email, senha, is_admin, cpf, telefone, sync_pending
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Remove a cached user
    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Re-key an optimistic user to its server id and mark it confirmed
    ///
    /// Cached registrations pointing at the placeholder follow along. A row
    /// already stored under the real id is replaced.
    pub async fn resolve_user_placeholder(&self, placeholder: i64, real_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE OR REPLACE users SET id = ?, sync_pending = 0 WHERE id = ?")
            .bind(real_id)
            .bind(placeholder)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE registrations SET id_usuario = ? WHERE id_usuario = ?")
            .bind(real_id)
            .bind(placeholder)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
