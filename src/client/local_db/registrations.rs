//! # Local Registration Operations
//!
//! Cached registrations keyed by `id_inscricao`, plus the per-event view the
//! check-in screen renders while offline.

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::models::Registration;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

pub(crate) async fn upsert_registration<'e, E>(executor: E, registration: &Registration) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT OR REPLACE INTO registrations (
            id_inscricao, id_usuario, id_evento, data_inscricao,
            data_cancelamento, status, sync_pending
        ) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(registration.id_inscricao)
    .bind(registration.id_usuario)
    .bind(registration.id_evento)
    .bind(&registration.data_inscricao)
    .bind(&registration.data_cancelamento)
    .bind(registration.status)
    .bind(registration.sync_pending)
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_registration(row: &SqliteRow) -> Result<Registration> {
    Ok(Registration {
        id_inscricao: row.try_get("id_inscricao")?,
        id_usuario: row.try_get("id_usuario")?,
        id_evento: row.try_get("id_evento")?,
        data_inscricao: row.try_get("data_inscricao")?,
        data_cancelamento: row.try_get("data_cancelamento")?,
        status: row.try_get("status")?,
        sync_pending: row.try_get("sync_pending")?,
    })
}

const SELECT_REGISTRATIONS: &str = "SELECT id_inscricao, id_usuario, id_evento, data_inscricao,
        data_cancelamento, status, sync_pending
 FROM registrations";

impl LocalDatabase {
    pub async fn put_registration(&self, registration: &Registration) -> Result<()> {
        upsert_registration(&self.pool, registration).await
    }

    pub async fn put_registrations(&self, registrations: &[Registration]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for registration in registrations {
            upsert_registration(&mut *tx, registration).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_registrations(&self) -> Result<Vec<Registration>> {
        let rows = sqlx::query(&format!("{} ORDER BY id_inscricao ASC", SELECT_REGISTRATIONS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_registration).collect()
    }

    /// Registrations of one event
    pub async fn get_event_registrations(&self, id_evento: i64) -> Result<Vec<Registration>> {
        let rows = sqlx::query(&format!(
            "{} WHERE id_evento = ? ORDER BY id_inscricao ASC",
            SELECT_REGISTRATIONS
        ))
        .bind(id_evento)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_registration).collect()
    }

    pub async fn get_registration(&self, id_inscricao: i64) -> Result<Option<Registration>> {
        let row = sqlx::query(&format!("{} WHERE id_inscricao = ?", SELECT_REGISTRATIONS))
            .bind(id_inscricao)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_registration).transpose()
    }

    pub async fn delete_registration(&self, id_inscricao: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM registrations WHERE id_inscricao = ?")
            .bind(id_inscricao)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Re-key an optimistic registration to its server id and mark it confirmed
    ///
    /// Cached check-ins pointing at the placeholder follow along.
    pub async fn resolve_registration_placeholder(&self, placeholder: i64, real_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE OR REPLACE registrations SET id_inscricao = ?, sync_pending = 0
             WHERE id_inscricao = ?",
        )
        .bind(real_id)
        .bind(placeholder)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE checkins SET id_inscricao = ? WHERE id_inscricao = ?")
            .bind(real_id)
            .bind(placeholder)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
