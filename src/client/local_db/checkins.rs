//! Cached check-ins keyed by `id_checkin`.

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::models::CheckIn;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

pub(crate) async fn upsert_checkin<'e, E>(executor: E, checkin: &CheckIn) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT OR REPLACE INTO checkins (id_checkin, id_inscricao, data_checkin, sync_pending)
         VALUES (?, ?, ?, ?)",
    )
    .bind(checkin.id_checkin)
    .bind(checkin.id_inscricao)
    .bind(&checkin.data_checkin)
    .bind(checkin.sync_pending)
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_checkin(row: &SqliteRow) -> Result<CheckIn> {
    Ok(CheckIn {
        id_checkin: row.try_get("id_checkin")?,
        id_inscricao: row.try_get("id_inscricao")?,
        data_checkin: row.try_get("data_checkin")?,
        sync_pending: row.try_get("sync_pending")?,
    })
}

impl LocalDatabase {
    pub async fn put_checkin(&self, checkin: &CheckIn) -> Result<()> {
        upsert_checkin(&self.pool, checkin).await
    }

    pub async fn put_checkins(&self, checkins: &[CheckIn]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for checkin in checkins {
            upsert_checkin(&mut *tx, checkin).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_checkins(&self) -> Result<Vec<CheckIn>> {
        let rows = sqlx::query(
            "SELECT id_checkin, id_inscricao, data_checkin, sync_pending
             FROM checkins ORDER BY id_checkin ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_checkin).collect()
    }

    /// Check-ins recorded for one registration
    pub async fn get_registration_checkins(&self, id_inscricao: i64) -> Result<Vec<CheckIn>> {
        let rows = sqlx::query(
            "SELECT id_checkin, id_inscricao, data_checkin, sync_pending
             FROM checkins WHERE id_inscricao = ? ORDER BY id_checkin ASC",
        )
        .bind(id_inscricao)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_checkin).collect()
    }

    pub async fn delete_checkin(&self, id_checkin: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM checkins WHERE id_checkin = ?")
            .bind(id_checkin)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the optimistic check-ins of a registration as accepted by the server
    pub async fn confirm_checkins(&self, id_inscricao: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE checkins SET sync_pending = 0 WHERE id_inscricao = ? AND sync_pending = 1",
        )
        .bind(id_inscricao)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
