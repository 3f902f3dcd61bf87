//! Cached events keyed by `id_evento`. Events are only ever written from server
//! data; the offline handlers never create them.

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::models::Event;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

pub(crate) async fn upsert_event<'e, E>(executor: E, event: &Event) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT OR REPLACE INTO events (id_evento, titulo, data_inicio, data_fim, local)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(event.id_evento)
    .bind(&event.titulo)
    .bind(&event.data_inicio)
    .bind(&event.data_fim)
    .bind(&event.local)
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_event(row: &SqliteRow) -> Result<Event> {
    Ok(Event {
        id_evento: row.try_get("id_evento")?,
        titulo: row.try_get("titulo")?,
        data_inicio: row.try_get("data_inicio")?,
        data_fim: row.try_get("data_fim")?,
        local: row.try_get("local")?,
    })
}

impl LocalDatabase {
    pub async fn put_event(&self, event: &Event) -> Result<()> {
        upsert_event(&self.pool, event).await
    }

    pub async fn put_events(&self, events: &[Event]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for event in events {
            upsert_event(&mut *tx, event).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// All cached events, earliest start first
    pub async fn get_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id_evento, titulo, data_inicio, data_fim, local
             FROM events ORDER BY data_inicio ASC, id_evento ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }

    pub async fn get_event(&self, id_evento: i64) -> Result<Option<Event>> {
        let row = sqlx::query(
            "SELECT id_evento, titulo, data_inicio, data_fim, local
             FROM events WHERE id_evento = ?",
        )
        .bind(id_evento)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_event).transpose()
    }

    pub async fn delete_event(&self, id_evento: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id_evento = ?")
            .bind(id_evento)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
