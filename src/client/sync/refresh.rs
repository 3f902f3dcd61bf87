//! # Cache Refresh
//!
//! Pulls the server's view of events, registrations, check-ins and users and
//! swaps it into the local store in one transaction. Registrations are fetched
//! per event and check-ins per registration, concurrently.
//!
//! Callers must only refresh while the pending queue is empty; the snapshot
//! replaces optimistic rows that have not reached the server yet.

use crate::client::api::ApiClient;
use crate::client::local_db::LocalDatabase;
use crate::shared::error::Result;
use crate::shared::models::{CheckIn, Event, Registration, User};
use futures_util::future::try_join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Entity counts written by one refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub users: usize,
    pub events: usize,
    pub registrations: usize,
    pub checkins: usize,
}

/// Decode a listing sent either as a bare array or wrapped under `key` or `data`
fn decode_list<T: DeserializeOwned>(value: Option<Value>, key: &str) -> Result<Vec<T>> {
    let list = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => Value::Array(items),
        Some(Value::Object(mut map)) => match map.remove(key).or_else(|| map.remove("data")) {
            Some(list @ Value::Array(_)) => list,
            _ => {
                tracing::warn!(key, "Listing response has no array, treating as empty");
                return Ok(Vec::new());
            }
        },
        Some(other) => {
            tracing::warn!(key, kind = ?other, "Unexpected listing response, treating as empty");
            return Ok(Vec::new());
        }
    };
    Ok(serde_json::from_value(list)?)
}

async fn fetch_list<T: DeserializeOwned>(
    api: &ApiClient,
    path: String,
    key: &str,
    token: Option<&str>,
) -> Result<Vec<T>> {
    let value = api.send(reqwest::Method::GET, &path, None, token).await?;
    decode_list(value, key)
}

/// Download a full snapshot and replace the cached entities with it
pub async fn refresh_local_cache(api: &ApiClient, db: &LocalDatabase) -> Result<RefreshReport> {
    let token = db.auth_token().await?;
    let token = token.as_deref();

    let events: Vec<Event> = fetch_list(api, "/eventos".to_string(), "eventos", token).await?;

    let registrations: Vec<Registration> = try_join_all(events.iter().map(|event| {
        fetch_list::<Registration>(
            api,
            format!("/eventos/{}/inscricoes", event.id_evento),
            "inscricoes",
            token,
        )
    }))
    .await?
    .into_iter()
    .flatten()
    .collect();

    let checkins: Vec<CheckIn> = try_join_all(registrations.iter().map(|registration| {
        fetch_list::<CheckIn>(
            api,
            format!("/checkins/{}", registration.id_inscricao),
            "checkins",
            token,
        )
    }))
    .await?
    .into_iter()
    .flatten()
    .collect();

    let users: Vec<User> = fetch_list(api, "/usuarios".to_string(), "usuarios", token).await?;

    db.replace_snapshot(&users, &events, &registrations, &checkins)
        .await?;

    let report = RefreshReport {
        users: users.len(),
        events: events.len(),
        registrations: registrations.len(),
        checkins: checkins.len(),
    };
    tracing::info!(
        users = report.users,
        events = report.events,
        registrations = report.registrations,
        checkins = report.checkins,
        "Local cache refreshed"
    );

    Ok(report)
}
