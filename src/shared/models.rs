//! Domain records cached by the client
//!
//! Server-shaped entities (field names follow the backend JSON) plus the request
//! shapes used by the mutating operations. Every cached entity may carry
//! `syncPending` to mark a locally originated record the server has not confirmed.

use serde::{Deserialize, Deserializer, Serialize};

/// Registration status: cancelled
pub const REGISTRATION_CANCELLED: i64 = 0;
/// Registration status: active
pub const REGISTRATION_ACTIVE: i64 = 1;

/// Cached user record, keyed by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub nome: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(rename = "syncPending", default)]
    pub sync_pending: bool,
}

/// Cached event record, keyed by `id_evento`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id_evento: i64,
    pub titulo: String,
    pub data_inicio: String,
    pub data_fim: String,
    #[serde(default)]
    pub local: String,
}

/// Cached registration record, keyed by `id_inscricao`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id_inscricao: i64,
    pub id_usuario: i64,
    pub id_evento: i64,
    #[serde(default)]
    pub data_inscricao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_cancelamento: Option<String>,
    #[serde(default = "active_status", deserialize_with = "status_from_json")]
    pub status: i64,
    #[serde(rename = "syncPending", default)]
    pub sync_pending: bool,
}

/// Cached check-in record, keyed by `id_checkin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id_checkin: i64,
    pub id_inscricao: i64,
    pub data_checkin: String,
    #[serde(rename = "syncPending", default)]
    pub sync_pending: bool,
}

/// Fields for creating a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub nome: String,
    pub email: String,
    pub senha: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
}

/// Partial user update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
}

impl User {
    /// Build a cached user from creation fields
    pub fn from_new(id: i64, new_user: &NewUser, sync_pending: bool) -> Self {
        Self {
            id,
            nome: new_user.nome.clone(),
            email: new_user.email.clone(),
            senha: Some(new_user.senha.clone()),
            is_admin: new_user.is_admin,
            cpf: new_user.cpf.clone(),
            telefone: new_user.telefone.clone(),
            sync_pending,
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: &UserUpdate) {
        if let Some(nome) = &update.nome {
            self.nome = nome.clone();
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(senha) = &update.senha {
            self.senha = Some(senha.clone());
        }
    }
}

impl Registration {
    /// Whether the registration has not been cancelled
    pub fn is_active(&self) -> bool {
        self.status == REGISTRATION_ACTIVE
    }
}

fn active_status() -> i64 {
    REGISTRATION_ACTIVE
}

/// The backend sends the status as `0`/`1`, as a boolean, or as a numeric string.
fn status_from_json<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(active) => i64::from(active),
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(REGISTRATION_ACTIVE),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(REGISTRATION_ACTIVE),
        _ => REGISTRATION_ACTIVE,
    })
}
