//! Per-user provider credential row.

use serde::Serialize;
use sqlx::FromRow;

use lumen_core::types::{DbId, Timestamp};

/// A user's provider override. When no row exists the system defaults
/// apply. `api_key_enc` is AES-256-GCM ciphertext; decryption happens in
/// the jobs crate, never here.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProvider {
    pub user_id: DbId,
    pub provider_host: String,
    #[serde(skip_serializing)]
    pub api_key_enc: Option<String>,
    pub updated_at: Timestamp,
}
