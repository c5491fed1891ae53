//! Stored file row.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use lumen_core::types::{DbId, Timestamp};

/// A row from the `files` table. `path` is relative to the storage root.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub purpose: String,
    pub mime_type: String,
    pub original_name: Option<String>,
    #[serde(skip_serializing)]
    pub path: String,
    pub persistent: bool,
    #[serde(skip_serializing)]
    pub public_token: String,
    pub created_at: Timestamp,
}

/// Insert payload for a new file row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFile {
    pub user_id: DbId,
    pub purpose: String,
    pub mime_type: String,
    pub original_name: Option<String>,
    pub path: String,
    pub persistent: bool,
    pub public_token: String,
}
