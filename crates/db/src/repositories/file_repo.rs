//! Repository for the `files` table.

use sqlx::PgPool;

use lumen_core::types::DbId;

use crate::models::file::{FileRecord, NewFile};

/// Column list for `files` queries.
const COLUMNS: &str = "\
    id, user_id, purpose, mime_type, original_name, path, \
    persistent, public_token, created_at";

/// Provides CRUD operations for stored files.
pub struct FileRepo;

impl FileRepo {
    /// Insert a new file row.
    pub async fn create(pool: &PgPool, input: &NewFile) -> Result<FileRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO files \
                 (user_id, purpose, mime_type, original_name, path, persistent, public_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FileRecord>(&query)
            .bind(input.user_id)
            .bind(&input.purpose)
            .bind(&input.mime_type)
            .bind(&input.original_name)
            .bind(&input.path)
            .bind(input.persistent)
            .bind(&input.public_token)
            .fetch_one(pool)
            .await
    }

    /// Find a file by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FileRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM files WHERE id = $1");
        sqlx::query_as::<_, FileRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
