//! Local-filesystem file store backed by the `files` table.

use std::path::{Path, PathBuf};

use lumen_core::types::DbId;
use lumen_db::models::file::{FileRecord, NewFile};
use lumen_db::repositories::FileRepo;
use lumen_db::DbPool;

use crate::mime;

/// Errors from the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the storage root failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The `files` row could not be written or read.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Writes assets under a single storage root and records each one in the
/// `files` table. Paths stored in rows are relative to the root, so the
/// root can move between deployments.
pub struct FileStorage {
    root: PathBuf,
    pool: DbPool,
}

impl FileStorage {
    /// Create a store rooted at `root`. Call [`ensure_root`](Self::ensure_root)
    /// once at startup before saving anything.
    pub fn new(root: impl Into<PathBuf>, pool: DbPool) -> Self {
        Self {
            root: root.into(),
            pool,
        }
    }

    /// Create the storage root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Persist a byte buffer as a new stored file.
    ///
    /// The filename is `<token>.<ext>` with the extension inferred from the
    /// MIME type; the token doubles as the row's public token.
    pub async fn save_bytes(
        &self,
        user_id: DbId,
        purpose: &str,
        mime_type: &str,
        original_name: &str,
        bytes: &[u8],
        persistent: bool,
    ) -> Result<FileRecord, StorageError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let filename = format!("{token}.{}", mime::extension_for(mime_type));

        tokio::fs::write(self.root.join(&filename), bytes).await?;

        let record = FileRepo::create(
            &self.pool,
            &NewFile {
                user_id,
                purpose: purpose.to_string(),
                mime_type: mime_type.to_string(),
                original_name: (!original_name.is_empty()).then(|| original_name.to_string()),
                path: filename,
                persistent,
                public_token: token,
            },
        )
        .await?;

        tracing::debug!(
            file_id = record.id,
            user_id,
            purpose,
            size = bytes.len(),
            "Stored file"
        );

        Ok(record)
    }

    /// Read a stored file's bytes back from disk.
    pub async fn read_bytes(&self, record: &FileRecord) -> Result<Vec<u8>, StorageError> {
        Ok(tokio::fs::read(self.absolute_path(record)).await?)
    }

    /// Absolute on-disk path of a stored file.
    pub fn absolute_path(&self, record: &FileRecord) -> PathBuf {
        self.root.join(Path::new(&record.path))
    }
}
