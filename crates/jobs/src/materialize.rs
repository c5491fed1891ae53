//! Result materialization: provider output → durable stored file.
//!
//! A provider result is either a remote URL to download or an inline
//! `data:<mime>;base64,` payload. Both end up as bytes handed to the
//! file-storage collaborator under the `generation-output` purpose tag.

use std::time::Duration;

use lumen_core::data_url;
use lumen_core::error_code::GenerationErrorCode;
use lumen_core::types::DbId;
use lumen_db::models::file::FileRecord;
use lumen_storage::{FileStorage, StorageError};

/// Purpose tag on every materialized generation output.
pub(crate) const OUTPUT_PURPOSE: &str = "generation-output";

/// Download timeout floor; large video results need more headroom than the
/// job's poll budget alone would give.
const MIN_FETCH_TIMEOUT_SECS: i64 = 120;

/// MIME type assumed when the download response carries none.
const FALLBACK_MIME: &str = "application/octet-stream";

/// Errors from materializing a provider result.
#[derive(Debug, thiserror::Error)]
pub(crate) enum MaterializeError {
    /// Downloading the remote result failed (transport or non-2xx).
    #[error("Failed to download the result: {0}")]
    Fetch(String),

    /// An inline payload could not be decoded.
    #[error("Invalid result payload: {0}")]
    Payload(String),

    /// Writing the bytes or the file row failed.
    #[error("Failed to store the result: {0}")]
    Store(#[from] StorageError),
}

impl MaterializeError {
    /// Taxonomy code for a terminal failure caused by this error.
    pub(crate) fn code(&self) -> GenerationErrorCode {
        match self {
            Self::Fetch(_) => GenerationErrorCode::NetworkError,
            Self::Payload(_) => GenerationErrorCode::InvalidRequest,
            Self::Store(_) => GenerationErrorCode::ApiError,
        }
    }
}

/// Turn a provider result reference into a stored file.
///
/// `timeout_secs` is the job's resolved timeout; downloads get at least
/// [`MIN_FETCH_TIMEOUT_SECS`] regardless.
pub(crate) async fn materialize(
    storage: &FileStorage,
    user_id: DbId,
    url: &str,
    timeout_secs: i64,
) -> Result<FileRecord, MaterializeError> {
    let (mime_type, bytes) = if data_url::is_data_url(url) {
        data_url::decode(url).map_err(|e| MaterializeError::Payload(e.to_string()))?
    } else {
        fetch_remote(url, timeout_secs).await?
    };

    tracing::debug!(user_id, size = bytes.len(), mime_type = %mime_type, "Materializing result");

    Ok(storage
        .save_bytes(user_id, OUTPUT_PURPOSE, &mime_type, "", &bytes, false)
        .await?)
}

/// Download a remote result, failing closed on any non-2xx status.
async fn fetch_remote(url: &str, timeout_secs: i64) -> Result<(String, Vec<u8>), MaterializeError> {
    let timeout = Duration::from_secs(timeout_secs.max(MIN_FETCH_TIMEOUT_SECS) as u64);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MaterializeError::Fetch(e.to_string()))?;

    tracing::debug!(%url, "Downloading result");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MaterializeError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MaterializeError::Fetch(format!("HTTP {}", status.as_u16())));
    }

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(FALLBACK_MIME)
        .to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MaterializeError::Fetch(e.to_string()))?
        .to_vec();

    Ok((mime_type, bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_failure_class() {
        assert_eq!(
            MaterializeError::Fetch("HTTP 404".into()).code(),
            GenerationErrorCode::NetworkError
        );
        assert_eq!(
            MaterializeError::Payload("bad base64".into()).code(),
            GenerationErrorCode::InvalidRequest
        );
    }
}
