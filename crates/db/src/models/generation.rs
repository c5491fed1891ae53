//! Generation entity, create DTO, and the typed lifecycle patch.
//!
//! The orchestrator never writes a full row. Every mutation goes through
//! [`GenerationPatch`], whose constructors encode the legal state-machine
//! transitions: which fields accompany entering running, succeeded, and
//! failed is decided here, in one place.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use lumen_core::error_code::{classify_error, GenerationErrorCode};
use lumen_core::generation::{GenerationKind, GenerationStatus, PROGRESS_COMPLETE};
use lumen_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Generation {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub prompt: String,
    pub model: String,
    pub status: String,
    pub progress: Option<f64>,
    pub started_at: Option<Timestamp>,
    pub elapsed_seconds: Option<i64>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub provider_task_id: Option<String>,
    pub provider_result_url: Option<String>,
    pub reference_file_ids: Json<Vec<DbId>>,
    pub image_size: Option<String>,
    pub aspect_ratio: Option<String>,
    pub duration_secs: Option<i32>,
    pub video_size: Option<String>,
    pub output_file_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Generation {
    /// Typed view of the `kind` column.
    pub fn kind(&self) -> Result<GenerationKind, lumen_core::error::CoreError> {
        GenerationKind::parse(&self.kind)
    }

    /// Typed view of the `status` column.
    pub fn status(&self) -> Result<GenerationStatus, lumen_core::error::CoreError> {
        GenerationStatus::parse(&self.status)
    }

    /// Whether the row already reached succeeded or failed.
    pub fn is_terminal(&self) -> bool {
        self.status().map(|s| s.is_terminal()).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Insert payload for the external submission path. Rows always start in
/// `queued`; lifecycle fields are owned by the orchestrator afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGeneration {
    pub user_id: DbId,
    pub kind: GenerationKind,
    pub prompt: String,
    pub model: String,
    pub reference_file_ids: Vec<DbId>,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
    pub video_size: Option<String>,
    pub duration_secs: Option<i32>,
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Typed partial update for a generation row. `None` fields are left
/// untouched; `updated_at` is always refreshed by the repository.
#[derive(Debug, Clone, Default)]
pub struct GenerationPatch {
    pub status: Option<GenerationStatus>,
    pub progress: Option<f64>,
    pub started_at: Option<Timestamp>,
    pub elapsed_seconds: Option<i64>,
    pub error: Option<String>,
    pub error_code: Option<GenerationErrorCode>,
    pub provider_task_id: Option<String>,
    pub provider_result_url: Option<String>,
    pub output_file_id: Option<DbId>,
}

impl GenerationPatch {
    /// Transition into `running`, stamping `started_at` only on the first
    /// entry (pass the row's current value).
    pub fn begin_running(current_started_at: Option<Timestamp>, now: Timestamp) -> Self {
        Self {
            status: Some(GenerationStatus::Running),
            started_at: if current_started_at.is_none() {
                Some(now)
            } else {
                None
            },
            ..Self::default()
        }
    }

    /// Record the provider-assigned task handle after submission, resetting
    /// progress to zero for the poll loop.
    pub fn task_submitted(task_id: String) -> Self {
        Self {
            provider_task_id: Some(task_id),
            progress: Some(0.0),
            ..Self::default()
        }
    }

    /// Persist a provider-reported progress value.
    pub fn progress(value: f64) -> Self {
        Self {
            progress: Some(value),
            ..Self::default()
        }
    }

    /// Persist a transient poll error as a diagnostic without failing the
    /// job; the status is left untouched.
    pub fn diagnostic_error(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }

    /// Terminal success: output reference, diagnostic URL, full progress.
    pub fn succeeded(
        output_file_id: DbId,
        result_url: String,
        elapsed_seconds: Option<i64>,
    ) -> Self {
        Self {
            status: Some(GenerationStatus::Succeeded),
            progress: Some(PROGRESS_COMPLETE),
            output_file_id: Some(output_file_id),
            provider_result_url: Some(result_url),
            elapsed_seconds,
            ..Self::default()
        }
    }

    /// Terminal failure. When no explicit code is supplied, one is derived
    /// by classifying the message text.
    pub fn failed(
        message: String,
        code: Option<GenerationErrorCode>,
        elapsed_seconds: Option<i64>,
    ) -> Self {
        let code = code.unwrap_or_else(|| classify_error(&message));
        Self {
            status: Some(GenerationStatus::Failed),
            error: Some(message),
            error_code: Some(code),
            elapsed_seconds,
            ..Self::default()
        }
    }

    /// Column names this patch would update, in binding order. The
    /// repository builds its UPDATE statement from this list.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut cols = Vec::new();
        if self.status.is_some() {
            cols.push("status");
        }
        if self.progress.is_some() {
            cols.push("progress");
        }
        if self.started_at.is_some() {
            cols.push("started_at");
        }
        if self.elapsed_seconds.is_some() {
            cols.push("elapsed_seconds");
        }
        if self.error.is_some() {
            cols.push("error");
        }
        if self.error_code.is_some() {
            cols.push("error_code");
        }
        if self.provider_task_id.is_some() {
            cols.push("provider_task_id");
        }
        if self.provider_result_url.is_some() {
            cols.push("provider_result_url");
        }
        if self.output_file_id.is_some() {
            cols.push("output_file_id");
        }
        cols
    }

    /// True when the patch carries nothing to write.
    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn begin_running_stamps_started_at_once() {
        let now = Utc::now();
        let first = GenerationPatch::begin_running(None, now);
        assert_eq!(first.status, Some(GenerationStatus::Running));
        assert_eq!(first.started_at, Some(now));

        let again = GenerationPatch::begin_running(Some(now - Duration::seconds(10)), now);
        assert_eq!(again.status, Some(GenerationStatus::Running));
        assert!(again.started_at.is_none());
    }

    #[test]
    fn succeeded_patch_carries_output_not_error() {
        let patch = GenerationPatch::succeeded(7, "https://cdn/out.png".into(), Some(12));
        assert_eq!(patch.status, Some(GenerationStatus::Succeeded));
        assert_eq!(patch.progress, Some(PROGRESS_COMPLETE));
        assert_eq!(patch.output_file_id, Some(7));
        assert_eq!(patch.elapsed_seconds, Some(12));
        assert!(patch.error.is_none());
        assert!(patch.error_code.is_none());
    }

    #[test]
    fn failed_patch_carries_error_not_output() {
        let patch = GenerationPatch::failed("connection refused".into(), None, Some(3));
        assert_eq!(patch.status, Some(GenerationStatus::Failed));
        assert_eq!(patch.error.as_deref(), Some("connection refused"));
        assert_eq!(patch.error_code, Some(GenerationErrorCode::NetworkError));
        assert!(patch.output_file_id.is_none());
    }

    #[test]
    fn failed_patch_honors_explicit_code() {
        let patch = GenerationPatch::failed(
            "video generation is not available here".into(),
            Some(GenerationErrorCode::UnsupportedFeature),
            None,
        );
        assert_eq!(patch.error_code, Some(GenerationErrorCode::UnsupportedFeature));
        assert!(patch.elapsed_seconds.is_none());
    }

    #[test]
    fn task_submitted_resets_progress() {
        let patch = GenerationPatch::task_submitted("task-123".into());
        assert_eq!(patch.provider_task_id.as_deref(), Some("task-123"));
        assert_eq!(patch.progress, Some(0.0));
        assert!(patch.status.is_none());
    }

    #[test]
    fn diagnostic_error_leaves_status_untouched() {
        let patch = GenerationPatch::diagnostic_error("poll hiccup".into());
        assert!(patch.status.is_none());
        assert_eq!(patch.columns(), vec!["error"]);
    }

    #[test]
    fn columns_track_set_fields_in_binding_order() {
        let patch = GenerationPatch::succeeded(1, "u".into(), Some(2));
        assert_eq!(
            patch.columns(),
            vec![
                "status",
                "progress",
                "elapsed_seconds",
                "provider_result_url",
                "output_file_id"
            ]
        );
    }

    #[test]
    fn empty_patch_reports_empty() {
        assert!(GenerationPatch::default().is_empty());
        assert!(!GenerationPatch::progress(5.0).is_empty());
    }
}
