//! The uniform provider contract: request shape, submit/poll outcomes, and
//! the adapter trait.

use async_trait::async_trait;

use lumen_core::error_code::GenerationErrorCode;
use lumen_core::generation::GenerationKind;

/// Default failure text when a provider reports neither an error nor a
/// message with a failed task.
pub const GENERIC_FAILURE_MESSAGE: &str = "The provider reported the task as failed";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Provider-agnostic generation request built by the protocol engine.
///
/// `references` are either `data:<mime>;base64,` URLs (always, for the
/// synchronous image provider) or opaque URLs the task-queue provider can
/// fetch itself. The engine caps the list to the kind's maximum before the
/// adapter ever sees it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
    pub video_size: Option<String>,
    pub duration_secs: Option<i32>,
    pub references: Vec<String>,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Single error shape at the adapter boundary.
///
/// Adapters never leak provider-internal structured errors; they surface a
/// best-effort message for later classification, plus an explicit code for
/// failures whose class is known before any classification (for example a
/// video request hitting the image-only provider).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub code: Option<GenerationErrorCode>,
}

impl ProviderError {
    /// An error whose code is derived later by classifying the message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// An error with an explicitly chosen taxonomy code.
    pub fn with_code(code: GenerationErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Provider-side task state as reported by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    InProgress,
    Succeeded,
    Failed,
}

/// One observation of a provider task: status, progress, and result
/// references. The first result URL is authoritative.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub task_id: Option<String>,
    pub state: TaskState,
    pub progress: Option<f64>,
    pub result_urls: Vec<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl TaskSnapshot {
    /// The authoritative result reference, when one exists.
    pub fn first_result_url(&self) -> Option<&str> {
        self.result_urls.first().map(String::as_str).filter(|u| !u.is_empty())
    }

    /// Human-readable failure text: `error` first, then `message`, then a
    /// generic default.
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| self.message.clone().filter(|m| !m.is_empty()))
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }
}

/// Result of submitting a generation to a provider.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The provider queued the work; poll with the returned task ID.
    Queued(String),
    /// The provider finished synchronously; no polling needed.
    Completed(TaskSnapshot),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One call-site for both wire styles.
///
/// The synchronous image provider always returns [`SubmitOutcome::Completed`]
/// and never a task ID; the task-queue provider may return either.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Submit a generation request.
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitOutcome, ProviderError>;

    /// Fetch the current state of a previously submitted task.
    async fn fetch_result(&self, task_id: &str) -> Result<TaskSnapshot, ProviderError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: TaskState) -> TaskSnapshot {
        TaskSnapshot {
            task_id: None,
            state,
            progress: None,
            result_urls: Vec::new(),
            error: None,
            message: None,
        }
    }

    #[test]
    fn first_result_url_skips_empty_strings() {
        let mut snap = snapshot(TaskState::Succeeded);
        snap.result_urls = vec!["".to_string()];
        assert_eq!(snap.first_result_url(), None);

        snap.result_urls = vec!["https://cdn/a.png".to_string(), "https://cdn/b.png".to_string()];
        assert_eq!(snap.first_result_url(), Some("https://cdn/a.png"));
    }

    #[test]
    fn failure_message_prefers_error_over_message() {
        let mut snap = snapshot(TaskState::Failed);
        snap.error = Some("quota failed".to_string());
        snap.message = Some("something else".to_string());
        assert_eq!(snap.failure_message(), "quota failed");
    }

    #[test]
    fn failure_message_falls_back_to_message_then_default() {
        let mut snap = snapshot(TaskState::Failed);
        snap.message = Some("the task was rejected".to_string());
        assert_eq!(snap.failure_message(), "the task was rejected");

        snap.message = None;
        assert_eq!(snap.failure_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn empty_error_string_is_treated_as_absent() {
        let mut snap = snapshot(TaskState::Failed);
        snap.error = Some(String::new());
        snap.message = Some("real message".to_string());
        assert_eq!(snap.failure_message(), "real message");
    }
}
