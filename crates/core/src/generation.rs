//! Generation lifecycle: kind, status state machine, reference caps, and
//! elapsed-time computation.
//!
//! The status machine is deliberately strict: a job moves queued → running →
//! {succeeded, failed} and nothing ever leaves a terminal state. The
//! orchestrator builds its row patches from these rules.

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of reference files an image generation may carry.
pub const MAX_IMAGE_REFERENCES: usize = 14;

/// Maximum number of reference files a video generation may carry.
pub const MAX_VIDEO_REFERENCES: usize = 1;

/// Progress value stamped on a successful terminal transition.
pub const PROGRESS_COMPLETE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What the provider is being asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Video,
}

impl GenerationKind {
    /// Database / wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Parse from the database `kind` column.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(CoreError::Validation(format!(
                "Unknown generation kind '{other}'. Must be one of: image, video"
            ))),
        }
    }

    /// Upper bound on reference files for this kind.
    pub fn max_references(self) -> usize {
        match self {
            Self::Image => MAX_IMAGE_REFERENCES,
            Self::Video => MAX_VIDEO_REFERENCES,
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl GenerationStatus {
    /// Database / wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database `status` column.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown generation status '{other}'. \
                 Must be one of: queued, running, succeeded, failed"
            ))),
        }
    }

    /// Succeeded and failed are terminal; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Transitions are monotonic: queued → running → {succeeded, failed}.
    /// Re-entering the current non-terminal state is allowed (the engine
    /// re-stamps `running` idempotently after a restart).
    pub fn can_transition_to(self, next: GenerationStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Running) => true,
            (Self::Running, Self::Running) => true,
            (Self::Running, Self::Succeeded | Self::Failed) => true,
            // Direct queued → failed covers submissions rejected before the
            // job ever entered running (e.g. the row was mutated externally).
            (Self::Queued, Self::Failed) => true,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Elapsed time
// ---------------------------------------------------------------------------

/// Whole seconds between `started_at` and `now`, clamped at zero.
///
/// Returns `None` when the job never recorded a start time, in which case
/// the terminal patch omits the field entirely.
pub fn elapsed_seconds(started_at: Option<Timestamp>, now: Timestamp) -> Option<i64> {
    started_at.map(|t| (now - t).num_seconds().max(0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    // -- Kind --

    #[test]
    fn kind_parse_roundtrip() {
        assert_eq!(GenerationKind::parse("image").unwrap(), GenerationKind::Image);
        assert_eq!(GenerationKind::parse("video").unwrap(), GenerationKind::Video);
        assert!(GenerationKind::parse("audio").is_err());
    }

    #[test]
    fn kind_reference_caps() {
        assert_eq!(GenerationKind::Image.max_references(), 14);
        assert_eq!(GenerationKind::Video.max_references(), 1);
    }

    // -- Status machine --

    #[test]
    fn status_parse_roundtrip() {
        for status in [
            GenerationStatus::Queued,
            GenerationStatus::Running,
            GenerationStatus::Succeeded,
            GenerationStatus::Failed,
        ] {
            assert_eq!(GenerationStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(GenerationStatus::parse("cancelled").is_err());
    }

    #[test]
    fn queued_moves_to_running() {
        assert!(GenerationStatus::Queued.can_transition_to(GenerationStatus::Running));
    }

    #[test]
    fn running_reaches_both_terminals() {
        assert!(GenerationStatus::Running.can_transition_to(GenerationStatus::Succeeded));
        assert!(GenerationStatus::Running.can_transition_to(GenerationStatus::Failed));
    }

    #[test]
    fn running_restamp_is_legal() {
        assert!(GenerationStatus::Running.can_transition_to(GenerationStatus::Running));
    }

    #[test]
    fn no_transition_leaves_a_terminal_state() {
        for terminal in [GenerationStatus::Succeeded, GenerationStatus::Failed] {
            for next in [
                GenerationStatus::Queued,
                GenerationStatus::Running,
                GenerationStatus::Succeeded,
                GenerationStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal:?} -> {next:?}");
            }
        }
    }

    #[test]
    fn no_status_regresses_to_queued() {
        for status in [
            GenerationStatus::Running,
            GenerationStatus::Succeeded,
            GenerationStatus::Failed,
        ] {
            assert!(!status.can_transition_to(GenerationStatus::Queued));
        }
    }

    // -- Elapsed --

    #[test]
    fn elapsed_whole_seconds() {
        let now = Utc::now();
        let started = now - Duration::seconds(42);
        assert_eq!(elapsed_seconds(Some(started), now), Some(42));
    }

    #[test]
    fn elapsed_clamped_at_zero_for_future_start() {
        let now = Utc::now();
        let started = now + Duration::seconds(5);
        assert_eq!(elapsed_seconds(Some(started), now), Some(0));
    }

    #[test]
    fn elapsed_omitted_without_start() {
        assert_eq!(elapsed_seconds(None, Utc::now()), None);
    }
}
