//! System settings row (single row, id = 1).

use serde::Serialize;
use sqlx::FromRow;

/// Defaults used when the settings row has never been written.
pub const DEFAULT_FILE_RETENTION_HOURS: i64 = 168;
pub const DEFAULT_REFERENCE_HISTORY_LIMIT: i64 = 50;
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 600;

/// System-wide tunables read by the orchestrator and the retention sweeps.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Settings {
    pub file_retention_hours: i64,
    pub reference_history_limit: i64,
    pub image_timeout_seconds: i64,
    pub video_timeout_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            file_retention_hours: DEFAULT_FILE_RETENTION_HOURS,
            reference_history_limit: DEFAULT_REFERENCE_HISTORY_LIMIT,
            image_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            video_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Settings {
    /// Configured timeout for a generation kind, in seconds. The floor and
    /// default fallback are applied by `lumen_core::timeout`, not here.
    pub fn timeout_seconds_for(&self, kind: lumen_core::generation::GenerationKind) -> i64 {
        match kind {
            lumen_core::generation::GenerationKind::Image => self.image_timeout_seconds,
            lumen_core::generation::GenerationKind::Video => self.video_timeout_seconds,
        }
    }
}
