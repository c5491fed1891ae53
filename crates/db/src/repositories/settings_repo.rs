//! Repository for the single-row `app_settings` table.

use sqlx::PgPool;

use crate::models::settings::Settings;

/// Reads system settings. There is at most one row (id = 1); a missing row
/// yields [`Settings::default`] so callers never special-case bootstrap.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Fetch settings, falling back to defaults when the row is absent.
    pub async fn fetch(pool: &PgPool) -> Result<Settings, sqlx::Error> {
        let row = sqlx::query_as::<_, Settings>(
            "SELECT file_retention_hours, reference_history_limit, \
                    image_timeout_seconds, video_timeout_seconds \
             FROM app_settings WHERE id = 1",
        )
        .fetch_optional(pool)
        .await?;

        Ok(row.unwrap_or_default())
    }
}
