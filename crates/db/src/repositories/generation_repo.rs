//! Repository for the `generations` table.
//!
//! The orchestrator's whole write surface is [`GenerationRepo::apply_patch`]:
//! a typed partial update built from [`GenerationPatch`] constructors. No
//! stringly-keyed field maps reach this layer.

use sqlx::types::Json;
use sqlx::PgPool;

use lumen_core::generation::GenerationStatus;
use lumen_core::types::DbId;

use crate::models::generation::{Generation, GenerationPatch, NewGeneration};

/// Column list for `generations` queries.
const COLUMNS: &str = "\
    id, user_id, kind, prompt, model, status, progress, \
    started_at, elapsed_seconds, error, error_code, \
    provider_task_id, provider_result_url, reference_file_ids, \
    image_size, aspect_ratio, duration_secs, video_size, output_file_id, \
    created_at, updated_at";

/// Provides CRUD operations for generations.
pub struct GenerationRepo;

impl GenerationRepo {
    /// Insert a new generation in `queued` status. This is the external
    /// submission path's entry point; the orchestrator only ever patches.
    pub async fn create(pool: &PgPool, input: &NewGeneration) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "INSERT INTO generations \
                 (user_id, kind, prompt, model, status, reference_file_ids, \
                  aspect_ratio, image_size, video_size, duration_secs) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(input.user_id)
            .bind(input.kind.as_str())
            .bind(&input.prompt)
            .bind(&input.model)
            .bind(GenerationStatus::Queued.as_str())
            .bind(Json(&input.reference_file_ids))
            .bind(&input.aspect_ratio)
            .bind(&input.image_size)
            .bind(&input.video_size)
            .bind(input.duration_secs)
            .fetch_one(pool)
            .await
    }

    /// Find a generation by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generations WHERE id = $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All jobs the dispatch loop should consider: queued or running.
    ///
    /// Oldest first, so long-queued work is picked up before fresh work.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE status IN ($1, $2) \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(GenerationStatus::Queued.as_str())
            .bind(GenerationStatus::Running.as_str())
            .fetch_all(pool)
            .await
    }

    /// Apply a typed partial update. `updated_at` is always refreshed;
    /// an otherwise-empty patch is a no-op.
    ///
    /// The SET clause is built from [`GenerationPatch::columns`] and the
    /// binds are issued in the same order, so the two can never drift apart
    /// without the patch tests catching it.
    pub async fn apply_patch(
        pool: &PgPool,
        id: DbId,
        patch: &GenerationPatch,
    ) -> Result<(), sqlx::Error> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<String> = vec!["updated_at = NOW()".to_string()];
        let mut bind_idx: u32 = 2; // $1 is the row id
        for column in patch.columns() {
            sets.push(format!("{column} = ${bind_idx}"));
            bind_idx += 1;
        }

        let query = format!(
            "UPDATE generations SET {} WHERE id = $1",
            sets.join(", ")
        );

        let mut q = sqlx::query(&query).bind(id);
        if let Some(status) = patch.status {
            q = q.bind(status.as_str());
        }
        if let Some(progress) = patch.progress {
            q = q.bind(progress);
        }
        if let Some(started_at) = patch.started_at {
            q = q.bind(started_at);
        }
        if let Some(elapsed) = patch.elapsed_seconds {
            q = q.bind(elapsed);
        }
        if let Some(error) = &patch.error {
            q = q.bind(error);
        }
        if let Some(code) = patch.error_code {
            q = q.bind(code.as_str());
        }
        if let Some(task_id) = &patch.provider_task_id {
            q = q.bind(task_id);
        }
        if let Some(url) = &patch.provider_result_url {
            q = q.bind(url);
        }
        if let Some(file_id) = patch.output_file_id {
            q = q.bind(file_id);
        }

        q.execute(pool).await?;
        Ok(())
    }
}
