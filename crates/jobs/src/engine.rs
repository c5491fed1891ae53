//! The submit/poll protocol engine.
//!
//! [`run_generation`] drives exactly one job from its persisted state to a
//! terminal state. Every step is a potential exit: provider resolution,
//! submission, and each poll iteration can finish the job as failed, and
//! the poll loop re-reads the row each pass so an externally mutated job is
//! left alone. Database errors propagate to the caller (the job stays
//! non-terminal and the next tick retries); everything else is absorbed
//! into the job's own state.

use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use lumen_core::error_code::GenerationErrorCode;
use lumen_core::generation::{elapsed_seconds, GenerationKind};
use lumen_core::timeout::{effective_timeout_secs, max_poll_attempts, POLL_INTERVAL_SECS};
use lumen_core::types::DbId;
use lumen_db::models::generation::{Generation, GenerationPatch};
use lumen_db::models::settings::Settings;
use lumen_db::repositories::{FileRepo, GenerationRepo, ProviderRepo, SettingsRepo};
use lumen_providers::{build_provider, GenerationRequest, SubmitOutcome, TaskSnapshot, TaskState};
use lumen_storage::StorageError;

use crate::credentials;
use crate::materialize;
use crate::runner::JobRunner;

/// Every Nth transient poll error is logged and persisted as a diagnostic.
const POLL_ERROR_LOG_INTERVAL: i64 = 10;

/// Drive one generation to a terminal state (or leave it non-terminal on a
/// database error / external mutation).
pub(crate) async fn run_generation(
    runner: &JobRunner,
    generation: Generation,
) -> Result<(), sqlx::Error> {
    let id = generation.id;
    tracing::info!(
        generation_id = id,
        kind = %generation.kind,
        model = %generation.model,
        "Starting generation"
    );

    // A job mutated externally between listing and launch is not ours.
    if generation.is_terminal() {
        return Ok(());
    }

    let kind = match generation.kind() {
        Ok(kind) => kind,
        Err(e) => {
            return fail(runner, id, e.to_string(), Some(GenerationErrorCode::InvalidRequest)).await
        }
    };

    // Enter running; stamps started_at only on the first entry.
    GenerationRepo::apply_patch(
        &runner.pool,
        id,
        &GenerationPatch::begin_running(generation.started_at, Utc::now()),
    )
    .await?;

    // Effective provider credentials: per-user override, else defaults.
    let Some((host, api_key)) = resolve_provider(runner, generation.user_id).await? else {
        return fail(
            runner,
            id,
            "No provider API key is configured; add one in the provider settings".to_string(),
            Some(GenerationErrorCode::ApiError),
        )
        .await;
    };

    let timeout_secs = resolve_timeout_secs(runner, kind).await;
    tracing::info!(generation_id = id, timeout_secs, "Resolved job timeout");

    let provider = match build_provider(&host, &api_key, Duration::from_secs(timeout_secs as u64)) {
        Ok(provider) => provider,
        Err(e) => return fail(runner, id, e.message, e.code).await,
    };

    let references = build_references(runner, &generation, kind).await;
    let request = GenerationRequest {
        kind,
        model: generation.model.clone(),
        prompt: generation.prompt.clone(),
        aspect_ratio: generation.aspect_ratio.clone(),
        image_size: generation.image_size.clone(),
        video_size: generation.video_size.clone(),
        duration_secs: generation.duration_secs,
        references,
    };

    // Submit unless a previous run already obtained a task handle (after a
    // restart we resume polling against the persisted task instead).
    let mut current = generation;
    if current.provider_task_id.as_deref().unwrap_or("").is_empty() {
        match provider.submit(&request).await {
            Err(e) => return fail(runner, id, e.message, e.code).await,
            Ok(SubmitOutcome::Completed(snapshot)) => {
                // Immediate-completion short-circuit: no polling at all.
                return finish_succeeded(runner, &current, &snapshot, timeout_secs).await;
            }
            Ok(SubmitOutcome::Queued(task_id)) => {
                tracing::info!(generation_id = id, task_id = %task_id, "Provider task created");
                GenerationRepo::apply_patch(
                    &runner.pool,
                    id,
                    &GenerationPatch::task_submitted(task_id),
                )
                .await?;
                match GenerationRepo::find_by_id(&runner.pool, id).await? {
                    Some(refreshed) => current = refreshed,
                    None => return Ok(()),
                }
            }
        }
    }

    poll_until_terminal(runner, &current, provider.as_ref(), timeout_secs).await
}

/// The bounded poll loop (step 7 of the protocol).
async fn poll_until_terminal(
    runner: &JobRunner,
    generation: &Generation,
    provider: &dyn lumen_providers::GenerationProvider,
    timeout_secs: i64,
) -> Result<(), sqlx::Error> {
    let id = generation.id;
    let max_attempts = max_poll_attempts(timeout_secs);
    let poll_interval = Duration::from_secs(POLL_INTERVAL_SECS as u64);

    for attempt in 0..max_attempts {
        // Re-read first: an externally mutated (or deleted) job is not ours
        // to touch any further.
        let Some(latest) = GenerationRepo::find_by_id(&runner.pool, id).await? else {
            return Ok(());
        };
        if latest.is_terminal() {
            return Ok(());
        }
        let Some(task_id) = latest
            .provider_task_id
            .clone()
            .filter(|t| !t.is_empty())
        else {
            return fail(
                runner,
                id,
                "The job has no provider task id to poll".to_string(),
                Some(GenerationErrorCode::InvalidRequest),
            )
            .await;
        };

        let snapshot = match provider.fetch_result(&task_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Transient: never fails the job. Surface the text as a
                // diagnostic every POLL_ERROR_LOG_INTERVAL attempts.
                if attempt % POLL_ERROR_LOG_INTERVAL == 0 {
                    tracing::warn!(
                        generation_id = id,
                        attempt,
                        error = %e,
                        "Transient error fetching task result"
                    );
                    GenerationRepo::apply_patch(
                        &runner.pool,
                        id,
                        &GenerationPatch::diagnostic_error(e.message),
                    )
                    .await?;
                }
                sleep(poll_interval).await;
                continue;
            }
        };

        if let Some(progress) = snapshot.progress.filter(|p| *p > 0.0) {
            GenerationRepo::apply_patch(&runner.pool, id, &GenerationPatch::progress(progress))
                .await?;
        }

        match snapshot.state {
            TaskState::Succeeded => {
                return finish_succeeded(runner, &latest, &snapshot, timeout_secs).await;
            }
            TaskState::Failed => {
                return fail(runner, id, snapshot.failure_message(), None).await;
            }
            TaskState::InProgress => sleep(poll_interval).await,
        }
    }

    fail(
        runner,
        id,
        "Timed out waiting for the provider result".to_string(),
        Some(GenerationErrorCode::Timeout),
    )
    .await
}

/// Materialize the first result reference and record terminal success.
async fn finish_succeeded(
    runner: &JobRunner,
    generation: &Generation,
    snapshot: &TaskSnapshot,
    timeout_secs: i64,
) -> Result<(), sqlx::Error> {
    let id = generation.id;
    let Some(url) = snapshot.first_result_url() else {
        return fail(
            runner,
            id,
            "The provider returned no result reference".to_string(),
            Some(GenerationErrorCode::ApiError),
        )
        .await;
    };

    let file = match materialize::materialize(&runner.storage, generation.user_id, url, timeout_secs)
        .await
    {
        Ok(file) => file,
        Err(e) => return fail(runner, id, e.to_string(), Some(e.code())).await,
    };

    let elapsed = elapsed_for(runner, id).await;
    GenerationRepo::apply_patch(
        &runner.pool,
        id,
        &GenerationPatch::succeeded(file.id, url.to_string(), elapsed),
    )
    .await?;

    tracing::info!(generation_id = id, output_file_id = file.id, "Generation succeeded");
    Ok(())
}

/// Record a terminal failure, deriving the code from the message when the
/// detecting step did not choose one.
async fn fail(
    runner: &JobRunner,
    id: DbId,
    message: String,
    code: Option<GenerationErrorCode>,
) -> Result<(), sqlx::Error> {
    let elapsed = elapsed_for(runner, id).await;
    let patch = GenerationPatch::failed(message, code, elapsed);
    tracing::warn!(
        generation_id = id,
        error_code = patch.error_code.map(|c| c.as_str()).unwrap_or("unknown"),
        error = patch.error.as_deref().unwrap_or(""),
        "Generation failed"
    );
    GenerationRepo::apply_patch(&runner.pool, id, &patch).await
}

/// Elapsed seconds since the job's recorded start. Read errors degrade to
/// omitting the field rather than blocking the terminal transition.
async fn elapsed_for(runner: &JobRunner, id: DbId) -> Option<i64> {
    match GenerationRepo::find_by_id(&runner.pool, id).await {
        Ok(Some(generation)) => elapsed_seconds(generation.started_at, Utc::now()),
        _ => None,
    }
}

/// Resolve the effective provider host and API key for a user.
///
/// A user row overrides the host; its encrypted key overrides the default
/// key only when it decrypts to something non-empty. `Ok(None)` means no
/// usable key exists anywhere.
async fn resolve_provider(
    runner: &JobRunner,
    user_id: DbId,
) -> Result<Option<(String, String)>, sqlx::Error> {
    let mut host = runner.config.default_provider_host.clone();
    let mut api_key = runner.config.default_provider_api_key.clone();

    if let Some(row) = ProviderRepo::find_by_user(&runner.pool, user_id).await? {
        host = row.provider_host;
        if let Some(encrypted) = row.api_key_enc.filter(|e| !e.is_empty()) {
            match credentials::decrypt_text(&encrypted, &runner.config.api_key_encryption_secret) {
                Ok(key) if !key.is_empty() => api_key = key,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        error = %e,
                        "Failed to decrypt user provider key, falling back to default"
                    );
                }
            }
        }
    }

    if api_key.is_empty() {
        return Ok(None);
    }
    Ok(Some((host, api_key)))
}

/// Effective timeout for a kind. Settings read errors degrade to defaults;
/// the floor/fallback clamp lives in `lumen_core::timeout`.
async fn resolve_timeout_secs(runner: &JobRunner, kind: GenerationKind) -> i64 {
    let settings = match SettingsRepo::fetch(&runner.pool).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read settings, using default timeouts");
            Settings::default()
        }
    };
    effective_timeout_secs(Some(settings.timeout_seconds_for(kind)))
}

/// Inline-encode the job's reference files, capped to the kind's maximum.
/// Unreadable references are skipped, not fatal.
async fn build_references(
    runner: &JobRunner,
    generation: &Generation,
    kind: GenerationKind,
) -> Vec<String> {
    let mut references = Vec::new();
    for &file_id in generation
        .reference_file_ids
        .0
        .iter()
        .take(kind.max_references())
    {
        match load_reference(runner, file_id).await {
            Ok(data_url) => references.push(data_url),
            Err(e) => {
                tracing::warn!(
                    generation_id = generation.id,
                    file_id,
                    error = %e,
                    "Skipping unreadable reference file"
                );
            }
        }
    }
    references
}

/// One reference file as a `data:` URL.
async fn load_reference(runner: &JobRunner, file_id: DbId) -> Result<String, ReferenceError> {
    let record = FileRepo::find_by_id(&runner.pool, file_id)
        .await?
        .ok_or(ReferenceError::Missing)?;
    let bytes = runner.storage.read_bytes(&record).await?;
    Ok(lumen_core::data_url::encode(&record.mime_type, &bytes))
}

#[derive(Debug, thiserror::Error)]
enum ReferenceError {
    #[error("file row not found")]
    Missing,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
