//! The dispatch loop.
//!
//! [`JobRunner::start`] spawns a loop that scans for pending generations
//! immediately and then every [`TICK_INTERVAL`], launching one engine task
//! per job not already in flight. A tick never waits on job completion, so
//! the cadence holds regardless of how long individual jobs run.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use lumen_db::repositories::GenerationRepo;
use lumen_db::DbPool;
use lumen_storage::FileStorage;

use crate::config::RunnerConfig;
use crate::engine;
use crate::guard::InFlightGuard;

/// Interval between dispatch ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(3);

/// The background job runner. Created once at startup; the returned `Arc`
/// stays alive for the life of the process.
pub struct JobRunner {
    pub(crate) pool: DbPool,
    pub(crate) storage: Arc<FileStorage>,
    pub(crate) config: Arc<RunnerConfig>,
    guard: InFlightGuard,
    cancel: CancellationToken,
}

impl JobRunner {
    /// Start the dispatch loop and return its handle.
    pub fn start(pool: DbPool, storage: Arc<FileStorage>, config: RunnerConfig) -> Arc<Self> {
        let runner = Arc::new(Self {
            pool,
            storage,
            config: Arc::new(config),
            guard: InFlightGuard::new(),
            cancel: CancellationToken::new(),
        });

        tokio::spawn(run_loop(Arc::clone(&runner)));
        tracing::info!("Job runner started");
        runner
    }

    /// Stop dispatching new work. Engine tasks already in flight run to
    /// completion on the runtime; nothing new is launched afterwards.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Number of jobs currently being processed.
    pub fn in_flight(&self) -> usize {
        self.guard.len()
    }
}

/// Tick immediately, then on the fixed interval, until cancelled.
async fn run_loop(runner: Arc<JobRunner>) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            _ = runner.cancel.cancelled() => {
                tracing::info!("Job runner stopped");
                return;
            }
            _ = ticker.tick() => tick(&runner).await,
        }
    }
}

/// One dispatch pass: list eligible jobs and launch an engine task for
/// each job not already in flight. Fire-and-forget; this never blocks on
/// job completion.
async fn tick(runner: &Arc<JobRunner>) {
    let pending = match GenerationRepo::list_pending(&runner.pool).await {
        Ok(pending) => pending,
        Err(e) => {
            // Nothing is touched on a listing failure; the next tick
            // simply retries.
            tracing::error!(error = %e, "Failed to list pending generations");
            return;
        }
    };

    for generation in pending {
        let Some(slot) = runner.guard.try_acquire(generation.id) else {
            continue;
        };

        let runner = Arc::clone(runner);
        tokio::spawn(async move {
            // Moving the slot in ties its release to task teardown:
            // success, error, or panic unwind all free the entry.
            let _slot = slot;
            let id = generation.id;
            if let Err(e) = engine::run_generation(&runner, generation).await {
                tracing::error!(generation_id = id, error = %e, "Generation run aborted");
            }
        });
    }
}
