//! Worker binary: runs migrations and the generation dispatch loop.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lumen_jobs::JobRunner;
use lumen_storage::FileStorage;

mod config;

use config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_worker=debug,lumen_jobs=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;

    let pool = lumen_db::create_pool(&config.database_url).await?;
    lumen_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let storage = Arc::new(FileStorage::new(&config.storage_dir, pool.clone()));
    storage.ensure_root().await?;
    tracing::info!(storage_dir = %config.storage_dir, "Storage ready");

    let runner = JobRunner::start(pool, storage, config.runner);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    runner.shutdown();

    Ok(())
}
