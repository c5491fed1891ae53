//! Persistence layer: sqlx/Postgres models and repositories.
//!
//! The orchestrator consumes this crate through a narrow contract: list
//! pending generations, read single rows, and apply typed partial updates.
//! Everything is last-writer-wins; the single-flight guard in the jobs
//! crate is what prevents two engines from racing on one row.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run embedded migrations against the pool.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
