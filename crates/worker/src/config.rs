//! Environment-driven worker configuration.

use lumen_jobs::RunnerConfig;

/// Everything the worker binary needs from its environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub storage_dir: String,
    pub runner: RunnerConfig,
}

impl WorkerConfig {
    /// Load from the process environment. Only `DATABASE_URL` is required;
    /// everything else has a deployable default.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        Ok(Self {
            database_url,
            storage_dir: env_or("STORAGE_DIR", "storage"),
            runner: RunnerConfig {
                default_provider_host: env_or(
                    "DEFAULT_PROVIDER_HOST",
                    "https://grsai.dakka.com.cn",
                ),
                default_provider_api_key: env_or("DEFAULT_PROVIDER_API_KEY", ""),
                api_key_encryption_secret: env_or(
                    "API_KEY_ENCRYPTION_SECRET",
                    "PLEASE_CHANGE_THIS_SECRET_32BYTES",
                ),
            },
        })
    }
}

/// Environment variable with a fallback; empty values count as unset.
fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}
