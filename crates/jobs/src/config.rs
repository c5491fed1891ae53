//! Orchestrator configuration resolved at startup.

/// Settings the dispatch loop and protocol engine need beyond the database:
/// the system-wide provider defaults and the secret protecting stored
/// per-user API keys.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Provider host used when a user has no override row.
    pub default_provider_host: String,
    /// Provider API key used when a user has no decryptable key of their own.
    pub default_provider_api_key: String,
    /// Secret for AES-256-GCM decryption of stored per-user keys.
    pub api_key_encryption_secret: String,
}
