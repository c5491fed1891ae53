//! Repository for the `user_providers` table.

use sqlx::PgPool;

use lumen_core::types::DbId;

use crate::models::provider::UserProvider;

/// Reads per-user provider overrides.
pub struct ProviderRepo;

impl ProviderRepo {
    /// Find a user's provider override, if any.
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserProvider>, sqlx::Error> {
        sqlx::query_as::<_, UserProvider>(
            "SELECT user_id, provider_host, api_key_enc, updated_at \
             FROM user_providers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}
