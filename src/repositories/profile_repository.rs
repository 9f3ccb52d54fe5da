use super::ProfileDirectory;
use crate::error::RepositoryResult;
use crate::models::Profile;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for stored user wallets
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for ProfileRepository {
    async fn find_profile(&self, user_id: Uuid) -> RepositoryResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, classic_address, public_key, private_key, seed
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
