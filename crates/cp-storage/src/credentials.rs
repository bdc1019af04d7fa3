use cp_core::ids::UserId;
use sqlx::PgPool;

use crate::error::map_sqlx_error;
use crate::models::CredentialRow;
use cp_core::error::AppError;

#[derive(Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn put(&self, user_id: &UserId, encrypted_cookies: &[u8]) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO x_credentials (user_id, encrypted_cookies, updated_at) \
             VALUES ($1, $2, now()) \
             ON CONFLICT (user_id) DO UPDATE SET encrypted_cookies = EXCLUDED.encrypted_cookies, updated_at = now()",
        )
        .bind(user_id.as_str())
        .bind(encrypted_cookies)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn get(&self, user_id: &UserId) -> Result<Option<CredentialRow>, AppError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT user_id, encrypted_cookies, updated_at FROM x_credentials WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn delete(&self, user_id: &UserId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM x_credentials WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
