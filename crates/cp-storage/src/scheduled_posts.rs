use chrono::{DateTime, Utc};
use cp_core::error::AppError;
use cp_core::ids::{PostId, UserId};
use sqlx::PgPool;

use crate::error::map_sqlx_error;
use crate::models::ScheduledPostRow;

#[derive(Clone)]
pub struct ScheduledPostRepository {
    pool: PgPool,
}

impl ScheduledPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        user_id: &UserId,
        content: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<ScheduledPostRow, AppError> {
        sqlx::query_as::<_, ScheduledPostRow>(
            "INSERT INTO scheduled_posts (user_id, content, scheduled_at, status, created_at, updated_at) \
             VALUES ($1, $2, $3, 'scheduled', now(), now()) \
             RETURNING post_id, user_id, content, scheduled_at, status, error_message, created_at, updated_at",
        )
        .bind(user_id.as_str())
        .bind(content)
        .bind(scheduled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn get(&self, post_id: PostId) -> Result<Option<ScheduledPostRow>, AppError> {
        sqlx::query_as::<_, ScheduledPostRow>(
            "SELECT post_id, user_id, content, scheduled_at, status, error_message, created_at, updated_at \
             FROM scheduled_posts WHERE post_id = $1",
        )
        .bind(post_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn update_content_and_time(
        &self,
        post_id: PostId,
        content: Option<&str>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE scheduled_posts SET \
             content = COALESCE($2, content), \
             scheduled_at = COALESCE($3, scheduled_at), \
             updated_at = now() \
             WHERE post_id = $1",
        )
        .bind(post_id.as_i64())
        .bind(content)
        .bind(scheduled_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn set_status(
        &self,
        post_id: PostId,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE scheduled_posts SET status = $2, error_message = $3, updated_at = now() WHERE post_id = $1",
        )
        .bind(post_id.as_i64())
        .bind(status)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Rows still `scheduled` at startup, loaded once to re-arm in-memory timers.
    pub async fn list_scheduled(&self) -> Result<Vec<ScheduledPostRow>, AppError> {
        sqlx::query_as::<_, ScheduledPostRow>(
            "SELECT post_id, user_id, content, scheduled_at, status, error_message, created_at, updated_at \
             FROM scheduled_posts WHERE status = 'scheduled'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
