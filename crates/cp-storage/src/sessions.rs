use cp_core::error::AppError;
use cp_core::ids::{JobHandle, SessionId, UserId};
use sqlx::PgPool;

use crate::error::map_sqlx_error;
use crate::models::SessionRow;

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        session_id: SessionId,
        user_id: &UserId,
        endpoint: &str,
        job_handle: JobHandle,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (session_id, user_id, endpoint, status, job_handle, created_at, touched_at) \
             VALUES ($1, $2, $3, 'starting', $4, now(), now())",
        )
        .bind(session_id.as_uuid())
        .bind(user_id.as_str())
        .bind(endpoint)
        .bind(job_handle.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn get(&self, session_id: SessionId) -> Result<Option<SessionRow>, AppError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, user_id, endpoint, status, job_handle, created_at, touched_at \
             FROM sessions WHERE session_id = $1",
        )
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn get_by_user(&self, user_id: &UserId) -> Result<Option<SessionRow>, AppError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, user_id, endpoint, status, job_handle, created_at, touched_at \
             FROM sessions WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn set_status(&self, session_id: SessionId, status: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET status = $2 WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn touch(&self, session_id: SessionId) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET touched_at = now() WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn delete(&self, session_id: SessionId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Sessions whose idle window has elapsed, for the reaper's sweep.
    pub async fn list_expired(&self, idle_ttl_secs: i64) -> Result<Vec<SessionRow>, AppError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, user_id, endpoint, status, job_handle, created_at, touched_at \
             FROM sessions WHERE touched_at < now() - make_interval(secs => $1) AND status != 'stopped'",
        )
        .bind(idle_ttl_secs as f64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
