use chrono::{DateTime, Utc};
use cp_core::error::AppError;
use cp_core::ids::{JobId, RunId, ThreadId, UserId};
use sqlx::PgPool;

use crate::error::map_sqlx_error;
use crate::models::{CronJobRow, CronJobRunRow};

#[derive(Clone)]
pub struct CronJobRepository {
    pool: PgPool,
}

impl CronJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        user_id: &UserId,
        name: &str,
        workflow_name: &str,
        cron_expression: &str,
    ) -> Result<CronJobRow, AppError> {
        sqlx::query_as::<_, CronJobRow>(
            "INSERT INTO cron_jobs (user_id, name, workflow_name, cron_expression, is_active, created_at) \
             VALUES ($1, $2, $3, $4, TRUE, now()) \
             RETURNING job_id, user_id, name, workflow_name, cron_expression, is_active, created_at, last_run_at",
        )
        .bind(user_id.as_str())
        .bind(name)
        .bind(workflow_name)
        .bind(cron_expression)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn get(&self, job_id: JobId) -> Result<Option<CronJobRow>, AppError> {
        sqlx::query_as::<_, CronJobRow>(
            "SELECT job_id, user_id, name, workflow_name, cron_expression, is_active, created_at, last_run_at \
             FROM cron_jobs WHERE job_id = $1",
        )
        .bind(job_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn list_active(&self) -> Result<Vec<CronJobRow>, AppError> {
        sqlx::query_as::<_, CronJobRow>(
            "SELECT job_id, user_id, name, workflow_name, cron_expression, is_active, created_at, last_run_at \
             FROM cron_jobs WHERE is_active = TRUE",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    pub async fn set_active(&self, job_id: JobId, is_active: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE cron_jobs SET is_active = $2 WHERE job_id = $1")
            .bind(job_id.as_i64())
            .bind(is_active)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn set_last_run_at(&self, job_id: JobId, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE cron_jobs SET last_run_at = $2 WHERE job_id = $1")
            .bind(job_id.as_i64())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Cascades to `cron_job_runs` via the foreign key's `ON DELETE CASCADE`.
    pub async fn delete(&self, job_id: JobId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cron_jobs WHERE job_id = $1")
            .bind(job_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct CronJobRunRepository {
    pool: PgPool,
}

impl CronJobRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_queued(&self, run_id: RunId, job_id: JobId) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO cron_job_runs (run_id, job_id, status, started_at) VALUES ($1, $2, 'queued', now())",
        )
        .bind(run_id.as_uuid())
        .bind(job_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn mark_running(&self, run_id: RunId, thread_id: ThreadId) -> Result<(), AppError> {
        sqlx::query("UPDATE cron_job_runs SET status = 'running', thread_id = $2 WHERE run_id = $1")
            .bind(run_id.as_uuid())
            .bind(thread_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn complete(
        &self,
        run_id: RunId,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE cron_job_runs SET status = $2, error_message = $3, completed_at = now() WHERE run_id = $1",
        )
        .bind(run_id.as_uuid())
        .bind(status)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn list_for_job(&self, job_id: JobId) -> Result<Vec<CronJobRunRow>, AppError> {
        sqlx::query_as::<_, CronJobRunRow>(
            "SELECT run_id, job_id, status, started_at, completed_at, error_message, thread_id \
             FROM cron_job_runs WHERE job_id = $1 ORDER BY started_at DESC",
        )
        .bind(job_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
