use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub user_id: String,
    pub encrypted_cookies: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

/// Row-level status kept as plain text in the database; the domain layer
/// (`cp-sessions`) owns the typed `SessionStatus` and converts at the edge.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub user_id: String,
    pub endpoint: String,
    pub status: String,
    pub job_handle: Uuid,
    pub created_at: DateTime<Utc>,
    pub touched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivityEventRow {
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub action: String,
    pub status: String,
    pub target: Option<String>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduledPostRow {
    pub post_id: i64,
    pub user_id: String,
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CronJobRow {
    pub job_id: i64,
    pub user_id: String,
    pub name: String,
    pub workflow_name: String,
    pub cron_expression: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CronJobRunRow {
    pub run_id: Uuid,
    pub job_id: i64,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub thread_id: Option<Uuid>,
}
