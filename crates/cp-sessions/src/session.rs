use chrono::{DateTime, Utc};
use cp_core::ids::{JobHandle, SessionId, UserId};
use cp_storage::models::SessionRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Starting,
    Running,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Stopped => "stopped",
        }
    }

    pub(crate) fn from_str(s: &str) -> Self {
        match s {
            "running" => SessionStatus::Running,
            "stopped" => SessionStatus::Stopped,
            _ => SessionStatus::Starting,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Starting | SessionStatus::Running)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub endpoint: String,
    pub status: SessionStatus,
    pub job_handle: JobHandle,
    pub created_at: DateTime<Utc>,
    pub touched_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn from_row(row: SessionRow) -> Self {
        Self {
            session_id: SessionId::from(row.session_id),
            user_id: row.user_id.into(),
            endpoint: row.endpoint,
            status: SessionStatus::from_str(&row.status),
            job_handle: JobHandle::from(row.job_handle),
            created_at: row.created_at,
            touched_at: row.touched_at,
        }
    }
}
