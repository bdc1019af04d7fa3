use chrono::{DateTime, Utc};
use cp_core::ids::UserId;
use cp_storage::models::ActivityEventRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An immutable record that a user-visible side effect completed or failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub user_id: UserId,
    pub action: String,
    pub status: ActivityStatus,
    pub target: Option<String>,
    pub details: BTreeMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Failed,
}

impl ActivityStatus {
    fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Success => "success",
            ActivityStatus::Failed => "failed",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "failed" => ActivityStatus::Failed,
            _ => ActivityStatus::Success,
        }
    }
}

impl ActivityEvent {
    pub(crate) fn into_row(self) -> ActivityEventRow {
        ActivityEventRow {
            user_id: self.user_id.to_string(),
            occurred_at: self.timestamp,
            action: self.action,
            status: self.status.as_str().to_string(),
            target: self.target,
            details: serde_json::Value::Object(self.details.into_iter().collect()),
        }
    }

    pub(crate) fn from_row(row: ActivityEventRow) -> Self {
        let details = match row.details {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self {
            user_id: row.user_id.into(),
            action: row.action,
            status: ActivityStatus::from_str(&row.status),
            target: row.target,
            details,
            timestamp: row.occurred_at,
        }
    }
}
