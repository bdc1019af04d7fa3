use std::pin::Pin;

use async_trait::async_trait;
use cp_core::ids::{RunId, ThreadId};
use futures_core::Stream;
use serde::{Deserialize, Serialize};

/// One event produced by a running workflow. `data` carries whatever shape
/// the workflow author chose; the Controller only inspects it to recognize
/// `event == "custom"` with `data.type == "activity_complete"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub event: String,
    pub data: serde_json::Value,
}

impl WorkflowEvent {
    pub fn is_activity_complete(&self) -> bool {
        self.event == "custom" && self.data.get("type").and_then(|v| v.as_str()) == Some("activity_complete")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStrategy {
    Normal,
    Rollback,
}

#[derive(Debug, Clone, Default)]
pub struct StreamMode {
    pub kinds: Vec<String>,
}

pub type EventStream = Pin<Box<dyn Stream<Item = WorkflowEvent> + Send>>;

#[derive(Debug)]
pub struct WorkflowError(pub String);

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "workflow runtime error: {}", self.0)
    }
}

impl std::error::Error for WorkflowError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_activity_complete_custom_event() {
        let event = WorkflowEvent {
            event: "custom".into(),
            data: serde_json::json!({ "type": "activity_complete", "action": "like" }),
        };
        assert!(event.is_activity_complete());
    }

    #[test]
    fn ignores_other_custom_events() {
        let event = WorkflowEvent {
            event: "custom".into(),
            data: serde_json::json!({ "type": "progress" }),
        };
        assert!(!event.is_activity_complete());

        let message_event = WorkflowEvent {
            event: "messages".into(),
            data: serde_json::json!({ "type": "activity_complete" }),
        };
        assert!(!message_event.is_activity_complete());
    }
}

/// The external Workflow Runtime collaborator, as seen from one named
/// workflow's handler. Implementations wrap whatever graph-execution engine
/// actually hosts the workflow.
#[async_trait]
pub trait WorkflowHandler: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadId, WorkflowError>;

    async fn create_run(
        &self,
        thread_id: ThreadId,
        input: serde_json::Value,
        strategy: RunStrategy,
    ) -> Result<RunId, WorkflowError>;

    async fn stream(
        &self,
        thread_id: ThreadId,
        input: serde_json::Value,
        stream_mode: StreamMode,
    ) -> Result<EventStream, WorkflowError>;
}
