use chrono::Utc;
use cp_core::error::AppError;
use cp_core::ids::{RunId, ThreadId, UserId};
use cp_core::ws::WsRooms;
use cp_events::{ActivityEvent, ActivityEventBus, ActivityStatus};
use cp_sessions::SessionManager;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::record::{CancelFlag, RunRecord};
use crate::registry::WorkflowRegistry;
use crate::workflow::{RunStrategy, StreamMode, WorkflowEvent};

/// Launches, streams, and cancels agent runs, enforcing at most one active
/// `RunRecord` per user and forwarding workflow events to push-channel
/// subscribers and the Activity Event Bus.
#[derive(Clone)]
pub struct RunController {
    registry: Arc<WorkflowRegistry>,
    events: ActivityEventBus,
    sessions: SessionManager,
    active: Arc<DashMap<UserId, RunRecord>>,
    threads: Arc<DashMap<UserId, ThreadId>>,
    push: WsRooms,
}

/// Stamps the resolved session endpoint into the workflow's input payload
/// so the handler knows which browser instance to drive. Left untouched if
/// `input` isn't a JSON object.
fn with_session_endpoint(mut input: serde_json::Value, endpoint: &str) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut input {
        map.insert(
            "session_endpoint".to_string(),
            serde_json::Value::String(endpoint.to_string()),
        );
    }
    input
}

impl RunController {
    pub fn new(registry: Arc<WorkflowRegistry>, events: ActivityEventBus, sessions: SessionManager) -> Self {
        Self {
            registry,
            events,
            sessions,
            active: Arc::new(DashMap::new()),
            threads: Arc::new(DashMap::new()),
            push: WsRooms::default(),
        }
    }

    /// The push channel a client subscribes to for this user's run events.
    pub fn push_channel(&self) -> &WsRooms {
        &self.push
    }

    pub fn is_running(&self, user_id: &UserId) -> Option<(RunId, ThreadId)> {
        self.active
            .get(user_id)
            .map(|r| (r.run_id, r.thread_id))
    }

    async fn resolve_thread(
        &self,
        user_id: &UserId,
        handler: &Arc<dyn crate::workflow::WorkflowHandler>,
    ) -> Result<ThreadId, AppError> {
        match self.threads.get(user_id) {
            Some(existing) => Ok(*existing),
            None => {
                let created = handler.create_thread().await?;
                self.threads.insert(user_id.clone(), created);
                Ok(created)
            }
        }
    }

    pub async fn start(
        &self,
        user_id: &UserId,
        workflow_name: &str,
        task: serde_json::Value,
    ) -> Result<(RunId, ThreadId), AppError> {
        let handler = self.registry.get(workflow_name)?;
        let session = self.sessions.get_or_create(user_id).await?;
        let thread_id = self.resolve_thread(user_id, &handler).await?;
        let task = with_session_endpoint(task, &session.endpoint);

        let run_id = RunId::new();
        let cancel_flag = CancelFlag::new();
        let record = RunRecord {
            run_id,
            user_id: user_id.clone(),
            thread_id,
            workflow_name: workflow_name.to_string(),
            cancel_flag: cancel_flag.clone(),
            started_at: Utc::now(),
        };

        match self.active.entry(user_id.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!(
                    "a run is already active for {user_id}"
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        let stream = handler
            .stream(thread_id, task, StreamMode::default())
            .await
            .map_err(|e| {
                self.active.remove(user_id);
                AppError::Upstream(e.to_string())
            })?;

        self.spawn_stream_loop(user_id.clone(), run_id, stream, cancel_flag);

        Ok((run_id, thread_id))
    }

    fn spawn_stream_loop(
        &self,
        user_id: UserId,
        run_id: RunId,
        mut stream: crate::workflow::EventStream,
        cancel_flag: CancelFlag,
    ) {
        let active = self.active.clone();
        let events = self.events.clone();
        let push = self.push.clone();

        tokio::spawn(async move {
            let room = push.room(user_id.as_str());
            let mut terminal = "completed";

            loop {
                if cancel_flag.is_set() {
                    terminal = "cancelled";
                    break;
                }

                match stream.next().await {
                    Some(event) => {
                        if let Err(err) = room.send_json(&event) {
                            tracing::warn!(%user_id, error = %err, "failed to push run event");
                        }

                        if event.is_activity_complete() {
                            if let Err(err) = publish_activity_complete(&events, &user_id, &event).await {
                                tracing::warn!(%user_id, error = %err, "failed to record activity_complete");
                            }
                        }
                    }
                    None => break,
                }
            }

            let _ = room.send_json(&WorkflowEvent {
                event: terminal.to_string(),
                data: serde_json::json!({ "run_id": run_id.to_string() }),
            });

            active.remove(&user_id);
        });
    }

    /// Runs a workflow to completion and returns its outcome, without any
    /// client subscriber or push channel involved. Used by the scheduler,
    /// which has no live session and needs the success/failure outcome to
    /// record against its own row rather than stream it to a client.
    pub async fn run_to_completion<F>(
        &self,
        user_id: &UserId,
        workflow_name: &str,
        input: serde_json::Value,
        on_thread_resolved: impl FnOnce(ThreadId) -> F,
    ) -> Result<(), AppError>
    where
        F: std::future::Future<Output = ()>,
    {
        let handler = self.registry.get(workflow_name)?;
        let session = self.sessions.get_or_create(user_id).await?;
        let thread_id = self.resolve_thread(user_id, &handler).await?;
        let input = with_session_endpoint(input, &session.endpoint);

        let run_id = RunId::new();
        let record = RunRecord {
            run_id,
            user_id: user_id.clone(),
            thread_id,
            workflow_name: workflow_name.to_string(),
            cancel_flag: CancelFlag::new(),
            started_at: Utc::now(),
        };

        match self.active.entry(user_id.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!(
                    "a run is already active for {user_id}"
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        on_thread_resolved(thread_id).await;

        let outcome = self.drive_to_completion(user_id, thread_id, handler, input).await;
        self.active.remove(user_id);
        outcome
    }

    async fn drive_to_completion(
        &self,
        user_id: &UserId,
        thread_id: ThreadId,
        handler: Arc<dyn crate::workflow::WorkflowHandler>,
        input: serde_json::Value,
    ) -> Result<(), AppError> {
        let mut stream = handler.stream(thread_id, input, StreamMode::default()).await?;
        while let Some(event) = stream.next().await {
            if event.is_activity_complete() {
                publish_activity_complete(&self.events, user_id, &event).await?;
            }
        }
        Ok(())
    }

    /// Sets the cancel flag, emits `stopping`, and issues a best-effort
    /// rollback run. No-op if the user has no active run.
    pub async fn cancel(&self, user_id: &UserId) -> Result<(), AppError> {
        let Some(record) = self.active.get(user_id).map(|r| r.value().clone()) else {
            return Ok(());
        };

        if record.cancel_flag.is_set() {
            return Ok(());
        }

        record.cancel_flag.set();

        let room = self.push.room(user_id.as_str());
        let _ = room.send_json(&WorkflowEvent {
            event: "stopping".to_string(),
            data: serde_json::json!({ "run_id": record.run_id.to_string() }),
        });

        if let Ok(handler) = self.registry.get(&record.workflow_name) {
            if let Err(err) = handler
                .create_run(record.thread_id, serde_json::json!({}), RunStrategy::Rollback)
                .await
            {
                tracing::warn!(%user_id, error = %err, "rollback run failed, cancelling locally anyway");
            }
        }

        Ok(())
    }
}

async fn publish_activity_complete(
    events: &ActivityEventBus,
    user_id: &UserId,
    event: &WorkflowEvent,
) -> Result<(), AppError> {
    let action = event
        .data
        .get("action")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let status = match event.data.get("status").and_then(|v| v.as_str()) {
        Some("failed") => ActivityStatus::Failed,
        _ => ActivityStatus::Success,
    };
    let target = event
        .data
        .get("target")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let details: BTreeMap<String, serde_json::Value> = match &event.data {
        serde_json::Value::Object(map) => map.clone().into_iter().collect(),
        _ => BTreeMap::new(),
    };

    events
        .publish(ActivityEvent {
            user_id: user_id.clone(),
            action,
            status,
            target,
            details,
            timestamp: Utc::now(),
        })
        .await
}
