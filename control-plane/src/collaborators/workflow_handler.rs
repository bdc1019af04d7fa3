use async_trait::async_trait;
use cp_core::ids::{RunId, ThreadId};
use cp_runs::{EventStream, RunStrategy, StreamMode, WorkflowError, WorkflowHandler};
use futures_util::stream;
use reqwest::Client;
use serde::Deserialize;

/// Thin client for one named workflow hosted by the external Workflow
/// Runtime. Streaming is modelled as successive event batches rather than a
/// raw SSE passthrough; the runtime's own transport is out of scope here.
#[derive(Clone)]
pub struct HttpWorkflowHandler {
    client: Client,
    base_url: String,
}

impl HttpWorkflowHandler {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct ThreadResponse {
    thread_id: uuid::Uuid,
}

#[derive(Deserialize)]
struct RunResponse {
    run_id: uuid::Uuid,
}

#[derive(Deserialize)]
struct StreamResponse {
    events: Vec<cp_runs::WorkflowEvent>,
}

#[async_trait]
impl WorkflowHandler for HttpWorkflowHandler {
    async fn create_thread(&self) -> Result<ThreadId, WorkflowError> {
        let resp = self
            .client
            .post(format!("{}/threads", self.base_url))
            .send()
            .await
            .map_err(|e| WorkflowError(e.to_string()))?
            .error_for_status()
            .map_err(|e| WorkflowError(e.to_string()))?
            .json::<ThreadResponse>()
            .await
            .map_err(|e| WorkflowError(e.to_string()))?;
        Ok(ThreadId::from(resp.thread_id))
    }

    async fn create_run(
        &self,
        thread_id: ThreadId,
        input: serde_json::Value,
        strategy: RunStrategy,
    ) -> Result<RunId, WorkflowError> {
        let strategy_name = match strategy {
            RunStrategy::Normal => "normal",
            RunStrategy::Rollback => "rollback",
        };
        let resp = self
            .client
            .post(format!("{}/threads/{}/runs", self.base_url, thread_id.as_uuid()))
            .json(&serde_json::json!({ "input": input, "strategy": strategy_name }))
            .send()
            .await
            .map_err(|e| WorkflowError(e.to_string()))?
            .error_for_status()
            .map_err(|e| WorkflowError(e.to_string()))?
            .json::<RunResponse>()
            .await
            .map_err(|e| WorkflowError(e.to_string()))?;
        Ok(RunId::from(resp.run_id))
    }

    async fn stream(
        &self,
        thread_id: ThreadId,
        input: serde_json::Value,
        stream_mode: StreamMode,
    ) -> Result<EventStream, WorkflowError> {
        let resp = self
            .client
            .post(format!("{}/threads/{}/stream", self.base_url, thread_id.as_uuid()))
            .json(&serde_json::json!({ "input": input, "stream_mode": stream_mode.kinds }))
            .send()
            .await
            .map_err(|e| WorkflowError(e.to_string()))?
            .error_for_status()
            .map_err(|e| WorkflowError(e.to_string()))?
            .json::<StreamResponse>()
            .await
            .map_err(|e| WorkflowError(e.to_string()))?;

        Ok(Box::pin(stream::iter(resp.events)))
    }
}
