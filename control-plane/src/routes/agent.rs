use axum::extract::{Path, State};
use axum::Json;
use cp_core::error::AppError;
use cp_core::ids::UserId;
use cp_security::AuthenticatedUser;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartAgentRequest {
    pub workflow: String,
    pub task: serde_json::Value,
}

#[derive(Serialize)]
pub struct StartAgentResponse {
    pub run_id: String,
    pub thread_id: String,
}

pub async fn start(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
    Json(body): Json<StartAgentRequest>,
) -> Result<Json<StartAgentResponse>, AppError> {
    user.authorize_path_user(&user_id)?;
    let (run_id, thread_id) = state.runs.start(&user_id, &body.workflow, body.task).await?;
    Ok(Json(StartAgentResponse {
        run_id: run_id.to_string(),
        thread_id: thread_id.to_string(),
    }))
}

#[derive(Serialize)]
pub struct StopAgentResponse {
    pub stopped: bool,
}

pub async fn stop(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<StopAgentResponse>, AppError> {
    user.authorize_path_user(&user_id)?;
    let was_running = state.runs.is_running(&user_id).is_some();
    state.runs.cancel(&user_id).await?;
    Ok(Json(StopAgentResponse { stopped: was_running }))
}

#[derive(Serialize)]
pub struct AgentStatusResponse {
    pub is_running: bool,
    pub run_id: Option<String>,
    pub thread_id: Option<String>,
}

pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<AgentStatusResponse>, AppError> {
    user.authorize_path_user(&user_id)?;
    let running = state.runs.is_running(&user_id);
    Ok(Json(AgentStatusResponse {
        is_running: running.is_some(),
        run_id: running.map(|(run_id, _)| run_id.to_string()),
        thread_id: running.map(|(_, thread_id)| thread_id.to_string()),
    }))
}
