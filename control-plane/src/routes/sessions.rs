use axum::extract::{Path, State};
use axum::Json;
use cp_core::error::AppError;
use cp_core::ids::{SessionId, UserId};
use cp_security::AuthenticatedUser;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub endpoint: String,
    pub status: &'static str,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<SessionResponse>, AppError> {
    user.authorize_path_user(&user_id)?;
    let session = state.sessions.get_or_create(&user_id).await?;
    Ok(Json(SessionResponse {
        session_id: session.session_id.to_string(),
        endpoint: session.endpoint,
        status: session.status.as_str(),
    }))
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

pub async fn terminate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<SessionId>,
) -> Result<Json<OkResponse>, AppError> {
    let owner = state
        .sessions
        .owner(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("session not found".into()))?;
    user.authorize_path_user(&owner)?;
    state.sessions.terminate(session_id).await?;
    Ok(Json(OkResponse { ok: true }))
}
