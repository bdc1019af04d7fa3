use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use cp_core::error::AppError;
use cp_core::ids::{PostId, UserId};
use cp_security::AuthenticatedUser;
use serde::{Deserialize, Serialize};

use crate::routes::sessions::OkResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct PostResponse {
    pub post_id: i64,
    pub status: String,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    user.authorize_path_user(&user_id)?;
    let row = state
        .scheduler
        .add_post(&user_id, &body.content, body.scheduled_at)
        .await?;
    Ok(Json(PostResponse {
        post_id: row.post_id,
        status: row.status,
    }))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

async fn authorize_post(
    state: &AppState,
    user: &AuthenticatedUser,
    post_id: PostId,
) -> Result<(), AppError> {
    let owner = state
        .scheduler
        .post_owner(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("scheduled post not found".into()))?;
    user.authorize_path_user(&owner)
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<PostId>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<OkResponse>, AppError> {
    authorize_post(&state, &user, post_id).await?;
    state
        .scheduler
        .update_post(post_id, body.content.as_deref(), body.scheduled_at)
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn cancel(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<PostId>,
) -> Result<Json<OkResponse>, AppError> {
    authorize_post(&state, &user, post_id).await?;
    state.scheduler.cancel_post(post_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn run_now(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<PostId>,
) -> Result<Json<OkResponse>, AppError> {
    authorize_post(&state, &user, post_id).await?;
    state.scheduler.run_post_now(post_id).await?;
    Ok(Json(OkResponse { ok: true }))
}
