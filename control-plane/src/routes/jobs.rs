use axum::extract::{Path, State};
use axum::Json;
use cp_core::error::AppError;
use cp_core::ids::{JobId, UserId};
use cp_security::AuthenticatedUser;
use serde::{Deserialize, Serialize};

use crate::routes::sessions::OkResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub name: String,
    pub workflow: String,
    pub cron_expression: String,
}

#[derive(Serialize)]
pub struct JobResponse {
    pub job_id: i64,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
    Json(body): Json<CreateJobRequest>,
) -> Result<Json<JobResponse>, AppError> {
    user.authorize_path_user(&user_id)?;
    let row = state
        .scheduler
        .add_job(&user_id, &body.name, &body.workflow, &body.cron_expression)
        .await?;
    Ok(Json(JobResponse { job_id: row.job_id }))
}

async fn authorize_job(
    state: &AppState,
    user: &AuthenticatedUser,
    job_id: JobId,
) -> Result<(), AppError> {
    let owner = state
        .scheduler
        .job_owner(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("cron job not found".into()))?;
    user.authorize_path_user(&owner)
}

pub async fn pause(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<OkResponse>, AppError> {
    authorize_job(&state, &user, job_id).await?;
    state.scheduler.pause_job(job_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn resume(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<OkResponse>, AppError> {
    authorize_job(&state, &user, job_id).await?;
    state.scheduler.resume_job(job_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<OkResponse>, AppError> {
    authorize_job(&state, &user, job_id).await?;
    state.scheduler.delete_job(job_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn run_now(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<OkResponse>, AppError> {
    authorize_job(&state, &user, job_id).await?;
    state.scheduler.run_job_now(job_id).await?;
    Ok(Json(OkResponse { ok: true }))
}
