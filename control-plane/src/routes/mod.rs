pub mod activity;
pub mod agent;
pub mod credentials;
pub mod health;
pub mod jobs;
pub mod posts;
pub mod sessions;
pub mod ws;

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::check))
        .route("/users/{user_id}/agent/start", post(agent::start))
        .route("/users/{user_id}/agent/stop", post(agent::stop))
        .route("/users/{user_id}/agent/status", get(agent::status))
        .route("/users/{user_id}/sessions", post(sessions::create))
        .route("/sessions/{session_id}", delete(sessions::terminate))
        .route("/users/{user_id}/credentials", post(credentials::put))
        .route("/users/{user_id}/posts", post(posts::create))
        .route("/posts/{post_id}", patch(posts::update))
        .route("/posts/{post_id}", delete(posts::cancel))
        .route("/posts/{post_id}/run-now", post(posts::run_now))
        .route("/users/{user_id}/jobs", post(jobs::create))
        .route("/jobs/{job_id}/pause", post(jobs::pause))
        .route("/jobs/{job_id}/resume", post(jobs::resume))
        .route("/jobs/{job_id}", delete(jobs::delete))
        .route("/jobs/{job_id}/run-now", post(jobs::run_now))
        .route("/users/{user_id}/activity", get(activity::history))
        .route("/ws/extension/{user_id}", get(ws::extension))
        .route("/ws/activity/{user_id}", get(ws::activity))
        .route("/ws/agent/{user_id}", get(ws::agent))
        .with_state(state)
}
