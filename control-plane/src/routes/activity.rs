use axum::extract::{Path, Query, State};
use axum::Json;
use cp_core::error::AppError;
use cp_core::ids::UserId;
use cp_events::ActivityEvent;
use cp_security::AuthenticatedUser;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ActivityEvent>>, AppError> {
    user.authorize_path_user(&user_id)?;
    let events = state.events.history(&user_id, params.limit).await?;
    Ok(Json(events))
}
