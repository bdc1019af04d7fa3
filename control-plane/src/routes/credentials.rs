use axum::extract::{Path, State};
use axum::Json;
use cp_core::error::AppError;
use cp_core::ids::UserId;
use cp_credentials::CookieSet;
use cp_security::AuthenticatedUser;
use serde::Deserialize;

use crate::routes::sessions::OkResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PutCredentialsRequest {
    pub cookies: CookieSet,
}

pub async fn put(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
    Json(body): Json<PutCredentialsRequest>,
) -> Result<Json<OkResponse>, AppError> {
    user.authorize_path_user(&user_id)?;
    state.credentials.put(&user_id, &body.cookies).await?;
    Ok(Json(OkResponse { ok: true }))
}
