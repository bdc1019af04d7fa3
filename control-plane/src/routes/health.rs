use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::state::AppState;

pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<cp_core::health::AggregateHealth>) {
    let result = state.health.check_all().await;
    let status = if result.status == "UP" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(result))
}
