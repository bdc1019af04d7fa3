use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::http::StatusCode;

/// Error taxonomy shared across every component of the control plane (see
/// the error handling design — each variant maps to one HTTP status and
/// never retries silently).
pub enum AppError {
    Auth(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    NoCredentials,
    CorruptCredentials,
    NotConnected(String),
    Timeout(String),
    BadRequest(String),
    Upstream(String),
    Internal(String),
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Auth(msg) => error_body(StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => error_body(StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => error_body(StatusCode::CONFLICT, msg),
            AppError::NoCredentials => {
                error_body(StatusCode::UNPROCESSABLE_ENTITY, "no stored browser credentials for this user")
            }
            AppError::CorruptCredentials => {
                error_body(StatusCode::UNPROCESSABLE_ENTITY, "stored credentials could not be decrypted")
            }
            AppError::NotConnected(msg) => error_body(StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Timeout(msg) => error_body(StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(msg) => error_body(StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Auth(m) => write!(f, "auth error: {m}"),
            AppError::Forbidden(m) => write!(f, "forbidden: {m}"),
            AppError::NotFound(m) => write!(f, "not found: {m}"),
            AppError::Conflict(m) => write!(f, "conflict: {m}"),
            AppError::NoCredentials => write!(f, "no credentials"),
            AppError::CorruptCredentials => write!(f, "corrupt credentials"),
            AppError::NotConnected(m) => write!(f, "not connected: {m}"),
            AppError::Timeout(m) => write!(f, "timeout: {m}"),
            AppError::BadRequest(m) => write!(f, "bad request: {m}"),
            AppError::Upstream(m) => write!(f, "upstream error: {m}"),
            AppError::Internal(m) => write!(f, "internal error: {m}"),
        }
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn parts(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let (status, body) = parts(AppError::Conflict("run already active".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "run already active");
    }

    #[tokio::test]
    async fn no_credentials_maps_to_422() {
        let (status, _) = parts(AppError::NoCredentials).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let (status, body) = parts(AppError::Internal("db pool poisoned".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal error");
    }

    #[tokio::test]
    async fn timeout_maps_to_504() {
        let (status, _) = parts(AppError::Timeout("extension send".into())).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}

/// Generate `From<E> for AppError` implementations mapping external error
/// types onto a specific variant.
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::error::AppError {
                fn from(err: $err_ty) -> Self {
                    $crate::error::AppError::$variant(err.to_string())
                }
            }
        )*
    };
}
