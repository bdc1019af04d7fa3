use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use cp_core::error::AppError;
use cp_core::ids::UserId;
use tracing::debug;

use crate::error::SecurityError;
use crate::jwt::JwtValidator;

/// The authenticated caller, reconstructed from validated JWT claims.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub claims: serde_json::Value,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: serde_json::Value) -> Self {
        let user_id = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .into();
        Self { user_id, claims }
    }

    /// Reject unless the path-provided user id is exactly the authenticated
    /// identity. This is the one cross-tenant check the core performs; there
    /// are no role or admin overrides.
    pub fn authorize_path_user(&self, path_user_id: &UserId) -> Result<(), AppError> {
        if &self.user_id == path_user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "path user id does not match authenticated identity".into(),
            ))
        }
    }
}

fn extract_bearer_token(header_value: &str) -> Result<&str, SecurityError> {
    let mut parts = header_value.splitn(2, ' ');
    let (scheme, token) = match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) => (scheme, token),
        _ => return Err(SecurityError::InvalidAuthScheme),
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(SecurityError::InvalidAuthScheme);
    }
    Ok(token)
}

async fn extract_jwt_claims<S>(parts: &Parts, state: &S) -> Result<serde_json::Value, AppError>
where
    S: Send + Sync,
    Arc<JwtValidator>: FromRef<S>,
{
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(SecurityError::MissingAuthHeader)?;
    let auth_value = auth_header
        .to_str()
        .map_err(|_| SecurityError::InvalidAuthScheme)?;
    let token = extract_bearer_token(auth_value)?;

    let validator: Arc<JwtValidator> = Arc::from_ref(state);
    let claims = validator.validate(token).await?;
    debug!(uri = %parts.uri, "authenticated request");
    Ok(claims)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<JwtValidator>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = extract_jwt_claims(parts, state).await?;
        Ok(AuthenticatedUser::from_claims(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claims_reads_sub() {
        let user = AuthenticatedUser::from_claims(serde_json::json!({ "sub": "auth0|u1" }));
        assert_eq!(user.user_id, UserId::new("auth0|u1"));
    }

    #[test]
    fn authorize_rejects_mismatched_path_user() {
        let user = AuthenticatedUser::from_claims(serde_json::json!({ "sub": "u1" }));
        assert!(user.authorize_path_user(&UserId::new("u1")).is_ok());
        assert!(user.authorize_path_user(&UserId::new("u2")).is_err());
    }

    #[test]
    fn bearer_token_requires_scheme() {
        assert!(extract_bearer_token("Bearer abc.def.ghi").is_ok());
        assert!(extract_bearer_token("Basic abc").is_err());
        assert!(extract_bearer_token("abc").is_err());
    }
}
