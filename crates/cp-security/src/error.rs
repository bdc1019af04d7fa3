use cp_core::error::AppError;

/// Errors raised while validating a bearer token or fetching signing keys.
#[derive(Debug)]
pub enum SecurityError {
    MissingAuthHeader,
    InvalidAuthScheme,
    InvalidToken(String),
    TokenExpired,
    UnknownKeyId(String),
    JwksFetchError(String),
    ValidationFailed(String),
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::MissingAuthHeader => write!(f, "missing authorization header"),
            SecurityError::InvalidAuthScheme => write!(f, "invalid authorization scheme"),
            SecurityError::InvalidToken(msg) => write!(f, "invalid token: {msg}"),
            SecurityError::TokenExpired => write!(f, "token expired"),
            SecurityError::UnknownKeyId(kid) => write!(f, "unknown signing key: {kid}"),
            SecurityError::JwksFetchError(msg) => write!(f, "jwks fetch error: {msg}"),
            SecurityError::ValidationFailed(msg) => write!(f, "token validation failed: {msg}"),
        }
    }
}

impl std::error::Error for SecurityError {}

impl From<SecurityError> for AppError {
    fn from(err: SecurityError) -> Self {
        // Detail stays in the trace logs emitted at the call site; the
        // caller only ever learns that authentication failed.
        tracing::warn!(error = %err, "authentication rejected");
        AppError::Auth("unauthorized".to_string())
    }
}
