use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use tracing::debug;

use crate::config::SecurityConfig;
use crate::error::SecurityError;
use crate::jwks::JwksCache;

enum KeySource {
    Jwks(Arc<JwksCache>),
    Static(DecodingKey),
}

/// Validates a bearer token's signature and standard claims, returning the
/// raw claim set. A single identity type (`AuthenticatedUser`) is built from
/// it downstream — this service has no need for the multiple-identity-types
/// indirection a generic framework would carry.
pub struct JwtValidator {
    key_source: KeySource,
    config: SecurityConfig,
}

impl JwtValidator {
    pub fn new(jwks: Arc<JwksCache>, config: SecurityConfig) -> Self {
        Self {
            key_source: KeySource::Jwks(jwks),
            config,
        }
    }

    pub fn new_with_static_key(key: DecodingKey, config: SecurityConfig) -> Self {
        Self {
            key_source: KeySource::Static(key),
            config,
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub async fn validate(&self, token: &str) -> Result<serde_json::Value, SecurityError> {
        let header = decode_header(token)
            .map_err(|e| SecurityError::InvalidToken(format!("failed to decode header: {e}")))?;

        let algorithm = header.alg;
        debug!(?algorithm, kid = ?header.kid, "decoded jwt header");

        if self.config.allowed_algorithms.is_empty() {
            return Err(SecurityError::ValidationFailed(
                "no allowed jwt algorithms configured".into(),
            ));
        }
        if !self.config.allowed_algorithms.contains(&algorithm) {
            return Err(SecurityError::ValidationFailed(format!(
                "disallowed jwt algorithm: {algorithm:?}"
            )));
        }

        let decoding_key = match &self.key_source {
            KeySource::Static(key) => key.clone(),
            KeySource::Jwks(jwks) => {
                let kid = header.kid.as_deref().ok_or_else(|| {
                    SecurityError::InvalidToken("jwt header missing 'kid' field".into())
                })?;
                jwks.get_key(kid).await?
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.algorithms = self.config.allowed_algorithms.clone();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let token_data = decode::<serde_json::Value>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    SecurityError::ValidationFailed("invalid issuer".into())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    SecurityError::ValidationFailed("invalid audience".into())
                }
                _ => SecurityError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}
