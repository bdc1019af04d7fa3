use cp_core::health::{HealthIndicator, HealthStatus};
use cp_security::JwksCache;
use sqlx::PgPool;
use std::sync::Arc;

pub struct DbHealth(pub PgPool);

impl HealthIndicator for DbHealth {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> HealthStatus {
        match sqlx::query("SELECT 1").execute(&self.0).await {
            Ok(_) => HealthStatus::Up,
            Err(err) => HealthStatus::Down(err.to_string()),
        }
    }
}

pub struct JwksHealth(pub Arc<JwksCache>);

impl HealthIndicator for JwksHealth {
    fn name(&self) -> &str {
        "jwks"
    }

    async fn check(&self) -> HealthStatus {
        // A `kid` guaranteed absent just exercises the fetch path without
        // needing a real token; any outcome other than a fetch error means
        // the issuer is reachable and serving a well-formed key set.
        match self.0.get_key("__health_probe__").await {
            Ok(_) => HealthStatus::Up,
            Err(cp_security::SecurityError::UnknownKeyId(_)) => HealthStatus::Up,
            Err(err) => HealthStatus::Down(err.to_string()),
        }
    }
}
