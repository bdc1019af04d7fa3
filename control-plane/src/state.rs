use std::sync::Arc;

use axum::extract::FromRef;
use cp_core::health::HealthRegistry;
use cp_credentials::CredentialStore;
use cp_events::ActivityEventBus;
use cp_runs::RunController;
use cp_scheduler::SchedulerEngine;
use cp_security::JwtValidator;
use cp_sessions::SessionManager;
use cp_bridge::ExtensionBridge;

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub jwt_validator: Arc<JwtValidator>,
    pub credentials: CredentialStore,
    pub sessions: SessionManager,
    pub bridge: ExtensionBridge,
    pub events: ActivityEventBus,
    pub runs: RunController,
    pub scheduler: SchedulerEngine,
    pub health: HealthRegistry,
}

impl FromRef<AppState> for Arc<JwtValidator> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_validator.clone()
    }
}
