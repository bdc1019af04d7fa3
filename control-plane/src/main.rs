mod collaborators;
mod health;
mod routes;
mod state;

use std::sync::Arc;

use aes_gcm::Aes256Gcm;
use cp_core::config::{self, AppConfig};
use cp_core::health::HealthRegistry;
use cp_credentials::key::cipher_from_base64;
use cp_credentials::CredentialStore;
use cp_events::ActivityEventBus;
use cp_runs::{RunController, WorkflowRegistry};
use cp_scheduler::SchedulerEngine;
use cp_security::{JwksCache, JwtValidator, SecurityConfig};
use cp_sessions::SessionManager;
use cp_storage::{
    ActivityRepository, CredentialRepository, CronJobRepository, CronJobRunRepository,
    ScheduledPostRepository, SessionRepository,
};
use tokio_util::sync::CancellationToken;

use collaborators::{HttpRuntimeAllocator, HttpWorkflowHandler};
use health::{DbHealth, JwksHealth};
use state::AppState;

fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.filter));

    if logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app_config: AppConfig = config::load("dev").unwrap_or_default();
    init_tracing(&app_config.logging);

    let pool = cp_storage::pool::connect(&app_config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let security_config = SecurityConfig::new(
        app_config.auth.jwks_url.clone(),
        app_config.auth.issuer_url.clone(),
        app_config.auth.audience.clone(),
    );
    let jwks = Arc::new(JwksCache::new(security_config.clone()).await?);
    let jwt_validator = Arc::new(JwtValidator::new(jwks.clone(), security_config));

    let cipher: Aes256Gcm = cipher_from_base64(&app_config.credentials.encryption_key_base64)?;
    let credentials = CredentialStore::new(CredentialRepository::new(pool.clone()), cipher);

    let allocator: Arc<dyn cp_sessions::RuntimeAllocator> = Arc::new(HttpRuntimeAllocator::new(
        app_config.collaborators.instance_farm_url.clone(),
    ));
    let sessions = SessionManager::new(
        SessionRepository::new(pool.clone()),
        credentials.clone(),
        allocator,
        app_config.session.idle_ttl(),
        app_config.session.warmup_timeout(),
    );

    let events = ActivityEventBus::new(ActivityRepository::new(pool.clone()));
    let bridge = cp_bridge::ExtensionBridge::new(events.clone());

    let workflow_handler: Arc<dyn cp_runs::WorkflowHandler> = Arc::new(HttpWorkflowHandler::new(
        app_config.collaborators.workflow_runtime_url.clone(),
    ));
    let mut registry = WorkflowRegistry::new();
    registry.register("content_post", workflow_handler.clone());
    registry.register("engagement", workflow_handler);
    let runs = RunController::new(Arc::new(registry), events.clone(), sessions.clone());

    let scheduler = SchedulerEngine::new(
        ScheduledPostRepository::new(pool.clone()),
        CronJobRepository::new(pool.clone()),
        CronJobRunRepository::new(pool.clone()),
        runs.clone(),
    );
    scheduler.reconcile_on_startup().await?;

    let mut health = HealthRegistry::new();
    health.register(DbHealth(pool.clone()));
    health.register(JwksHealth(jwks));

    let shutdown = CancellationToken::new();
    cp_sessions::reaper::spawn(sessions.clone(), app_config.session.reap_interval(), shutdown.clone());
    cp_scheduler::clock::spawn(
        scheduler.clone(),
        app_config.scheduler.tick(),
        app_config.scheduler.missed_policy,
        shutdown.clone(),
    );

    let state = AppState {
        pool,
        jwt_validator,
        credentials,
        sessions,
        bridge,
        events,
        runs,
        scheduler,
        health,
    };

    let router = routes::build(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::catch_panic::CatchPanicLayer::new())
        .layer(tower_http::cors::CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&app_config.bind_addr).await?;
    tracing::info!(addr = %app_config.bind_addr, "control plane listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
