//! Liveness/readiness checks: a plain trait plus an aggregator, no
//! dependency-injection plugin system involved.

use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down(String),
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

pub trait HealthIndicator: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn check(&self) -> impl std::future::Future<Output = HealthStatus> + Send;
}

#[derive(Clone, Default)]
pub struct HealthRegistry {
    indicators: Vec<Arc<dyn DynHealthIndicator>>,
}

trait DynHealthIndicator: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = HealthStatus> + Send + '_>>;
}

struct Wrapped<T>(T);

impl<T: HealthIndicator> DynHealthIndicator for Wrapped<T> {
    fn name(&self) -> &str {
        self.0.name()
    }
    fn check(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = HealthStatus> + Send + '_>> {
        Box::pin(self.0.check())
    }
}

#[derive(Serialize)]
pub struct AggregateHealth {
    pub status: &'static str,
    pub checks: Vec<NamedStatus>,
}

#[derive(Serialize)]
pub struct NamedStatus {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, indicator: impl HealthIndicator) {
        self.indicators.push(Arc::new(Wrapped(indicator)));
    }

    pub async fn check_all(&self) -> AggregateHealth {
        let mut checks = Vec::with_capacity(self.indicators.len());
        let mut all_up = true;
        for indicator in &self.indicators {
            let status = indicator.check().await;
            all_up &= status.is_up();
            checks.push(NamedStatus {
                name: indicator.name().to_string(),
                status,
            });
        }
        AggregateHealth {
            status: if all_up { "UP" } else { "DOWN" },
            checks,
        }
    }
}
