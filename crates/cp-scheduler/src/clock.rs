use std::time::Duration;

use cp_core::config::MissedPolicy;
use tokio_util::sync::CancellationToken;

use crate::engine::SchedulerEngine;

/// Runs `engine.tick` at a fixed cadence until `shutdown` is cancelled.
pub fn spawn(
    engine: SchedulerEngine,
    tick_interval: Duration,
    missed_policy: MissedPolicy,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("scheduler clock shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = engine.tick(tick_interval, missed_policy).await {
                        tracing::warn!(error = %err, "scheduler tick failed");
                    }
                }
            }
        }
    });
}
