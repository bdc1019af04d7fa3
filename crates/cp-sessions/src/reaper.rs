use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::manager::SessionManager;

/// Background sweep that terminates sessions past their idle TTL. Runs
/// until `shutdown` is cancelled.
pub fn spawn(manager: SessionManager, interval: Duration, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("session reaper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match manager.reap_expired().await {
                        Ok(count) if count > 0 => tracing::info!(reaped = count, "reaped expired sessions"),
                        Ok(_) => {}
                        Err(err) => tracing::warn!(error = %err, "session reaper sweep failed"),
                    }
                }
            }
        }
    });
}
