use std::future::Future;
use std::time::Duration;

use cp_core::error::AppError;

/// Retries `op` at a fixed cadence until it succeeds or `budget` elapses.
/// Used by callers that hold a `starting` session and need its endpoint to
/// become reachable before giving up with a `Timeout` error.
pub async fn retry_during_warmup<F, Fut, T>(budget: Duration, op: F) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    const POLL_INTERVAL: Duration = Duration::from_millis(500);

    let deadline = tokio::time::Instant::now() + budget;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(_) => {
                return Err(AppError::Timeout(
                    "session did not become ready within the warmup window".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_once_op_stops_failing() {
        let attempts = AtomicU32::new(0);
        let result = retry_during_warmup(Duration::from_secs(2), || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(AppError::Upstream("not ready".into()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn times_out_when_op_never_succeeds() {
        let result: Result<(), AppError> =
            retry_during_warmup(Duration::from_millis(50), || async {
                Err(AppError::Upstream("still not ready".into()))
            })
            .await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }
}
