//! Waiting on provider resources with exponential backoff and cancellation.

use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Configuration for resource waiting with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time to wait before timeout
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            timeout: Duration::from_secs(600),
        }
    }
}

/// How a wait ended, when the check itself did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Ready(T),
    TimedOut { attempts: u32, waited: Duration },
    Cancelled,
}

/// Poll `check` until it yields a value, the timeout passes or `cancel` fires.
///
/// `check` returns `Ok(Some(_))` when ready and `Ok(None)` to poll again.
/// An `Err` from `check` ends the wait immediately and is returned as-is.
pub async fn wait_until<T, E, F, Fut>(
    config: &WaitConfig,
    cancel: Option<&CancellationToken>,
    resource_name: &str,
    mut check: F,
) -> Result<WaitOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .without_max_times()
        .build();

    loop {
        attempts += 1;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Ok(WaitOutcome::Cancelled);
        }

        if let Some(value) = check().await? {
            debug!(resource = %resource_name, attempts, "Resource ready");
            return Ok(WaitOutcome::Ready(value));
        }

        let waited = start.elapsed();
        if waited >= config.timeout {
            return Ok(WaitOutcome::TimedOut { attempts, waited });
        }

        let delay = delays
            .next()
            .unwrap_or(config.max_delay)
            .min(config.timeout - waited);
        debug!(
            resource = %resource_name,
            attempt = attempts,
            delay_ms = delay.as_millis(),
            "Resource not ready, retrying"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = async {
                match cancel {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending::<()>().await,
                }
            } => return Ok(WaitOutcome::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> WaitConfig {
        WaitConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_ready_after_some_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome: Result<_, ()> = wait_until(&fast(), None, "lb1", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok((n >= 3).then_some(n))
            }
        })
        .await;

        assert_eq!(outcome, Ok(WaitOutcome::Ready(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_check_error_stops_waiting() {
        let outcome: Result<WaitOutcome<()>, &str> =
            wait_until(&fast(), None, "lb1", || async { Err("load balancer failed") }).await;
        assert_eq!(outcome, Err("load balancer failed"));
    }

    #[tokio::test]
    async fn test_times_out() {
        let config = WaitConfig {
            timeout: Duration::from_millis(30),
            ..fast()
        };
        let outcome: Result<WaitOutcome<()>, ()> =
            wait_until(&config, None, "lb1", || async { Ok(None) }).await;
        assert!(matches!(outcome, Ok(WaitOutcome::TimedOut { attempts, .. }) if attempts >= 2));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome: Result<WaitOutcome<()>, ()> =
            wait_until(&fast(), Some(&token), "lb1", || async { Ok(None) }).await;
        assert_eq!(outcome, Ok(WaitOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_while_sleeping() {
        let token = CancellationToken::new();
        let config = WaitConfig {
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
        };
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome: Result<WaitOutcome<()>, ()> =
            wait_until(&config, Some(&token), "lb1", || async { Ok(None) }).await;
        assert_eq!(outcome, Ok(WaitOutcome::Cancelled));
    }
}
