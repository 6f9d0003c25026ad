//! Exponential backoff with jitter for suspension-point external calls
//! (safety fetch, holder fetch, swap submission — spec §4.13/§5).

use std::future::Future;
use std::time::Duration;

use backoff::{future::retry, ExponentialBackoff};
use tracing::warn;

use crate::error::Error;

const MAX_ATTEMPTS: u32 = 3;

/// Retries `op` up to [`MAX_ATTEMPTS`] times with exponential backoff.
/// Errors for which `Error::is_retryable` is false abort immediately.
/// Rate-limit errors (`Error::RateLimited`) double the next delay.
pub async fn with_retry<T, F, Fut>(label: &'static str, op: F) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let policy = ExponentialBackoff {
        initial_interval: Duration::from_millis(200),
        multiplier: 2.0,
        max_interval: Duration::from_secs(5),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempt = 0u32;
    retry(policy, || {
        attempt += 1;
        let attempt = attempt;
        async move {
            match op().await {
                Ok(value) => Ok(value),
                Err(e) if attempt >= MAX_ATTEMPTS => {
                    warn!(label, attempt, error = %e, "retry attempts exhausted");
                    Err(backoff::Error::permanent(e))
                }
                Err(Error::RateLimited { retry_after_ms }) => {
                    warn!(label, attempt, retry_after_ms, "rate limited, doubling delay");
                    Err(backoff::Error::transient(Error::RateLimited { retry_after_ms }))
                }
                Err(e) if e.is_retryable() => {
                    warn!(label, attempt, error = %e, "transient error, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        }
    })
    .await
}

/// Wraps a future with a fixed timeout, mapping elapsed time into
/// [`Error::ExecutorTimeout`]. Used for safety/holder fetches (5s) and swap
/// submission (60s).
pub async fn with_timeout<T, Fut>(duration: Duration, fut: Fut) -> Result<T, Error>
where
    Fut: Future<Output = Result<T, Error>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::ExecutorTimeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Error> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permanent_error_aborts_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Error> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::RouteNotFound {
                mint: "x".to_string(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_error_retries_up_to_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Error> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Network("boom".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn timeout_maps_to_executor_timeout() {
        let result: Result<u32, Error> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(1)
        })
        .await;
        assert!(matches!(result, Err(Error::ExecutorTimeout(_))));
    }
}
