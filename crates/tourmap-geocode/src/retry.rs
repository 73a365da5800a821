//! Retry with exponential back-off and jitter for geocoding lookups.
//!
//! Only transient conditions are retried: network timeouts and connection
//! failures, HTTP 5xx, and HTTP 429. A definitive "no match" is not an error
//! at all (`Ok(None)`) and never reaches this module.

use std::future::Future;
use std::time::Duration;

use crate::error::GeocodeError;

const MAX_DELAY_MS: u64 = 30_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
pub(crate) fn is_retriable(err: &GeocodeError) -> bool {
    match err {
        GeocodeError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        GeocodeError::RateLimited { .. } => true,
        GeocodeError::UnexpectedStatus { status, .. } => *status >= 500,
        GeocodeError::Deserialize { .. }
        | GeocodeError::InvalidCoordinates { .. }
        | GeocodeError::InvalidBaseUrl { .. }
        | GeocodeError::ThrottleClosed(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The n-th retry waits `backoff_base_ms × 2^(n-1)` ± 25 % jitter, capped at
/// 30 s. A `Retry-After` hint from a 429 response raises the wait to at
/// least that many seconds (still capped). Non-retriable errors are
/// returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, GeocodeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GeocodeError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered = (computed.min(MAX_DELAY_MS) as f64
                    * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let hinted = match &err {
                    &GeocodeError::RateLimited { retry_after_secs } => {
                        retry_after_secs.saturating_mul(1000)
                    }
                    _ => 0,
                };
                let delay_ms = jittered.max(hinted).min(MAX_DELAY_MS);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "geocoder transient error; retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn deserialize_err() -> GeocodeError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        GeocodeError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    fn rate_limited() -> GeocodeError {
        GeocodeError::RateLimited {
            retry_after_secs: 0,
        }
    }

    #[test]
    fn rate_limited_is_retriable() {
        assert!(is_retriable(&rate_limited()));
    }

    #[test]
    fn server_error_status_is_retriable() {
        assert!(is_retriable(&GeocodeError::UnexpectedStatus {
            status: 503,
            url: "http://x".to_owned()
        }));
    }

    #[test]
    fn client_error_status_is_not_retriable() {
        assert!(!is_retriable(&GeocodeError::UnexpectedStatus {
            status: 403,
            url: "http://x".to_owned()
        }));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        assert!(!is_retriable(&deserialize_err()));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, GeocodeError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limited_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, GeocodeError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(rate_limited())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "2 retries → 3 attempts");
        assert!(matches!(result, Err(GeocodeError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_deserialize_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(deserialize_err())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(GeocodeError::Deserialize { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_exponentially() {
        let start = tokio::time::Instant::now();
        let _ = retry_with_backoff(3, 1_000, || async { Err::<(), _>(rate_limited()) }).await;
        // 1s + 2s + 4s, each at least 75 % after jitter.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5_250), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(8_750), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_hint_raises_delay() {
        let start = tokio::time::Instant::now();
        let _ = retry_with_backoff(1, 0, || async {
            Err::<(), _>(GeocodeError::RateLimited {
                retry_after_secs: 5,
            })
        })
        .await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
