//! Retry utilities for source fetches.
//!
//! Transient failures (HTTP 429, 5xx, network errors) are retried with
//! exponential back-off and jitter. Parse failures, 404s and other client
//! errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` if `err` is a transient condition worth retrying.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        ScraperError::NotFound { .. }
        | ScraperError::Deserialize { .. }
        | ScraperError::Normalization { .. } => false,
    }
}

/// Executes `operation`, retrying transient errors up to `max_retries` times.
///
/// The wait before retry `n` is `backoff_base_ms * 2^(n-1)` with ±25 %
/// jitter. A rate-limit response's `Retry-After` is honoured when it is
/// longer. Delays are capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
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
        let jittered = (computed as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        let requested = match &err {
            ScraperError::RateLimited {
                retry_after_secs, ..
            } => retry_after_secs.saturating_mul(1_000),
            _ => 0,
        };
        let delay_ms = jittered.max(requested).min(MAX_DELAY_MS);

        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            error = %err,
            "transient scraper error, retrying after back-off"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn unexpected(status: u16) -> ScraperError {
        ScraperError::UnexpectedStatus {
            status,
            url: "https://feeds.example.com".to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScraperError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_then_gives_up() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result: Result<(), _> = retry_with_backoff(2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err(unexpected(502))
            }
        })
        .await;
        assert!(matches!(
            result,
            Err(ScraperError::UnexpectedStatus { status: 502, .. })
        ));
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result: Result<(), _> = retry_with_backoff(5, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err(ScraperError::NotFound {
                    url: "https://feeds.example.com/missing".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(ScraperError::NotFound { .. })));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&unexpected(403)));
        assert!(is_retriable(&unexpected(500)));
        assert!(is_retriable(&ScraperError::RateLimited {
            domain: "feeds.example.com".to_owned(),
            retry_after_secs: 0
        }));
    }
}
