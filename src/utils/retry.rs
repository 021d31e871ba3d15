//! Exponential backoff for calls to external model endpoints.
//!
//! The retrieval core never retries on its own; callers opt in by wrapping
//! their collaborators (see [`crate::client::RetryingSummarizer`]).

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier applied after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay to wait after `attempt` (1-based) failed, before jitter.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * factor).min(self.max_delay)
    }
}

/// Determines if an error is worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt >= config.max_attempts || !error.is_retryable() {
            return Err(error);
        }

        let delay = config.delay_after(attempt);
        let delay = delay + Duration::from_millis(jitter_ms(delay.as_millis() as u64 / 4));
        tracing::warn!(attempt, ?delay, %error, "upstream call failed, retrying");
        sleep(delay).await;
    }
}

fn jitter_ms(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts).with_initial_delay(Duration::from_millis(5))
    }

    #[test]
    fn test_delay_after_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
        };
        assert_eq!(config.delay_after(1), Duration::from_millis(100));
        assert_eq!(config.delay_after(2), Duration::from_millis(200));
        assert_eq!(config.delay_after(3), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let result = with_retry(&fast(3), || async {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(UpstreamError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                })
            } else {
                Ok("summary")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "summary");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let counter = AtomicU32::new(0);
        let result = with_retry(&fast(5), || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(UpstreamError::InvalidResponse("no candidates".to_string()))
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::InvalidResponse(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let counter = AtomicU32::new(0);
        let result = with_retry(&fast(3), || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(UpstreamError::Timeout(Duration::from_secs(1)))
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::Timeout(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
