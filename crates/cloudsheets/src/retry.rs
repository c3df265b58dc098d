//! Retrying runner for remote calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::RetryConfig;

/// Highest exponent applied to the base delay
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Runs a fallible async operation up to `retry_count` times.
#[derive(Debug, Clone, Default)]
pub struct RetryRunner {
    config: RetryConfig,
}

impl RetryRunner {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before attempt `attempt + 1`, jitter included.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if !self.config.use_exponential_backoff {
            return Duration::ZERO;
        }

        let factor = 1u32 << attempt.min(MAX_BACKOFF_SHIFT);
        let jitter = self.config.max_jitter.mul_f64(rand::random::<f64>());
        self.config.base_delay.saturating_mul(factor) + jitter
    }

    /// Call `operation` until it succeeds, fails with an error `retryable`
    /// rejects, or the attempts are used up. The last error is returned.
    ///
    /// There is no wait after the final attempt.
    pub async fn with_retry<T, E, F, Fut, P>(&self, mut operation: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.config.retry_count.max(1);
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            attempt += 1;
            if attempt >= attempts || !retryable(&error) {
                return Err(error);
            }

            let delay = self.backoff(attempt - 1);
            tracing::warn!(attempt, attempts, ?delay, error = %error, "Remote call failed, retrying");
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn runner(retry_count: u32) -> RetryRunner {
        RetryRunner::new(RetryConfig {
            retry_count,
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_uses_every_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = runner(5)
            .with_retry(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("unavailable".to_string())
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err("unavailable".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = runner(5)
            .with_retry(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("not found".to_string())
                },
                |e| e != "not found",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = runner(5)
            .with_retry(
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(format!("attempt {} failed", n))
                    } else {
                        Ok(n)
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retry_count_still_attempts_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), String> = runner(0)
            .with_retry(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                },
                |_| true,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let _: Result<(), String> = runner(3)
            .with_retry(|| async { Err("boom".to_string()) }, |_| true)
            .await;

        // 1s + 2s of backoff, each with up to 1s of jitter
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_secs(5), "{:?}", elapsed);
    }

    #[test]
    fn test_backoff_bounds() {
        let runner = RetryRunner::default();
        for attempt in 0..4 {
            let delay = runner.backoff(attempt);
            let base = Duration::from_secs(1 << attempt);
            assert!(delay >= base);
            assert!(delay <= base + Duration::from_secs(1));
        }

        let flat = RetryRunner::new(RetryConfig {
            use_exponential_backoff: false,
            ..Default::default()
        });
        assert_eq!(flat.backoff(3), Duration::ZERO);
    }
}
