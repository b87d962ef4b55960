//! Retry-with-backoff for a single fallible async operation.
//!
//! Attempts run strictly one after another; the helper only sleeps between
//! them and never runs work concurrently.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

// ---

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    // ---
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,

    /// Wait before the second attempt.
    pub base_delay: Duration,

    /// Factor applied to the wait after each further failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    // ---
    /// A single attempt and no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Wait after the given failed attempt (1-based): `base * multiplier^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        // ---
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(0.0).powi(exponent);
        self.base_delay.mul_f64(factor.min(1.0e6))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached.
///
/// Returns the last error when every attempt failed.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    // ---
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    "Attempt {}/{} failed: {} (retrying in {:?})",
                    attempt,
                    max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!("Attempt {}/{} failed: {}", attempt, max_attempts, err);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_grows_exponentially() {
        // ---
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
        assert_eq!(RetryPolicy::no_retry().delay_after(5), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        // ---
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = retry_with_backoff(&quick(3), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("failure {n}"))
            } else {
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        // ---
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(&quick(4), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("failure {n}"))
        })
        .await;

        assert_eq!(result, Err("failure 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        // ---
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_with_backoff(&quick(0), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("nope")
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
