//! Retry policy with exponential backoff and optional jitter.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;

/// Bounded retry with exponential backoff.
///
/// The delay before retry `n` (0-based) is
/// `min(base_delay * exponential_base^n, max_delay)`, scaled by a uniform
/// factor in `[0.5, 1.0]` when jitter is enabled. Every failure is retried;
/// the last one is returned unchanged once attempts run out.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    exponential_base: f64,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a retry policy. `max_attempts` is clamped to at least 1.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        exponential_base: f64,
        jitter: bool,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            exponential_base,
            jitter,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.exponential_base,
            config.jitter,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn has_jitter(&self) -> bool {
        self.jitter
    }

    /// Un-jittered delay before retry `attempt` (0-based).
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Delay actually slept before retry `attempt`, jitter included.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.calculate_backoff(attempt);
        if self.jitter {
            backoff.mul_f64(rand::rng().random_range(0.5..=1.0))
        } else {
            backoff
        }
    }

    /// Run `operation` until it succeeds or attempts are exhausted.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "Operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if attempt + 1 >= self.max_attempts {
                        return Err(err);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Attempt failed, retrying"
                    );

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_secs(1),
            Duration::from_secs(30),
            2.0,
            false,
        )
    }

    #[test]
    fn test_calculate_backoff() {
        let policy = policy(5);
        assert_eq!(policy.calculate_backoff(0), Duration::from_secs(1));
        assert_eq!(policy.calculate_backoff(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_backoff(2), Duration::from_secs(4));
        assert_eq!(policy.calculate_backoff(10), Duration::from_secs(30));
        assert_eq!(policy.calculate_backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_from_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.has_jitter());
        assert_eq!(policy.calculate_backoff(0), Duration::from_secs(1));
        assert_eq!(policy.max_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(policy(0).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_one_then_two_seconds() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let start = tokio::time::Instant::now();

        let result: Result<(), String> = policy(3)
            .execute(|| {
                let attempts = attempts.clone();
                async move {
                    let mut attempts = attempts.lock().unwrap();
                    attempts.push(start.elapsed());
                    Err(format!("failure {}", attempts.len()))
                }
            })
            .await;

        assert_eq!(
            *attempts.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3)
            ]
        );
        assert_eq!(result.unwrap_err(), "failure 3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_on_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let result: Result<u32, String> = policy(3)
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<&str, String> = policy(3)
            .execute(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("connection refused".to_string())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_within_half_to_full_delay() {
        let policy = RetryPolicy::new(
            2,
            Duration::from_secs(4),
            Duration::from_secs(30),
            2.0,
            true,
        );
        let start = tokio::time::Instant::now();

        let _: Result<(), &str> = policy.execute(|| async { Err("down") }).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(4), "elapsed {elapsed:?}");
    }
}
