//! Bounded retry with exponential backoff for oracle calls.

use std::future::Future;
use std::time::Duration;

use finrep_models::RetryConfig;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ReportError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Fast retries for tests.
    pub fn fast(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        }
    }

    /// Backoff before the given attempt (attempt 0 never waits).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let backoff = Duration::from_millis(backoff_ms as u64);

        backoff.min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails with a non-transient error, or
    /// attempts run out. Returns the last error.
    pub async fn execute<F, Fut, T>(&self, stage: &str, mut operation: F) -> Result<T, ReportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReportError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            debug!(stage, attempt = attempt + 1, max_attempts = attempts, "Oracle attempt");

            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(stage, retries = attempt, "Oracle call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() || attempt + 1 >= attempts => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let backoff = self.backoff_duration(attempt);
                    warn!(
                        stage,
                        error = %e,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Oracle call failed, retrying"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_is_single_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 1);

        let configured = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(configured.max_attempts, 1);
        assert_eq!(configured.initial_backoff, Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_in_config_still_runs_once() {
        let config = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&config).max_attempts, 1);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.backoff_duration(0), Duration::ZERO);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = RetryPolicy::fast(3)
            .execute("strategy", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ReportError::Timeout(1))
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = RetryPolicy::fast(3)
            .execute("notices", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ReportError::Malformed("bad".to_string()))
            })
            .await;
        assert!(matches!(result, Err(ReportError::Malformed(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = RetryPolicy::fast(2)
            .execute("sentiment", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ReportError::EmptyResponse)
            })
            .await;
        assert!(matches!(result, Err(ReportError::EmptyResponse)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
