//! Retry with exponential backoff
//!
//! Waits are `tokio::time::sleep`, so a backing-off request never blocks other
//! connections. Attempts for one operation are strictly sequential.

use crate::error::{AssistantError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: usize,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Delay after the zero-based `attempt` fails.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let delay_ms = (self.initial_delay.as_millis() as f64)
            * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(delay_ms as u64)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent.
    ///
    /// Non-retryable errors are returned unchanged. Spending the budget yields
    /// `AssistantError::RetriesExhausted`. There is no sleep after the last attempt.
    pub async fn retry_with_backoff<F, Fut, T>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&AssistantError) -> bool,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    if attempt + 1 < attempts {
                        let delay = self.delay_for_attempt(attempt);
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Retryable failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(attempt = attempt + 1, error = %e, "Retry budget exhausted");
                    }
                }
            }
        }

        Err(AssistantError::RetriesExhausted { attempts })
    }
}
