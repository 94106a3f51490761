//! Retry executor with linear backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to attempt an operation and how long to wait in between.
///
/// The wait after failed attempt `i` (0-based) is `retry_timeout * (i + 1)`:
/// linear, not exponential. `max_retries` counts the first attempt, so the
/// default of 1 means no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_timeout: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_timeout: Duration) -> Self {
        Self {
            max_retries,
            retry_timeout,
        }
    }

    /// Number of attempts actually made; zero is treated as one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay between attempt `attempt` (0-based) and the next one.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_timeout
            .saturating_mul(attempt.saturating_add(1))
    }

    /// Runs `op` until it succeeds or the attempts are exhausted.
    ///
    /// Returns the first success immediately. On exhaustion returns the error
    /// of the last attempt; earlier errors are only logged.
    pub async fn execute<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts();
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, max_retries = attempts, "Attempt succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt + 1 >= attempts => {
                    if attempts > 1 {
                        warn!(max_retries = attempts, error = %err, "Retries exhausted");
                    }
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
