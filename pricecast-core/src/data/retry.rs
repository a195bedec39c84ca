//! Retry policy for network sources.
//!
//! Delays grow linearly: the wait before attempt `n + 1` is `delay * n`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::provider::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay, multiplied by the number of attempts made so far.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// Wait after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.delay * attempt
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, DataError>
    where
        F: FnMut(u32) -> Result<T, DataError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let wait = match &e {
                        DataError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(*retry_after_secs).max(self.delay_after(attempt))
                        }
                        _ => self.delay_after(attempt),
                    };
                    warn!(%label, attempt, error = %e, wait_ms = wait.as_millis() as u64, "retrying");
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
