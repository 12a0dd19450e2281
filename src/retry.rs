//! Retry Executor
//!
//! Re-runs a failing async operation a bounded number of times with a
//! linearly growing delay between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Delay unit between attempts when none is configured
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

/// Attempts per operation when none is configured
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

// == Retry Policy ==
/// Bounded retry with linear backoff.
///
/// After failed attempt `i` (1-indexed) the executor waits `base_delay * i`
/// before attempt `i + 1`. There is no jitter and no upper bound on the
/// delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` below one is raised to one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay inserted after the given failed attempt. Saturates at
    /// `Duration::MAX` instead of overflowing.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.checked_mul(attempt).unwrap_or(Duration::MAX)
    }

    // == Execute ==
    /// Runs `operation` until it succeeds or the attempt budget is spent.
    ///
    /// The error of the final attempt is returned exactly as the operation
    /// produced it.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        %error,
                        "Giving up after final attempt"
                    );
                    return Err(error);
                }
                Err(error) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        ?delay,
                        %error,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}
