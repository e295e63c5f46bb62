//! Bounded exponential backoff for provider requests.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::errors::{MarketDataError, RetryClass};

/// Default number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

fn retry_with_backoff(error: &MarketDataError) -> bool {
    error.retry_class() == RetryClass::WithBackoff
}

/// Retry policy: up to `max_attempts` tries with delays of
/// `base_delay * 2^(n-1)` capped at `max_delay`.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Decides whether an error is worth another attempt.
    pub retry_if: fn(&MarketDataError) -> bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            retry_if: retry_with_backoff,
        }
    }
}

impl BackoffPolicy {
    /// Same schedule shape with a different base delay and cap.
    pub fn with_delays(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T, MarketDataError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && (self.retry_if)(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
