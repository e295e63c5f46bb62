//! Token bucket rate limiter for outbound provider requests.
//!
//! One limiter is shared by every concurrent batch so the aggregate request
//! rate, not the per-task rate, stays under the upstream budget.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

/// Default rate: the public data API tolerates roughly one call per second.
const DEFAULT_REQUESTS_PER_SECOND: f64 = 1.0;

/// Default bucket capacity. A capacity of one disables bursting entirely.
const DEFAULT_BUCKET_CAPACITY: f64 = 1.0;

/// Token bucket state.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens.
    tokens: f64,
    /// Last time the bucket was updated.
    last_update: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn with_config(config: &RateLimitConfig) -> Self {
        Self {
            tokens: config.burst_capacity,
            last_update: Instant::now(),
            rate: config.requests_per_second,
            capacity: config.burst_capacity,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    /// Try to take a token immediately.
    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Wait time until the next token becomes available.
    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Duration::from_secs_f64(tokens_needed / self.rate)
        }
    }
}

/// Rate limiter configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitConfig {
    /// Sustained request rate. Fractional values (e.g. `0.6`) are allowed.
    pub requests_per_second: f64,
    /// Maximum number of tokens that may accumulate while idle.
    pub burst_capacity: f64,
}

impl RateLimitConfig {
    /// Config with the given rate and no bursting.
    pub fn per_second(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
            burst_capacity: DEFAULT_BUCKET_CAPACITY,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_second(DEFAULT_REQUESTS_PER_SECOND)
    }
}

/// Shared token bucket rate limiter.
///
/// `acquire` never rejects: it suspends the caller until a token is
/// available. Thread-safe; wrap it in an `Arc` to share between tasks.
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter. Non-positive rates or capacities are clamped to
    /// sane minimums so that `acquire` can always make progress.
    pub fn new(config: RateLimitConfig) -> Self {
        let config = RateLimitConfig {
            requests_per_second: if config.requests_per_second > 0.0 {
                config.requests_per_second
            } else {
                warn!(
                    "Rate limiter configured with non-positive rate {}, using {}",
                    config.requests_per_second, DEFAULT_REQUESTS_PER_SECOND
                );
                DEFAULT_REQUESTS_PER_SECOND
            },
            burst_capacity: config.burst_capacity.max(DEFAULT_BUCKET_CAPACITY),
        };

        Self {
            bucket: Mutex::new(TokenBucket::with_config(&config)),
            config,
        }
    }

    /// The effective configuration after clamping.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Lock the bucket, recovering from poison if necessary.
    ///
    /// The worst case after a poisoned lock is a slightly inaccurate token
    /// count, which is preferable to panicking the pipeline.
    fn lock_bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Acquire a token, waiting asynchronously until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait_time = {
                let mut bucket = self.lock_bucket();

                if bucket.try_acquire() {
                    debug!("Rate limiter: acquired token");
                    return;
                }

                bucket.time_until_available()
            };

            if wait_time > Duration::ZERO {
                debug!("Rate limiter: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
    }

    /// Try to acquire a token without waiting.
    pub fn try_acquire(&self) -> bool {
        self.lock_bucket().try_acquire()
    }

    /// Tokens currently available (after refill).
    pub fn remaining_tokens(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        bucket.refill();
        bucket.tokens
    }

    /// Refill the bucket to capacity.
    pub fn reset(&self) {
        *self.lock_bucket() = TokenBucket::with_config(&self.config);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
