//! Pipeline tuning knobs.

use std::time::Duration;

use craftflow_market_data::RateLimitConfig;

use crate::constants::*;
use crate::errors::{Error, Result};

/// Configuration for [`IngestorService`](super::IngestorService).
#[derive(Debug, Clone, PartialEq)]
pub struct IngestorConfig {
    pub max_requests_per_second: f64,
    pub rate_burst: u32,
    pub max_concurrent_batches: usize,
    pub batch_size: usize,
    pub selection_limit: usize,
    pub min_refresh_interval: Duration,
    pub idle_sleep: Duration,
    pub error_backoff: Duration,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
            rate_burst: DEFAULT_RATE_BURST,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            batch_size: DEFAULT_BATCH_SIZE,
            selection_limit: DEFAULT_SELECTION_LIMIT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

impl IngestorConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_requests_per_second.is_finite() && self.max_requests_per_second > 0.0) {
            return Err(Error::InvalidConfigValue(format!(
                "max_requests_per_second must be positive, got {}",
                self.max_requests_per_second
            )));
        }
        if self.rate_burst == 0 {
            return Err(Error::InvalidConfigValue(
                "rate_burst must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_batches == 0 {
            return Err(Error::InvalidConfigValue(
                "max_concurrent_batches must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(Error::InvalidConfigValue(format!(
                "batch_size must be within 1..={}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        if self.min_refresh_interval > MAX_REFRESH_INTERVAL {
            return Err(Error::InvalidConfigValue(format!(
                "min_refresh_interval must be at most {:?}, got {:?}",
                MAX_REFRESH_INTERVAL, self.min_refresh_interval
            )));
        }
        if self.selection_limit == 0 {
            return Err(Error::InvalidConfigValue(
                "selection_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: self.max_requests_per_second,
            burst_capacity: f64::from(self.rate_burst),
        }
    }
}
