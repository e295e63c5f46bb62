use std::time::Duration;

/// Sustained upstream request rate (requests per second).
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: f64 = 0.6;

/// Token bucket capacity; 1 means no bursting.
pub const DEFAULT_RATE_BURST: u32 = 1;

/// Batch units allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 1;

/// Item names per upstream request.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Upper bound on `batch_size`, above which request URIs get too long.
pub const MAX_BATCH_SIZE: usize = 100;

/// Tracked pairs selected per cycle, across all locations.
pub const DEFAULT_SELECTION_LIMIT: usize = 50;

/// A tracked pair is due for refresh once its last check is this old.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Sleep between cycles when nothing is due.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_secs(30);

/// Sleep after a failed task selection.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Upper bound on `min_refresh_interval`.
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
