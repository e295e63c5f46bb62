use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::{Error, Result};

/// Bounds how many batch units are in flight at once.
///
/// A unit holds its permit from before the network call until its write
/// has finished.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimiter {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::Unexpected(format!("concurrency limiter closed: {}", e)))
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}
