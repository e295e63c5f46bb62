//! The ingestion control loop.
//!
//! One cycle: select outdated (item, location) pairs, split each location's
//! items into batches, and run every batch as its own task that fetches,
//! processes and persists under the shared rate and concurrency limits.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use craftflow_market_data::{PriceProvider, RateLimiter};
use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::batcher::make_batches;
use super::config::IngestorConfig;
use super::limiter::ConcurrencyLimiter;
use super::model::{BatchReport, BatchStatus, CycleReport, SaveSummary, TaskMap};
use super::processor::PriceProcessor;
use super::store::IngestStore;
use crate::catalog::LocationId;
use crate::errors::{Error, Result};

/// Location `api_name -> id`, loaded once and shared read-only by every unit.
pub type LocationCache = HashMap<String, LocationId>;

/// Orchestrates selection, batching and the per-batch fetch/persist units.
pub struct IngestorService {
    provider: Arc<dyn PriceProvider>,
    store: Arc<dyn IngestStore>,
    processor: PriceProcessor,
    rate_limiter: Arc<RateLimiter>,
    concurrency: ConcurrencyLimiter,
    config: IngestorConfig,
}

impl IngestorService {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        store: Arc<dyn IngestStore>,
        config: IngestorConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            store,
            processor: PriceProcessor::new(),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit())),
            concurrency: ConcurrencyLimiter::new(config.max_concurrent_batches),
            config,
        })
    }

    pub fn config(&self) -> &IngestorConfig {
        &self.config
    }

    /// Load the location cache. An empty location table is an error: no
    /// task could ever be dispatched.
    pub fn load_locations(&self) -> Result<Arc<LocationCache>> {
        let locations = self.store.location_map()?;
        if locations.is_empty() {
            return Err(Error::ReferenceData(
                "location table is empty".to_string(),
            ));
        }
        info!("Loaded {} locations into cache", locations.len());
        Ok(Arc::new(locations))
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Fails only if the location cache cannot be loaded. In-flight batch
    /// units always finish before this returns.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let locations = self.load_locations()?;
        info!(
            "Ingestor started with provider {} ({} req/s, {} concurrent batches, batch size {})",
            self.provider.id(),
            self.config.max_requests_per_second,
            self.config.max_concurrent_batches,
            self.config.batch_size
        );

        while !shutdown.is_cancelled() {
            let tasks = match self.select_tasks() {
                Ok(tasks) => tasks,
                Err(e) => {
                    error!(
                        "Task selection failed: {}. Retrying in {:?}",
                        e, self.config.error_backoff
                    );
                    sleep_or_cancel(self.config.error_backoff, &shutdown).await;
                    continue;
                }
            };

            if tasks.is_empty() {
                debug!(
                    "No outdated items, sleeping {:?}",
                    self.config.idle_sleep
                );
                sleep_or_cancel(self.config.idle_sleep, &shutdown).await;
                continue;
            }

            let report = self.dispatch(&locations, tasks, &shutdown).await;
            log_cycle(&report);
        }

        info!("Ingestor stopped");
        Ok(())
    }

    /// One full cycle: load locations, select, dispatch, await.
    ///
    /// Unlike [`run`](Self::run), a selection failure is returned to the
    /// caller. Returns an empty report when nothing is due.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<CycleReport> {
        let locations = self.load_locations()?;
        let tasks = self.select_tasks()?;
        if tasks.is_empty() {
            return Ok(CycleReport::default());
        }

        let report = self.dispatch(&locations, tasks, shutdown).await;
        log_cycle(&report);
        Ok(report)
    }

    fn select_tasks(&self) -> Result<TaskMap> {
        let tasks = self
            .store
            .outdated_tasks(self.config.selection_limit, self.config.min_refresh_interval)?;
        let total: usize = tasks.values().map(Vec::len).sum();
        if total > 0 {
            info!(
                "Selected {} outdated items across {} locations",
                total,
                tasks.len()
            );
        }
        Ok(tasks)
    }

    async fn dispatch(
        &self,
        locations: &Arc<LocationCache>,
        tasks: TaskMap,
        shutdown: &CancellationToken,
    ) -> CycleReport {
        let mut report = CycleReport::default();
        let mut units = JoinSet::new();

        'locations: for (location, items) in tasks {
            if shutdown.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let Some(&location_id) = locations.get(&location) else {
                warn!(
                    "Location '{}' not in reference cache, skipping {} items",
                    location,
                    items.len()
                );
                report.locations_skipped.push(location);
                continue;
            };

            let batches = make_batches(&items, self.config.batch_size);
            info!(
                "Processing {}: {} items in {} batches",
                location,
                items.len(),
                batches.len()
            );

            for batch in batches {
                if shutdown.is_cancelled() {
                    report.interrupted = true;
                    break 'locations;
                }

                let permit = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        report.interrupted = true;
                        break 'locations;
                    }
                    permit = self.concurrency.acquire() => permit,
                };
                let permit = match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Could not acquire batch slot: {}", e);
                        break 'locations;
                    }
                };

                let unit = BatchUnit {
                    provider: Arc::clone(&self.provider),
                    store: Arc::clone(&self.store),
                    rate_limiter: Arc::clone(&self.rate_limiter),
                    processor: self.processor,
                    location: location.clone(),
                    location_id,
                    items: batch,
                };
                units.spawn(async move {
                    let report = unit.run().await;
                    drop(permit);
                    report
                });
            }
        }

        if report.interrupted {
            info!(
                "Shutdown requested, waiting for {} in-flight batches",
                units.len()
            );
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(batch) => report.add_batch(&batch),
                Err(e) => {
                    error!("Batch task did not complete: {}", e);
                    report.add_panicked();
                }
            }
        }

        report
    }
}

/// Everything one batch needs, moved into its task.
struct BatchUnit {
    provider: Arc<dyn PriceProvider>,
    store: Arc<dyn IngestStore>,
    rate_limiter: Arc<RateLimiter>,
    processor: PriceProcessor,
    location: String,
    location_id: LocationId,
    items: Vec<String>,
}

impl BatchUnit {
    async fn run(self) -> BatchReport {
        let outcome = AssertUnwindSafe(self.execute()).catch_unwind().await;

        let status = match outcome {
            Ok(Ok(summary)) => {
                debug!(
                    "Saved batch for {}: {} prices, {} items checked",
                    self.location, summary.prices_upserted, summary.items_checked
                );
                if !summary.unresolved.is_empty() {
                    warn!(
                        "Unknown items in batch for {}: {:?}",
                        self.location, summary.unresolved
                    );
                }
                BatchStatus::Saved(summary)
            }
            Ok(Err(e)) => {
                error!(
                    "Batch failed for {} ({} items: {:?}): {}",
                    self.location,
                    self.items.len(),
                    self.items,
                    e
                );
                BatchStatus::Failed(e.to_string())
            }
            Err(_) => {
                error!(
                    "Batch panicked for {} ({} items: {:?})",
                    self.location,
                    self.items.len(),
                    self.items
                );
                BatchStatus::Failed("batch task panicked".to_string())
            }
        };

        BatchReport {
            location: self.location,
            items: self.items,
            status,
        }
    }

    async fn execute(&self) -> Result<SaveSummary> {
        self.rate_limiter.acquire().await;

        let records = self
            .provider
            .fetch_prices(&self.items, &self.location)
            .await?;
        let rows = self.processor.process(records);

        self.store
            .save_batch(rows, self.items.clone(), self.location_id)
            .await
    }
}

async fn sleep_or_cancel(duration: std::time::Duration, shutdown: &CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

fn log_cycle(report: &CycleReport) {
    if report.is_success() {
        info!("Cycle finished: {}", report.summary());
    } else {
        warn!("Cycle finished: {}", report.summary());
    }
    if !report.locations_skipped.is_empty() {
        warn!("Skipped unknown locations: {:?}", report.locations_skipped);
    }
}
