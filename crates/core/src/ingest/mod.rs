//! Price ingestion pipeline.
//!
//! - [`store`] - storage trait the pipeline reads tasks from and writes to
//! - [`batcher`] - splits item lists into upstream-sized requests
//! - [`processor`] - turns provider records into storage rows
//! - [`limiter`] - bounds in-flight batch units
//! - [`service`] - the control loop tying them together
//!
//! ```text
//! IngestorService → IngestStore::outdated_tasks → make_batches
//!       ↓
//! [ConcurrencyLimiter + RateLimiter] → PriceProvider → PriceProcessor → IngestStore::save_batch
//! ```

pub mod batcher;
pub mod config;
pub mod limiter;
pub mod model;
pub mod processor;
pub mod service;
pub mod store;

mod service_tests;

pub use batcher::make_batches;
pub use config::IngestorConfig;
pub use limiter::ConcurrencyLimiter;
pub use model::{BatchReport, BatchStatus, CycleReport, PriceRow, SaveSummary, TaskMap};
pub use processor::PriceProcessor;
pub use service::{IngestorService, LocationCache};
pub use store::IngestStore;
