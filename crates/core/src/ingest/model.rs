//! Data flowing through one ingestion cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outdated work: location external name -> ordered item external names.
pub type TaskMap = BTreeMap<String, Vec<String>>;

/// Storage-ready price row, still keyed by external names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRow {
    pub item_name: String,
    pub location_name: String,
    pub quality_level: i32,

    pub sell_price_min: i64,
    pub sell_price_min_date: Option<DateTime<Utc>>,
    pub sell_price_max: i64,
    pub sell_price_max_date: Option<DateTime<Utc>>,

    pub buy_price_min: i64,
    pub buy_price_min_date: Option<DateTime<Utc>>,
    pub buy_price_max: i64,
    pub buy_price_max_date: Option<DateTime<Utc>>,

    /// Processing time, shared by every row of one batch.
    pub last_updated: DateTime<Utc>,
}

/// Outcome of one `save_batch` transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub prices_upserted: usize,
    /// Tracked rows whose last check was advanced.
    pub items_checked: usize,
    /// Names that matched no item and were dropped.
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Saved(SaveSummary),
    Failed(String),
}

/// Result of one batch unit: fetch, process, persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub location: String,
    pub items: Vec<String>,
    pub status: BatchStatus,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, BatchStatus::Saved(_))
    }
}

/// Aggregate of one run cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub batches_succeeded: usize,
    pub batches_failed: usize,
    pub prices_written: usize,
    pub items_checked: usize,
    /// Locations present in the task map but absent from the reference cache.
    pub locations_skipped: Vec<String>,
    /// Set when shutdown interrupted dispatch before every batch was sent.
    pub interrupted: bool,
}

impl CycleReport {
    pub fn batches_dispatched(&self) -> usize {
        self.batches_succeeded + self.batches_failed
    }

    pub fn is_success(&self) -> bool {
        self.batches_failed == 0
    }

    pub(crate) fn add_batch(&mut self, report: &BatchReport) {
        match &report.status {
            BatchStatus::Saved(summary) => {
                self.batches_succeeded += 1;
                self.prices_written += summary.prices_upserted;
                self.items_checked += summary.items_checked;
            }
            BatchStatus::Failed(_) => self.batches_failed += 1,
        }
    }

    pub(crate) fn add_panicked(&mut self) {
        self.batches_failed += 1;
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        if self.is_success() {
            format!(
                "{} batches saved: {} prices written, {} items checked",
                self.batches_succeeded, self.prices_written, self.items_checked
            )
        } else {
            format!(
                "{} of {} batches failed: {} prices written, {} items checked",
                self.batches_failed,
                self.batches_dispatched(),
                self.prices_written,
                self.items_checked
            )
        }
    }
}
