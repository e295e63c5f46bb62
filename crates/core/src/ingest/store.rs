//! Storage interface for the ingestion pipeline.
//!
//! Implemented by the `storage-sqlite` crate; tests use in-memory mocks.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::model::{PriceRow, SaveSummary, TaskMap};
use crate::catalog::{ItemId, LocationId};
use crate::errors::Result;

/// Reads reference data and tracked state, writes price batches.
///
/// # Design Notes
///
/// - Sync methods are plain reads served from a pooled connection
/// - `save_batch` is async: it goes through the serialized writer
#[async_trait]
pub trait IngestStore: Send + Sync {
    /// Full location table as `api_name -> id`.
    fn location_map(&self) -> Result<HashMap<String, LocationId>>;

    /// `unique_name -> id` for the names that exist; unknown names are omitted.
    fn resolve_item_ids(&self, names: &[String]) -> Result<HashMap<String, ItemId>>;

    /// Active tracked pairs never checked or checked before `now - min_interval`,
    /// grouped by location.
    ///
    /// Within a location, never-checked pairs come first, then oldest check,
    /// then higher priority, then item id. `limit` caps the total across all
    /// locations.
    fn outdated_tasks(&self, limit: usize, min_interval: Duration) -> Result<TaskMap>;

    /// In one transaction: upsert `rows` for resolvable items and advance
    /// last-check for every resolvable name in `checked_items` at `location_id`.
    ///
    /// Last-check is never moved backwards. On error nothing is committed.
    async fn save_batch(
        &self,
        rows: Vec<PriceRow>,
        checked_items: Vec<String>,
        location_id: LocationId,
    ) -> Result<SaveSummary>;
}
