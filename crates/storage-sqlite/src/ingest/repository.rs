use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::upsert::excluded;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::model::MarketPriceDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{items, locations, market_prices, tracked_items};
use crate::utils::{chunk_for_sqlite, unique_names};
use craftflow_core::catalog::{ItemId, LocationId};
use craftflow_core::errors::Error;
use craftflow_core::ingest::{IngestStore, PriceRow, SaveSummary, TaskMap};
use craftflow_core::Result;

/// `unique_name -> id` for the names present in `items`.
fn lookup_item_ids(
    conn: &mut SqliteConnection,
    names: &[String],
) -> QueryResult<HashMap<String, ItemId>> {
    let mut ids = HashMap::with_capacity(names.len());
    for chunk in chunk_for_sqlite(names) {
        let found = items::table
            .filter(items::unique_name.eq_any(chunk))
            .select((items::unique_name, items::id))
            .load::<(String, ItemId)>(conn)?;
        ids.extend(found);
    }
    Ok(ids)
}

pub struct IngestRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl IngestRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl IngestStore for IngestRepository {
    fn location_map(&self) -> Result<HashMap<String, LocationId>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = locations::table
            .select((locations::api_name, locations::id))
            .load::<(String, LocationId)>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().collect())
    }

    fn resolve_item_ids(&self, names: &[String]) -> Result<HashMap<String, ItemId>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = get_connection(&self.pool)?;
        lookup_item_ids(&mut conn, &unique_names(names)).into_core()
    }

    fn outdated_tasks(&self, limit: usize, min_interval: Duration) -> Result<TaskMap> {
        let cutoff = ChronoDuration::from_std(min_interval)
            .ok()
            .and_then(|interval| Utc::now().checked_sub_signed(interval))
            .ok_or_else(|| {
                Error::InvalidConfigValue(format!("min_interval {:?} out of range", min_interval))
            })?
            .naive_utc();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut conn = get_connection(&self.pool)?;
        // NULLs sort first in ascending order, so never-checked pairs lead.
        let rows = tracked_items::table
            .inner_join(items::table)
            .inner_join(locations::table)
            .filter(tracked_items::is_active.eq(true))
            .filter(
                tracked_items::last_check
                    .is_null()
                    .or(tracked_items::last_check.lt(cutoff)),
            )
            .order((
                tracked_items::last_check.asc(),
                tracked_items::priority.desc(),
                tracked_items::item_id.asc(),
                tracked_items::location_id.asc(),
            ))
            .limit(limit)
            .select((locations::api_name, items::unique_name))
            .load::<(String, String)>(&mut conn)
            .into_core()?;

        debug!("Selected {} outdated tracked items", rows.len());

        let mut tasks = TaskMap::new();
        for (location, item) in rows {
            tasks.entry(location).or_default().push(item);
        }
        Ok(tasks)
    }

    async fn save_batch(
        &self,
        rows: Vec<PriceRow>,
        checked_items: Vec<String>,
        location_id: LocationId,
    ) -> Result<SaveSummary> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SaveSummary> {
                let names =
                    unique_names(rows.iter().map(|row| &row.item_name).chain(&checked_items));
                let ids = lookup_item_ids(conn, &names).map_err(StorageError::from)?;

                let mut summary = SaveSummary {
                    unresolved: names
                        .into_iter()
                        .filter(|name| !ids.contains_key(name))
                        .collect(),
                    ..SaveSummary::default()
                };

                for row in &rows {
                    let Some(&item_id) = ids.get(&row.item_name) else {
                        continue;
                    };
                    let db_row = MarketPriceDB::from_row(row, item_id, location_id);
                    summary.prices_upserted += diesel::insert_into(market_prices::table)
                        .values(&db_row)
                        .on_conflict((
                            market_prices::item_id,
                            market_prices::location_id,
                            market_prices::quality_level,
                        ))
                        .do_update()
                        .set((
                            market_prices::sell_price_min
                                .eq(excluded(market_prices::sell_price_min)),
                            market_prices::sell_price_min_date
                                .eq(excluded(market_prices::sell_price_min_date)),
                            market_prices::sell_price_max
                                .eq(excluded(market_prices::sell_price_max)),
                            market_prices::sell_price_max_date
                                .eq(excluded(market_prices::sell_price_max_date)),
                            market_prices::buy_price_min.eq(excluded(market_prices::buy_price_min)),
                            market_prices::buy_price_min_date
                                .eq(excluded(market_prices::buy_price_min_date)),
                            market_prices::buy_price_max.eq(excluded(market_prices::buy_price_max)),
                            market_prices::buy_price_max_date
                                .eq(excluded(market_prices::buy_price_max_date)),
                            market_prices::last_updated.eq(excluded(market_prices::last_updated)),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                let mut checked_ids: Vec<ItemId> = checked_items
                    .iter()
                    .filter_map(|name| ids.get(name).copied())
                    .collect();
                checked_ids.sort_unstable();
                checked_ids.dedup();

                // A later value written by a concurrent run is left in place.
                let now = Utc::now().naive_utc();
                for chunk in chunk_for_sqlite(&checked_ids) {
                    summary.items_checked += diesel::update(
                        tracked_items::table
                            .filter(tracked_items::location_id.eq(location_id))
                            .filter(tracked_items::item_id.eq_any(chunk))
                            .filter(
                                tracked_items::last_check
                                    .is_null()
                                    .or(tracked_items::last_check.le(now)),
                            ),
                    )
                    .set(tracked_items::last_check.eq(now))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                }

                Ok(summary)
            })
            .await
    }
}
