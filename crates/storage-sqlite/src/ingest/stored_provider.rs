//! Replays the last stored snapshot through the `PriceProvider` contract.

use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;

use super::model::MarketPriceDB;
use crate::db::DbPool;
use crate::schema::{items, locations, market_prices};
use crate::utils::{chunk_for_sqlite, unique_names};
use craftflow_market_data::{MarketDataError, PriceProvider, PriceRecord};

pub const STORED_PROVIDER_ID: &str = "DATABASE";

/// Serves prices from `market_prices` instead of the network.
///
/// Used for offline replays and dry runs of the pipeline.
pub struct StoredPriceProvider {
    pool: Arc<DbPool>,
}

impl StoredPriceProvider {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn unavailable(message: impl ToString) -> MarketDataError {
        MarketDataError::SourceUnavailable {
            provider: STORED_PROVIDER_ID.to_string(),
            message: message.to_string(),
        }
    }

    fn load(
        &self,
        item_names: &[String],
        location: &str,
    ) -> Result<Vec<(String, String, MarketPriceDB)>, MarketDataError> {
        let mut conn = self.pool.get().map_err(Self::unavailable)?;
        let names = unique_names(item_names);

        let mut rows = Vec::new();
        for chunk in chunk_for_sqlite(&names) {
            let found = market_prices::table
                .inner_join(items::table)
                .inner_join(locations::table)
                .filter(locations::api_name.eq(location))
                .filter(items::unique_name.eq_any(chunk))
                .order((items::unique_name.asc(), market_prices::quality_level.asc()))
                .select((
                    items::unique_name,
                    locations::api_name,
                    MarketPriceDB::as_select(),
                ))
                .load::<(String, String, MarketPriceDB)>(&mut conn)
                .map_err(Self::unavailable)?;
            rows.extend(found);
        }
        Ok(rows)
    }
}

#[async_trait]
impl PriceProvider for StoredPriceProvider {
    fn id(&self) -> &'static str {
        STORED_PROVIDER_ID
    }

    async fn fetch_prices(
        &self,
        item_names: &[String],
        location: &str,
    ) -> Result<Vec<PriceRecord>, MarketDataError> {
        if item_names.is_empty() {
            return Ok(Vec::new());
        }

        self.load(item_names, location)?
            .into_iter()
            .map(|(item_name, city, stored)| -> Result<PriceRecord, MarketDataError> {
                let row = stored.into_row(item_name, city);
                let quality = u8::try_from(row.quality_level)
                    .ok()
                    .filter(|q| PriceRecord::is_valid_quality(*q))
                    .ok_or_else(|| MarketDataError::InvalidPayload {
                        provider: STORED_PROVIDER_ID.to_string(),
                        message: format!(
                            "stored quality {} for {} out of range",
                            row.quality_level, row.item_name
                        ),
                    })?;

                Ok(PriceRecord {
                    item_name: row.item_name,
                    city: row.location_name,
                    quality,
                    sell_price_min: row.sell_price_min,
                    sell_price_min_at: row.sell_price_min_date,
                    sell_price_max: row.sell_price_max,
                    sell_price_max_at: row.sell_price_max_date,
                    buy_price_min: row.buy_price_min,
                    buy_price_min_at: row.buy_price_min_date,
                    buy_price_max: row.buy_price_max,
                    buy_price_max_at: row.buy_price_max_date,
                })
            })
            .collect()
    }
}
