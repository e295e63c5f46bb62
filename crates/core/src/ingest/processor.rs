//! Turns provider records into storage-ready rows.

use chrono::{DateTime, Utc};
use craftflow_market_data::PriceRecord;
use log::debug;

use super::model::PriceRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceProcessor;

impl PriceProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Convert `records`, stamping every row with the current time.
    pub fn process(&self, records: Vec<PriceRecord>) -> Vec<PriceRow> {
        self.process_at(records, Utc::now())
    }

    /// Convert `records`, dropping those with no price on any side of the book.
    pub fn process_at(&self, records: Vec<PriceRecord>, now: DateTime<Utc>) -> Vec<PriceRow> {
        let total = records.len();
        let rows: Vec<PriceRow> = records
            .into_iter()
            .filter(|record| !record.is_empty_market())
            .map(|record| PriceRow {
                item_name: record.item_name,
                location_name: record.city,
                quality_level: i32::from(record.quality),
                sell_price_min: record.sell_price_min,
                sell_price_min_date: record.sell_price_min_at,
                sell_price_max: record.sell_price_max,
                sell_price_max_date: record.sell_price_max_at,
                buy_price_min: record.buy_price_min,
                buy_price_min_date: record.buy_price_min_at,
                buy_price_max: record.buy_price_max,
                buy_price_max_date: record.buy_price_max_at,
                last_updated: now,
            })
            .collect();

        if rows.len() < total {
            debug!("Discarded {} empty market records", total - rows.len());
        }
        rows
    }
}
