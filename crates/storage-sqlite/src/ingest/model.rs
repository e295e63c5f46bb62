//! Database model for stored prices.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use craftflow_core::catalog::{ItemId, LocationId};
use craftflow_core::ingest::PriceRow;

fn to_utc(value: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&value)
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::market_prices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketPriceDB {
    pub item_id: i32,
    pub location_id: i32,
    pub quality_level: i32,
    pub sell_price_min: i64,
    pub sell_price_min_date: Option<NaiveDateTime>,
    pub sell_price_max: i64,
    pub sell_price_max_date: Option<NaiveDateTime>,
    pub buy_price_min: i64,
    pub buy_price_min_date: Option<NaiveDateTime>,
    pub buy_price_max: i64,
    pub buy_price_max_date: Option<NaiveDateTime>,
    pub last_updated: NaiveDateTime,
}

impl MarketPriceDB {
    /// Storage row for `row` once its item name resolved to `item_id`.
    pub fn from_row(row: &PriceRow, item_id: ItemId, location_id: LocationId) -> Self {
        Self {
            item_id,
            location_id,
            quality_level: row.quality_level,
            sell_price_min: row.sell_price_min,
            sell_price_min_date: row.sell_price_min_date.map(|t| t.naive_utc()),
            sell_price_max: row.sell_price_max,
            sell_price_max_date: row.sell_price_max_date.map(|t| t.naive_utc()),
            buy_price_min: row.buy_price_min,
            buy_price_min_date: row.buy_price_min_date.map(|t| t.naive_utc()),
            buy_price_max: row.buy_price_max,
            buy_price_max_date: row.buy_price_max_date.map(|t| t.naive_utc()),
            last_updated: row.last_updated.naive_utc(),
        }
    }

    /// Inverse of [`from_row`](Self::from_row), given the external names.
    pub fn into_row(self, item_name: String, location_name: String) -> PriceRow {
        PriceRow {
            item_name,
            location_name,
            quality_level: self.quality_level,
            sell_price_min: self.sell_price_min,
            sell_price_min_date: self.sell_price_min_date.map(to_utc),
            sell_price_max: self.sell_price_max,
            sell_price_max_date: self.sell_price_max_date.map(to_utc),
            buy_price_min: self.buy_price_min,
            buy_price_min_date: self.buy_price_min_date.map(to_utc),
            buy_price_max: self.buy_price_max,
            buy_price_max_date: self.buy_price_max_date.map(to_utc),
            last_updated: to_utc(self.last_updated),
        }
    }
}
