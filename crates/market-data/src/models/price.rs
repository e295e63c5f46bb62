//! Price snapshot as reported by a provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every quality level the upstream knows about, in ascending order.
pub const QUALITY_LEVELS: [u8; 5] = [1, 2, 3, 4, 5];

/// One observed order-book snapshot for an (item, city, quality) triple.
///
/// Prices are in silver. A zero price means "no order observed" for that
/// side of the book; the matching timestamp is then usually `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    /// External item name (e.g. `T4_BAG`, `T6_2H_BOW@2`).
    pub item_name: String,
    /// External location name the price was observed in.
    pub city: String,
    /// Quality level, always within [`QUALITY_LEVELS`].
    pub quality: u8,

    pub sell_price_min: i64,
    pub sell_price_min_at: Option<DateTime<Utc>>,
    pub sell_price_max: i64,
    pub sell_price_max_at: Option<DateTime<Utc>>,

    pub buy_price_min: i64,
    pub buy_price_min_at: Option<DateTime<Utc>>,
    pub buy_price_max: i64,
    pub buy_price_max_at: Option<DateTime<Utc>>,
}

impl PriceRecord {
    /// True when no side of the book carries a price.
    pub fn is_empty_market(&self) -> bool {
        self.sell_price_min == 0
            && self.sell_price_max == 0
            && self.buy_price_min == 0
            && self.buy_price_max == 0
    }

    /// Returns true if `quality` is a level the upstream reports.
    pub fn is_valid_quality(quality: u8) -> bool {
        QUALITY_LEVELS.contains(&quality)
    }
}
