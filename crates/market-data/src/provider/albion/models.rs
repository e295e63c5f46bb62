//! Albion Online Data Project response models.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::PriceRecord;

use super::PROVIDER_ID;

/// Timestamp the upstream reports when no order was ever observed.
const NO_OBSERVATION_PREFIX: &str = "0001-01-01";

/// Naive timestamp layout used by the upstream (no offset, UTC implied).
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// One entry of the `stats/prices` array.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbionPriceDto {
    #[serde(alias = "item_type_id", alias = "item_id")]
    pub item_type_id: String,
    pub city: String,
    #[serde(alias = "quality_level", alias = "quality")]
    pub quality_level: i64,

    #[serde(default, alias = "sell_price_min")]
    pub sell_price_min: Option<i64>,
    #[serde(default, alias = "sell_price_min_date")]
    pub sell_price_min_date: Option<String>,
    #[serde(default, alias = "sell_price_max")]
    pub sell_price_max: Option<i64>,
    #[serde(default, alias = "sell_price_max_date")]
    pub sell_price_max_date: Option<String>,

    #[serde(default, alias = "buy_price_min")]
    pub buy_price_min: Option<i64>,
    #[serde(default, alias = "buy_price_min_date")]
    pub buy_price_min_date: Option<String>,
    #[serde(default, alias = "buy_price_max")]
    pub buy_price_max: Option<i64>,
    #[serde(default, alias = "buy_price_max_date")]
    pub buy_price_max_date: Option<String>,
}

fn price(value: Option<i64>, field: &str, item: &str) -> Result<i64, MarketDataError> {
    match value.unwrap_or(0) {
        p if p < 0 => Err(MarketDataError::invalid_payload(
            PROVIDER_ID,
            format!("negative {} ({}) for {}", field, p, item),
        )),
        p => Ok(p),
    }
}

/// Parse an upstream timestamp. Accepts RFC 3339 and offset-less ISO 8601
/// (interpreted as UTC); the year-1 sentinel maps to `None`.
pub(crate) fn parse_observed_at(
    value: Option<&str>,
    field: &str,
    item: &str,
) -> Result<Option<DateTime<Utc>>, MarketDataError> {
    let raw = match value.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) if raw.starts_with(NO_OBSERVATION_PREFIX) => return Ok(None),
        Some(raw) => raw,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
        .map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .map_err(|e| {
            MarketDataError::invalid_payload(
                PROVIDER_ID,
                format!("unparseable {} '{}' for {}: {}", field, raw, item, e),
            )
        })
}

impl TryFrom<AlbionPriceDto> for PriceRecord {
    type Error = MarketDataError;

    fn try_from(dto: AlbionPriceDto) -> Result<Self, Self::Error> {
        let item = dto.item_type_id.as_str();

        let quality = u8::try_from(dto.quality_level)
            .ok()
            .filter(|q| PriceRecord::is_valid_quality(*q))
            .ok_or_else(|| {
                MarketDataError::invalid_payload(
                    PROVIDER_ID,
                    format!("quality {} out of range for {}", dto.quality_level, item),
                )
            })?;

        Ok(PriceRecord {
            quality,
            sell_price_min: price(dto.sell_price_min, "sellPriceMin", item)?,
            sell_price_min_at: parse_observed_at(
                dto.sell_price_min_date.as_deref(),
                "sellPriceMinDate",
                item,
            )?,
            sell_price_max: price(dto.sell_price_max, "sellPriceMax", item)?,
            sell_price_max_at: parse_observed_at(
                dto.sell_price_max_date.as_deref(),
                "sellPriceMaxDate",
                item,
            )?,
            buy_price_min: price(dto.buy_price_min, "buyPriceMin", item)?,
            buy_price_min_at: parse_observed_at(
                dto.buy_price_min_date.as_deref(),
                "buyPriceMinDate",
                item,
            )?,
            buy_price_max: price(dto.buy_price_max, "buyPriceMax", item)?,
            buy_price_max_at: parse_observed_at(
                dto.buy_price_max_date.as_deref(),
                "buyPriceMaxDate",
                item,
            )?,
            item_name: dto.item_type_id,
            city: dto.city,
        })
    }
}
