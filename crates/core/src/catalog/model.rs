//! Catalog domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type LocationId = i32;
pub type ItemId = i32;

/// Priority given to newly tracked pairs.
pub const DEFAULT_TRACKING_PRIORITY: i32 = 1;

/// A market location (city, outpost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    /// Name the upstream API knows the location by, unique.
    pub api_name: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub api_name: String,
    pub display_name: Option<String>,
}

/// A tradeable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    /// External identifier, e.g. `T6_2H_BOW@2`.
    pub unique_name: String,
    pub base_name: String,
    pub tier: i32,
    pub enchantment_level: i32,
    pub display_name: Option<String>,
}

impl Item {
    /// Tier plus enchantment level; a T6.2 item competes with T8.0.
    pub fn effective_tier(&self) -> i32 {
        self.tier + self.enchantment_level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub unique_name: String,
    pub base_name: String,
    pub tier: i32,
    pub enchantment_level: i32,
    pub display_name: Option<String>,
}

impl NewItem {
    /// Derive tier, enchantment and base name from an external name such as
    /// `T6_2H_BOW@2`. Names without a `T<n>_` prefix get tier 0.
    pub fn from_unique_name(unique_name: &str) -> Self {
        let (name, enchantment_level) = match unique_name.rsplit_once('@') {
            Some((name, level)) => (name, level.parse().unwrap_or(0)),
            None => (unique_name, 0),
        };

        let (tier, base_name) = name
            .strip_prefix('T')
            .and_then(|rest| rest.split_once('_'))
            .and_then(|(tier, base)| tier.parse::<i32>().ok().map(|t| (t, base)))
            .unwrap_or((0, name));

        Self {
            unique_name: unique_name.to_string(),
            base_name: base_name.to_string(),
            tier,
            enchantment_level,
            display_name: None,
        }
    }
}

/// An (item, location) pair the pipeline keeps fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedItem {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub is_active: bool,
    /// Higher values are refreshed first among equally stale pairs.
    pub priority: i32,
    /// When the pipeline last attempted this pair; `None` if never.
    pub last_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTrackedItem {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub priority: i32,
}

impl NewTrackedItem {
    pub fn new(item_id: ItemId, location_id: LocationId) -> Self {
        Self {
            item_id,
            location_id,
            priority: DEFAULT_TRACKING_PRIORITY,
        }
    }
}
