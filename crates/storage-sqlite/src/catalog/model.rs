//! Database models for reference data.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use craftflow_core::catalog::{
    Item, Location, NewItem, NewLocation, NewTrackedItem, TrackedItem,
};

#[derive(Queryable, Identifiable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::locations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LocationDB {
    pub id: i32,
    pub api_name: String,
    pub display_name: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::locations)]
pub struct NewLocationDB {
    pub api_name: String,
    pub display_name: Option<String>,
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ItemDB {
    pub id: i32,
    pub unique_name: String,
    pub base_name: String,
    pub tier: i32,
    pub enchantment_level: i32,
    pub display_name: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::items)]
pub struct NewItemDB {
    pub unique_name: String,
    pub base_name: String,
    pub tier: i32,
    pub enchantment_level: i32,
    pub display_name: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::tracked_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrackedItemDB {
    pub item_id: i32,
    pub location_id: i32,
    pub is_active: bool,
    pub priority: i32,
    pub last_check: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone, Copy)]
#[diesel(table_name = crate::schema::tracked_items)]
pub struct NewTrackedItemDB {
    pub item_id: i32,
    pub location_id: i32,
    pub priority: i32,
}

impl From<LocationDB> for Location {
    fn from(db: LocationDB) -> Self {
        Self {
            id: db.id,
            api_name: db.api_name,
            display_name: db.display_name,
        }
    }
}

impl From<NewLocation> for NewLocationDB {
    fn from(domain: NewLocation) -> Self {
        Self {
            api_name: domain.api_name,
            display_name: domain.display_name,
        }
    }
}

impl From<ItemDB> for Item {
    fn from(db: ItemDB) -> Self {
        Self {
            id: db.id,
            unique_name: db.unique_name,
            base_name: db.base_name,
            tier: db.tier,
            enchantment_level: db.enchantment_level,
            display_name: db.display_name,
        }
    }
}

impl From<NewItem> for NewItemDB {
    fn from(domain: NewItem) -> Self {
        Self {
            unique_name: domain.unique_name,
            base_name: domain.base_name,
            tier: domain.tier,
            enchantment_level: domain.enchantment_level,
            display_name: domain.display_name,
        }
    }
}

impl From<TrackedItemDB> for TrackedItem {
    fn from(db: TrackedItemDB) -> Self {
        Self {
            item_id: db.item_id,
            location_id: db.location_id,
            is_active: db.is_active,
            priority: db.priority,
            last_check: db.last_check.map(|t| Utc.from_utc_datetime(&t)),
        }
    }
}

impl From<NewTrackedItem> for NewTrackedItemDB {
    fn from(domain: NewTrackedItem) -> Self {
        Self {
            item_id: domain.item_id,
            location_id: domain.location_id,
            priority: domain.priority,
        }
    }
}
