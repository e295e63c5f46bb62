use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::upsert::excluded;
use std::sync::Arc;

use super::model::{ItemDB, LocationDB, NewItemDB, NewLocationDB, NewTrackedItemDB, TrackedItemDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{items, locations, tracked_items};
use craftflow_core::catalog::{
    Item, ItemId, Location, LocationId, NewItem, NewLocation, NewTrackedItem, TrackedItem,
};
use craftflow_core::Result;

/// Reads and writes reference data: locations, items and tracked pairs.
///
/// The ingestor never goes through this; it reads reference data via
/// `IngestRepository`. This is the entry point for seeding tools and the
/// storage test fixtures.
pub struct CatalogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CatalogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Insert locations, updating the display name of existing `api_name`s.
    pub async fn upsert_locations(&self, new_locations: Vec<NewLocation>) -> Result<usize> {
        let rows: Vec<NewLocationDB> = new_locations.into_iter().map(Into::into).collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut count = 0;
                for row in &rows {
                    count += diesel::insert_into(locations::table)
                        .values(row)
                        .on_conflict(locations::api_name)
                        .do_update()
                        .set(locations::display_name.eq(excluded(locations::display_name)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(count)
            })
            .await
    }

    /// Insert items, refreshing every attribute of existing `unique_name`s.
    pub async fn upsert_items(&self, new_items: Vec<NewItem>) -> Result<usize> {
        let rows: Vec<NewItemDB> = new_items.into_iter().map(Into::into).collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut count = 0;
                for row in &rows {
                    count += diesel::insert_into(items::table)
                        .values(row)
                        .on_conflict(items::unique_name)
                        .do_update()
                        .set((
                            items::base_name.eq(excluded(items::base_name)),
                            items::tier.eq(excluded(items::tier)),
                            items::enchantment_level.eq(excluded(items::enchantment_level)),
                            items::display_name.eq(excluded(items::display_name)),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(count)
            })
            .await
    }

    /// Start tracking pairs. Already tracked pairs are left untouched.
    ///
    /// Returns the number of newly tracked pairs.
    pub async fn track(&self, pairs: Vec<NewTrackedItem>) -> Result<usize> {
        if pairs.is_empty() {
            return Ok(0);
        }
        let rows: Vec<NewTrackedItemDB> = pairs.into_iter().map(Into::into).collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut count = 0;
                for chunk in rows.chunks(1_000) {
                    count += diesel::insert_or_ignore_into(tracked_items::table)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(count)
            })
            .await
    }

    pub async fn set_tracking_active(
        &self,
        item_id: ItemId,
        location_id: LocationId,
        active: bool,
    ) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::update(tracked_items::table.find((item_id, location_id)))
                    .set(tracked_items::is_active.eq(active))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    pub fn list_locations(&self) -> Result<Vec<Location>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = locations::table
            .order(locations::id.asc())
            .select(LocationDB::as_select())
            .load::<LocationDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Location::from).collect())
    }

    pub fn get_item(&self, unique_name: &str) -> Result<Option<Item>> {
        let mut conn = get_connection(&self.pool)?;
        let row = items::table
            .filter(items::unique_name.eq(unique_name))
            .select(ItemDB::as_select())
            .first::<ItemDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(Item::from))
    }

    pub fn get_tracked(
        &self,
        item_id: ItemId,
        location_id: LocationId,
    ) -> Result<Option<TrackedItem>> {
        let mut conn = get_connection(&self.pool)?;
        let row = tracked_items::table
            .find((item_id, location_id))
            .select(TrackedItemDB::as_select())
            .first::<TrackedItemDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(TrackedItem::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use tempfile::tempdir;

    async fn create_test_repository() -> (CatalogRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();

        let pool = create_pool(&db_path).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (CatalogRepository::new(pool, writer), temp_dir)
    }

    fn location(name: &str, display: Option<&str>) -> NewLocation {
        NewLocation {
            api_name: name.to_string(),
            display_name: display.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_upsert_locations_updates_display_name() {
        let (repo, _dir) = create_test_repository().await;

        repo.upsert_locations(vec![location("Martlock", None)])
            .await
            .unwrap();
        repo.upsert_locations(vec![location("Martlock", Some("Martlock City"))])
            .await
            .unwrap();

        let locations = repo.list_locations().unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].display_name.as_deref(), Some("Martlock City"));
    }

    #[tokio::test]
    async fn test_upsert_items_keeps_id_and_refreshes_fields() {
        let (repo, _dir) = create_test_repository().await;

        repo.upsert_items(vec![NewItem::from_unique_name("T6_2H_BOW@2")])
            .await
            .unwrap();
        let first = repo.get_item("T6_2H_BOW@2").unwrap().unwrap();
        assert_eq!(first.effective_tier(), 8);

        let mut renamed = NewItem::from_unique_name("T6_2H_BOW@2");
        renamed.display_name = Some("Elder's Bow".to_string());
        repo.upsert_items(vec![renamed]).await.unwrap();

        let second = repo.get_item("T6_2H_BOW@2").unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name.as_deref(), Some("Elder's Bow"));
    }

    #[tokio::test]
    async fn test_track_ignores_existing_pairs() {
        let (repo, _dir) = create_test_repository().await;
        repo.upsert_locations(vec![location("Martlock", None)])
            .await
            .unwrap();
        repo.upsert_items(vec![NewItem::from_unique_name("T4_BAG")])
            .await
            .unwrap();
        let location_id = repo.list_locations().unwrap()[0].id;
        let item_id = repo.get_item("T4_BAG").unwrap().unwrap().id;

        let pair = NewTrackedItem {
            item_id,
            location_id,
            priority: 3,
        };
        assert_eq!(repo.track(vec![pair]).await.unwrap(), 1);
        assert_eq!(repo.track(vec![NewTrackedItem::new(item_id, location_id)]).await.unwrap(), 0);

        let tracked = repo.get_tracked(item_id, location_id).unwrap().unwrap();
        assert!(tracked.is_active);
        assert_eq!(tracked.priority, 3);
        assert_eq!(tracked.last_check, None);

        repo.set_tracking_active(item_id, location_id, false)
            .await
            .unwrap();
        assert!(!repo.get_tracked(item_id, location_id).unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_track_rejects_unknown_item() {
        let (repo, _dir) = create_test_repository().await;
        repo.upsert_locations(vec![location("Martlock", None)])
            .await
            .unwrap();

        let result = repo.track(vec![NewTrackedItem::new(999, 1)]).await;

        assert!(result.is_err());
    }
}
