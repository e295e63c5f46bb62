//! Tests for IngestorService contracts and edge cases.
//!
//! # Critical Contract Points
//!
//! 1. Every selected item is fetched in batches of at most `batch_size`
//! 2. A batch that fails (fetch, save, or panic) never affects its siblings
//! 3. Items in a failed batch are not marked as checked
//! 4. Upstream calls respect the shared rate limit across concurrent batches
//! 5. No more than `max_concurrent_batches` units are in flight
//! 6. Shutdown stops dispatch but lets in-flight units finish

#[cfg(test)]
mod tests {
    use crate::catalog::{ItemId, LocationId};
    use crate::errors::{DatabaseError, Error, Result};
    use crate::ingest::{
        IngestStore, IngestorConfig, IngestorService, PriceRow, SaveSummary, TaskMap,
    };
    use async_trait::async_trait;
    use craftflow_market_data::{MarketDataError, PriceProvider, PriceRecord};
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    // =========================================================================
    // Mock IngestStore
    // =========================================================================

    #[derive(Clone, Debug)]
    struct SavedBatch {
        rows: Vec<PriceRow>,
        checked: Vec<String>,
        location_id: LocationId,
    }

    #[derive(Clone, Default)]
    struct MockIngestStore {
        locations: Arc<Mutex<HashMap<String, LocationId>>>,
        items: Arc<Mutex<HashMap<String, ItemId>>>,
        pending: Arc<Mutex<TaskMap>>,
        saved: Arc<Mutex<Vec<SavedBatch>>>,
        selection_failures: Arc<Mutex<usize>>,
        fail_on_save: Arc<Mutex<bool>>,
    }

    impl MockIngestStore {
        fn new() -> Self {
            Self::default()
        }

        fn with_location(self, name: &str, id: LocationId) -> Self {
            self.locations.lock().unwrap().insert(name.to_string(), id);
            self
        }

        /// Register items and mark them outdated at `location`.
        fn with_pending(self, location: &str, items: &[&str]) -> Self {
            {
                let mut known = self.items.lock().unwrap();
                for name in items {
                    let next_id = known.len() as ItemId + 1;
                    known.entry(name.to_string()).or_insert(next_id);
                }
            }
            self.pending
                .lock()
                .unwrap()
                .entry(location.to_string())
                .or_default()
                .extend(items.iter().map(|s| s.to_string()));
            self
        }

        fn fail_selection(&self, times: usize) {
            *self.selection_failures.lock().unwrap() = times;
        }

        fn set_fail_on_save(&self, fail: bool) {
            *self.fail_on_save.lock().unwrap() = fail;
        }

        fn saved(&self) -> Vec<SavedBatch> {
            self.saved.lock().unwrap().clone()
        }

        fn checked_items(&self) -> HashSet<String> {
            self.saved()
                .into_iter()
                .flat_map(|batch| batch.checked)
                .collect()
        }
    }

    #[async_trait]
    impl IngestStore for MockIngestStore {
        fn location_map(&self) -> Result<HashMap<String, LocationId>> {
            Ok(self.locations.lock().unwrap().clone())
        }

        fn resolve_item_ids(&self, names: &[String]) -> Result<HashMap<String, ItemId>> {
            let items = self.items.lock().unwrap();
            Ok(names
                .iter()
                .filter_map(|n| items.get(n).map(|id| (n.clone(), *id)))
                .collect())
        }

        fn outdated_tasks(&self, limit: usize, _min_interval: Duration) -> Result<TaskMap> {
            let mut failures = self.selection_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::Database(DatabaseError::QueryFailed(
                    "database is locked".to_string(),
                )));
            }

            let mut remaining = limit;
            let mut tasks = TaskMap::new();
            for (location, items) in self.pending.lock().unwrap().iter() {
                let take: Vec<String> = items.iter().take(remaining).cloned().collect();
                remaining -= take.len();
                if !take.is_empty() {
                    tasks.insert(location.clone(), take);
                }
            }
            Ok(tasks)
        }

        async fn save_batch(
            &self,
            rows: Vec<PriceRow>,
            checked_items: Vec<String>,
            location_id: LocationId,
        ) -> Result<SaveSummary> {
            if *self.fail_on_save.lock().unwrap() {
                return Err(Error::Database(DatabaseError::TransactionFailed(
                    "Intentional save failure".to_string(),
                )));
            }

            let ids = self.resolve_item_ids(&checked_items)?;
            let unresolved = checked_items
                .iter()
                .filter(|n| !ids.contains_key(*n))
                .cloned()
                .collect();

            for items in self.pending.lock().unwrap().values_mut() {
                items.retain(|i| !ids.contains_key(i));
            }

            let summary = SaveSummary {
                prices_upserted: rows.len(),
                items_checked: ids.len(),
                unresolved,
            };
            self.saved.lock().unwrap().push(SavedBatch {
                rows,
                checked: checked_items,
                location_id,
            });
            Ok(summary)
        }
    }

    // =========================================================================
    // Mock PriceProvider
    // =========================================================================

    #[derive(Clone, Default)]
    struct MockPriceProvider {
        prices: Arc<Mutex<HashMap<String, i64>>>,
        failing_items: Arc<Mutex<HashSet<String>>>,
        panicking_items: Arc<Mutex<HashSet<String>>>,
        latency: Arc<Mutex<Duration>>,
        calls: Arc<Mutex<Vec<(Vec<String>, Instant)>>>,
        in_flight: Arc<Mutex<usize>>,
        max_in_flight: Arc<Mutex<usize>>,
    }

    impl MockPriceProvider {
        fn new() -> Self {
            Self::default()
        }

        fn with_price(self, item: &str, sell_price_min: i64) -> Self {
            self.prices
                .lock()
                .unwrap()
                .insert(item.to_string(), sell_price_min);
            self
        }

        fn fail_for(&self, item: &str) {
            self.failing_items.lock().unwrap().insert(item.to_string());
        }

        fn panic_for(&self, item: &str) {
            self.panicking_items.lock().unwrap().insert(item.to_string());
        }

        fn set_latency(&self, latency: Duration) {
            *self.latency.lock().unwrap() = latency;
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_batches(&self) -> Vec<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(batch, _)| batch.clone())
                .collect()
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }

        fn max_in_flight(&self) -> usize {
            *self.max_in_flight.lock().unwrap()
        }
    }

    #[async_trait]
    impl PriceProvider for MockPriceProvider {
        fn id(&self) -> &'static str {
            "MOCK"
        }

        async fn fetch_prices(
            &self,
            item_names: &[String],
            location: &str,
        ) -> std::result::Result<Vec<PriceRecord>, MarketDataError> {
            self.calls
                .lock()
                .unwrap()
                .push((item_names.to_vec(), Instant::now()));
            {
                let mut in_flight = self.in_flight.lock().unwrap();
                *in_flight += 1;
                let mut max = self.max_in_flight.lock().unwrap();
                *max = (*max).max(*in_flight);
            }

            let latency = *self.latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            *self.in_flight.lock().unwrap() -= 1;

            let panics = item_names
                .iter()
                .any(|i| self.panicking_items.lock().unwrap().contains(i));
            if panics {
                panic!("provider blew up");
            }

            let fails = item_names
                .iter()
                .any(|i| self.failing_items.lock().unwrap().contains(i));
            if fails {
                return Err(MarketDataError::ServerError {
                    provider: "MOCK".to_string(),
                    status: 502,
                });
            }

            let prices = self.prices.lock().unwrap();
            Ok(item_names
                .iter()
                .filter_map(|item| {
                    prices.get(item).map(|price| PriceRecord {
                        item_name: item.clone(),
                        city: location.to_string(),
                        quality: 1,
                        sell_price_min: *price,
                        sell_price_min_at: None,
                        sell_price_max: 0,
                        sell_price_max_at: None,
                        buy_price_min: 0,
                        buy_price_min_at: None,
                        buy_price_max: 0,
                        buy_price_max_at: None,
                    })
                })
                .collect())
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn fast_config() -> IngestorConfig {
        IngestorConfig {
            max_requests_per_second: 1000.0,
            ..IngestorConfig::default()
        }
    }

    fn service(
        provider: &MockPriceProvider,
        store: &MockIngestStore,
        config: IngestorConfig,
    ) -> IngestorService {
        IngestorService::new(Arc::new(provider.clone()), Arc::new(store.clone()), config).unwrap()
    }

    fn item_names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}_{}", prefix, i)).collect()
    }

    // =========================================================================
    // Cycle contract
    // =========================================================================

    #[tokio::test]
    async fn test_cycle_saves_prices_and_checks_every_item() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &["T4_BAG", "T5_BAG"]);
        let provider = MockPriceProvider::new().with_price("T4_BAG", 100);

        let report = service(&provider, &store, fast_config())
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches_succeeded, 1);
        assert_eq!(report.prices_written, 1);
        assert_eq!(report.items_checked, 2);

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].location_id, 1);
        assert_eq!(saved[0].rows.len(), 1);
        assert_eq!(saved[0].rows[0].item_name, "T4_BAG");
        assert_eq!(saved[0].rows[0].sell_price_min, 100);
        assert_eq!(saved[0].checked, vec!["T4_BAG", "T5_BAG"]);
    }

    #[tokio::test]
    async fn test_items_are_split_into_batches() {
        let names = item_names("T4_ITEM", 200);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &refs);
        let provider = MockPriceProvider::new();

        let config = IngestorConfig {
            batch_size: 50,
            selection_limit: 500,
            ..fast_config()
        };
        let report = service(&provider, &store, config)
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 4);
        assert_eq!(report.batches_succeeded, 4);
        assert!(provider.call_batches().iter().all(|b| b.len() == 50));

        let fetched: HashSet<String> = provider.call_batches().into_iter().flatten().collect();
        assert_eq!(fetched, names.into_iter().collect());
    }

    #[tokio::test]
    async fn test_empty_fetch_still_checks_items() {
        let store = MockIngestStore::new()
            .with_location("Lymhurst", 3)
            .with_pending("Lymhurst", &["T8_CAPE"]);
        let provider = MockPriceProvider::new();

        let report = service(&provider, &store, fast_config())
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.prices_written, 0);
        assert_eq!(report.items_checked, 1);
        assert!(store.checked_items().contains("T8_CAPE"));
    }

    #[tokio::test]
    async fn test_nothing_due_returns_empty_report() {
        let store = MockIngestStore::new().with_location("Martlock", 1);
        let provider = MockPriceProvider::new();

        let report = service(&provider, &store, fast_config())
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches_dispatched(), 0);
        assert_eq!(provider.call_count(), 0);
    }

    // =========================================================================
    // Failure isolation
    // =========================================================================

    #[tokio::test]
    async fn test_failed_fetch_does_not_affect_siblings() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &["A1", "A2", "B1", "B2", "C1", "C2"]);
        let provider = MockPriceProvider::new()
            .with_price("A1", 10)
            .with_price("C1", 30);
        provider.fail_for("B2");

        let config = IngestorConfig {
            batch_size: 2,
            max_concurrent_batches: 3,
            ..fast_config()
        };
        let report = service(&provider, &store, config)
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches_succeeded, 2);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.prices_written, 2);

        let checked = store.checked_items();
        assert!(checked.contains("A1") && checked.contains("C2"));
        assert!(!checked.contains("B1"));
        assert!(!checked.contains("B2"));
    }

    #[tokio::test]
    async fn test_failed_save_is_reported_not_propagated() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &["T4_BAG"]);
        store.set_fail_on_save(true);
        let provider = MockPriceProvider::new().with_price("T4_BAG", 10);

        let report = service(&provider, &store, fast_config())
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches_failed, 1);
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_batch_is_contained() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &["BOOM", "SAFE"]);
        let provider = MockPriceProvider::new().with_price("SAFE", 5);
        provider.panic_for("BOOM");

        let config = IngestorConfig {
            batch_size: 1,
            ..fast_config()
        };
        let report = service(&provider, &store, config)
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.batches_succeeded, 1);
        assert_eq!(store.checked_items(), HashSet::from(["SAFE".to_string()]));
    }

    #[tokio::test]
    async fn test_unknown_location_is_skipped() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Atlantis", &["T4_BAG"])
            .with_pending("Martlock", &["T5_BAG"]);
        let provider = MockPriceProvider::new();

        let report = service(&provider, &store, fast_config())
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.locations_skipped, vec!["Atlantis".to_string()]);
        assert_eq!(provider.call_batches(), vec![vec!["T5_BAG".to_string()]]);
    }

    #[tokio::test]
    async fn test_empty_location_table_is_fatal() {
        let store = MockIngestStore::new().with_pending("Martlock", &["T4_BAG"]);
        let provider = MockPriceProvider::new();

        let result = service(&provider, &store, fast_config())
            .run(CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::ReferenceData(_))));
        assert_eq!(provider.call_count(), 0);
    }

    // =========================================================================
    // Limits
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_spans_concurrent_batches() {
        const RATE: f64 = 2.0;
        let names = item_names("T4_ITEM", 10);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &refs);
        let provider = MockPriceProvider::new();

        let config = IngestorConfig {
            max_requests_per_second: RATE,
            max_concurrent_batches: 5,
            batch_size: 1,
            ..IngestorConfig::default()
        };
        let start = Instant::now();
        let report = service(&provider, &store, config)
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches_succeeded, 10);
        let elapsed = start.elapsed();
        let min_expected = Duration::from_secs_f64(9.0 / RATE);
        assert!(
            elapsed >= min_expected,
            "10 calls took {:?}, expected at least {:?}",
            elapsed,
            min_expected
        );

        let mut times = provider.call_times();
        times.sort();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(499));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let names = item_names("T4_ITEM", 12);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &refs);
        let provider = MockPriceProvider::new();
        provider.set_latency(Duration::from_secs(2));

        let config = IngestorConfig {
            max_requests_per_second: 100.0,
            rate_burst: 10,
            max_concurrent_batches: 3,
            batch_size: 1,
            ..IngestorConfig::default()
        };
        let report = service(&provider, &store, config)
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches_succeeded, 12);
        assert_eq!(provider.max_in_flight(), 3);
    }

    // =========================================================================
    // Control loop
    // =========================================================================

    #[tokio::test]
    async fn test_cancelled_before_dispatch_sends_nothing() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &["T4_BAG"]);
        let provider = MockPriceProvider::new();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let report = service(&provider, &store, fast_config())
            .run_cycle(&shutdown)
            .await
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_batches_finish_after_shutdown() {
        let names = item_names("T4_ITEM", 6);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &refs);
        let provider = MockPriceProvider::new();
        provider.set_latency(Duration::from_secs(2));

        let config = IngestorConfig {
            max_requests_per_second: 100.0,
            rate_burst: 10,
            max_concurrent_batches: 2,
            batch_size: 1,
            ..IngestorConfig::default()
        };
        let svc = service(&provider, &store, config);

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        let (report, _) = tokio::join!(svc.run_cycle(&shutdown), async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let report = report.unwrap();

        assert!(report.interrupted);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(store.saved().len(), provider.call_count());
        assert_eq!(report.batches_succeeded, 2);
        let mut fetched = provider.call_batches();
        fetched.sort();
        assert_eq!(fetched, vec![names[0..1].to_vec(), names[1..2].to_vec()]);
        assert!(!store.checked_items().contains(&names[5]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_processes_work_then_idles_until_shutdown() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &["T4_BAG", "T5_BAG"]);
        let provider = MockPriceProvider::new().with_price("T4_BAG", 100);
        let svc = service(&provider, &store, fast_config());

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        let (result, _) = tokio::join!(svc.run(shutdown), async move {
            tokio::time::sleep(Duration::from_secs(120)).await;
            trigger.cancel();
        });

        assert!(result.is_ok());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_selection_failure() {
        let store = MockIngestStore::new()
            .with_location("Martlock", 1)
            .with_pending("Martlock", &["T4_BAG"]);
        store.fail_selection(2);
        let provider = MockPriceProvider::new();
        let svc = service(&provider, &store, fast_config());

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        let (result, _) = tokio::join!(svc.run(shutdown), async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            trigger.cancel();
        });

        assert!(result.is_ok());
        assert_eq!(provider.call_count(), 1);
        assert!(store.saved()[0].rows.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = IngestorService::new(
            Arc::new(MockPriceProvider::new()),
            Arc::new(MockIngestStore::new()),
            IngestorConfig {
                batch_size: 0,
                ..IngestorConfig::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidConfigValue(_))));
    }
}
