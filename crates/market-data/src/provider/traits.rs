//! Price provider trait definition.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::PriceRecord;

/// Trait for price sources.
///
/// Implement this trait to plug a new upstream (HTTP API, database
/// snapshot, fixture) into the ingestion pipeline.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use craftflow_market_data::provider::PriceProvider;
///
/// struct FixtureProvider;
///
/// #[async_trait]
/// impl PriceProvider for FixtureProvider {
///     fn id(&self) -> &'static str {
///         "FIXTURE"
///     }
///
///     async fn fetch_prices(
///         &self,
///         item_names: &[String],
///         location: &str,
///     ) -> Result<Vec<PriceRecord>, MarketDataError> {
///         Ok(Vec::new())
///     }
/// }
/// ```
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Unique identifier for this provider, used in logs and errors.
    fn id(&self) -> &'static str;

    /// Fetch current prices for `item_names` at one `location`.
    ///
    /// Returns one record per (item, quality) the source knows about. Items
    /// the source has never seen are simply absent. An empty `item_names`
    /// slice yields an empty result without contacting the source.
    async fn fetch_prices(
        &self,
        item_names: &[String],
        location: &str,
    ) -> Result<Vec<PriceRecord>, MarketDataError>;
}
