//! Albion Online Data Project provider.
//!
//! Fetches current order-book prices from the public `stats/prices`
//! endpoint. No authentication; the project asks clients to identify
//! themselves with a `User-Agent` and to stay near one request per second.
//!
//! # API Endpoint
//!
//! `{base}/stats/prices/{item,item,...}?locations={city}&qualities=1,2,3,4,5`
//!
//! # Response Format
//!
//! A JSON array with one object per (item, city, quality). Unknown items are
//! omitted; a 404 means nothing is known for the whole batch.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{header, Client, StatusCode};

use crate::errors::MarketDataError;
use crate::models::{PriceRecord, QUALITY_LEVELS};
use crate::provider::{BackoffPolicy, PriceProvider};

pub use models::AlbionPriceDto;

pub(crate) const PROVIDER_ID: &str = "ALBION_DATA";

/// Default API root (European server).
pub const DEFAULT_BASE_URL: &str = "https://europe.albion-online-data.com/api/v2";

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = "CraftFlowIngestor";

/// Batches above this size risk `414 URI Too Long`.
const MAX_SAFE_BATCH: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for [`AlbionDataProvider`].
#[derive(Clone, Debug)]
pub struct AlbionProviderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for AlbionProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// HTTP price provider backed by the Albion Online Data Project.
///
/// # Example
///
/// ```ignore
/// let provider = AlbionDataProvider::new(AlbionProviderConfig::default())?;
/// let prices = provider
///     .fetch_prices(&["T4_BAG".to_string()], "Martlock")
///     .await?;
/// ```
pub struct AlbionDataProvider {
    client: Client,
    base_url: String,
    backoff: BackoffPolicy,
}

impl AlbionDataProvider {
    pub fn new(config: AlbionProviderConfig) -> Result<Self, MarketDataError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent)
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            backoff: config.backoff,
        })
    }

    fn prices_url(&self, item_names: &[String]) -> String {
        let joined = item_names
            .iter()
            .map(|name| urlencoding::encode(name).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/stats/prices/{}", self.base_url, joined)
    }

    /// One request, no retries. `Ok(None)` signals a 404.
    async fn fetch_once(
        &self,
        url: &str,
        location: &str,
    ) -> Result<Option<String>, MarketDataError> {
        let qualities = QUALITY_LEVELS
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(url)
            .query(&[("locations", location), ("qualities", qualities.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketDataError::Timeout {
                        provider: PROVIDER_ID.to_string(),
                    }
                } else {
                    MarketDataError::Network(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if status.is_server_error() {
            return Err(MarketDataError::ServerError {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(MarketDataError::ClientError {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Some(response.text().await?))
    }

    fn parse_prices(body: &str) -> Result<Vec<PriceRecord>, MarketDataError> {
        let dtos: Vec<AlbionPriceDto> = serde_json::from_str(body)
            .map_err(|e| MarketDataError::invalid_payload(PROVIDER_ID, e.to_string()))?;

        dtos.into_iter().map(PriceRecord::try_from).collect()
    }
}

#[async_trait]
impl PriceProvider for AlbionDataProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_prices(
        &self,
        item_names: &[String],
        location: &str,
    ) -> Result<Vec<PriceRecord>, MarketDataError> {
        if item_names.is_empty() {
            return Ok(Vec::new());
        }

        if item_names.len() > MAX_SAFE_BATCH {
            warn!(
                "Fetching {} items at once for {}; consider a smaller batch size",
                item_names.len(),
                location
            );
        }

        let url = self.prices_url(item_names);
        let body = self
            .backoff
            .retry(|attempt| {
                debug!(
                    "GET {} ({} items, location {}, attempt {})",
                    url,
                    item_names.len(),
                    location,
                    attempt
                );
                self.fetch_once(&url, location)
            })
            .await?;

        match body {
            Some(body) => Self::parse_prices(&body),
            None => {
                warn!(
                    "No prices known for batch starting with {} at {} (404)",
                    item_names[0], location
                );
                Ok(Vec::new())
            }
        }
    }
}
