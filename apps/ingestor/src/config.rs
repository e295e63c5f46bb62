use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use craftflow_core::ingest::IngestorConfig;
use craftflow_market_data::{AlbionProviderConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};

const DEFAULT_DB_PATH: &str = "./db/craftflow.db";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Where batch units read prices from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// The public HTTP API.
    Api,
    /// Prices already stored in the database (offline replay).
    Database,
}

impl FromStr for PriceSource {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "database" | "db" => Ok(Self::Database),
            other => bail!("unknown price source '{}', expected 'api' or 'database'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("unknown log format '{}', expected 'text' or 'json'", other),
        }
    }
}

pub struct Config {
    pub db_path: String,
    pub api_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub source: PriceSource,
    pub log_format: LogFormat,
    pub ingestor: IngestorConfig,
}

/// Parse `key` if set; unset or blank means `None`.
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {}='{}': {}", key, raw, e)),
        None => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = IngestorConfig::default();

        let db_path = lookup("INGESTOR_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into());
        let api_url = lookup("INGESTOR_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let user_agent =
            lookup("INGESTOR_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.into());
        let timeout_secs = parse_var::<u64>(&lookup, "INGESTOR_REQUEST_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let source = parse_var::<PriceSource>(&lookup, "INGESTOR_SOURCE")?
            .unwrap_or(PriceSource::Api);
        let log_format = parse_var::<LogFormat>(&lookup, "INGESTOR_LOG_FORMAT")?
            .unwrap_or(LogFormat::Text);

        let ingestor = IngestorConfig {
            max_requests_per_second: parse_var(&lookup, "INGESTOR_RATE_LIMIT")?
                .unwrap_or(defaults.max_requests_per_second),
            rate_burst: parse_var(&lookup, "INGESTOR_RATE_BURST")?.unwrap_or(defaults.rate_burst),
            max_concurrent_batches: parse_var(&lookup, "INGESTOR_CONCURRENCY")?
                .unwrap_or(defaults.max_concurrent_batches),
            batch_size: parse_var(&lookup, "INGESTOR_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            selection_limit: parse_var(&lookup, "INGESTOR_SELECTION_LIMIT")?
                .unwrap_or(defaults.selection_limit),
            min_refresh_interval: match parse_var::<u64>(&lookup, "INGESTOR_MIN_REFRESH_MINUTES")? {
                Some(minutes) => minutes
                    .checked_mul(60)
                    .map(Duration::from_secs)
                    .ok_or_else(|| anyhow!("INGESTOR_MIN_REFRESH_MINUTES={} is too large", minutes))?,
                None => defaults.min_refresh_interval,
            },
            idle_sleep: parse_var::<u64>(&lookup, "INGESTOR_SLEEP_SEC")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_sleep),
            error_backoff: defaults.error_backoff,
        };
        ingestor
            .validate()
            .context("invalid ingestor configuration")?;

        Ok(Self {
            db_path,
            api_url,
            user_agent,
            request_timeout: Duration::from_secs(timeout_secs),
            source,
            log_format,
            ingestor,
        })
    }

    pub fn provider_config(&self) -> AlbionProviderConfig {
        AlbionProviderConfig {
            base_url: self.api_url.clone(),
            user_agent: self.user_agent.clone(),
            request_timeout: self.request_timeout,
            ..AlbionProviderConfig::default()
        }
    }
}
