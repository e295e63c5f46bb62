//! CraftFlow Market Data Crate
//!
//! Upstream boundary of the price ingestor: everything that talks to, or
//! paces calls to, an external price source.
//!
//! # Overview
//!
//! - [`PriceRecord`] - provider-agnostic price snapshot for (item, city, quality)
//! - [`PriceProvider`] - trait implemented by every price source
//! - [`AlbionDataProvider`] - HTTP provider for the Albion Online Data Project
//! - [`BackoffPolicy`] - bounded exponential retry used by HTTP providers
//! - [`RateLimiter`] - shared token bucket bounding the aggregate request rate
//! - [`MarketDataError`] - errors with a [`RetryClass`] for retry decisions
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   Orchestrator   | --> |   RateLimiter    |  (one token per batch)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |  PriceProvider   | --> |  BackoffPolicy   |  (429 / 5xx / network)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |   PriceRecord    |
//! +------------------+
//! ```

pub mod errors;
pub mod limiter;
pub mod models;
pub mod provider;

pub use errors::{MarketDataError, RetryClass};
pub use limiter::{RateLimitConfig, RateLimiter};
pub use models::{PriceRecord, QUALITY_LEVELS};
pub use provider::albion::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use provider::{AlbionDataProvider, AlbionProviderConfig, BackoffPolicy, PriceProvider};
