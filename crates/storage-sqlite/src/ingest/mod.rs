//! Ingestion storage: the `IngestStore` implementation and a
//! database-backed price provider.

mod model;
mod repository;
mod stored_provider;

pub use model::MarketPriceDB;
pub use repository::IngestRepository;
pub use stored_provider::{StoredPriceProvider, STORED_PROVIDER_ID};
