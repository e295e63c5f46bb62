//! CraftFlow Core - Domain entities, the ingestion pipeline, and its traits.
//!
//! This crate is database-agnostic. Persistence is described by the
//! [`ingest::IngestStore`] trait, implemented by the `storage-sqlite` crate;
//! upstream prices come from any `craftflow_market_data::PriceProvider`.

pub mod catalog;
pub mod constants;
pub mod errors;
pub mod ingest;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
