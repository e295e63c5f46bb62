//! SQLite storage implementation for the CraftFlow ingestor.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite:
//! - Database connection pooling, pragmas and the single writer actor
//! - Embedded Diesel migrations
//! - [`ingest::IngestRepository`], the `IngestStore` the pipeline runs against
//! - [`catalog::CatalogRepository`] for reference data
//! - [`ingest::StoredPriceProvider`], a `PriceProvider` backed by stored prices
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//!
//! ```text
//! core (pipeline)        market-data (upstream)
//!       │                      │
//!       └──────────┬───────────┘
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod catalog;
pub mod db;
pub mod errors;
pub mod ingest;
pub mod schema;
pub mod utils;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use catalog::CatalogRepository;
pub use ingest::{IngestRepository, StoredPriceProvider};

// Re-export from craftflow-core for convenience
pub use craftflow_core::errors::{DatabaseError, Error, Result};
