//! Provider-agnostic data models.

mod price;

pub use price::{PriceRecord, QUALITY_LEVELS};
