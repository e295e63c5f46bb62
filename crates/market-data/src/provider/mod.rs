//! Price providers and the retry policy they share.

pub mod albion;
mod backoff;
mod traits;

pub use albion::{AlbionDataProvider, AlbionProviderConfig};
pub use backoff::{BackoffPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY};
pub use traits::PriceProvider;
