//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all upstream price operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while fetching prices from a provider.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which the provider's backoff loop uses to decide whether to try again.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with a 5xx status.
    #[error("Server error from {provider}: HTTP {status}")]
    ServerError {
        /// The provider that failed
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The provider rejected the request with a 4xx status other than 404/429.
    #[error("Client error from {provider}: HTTP {status}")]
    ClientError {
        /// The provider that rejected the request
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The provider returned a body that does not match the price contract.
    ///
    /// Raised for the whole batch as soon as one record is malformed.
    #[error("Invalid payload from {provider}: {message}")]
    InvalidPayload {
        /// The provider that produced the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// A storage-backed provider failed to read its snapshot.
    #[error("Source unavailable: {provider} - {message}")]
    SourceUnavailable {
        /// The provider that failed
        provider: String,
        /// The underlying error message
        message: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use craftflow_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "ALBION_DATA".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::ClientError { provider: "ALBION_DATA".to_string(), status: 400 };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::ServerError { .. }
            | Self::Network(_) => RetryClass::WithBackoff,

            Self::ClientError { .. }
            | Self::InvalidPayload { .. }
            | Self::SourceUnavailable { .. } => RetryClass::Never,
        }
    }

    pub(crate) fn invalid_payload(provider: &str, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_retries_with_backoff() {
        let error = MarketDataError::RateLimited {
            provider: "ALBION_DATA".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_timeout_retries_with_backoff() {
        let error = MarketDataError::Timeout {
            provider: "ALBION_DATA".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_server_error_retries_with_backoff() {
        let error = MarketDataError::ServerError {
            provider: "ALBION_DATA".to_string(),
            status: 502,
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_client_error_never_retries() {
        let error = MarketDataError::ClientError {
            provider: "ALBION_DATA".to_string(),
            status: 403,
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_invalid_payload_never_retries() {
        let error = MarketDataError::invalid_payload("ALBION_DATA", "negative price");
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_source_unavailable_never_retries() {
        let error = MarketDataError::SourceUnavailable {
            provider: "STORED".to_string(),
            message: "pool exhausted".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::RateLimited {
            provider: "ALBION_DATA".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: ALBION_DATA");

        let error = MarketDataError::ServerError {
            provider: "ALBION_DATA".to_string(),
            status: 503,
        };
        assert_eq!(
            format!("{}", error),
            "Server error from ALBION_DATA: HTTP 503"
        );

        let error = MarketDataError::invalid_payload("ALBION_DATA", "quality 9 out of range");
        assert_eq!(
            format!("{}", error),
            "Invalid payload from ALBION_DATA: quality 9 out of range"
        );
    }
}
