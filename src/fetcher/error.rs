//! Error types for the fetcher module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL is empty, relative or otherwise malformed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Only http and https pages are fetched
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The host is not on the configured allow-list
    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Connection, TLS or body transfer failure
    #[error("Network error: {0}")]
    Network(reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    HttpStatus(u16),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(e) => CrateError::Http(e),
            FetchError::InvalidUrl(msg) => CrateError::InvalidUrl(msg),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}
