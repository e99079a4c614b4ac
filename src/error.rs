//! Error types for the linkpost crate

use thiserror::Error;

/// Result type for linkpost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for linkpost operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source URL could not be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Fetching the source page failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The record store rejected an operation
    #[error("Store error: {0}")]
    Store(String),
}
