//! Error types for the import module

use crate::error::Error as CrateError;
use crate::fetcher::FetchError;
use crate::store::StoreError;
use thiserror::Error;

/// Error type for import operations
///
/// Every variant means the record was left untouched. Failures of individual
/// writes are reported in `ImportSummary::failed_ops` instead.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source URL cannot be fetched as given
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The source page could not be retrieved
    #[error("Fetch failed: {0}")]
    FetchFailed(#[source] FetchError),

    /// The record's current fields could not be read
    #[error("Reading stored fields failed: {0}")]
    StoreRead(#[source] StoreError),
}

impl From<FetchError> for ImportError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(msg) => ImportError::InvalidUrl(msg),
            FetchError::UnsupportedScheme(scheme) => {
                ImportError::InvalidUrl(format!("unsupported scheme {}", scheme))
            }
            other => ImportError::FetchFailed(other),
        }
    }
}

impl From<ImportError> for CrateError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::InvalidUrl(msg) => CrateError::InvalidUrl(msg),
            ImportError::FetchFailed(e) => e.into(),
            ImportError::StoreRead(e) => e.into(),
        }
    }
}
