//! Error types for the store module

use std::io;

use crate::error::Error as CrateError;
use crate::fields::FieldKey;
use thiserror::Error;

/// Error type for record store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// XML serialization error
    #[error("XML serialization error: {0}")]
    SerializeError(#[from] quick_xml::errors::serialize::SeError),

    /// XML deserialization error
    #[error("XML deserialization error: {0}")]
    DeserializeError(#[from] quick_xml::errors::serialize::DeError),

    /// Record identifier that cannot be used
    #[error("Invalid record id: {0:?}")]
    InvalidRecordId(String),

    /// `add` on a field that already has a value
    #[error("Field {key} of record {record} already has a value")]
    AlreadySet {
        /// Record identifier
        record: String,
        /// Field that was being added
        key: FieldKey,
    },

    /// The backing store refused the write
    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl From<StoreError> for CrateError {
    fn from(err: StoreError) -> Self {
        CrateError::Store(err.to_string())
    }
}
