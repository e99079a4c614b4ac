//! # Record Store Module
//!
//! The import pipeline never owns records. It reads and writes them through
//! the `RecordStore` trait, whose primitive operations map one to one onto the
//! writes a `ReconciliationPlan` asks for. Going through primitives rather than
//! a "save record" path means a title update can never re-trigger an import.
//!
//! ## Key Components
//!
//! - `RecordId`: validated record identifier
//! - `Record`: title plus managed fields
//! - `RecordStore`: async trait the importer consumes
//! - `MemoryStore`: in-process store, also used as a test double
//! - `XmlStore`: one XML document per record on disk

mod error;
mod memory;
mod xml;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use xml::{XmlStore, XmlStoreConfig};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::fields::{FieldKey, FieldSet, StoredFields};

/// Identifier of a record in a store
///
/// Restricted to ASCII letters, digits, `-`, `_` and `.` (not leading) so it
/// can be used as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Validate and wrap a record identifier
    pub fn new(id: impl Into<String>) -> Result<Self, StoreError> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(id))
        } else {
            Err(StoreError::InvalidRecordId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::new(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecordId::new(value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// A stored record as the import pipeline sees it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Display title, `None` until one is set
    pub title: Option<String>,

    /// Managed fields
    pub fields: FieldSet,
}

/// Storage collaborator for imports
///
/// A missing record behaves like a record with no title and no fields.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the whole record
    async fn get_record(&self, record: &RecordId) -> Result<Record, StoreError>;

    /// Read the current value of every managed field
    async fn get_fields(&self, record: &RecordId) -> Result<StoredFields, StoreError> {
        Ok(self.get_record(record).await?.fields)
    }

    /// Give an empty field a value; fails if the field already has one
    async fn add_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Overwrite a field
    async fn update_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Remove a field
    async fn delete_field(&self, record: &RecordId, key: FieldKey) -> Result<(), StoreError>;

    /// Replace the record's display title
    async fn set_title(&self, record: &RecordId, title: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn get_record(&self, record: &RecordId) -> Result<Record, StoreError> {
        (**self).get_record(record).await
    }

    async fn get_fields(&self, record: &RecordId) -> Result<StoredFields, StoreError> {
        (**self).get_fields(record).await
    }

    async fn add_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError> {
        (**self).add_field(record, key, value).await
    }

    async fn update_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError> {
        (**self).update_field(record, key, value).await
    }

    async fn delete_field(&self, record: &RecordId, key: FieldKey) -> Result<(), StoreError> {
        (**self).delete_field(record, key).await
    }

    async fn set_title(&self, record: &RecordId, title: &str) -> Result<(), StoreError> {
        (**self).set_title(record, title).await
    }
}

/// Apply `add` semantics to an in-memory record
pub(crate) fn add_to_record(
    record: &mut Record,
    id: &RecordId,
    key: FieldKey,
    value: &str,
) -> Result<(), StoreError> {
    if record.fields.contains(key) {
        return Err(StoreError::AlreadySet {
            record: id.to_string(),
            key,
        });
    }
    record.fields.set(key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_validation() {
        assert!(RecordId::new("post-42").is_ok());
        assert!(RecordId::new("2024_10.draft").is_ok());

        for bad in ["", ".hidden", "../etc/passwd", "a/b", "spaced id", "ü"] {
            assert!(
                matches!(RecordId::new(bad), Err(StoreError::InvalidRecordId(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_add_to_record_refuses_overwrite() {
        let id = RecordId::new("r1").unwrap();
        let mut record = Record::default();

        add_to_record(&mut record, &id, FieldKey::Host, "example.com").unwrap();
        let err = add_to_record(&mut record, &id, FieldKey::Host, "other.com").unwrap_err();

        assert!(matches!(err, StoreError::AlreadySet { key: FieldKey::Host, .. }));
        assert_eq!(record.fields.get(FieldKey::Host), Some("example.com"));
    }
}
