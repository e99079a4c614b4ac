//! In-memory record store

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Record, RecordId, RecordStore, StoreError, add_to_record};
use crate::fields::FieldKey;

/// Record store held in process memory
///
/// Counts every write call it receives, successful or not, which makes it a
/// convenient double for asserting that an import left a record untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordId, Record>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record
    pub async fn insert(&self, id: RecordId, record: Record) {
        self.records.write().await.insert(id, record);
    }

    /// Number of write calls received so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn write<F>(&self, id: &RecordId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Record) -> Result<(), StoreError>,
    {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.write().await;
        apply(records.entry(id.clone()).or_default())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, record: &RecordId) -> Result<Record, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(record)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError> {
        debug!("add {} on {}", key, record);
        self.write(record, |r| add_to_record(r, record, key, value))
            .await
    }

    async fn update_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError> {
        debug!("update {} on {}", key, record);
        self.write(record, |r| {
            r.fields.set(key, value);
            Ok(())
        })
        .await
    }

    async fn delete_field(&self, record: &RecordId, key: FieldKey) -> Result<(), StoreError> {
        debug!("delete {} on {}", key, record);
        self.write(record, |r| {
            r.fields.clear(key);
            Ok(())
        })
        .await
    }

    async fn set_title(&self, record: &RecordId, title: &str) -> Result<(), StoreError> {
        debug!("set title on {}", record);
        self.write(record, |r| {
            r.title = Some(title.to_string());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> RecordId {
        RecordId::new("post-1").unwrap()
    }

    #[tokio::test]
    async fn test_missing_record_is_empty() {
        let store = MemoryStore::new();
        let fields = store.get_fields(&id()).await.unwrap();
        assert!(fields.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_field_lifecycle() {
        let store = MemoryStore::new();
        let id = id();

        store.add_field(&id, FieldKey::OgImage, "a.png").await.unwrap();
        assert!(matches!(
            store.add_field(&id, FieldKey::OgImage, "b.png").await,
            Err(StoreError::AlreadySet { .. })
        ));

        store.update_field(&id, FieldKey::OgImage, "b.png").await.unwrap();
        assert_eq!(
            store.get_fields(&id).await.unwrap().get(FieldKey::OgImage),
            Some("b.png")
        );

        store.delete_field(&id, FieldKey::OgImage).await.unwrap();
        assert!(store.get_fields(&id).await.unwrap().is_empty());

        store.set_title(&id, "Hello").await.unwrap();
        assert_eq!(
            store.get_record(&id).await.unwrap().title.as_deref(),
            Some("Hello")
        );

        assert_eq!(store.write_count(), 5);
    }
}
