//! File-backed record store
//!
//! Each record lives in its own XML document, `<base_path>/<record-id>.xml`:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <record id="post-1" updated="2024-05-01T10:00:00Z">
//!   <title value="Example Domain"/>
//!   <field key="linked:url" value="https://example.com/"/>
//!   <field key="linked:host" value="example.com"/>
//! </record>
//! ```
//!
//! Values are kept in attributes because the XML deserializer trims text
//! content, and titles often carry surrounding whitespace. Fields with keys
//! this crate does not manage are carried over unchanged on every rewrite.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::{de::from_str, se::to_string};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{Record, RecordId, RecordStore, StoreError, add_to_record};
use crate::fields::{FieldKey, FieldSet};

/// Storage configuration
#[derive(Debug, Clone)]
pub struct XmlStoreConfig {
    /// Directory holding one file per record
    pub base_path: PathBuf,
}

impl Default for XmlStoreConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(".linkpost/records"),
        }
    }
}

/// XML representation of a record
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename = "record")]
struct RecordDocument {
    #[serde(rename = "@id")]
    id: String,

    #[serde(rename = "@updated", default, skip_serializing_if = "Option::is_none")]
    updated: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<TitleEntry>,

    #[serde(rename = "field", default)]
    fields: Vec<FieldEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct TitleEntry {
    #[serde(rename = "@value")]
    value: String,
}

/// XML representation of a single field
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct FieldEntry {
    #[serde(rename = "@key")]
    key: String,

    #[serde(rename = "@value", default)]
    value: String,
}

/// A stored record plus the field entries it does not understand
#[derive(Debug, Default)]
struct LoadedRecord {
    record: Record,
    foreign: Vec<FieldEntry>,
}

impl RecordDocument {
    fn from_record(id: &RecordId, record: &Record, foreign: &[FieldEntry]) -> Self {
        let mut fields: Vec<FieldEntry> = record
            .fields
            .iter()
            .map(|(key, value)| FieldEntry {
                key: key.as_str().to_string(),
                value: value.to_string(),
            })
            .collect();
        fields.extend_from_slice(foreign);

        RecordDocument {
            id: id.to_string(),
            updated: Some(Utc::now()),
            title: record
                .title
                .clone()
                .filter(|title| !title.is_empty())
                .map(|value| TitleEntry { value }),
            fields,
        }
    }

    fn into_loaded(self) -> LoadedRecord {
        let mut fields = FieldSet::new();
        let mut foreign = Vec::new();
        for entry in self.fields {
            match entry.key.parse::<FieldKey>() {
                Ok(key) => fields.set(key, entry.value),
                Err(e) => {
                    debug!("Keeping unmanaged field in record {}: {}", self.id, e);
                    foreign.push(entry);
                }
            }
        }
        LoadedRecord {
            record: Record {
                title: self.title.map(|title| title.value),
                fields,
            },
            foreign,
        }
    }
}

/// Record store writing one XML file per record
#[derive(Debug)]
pub struct XmlStore {
    config: XmlStoreConfig,

    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl Default for XmlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlStore {
    /// Create a new store with default configuration
    pub fn new() -> Self {
        Self::with_config(XmlStoreConfig::default())
    }

    /// Create a new store with custom configuration
    pub fn with_config(config: XmlStoreConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Gets the storage path for a record
    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.config.base_path.join(format!("{}.xml", id))
    }

    /// Creates necessary directories for storage
    async fn ensure_directories(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn load(&self, id: &RecordId) -> Result<LoadedRecord, StoreError> {
        let path = self.record_path(id);
        let xml = match fs::read_to_string(&path).await {
            Ok(xml) => xml,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LoadedRecord::default()),
            Err(e) => return Err(e.into()),
        };
        let document: RecordDocument = from_str(&xml)?;
        if document.id != id.as_str() {
            warn!("Record file {} claims id {}", path.display(), document.id);
        }
        Ok(document.into_loaded())
    }

    async fn save(&self, id: &RecordId, loaded: &LoadedRecord) -> Result<(), StoreError> {
        let path = self.record_path(id);
        self.ensure_directories(&path).await?;

        let document = RecordDocument::from_record(id, &loaded.record, &loaded.foreign);
        let xml = to_string(&document)?;
        fs::write(
            &path,
            format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml),
        )
        .await?;
        debug!("Wrote record {} to {}", id, path.display());
        Ok(())
    }

    async fn modify<F>(&self, id: &RecordId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Record) -> Result<(), StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut loaded = self.load(id).await?;
        apply(&mut loaded.record)?;
        self.save(id, &loaded).await
    }
}

#[async_trait]
impl RecordStore for XmlStore {
    #[instrument(skip(self), level = "debug")]
    async fn get_record(&self, record: &RecordId) -> Result<Record, StoreError> {
        Ok(self.load(record).await?.record)
    }

    async fn add_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError> {
        self.modify(record, |r| add_to_record(r, record, key, value))
            .await
    }

    async fn update_field(
        &self,
        record: &RecordId,
        key: FieldKey,
        value: &str,
    ) -> Result<(), StoreError> {
        self.modify(record, |r| {
            r.fields.set(key, value);
            Ok(())
        })
        .await
    }

    async fn delete_field(&self, record: &RecordId, key: FieldKey) -> Result<(), StoreError> {
        self.modify(record, |r| {
            r.fields.clear(key);
            Ok(())
        })
        .await
    }

    async fn set_title(&self, record: &RecordId, title: &str) -> Result<(), StoreError> {
        self.modify(record, |r| {
            r.title = Some(title.to_string());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> XmlStore {
        XmlStore::with_config(XmlStoreConfig {
            base_path: dir.path().to_path_buf(),
        })
    }

    #[test]
    fn test_default_path() {
        let store = XmlStore::new();
        let path = store.record_path(&RecordId::new("post-7").unwrap());
        assert_eq!(path, Path::new(".linkpost/records/post-7.xml"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let record = store.get_record(&RecordId::new("nope").unwrap()).await.unwrap();
        assert_eq!(record, Record::default());
    }

    #[tokio::test]
    async fn test_writes_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let id = RecordId::new("post-1").unwrap();

        let store = store_in(&dir);
        store.set_title(&id, "Fish & Chips <3").await.unwrap();
        store
            .add_field(&id, FieldKey::Url, "https://example.com/?a=1&b=2")
            .await
            .unwrap();
        store.add_field(&id, FieldKey::Host, "example.com").await.unwrap();
        store.delete_field(&id, FieldKey::Host).await.unwrap();

        let xml = std::fs::read_to_string(dir.path().join("post-1.xml")).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"key="linked:url""#));

        let reopened = store_in(&dir);
        let record = reopened.get_record(&id).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Fish & Chips <3"));
        assert_eq!(
            record.fields.get(FieldKey::Url),
            Some("https://example.com/?a=1&b=2")
        );
        assert_eq!(record.fields.get(FieldKey::Host), None);
    }

    #[tokio::test]
    async fn test_add_rejects_existing_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let id = RecordId::new("post-2").unwrap();

        store.add_field(&id, FieldKey::OgTitle, "One").await.unwrap();
        let result = store.add_field(&id, FieldKey::OgTitle, "Two").await;

        assert!(matches!(result, Err(StoreError::AlreadySet { .. })));
        assert_eq!(
            store.get_fields(&id).await.unwrap().get(FieldKey::OgTitle),
            Some("One")
        );
    }

    #[tokio::test]
    async fn test_values_keep_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let id = RecordId::new("padded").unwrap();

        store.set_title(&id, "\n  Hello  \n").await.unwrap();
        store
            .add_field(&id, FieldKey::OgTitle, "\n  Hello  \n")
            .await
            .unwrap();
        store
            .add_field(&id, FieldKey::OgDescription, " two  spaces ")
            .await
            .unwrap();

        let record = store_in(&dir).get_record(&id).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("\n  Hello  \n"));
        assert_eq!(record.fields.get(FieldKey::OgTitle), Some("\n  Hello  \n"));
        assert_eq!(
            record.fields.get(FieldKey::OgDescription),
            Some(" two  spaces ")
        );
    }

    #[tokio::test]
    async fn test_unmanaged_keys_survive_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("legacy.xml"),
            r#"<?xml version="1.0" encoding="UTF-8"?>
<record id="legacy"><title value="Old"/><field key="linked:og:site_name" value="Site"/><field key="linked:host" value="example.org"/></record>"#,
        )
        .unwrap();

        let store = store_in(&dir);
        let id = RecordId::new("legacy").unwrap();
        let record = store.get_record(&id).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Old"));
        assert_eq!(record.fields.get(FieldKey::Host), Some("example.org"));
        assert_eq!(record.fields.iter().count(), 1);

        store.delete_field(&id, FieldKey::Host).await.unwrap();

        let xml = std::fs::read_to_string(dir.path().join("legacy.xml")).unwrap();
        assert!(xml.contains(r#"key="linked:og:site_name""#));
        assert!(xml.contains(r#"value="Site""#));
        assert!(!xml.contains("linked:host"));
    }
}
