//! # Record Field Model
//!
//! The five persisted fields an import manages, as a fixed-shape record rather
//! than a free-form map, so a typo in a key is a compile error.
//!
//! ## Key Components
//!
//! - `FieldKey`: the five field names and their storage keys
//! - `FieldSet`: one optional value per key
//! - `DesiredFields` / `StoredFields`: what an import wants and what the store has

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::metadata::{OG_DESCRIPTION, OG_IMAGE, OG_TITLE, OgMetadata};

/// One of the fields an import writes to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    #[serde(rename = "linked:url")]
    Url,
    #[serde(rename = "linked:og:image")]
    OgImage,
    #[serde(rename = "linked:og:description")]
    OgDescription,
    #[serde(rename = "linked:host")]
    Host,
    #[serde(rename = "linked:og:title")]
    OgTitle,
}

impl FieldKey {
    /// Every key, in the order operations are applied
    pub const ALL: [FieldKey; 5] = [
        FieldKey::Url,
        FieldKey::OgImage,
        FieldKey::OgDescription,
        FieldKey::Host,
        FieldKey::OgTitle,
    ];

    /// Storage key understood by record stores
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Url => "linked:url",
            FieldKey::OgImage => "linked:og:image",
            FieldKey::OgDescription => "linked:og:description",
            FieldKey::Host => "linked:host",
            FieldKey::OgTitle => "linked:og:title",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a storage key is not one of the managed fields
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown field key: {0}")]
pub struct UnknownFieldKey(pub String);

impl FromStr for FieldKey {
    type Err = UnknownFieldKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownFieldKey(s.to_string()))
    }
}

/// A value for each managed field
///
/// Empty strings are never stored: setting a field to `""` clears it, so
/// "present" always means "present and non-empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    #[serde(rename = "linked:url", default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,

    #[serde(rename = "linked:og:image", default, skip_serializing_if = "Option::is_none")]
    og_image: Option<String>,

    #[serde(rename = "linked:og:description", default, skip_serializing_if = "Option::is_none")]
    og_description: Option<String>,

    #[serde(rename = "linked:host", default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,

    #[serde(rename = "linked:og:title", default, skip_serializing_if = "Option::is_none")]
    og_title: Option<String>,
}

/// Field values an import wants on the record
pub type DesiredFields = FieldSet;

/// Field values currently persisted for the record
pub type StoredFields = FieldSet;

impl FieldSet {
    /// Create a set with every field empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the desired fields for an import
    ///
    /// # Arguments
    ///
    /// * `url` - The source URL, stored verbatim
    /// * `host` - The normalized host of `url`
    /// * `metadata` - Open Graph properties parsed from the page
    pub fn desired(url: &str, host: &str, metadata: &OgMetadata) -> DesiredFields {
        let mut fields = FieldSet::new();
        fields.set(FieldKey::Url, url);
        fields.set(FieldKey::OgImage, metadata.get(OG_IMAGE).unwrap_or_default());
        fields.set(
            FieldKey::OgDescription,
            metadata.get(OG_DESCRIPTION).unwrap_or_default(),
        );
        fields.set(FieldKey::Host, host);
        fields.set(FieldKey::OgTitle, metadata.get(OG_TITLE).unwrap_or_default());
        fields
    }

    fn slot(&self, key: FieldKey) -> &Option<String> {
        match key {
            FieldKey::Url => &self.url,
            FieldKey::OgImage => &self.og_image,
            FieldKey::OgDescription => &self.og_description,
            FieldKey::Host => &self.host,
            FieldKey::OgTitle => &self.og_title,
        }
    }

    fn slot_mut(&mut self, key: FieldKey) -> &mut Option<String> {
        match key {
            FieldKey::Url => &mut self.url,
            FieldKey::OgImage => &mut self.og_image,
            FieldKey::OgDescription => &mut self.og_description,
            FieldKey::Host => &mut self.host,
            FieldKey::OgTitle => &mut self.og_title,
        }
    }

    /// Value of a field, `None` when it is empty
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.slot(key).as_deref().filter(|value| !value.is_empty())
    }

    /// Set a field; an empty value clears it
    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) {
        let value = value.into();
        *self.slot_mut(key) = if value.is_empty() { None } else { Some(value) };
    }

    /// Clear a field
    pub fn clear(&mut self, key: FieldKey) {
        *self.slot_mut(key) = None;
    }

    /// Whether a field holds a value
    pub fn contains(&self, key: FieldKey) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over the fields that hold a value
    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        FieldKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_strings() {
        let keys: Vec<&str> = FieldKey::ALL.iter().map(|key| key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "linked:url",
                "linked:og:image",
                "linked:og:description",
                "linked:host",
                "linked:og:title",
            ]
        );

        for key in FieldKey::ALL {
            assert_eq!(key.as_str().parse::<FieldKey>().unwrap(), key);
        }
        assert!("linked:og:site_name".parse::<FieldKey>().is_err());
    }

    #[test]
    fn test_empty_value_clears() {
        let mut fields = FieldSet::new();
        fields.set(FieldKey::Host, "example.com");
        assert_eq!(fields.get(FieldKey::Host), Some("example.com"));

        fields.set(FieldKey::Host, "");
        assert_eq!(fields.get(FieldKey::Host), None);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_desired_from_metadata() {
        let mut metadata = OgMetadata::new();
        metadata.insert(OG_TITLE, "Title");
        metadata.insert(OG_DESCRIPTION, "");
        metadata.insert("og:site_name", "Ignored");

        let desired = FieldSet::desired("https://www.example.com/a", "example.com", &metadata);

        assert_eq!(desired.get(FieldKey::Url), Some("https://www.example.com/a"));
        assert_eq!(desired.get(FieldKey::Host), Some("example.com"));
        assert_eq!(desired.get(FieldKey::OgTitle), Some("Title"));
        assert_eq!(desired.get(FieldKey::OgDescription), None);
        assert_eq!(desired.get(FieldKey::OgImage), None);
        assert_eq!(desired.iter().count(), 3);
    }

    #[test]
    fn test_serializes_with_storage_keys() {
        let mut fields = FieldSet::new();
        fields.set(FieldKey::OgImage, "a.png");

        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json, serde_json::json!({ "linked:og:image": "a.png" }));
    }
}
