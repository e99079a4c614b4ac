//! Open Graph metadata extraction
//!
//! Parsing is lenient: the document goes through an HTML5 parser, so broken
//! markup yields whatever tags are still recoverable instead of an error.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;

/// Property prefix of the Open Graph namespace
pub const OG_PREFIX: &str = "og:";

/// Property that receives the `<title>` fallback
pub const OG_TITLE: &str = "og:title";

pub const OG_IMAGE: &str = "og:image";

pub const OG_DESCRIPTION: &str = "og:description";

/// Open Graph properties found in a document, keyed by property name
///
/// An absent key means the page did not declare it, which is distinct from a
/// tag whose content is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OgMetadata {
    properties: BTreeMap<String, String>,
}

impl OgMetadata {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a property, if the page declared it
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }

    /// Record a property, replacing any earlier value
    pub fn insert(&mut self, property: impl Into<String>, content: impl Into<String>) {
        self.properties.insert(property.into(), content.into());
    }

    /// Iterate over properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn og_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse(&format!(r#"meta[property^="{}"]"#, OG_PREFIX))
            .expect("static selector is valid")
    })
}

fn title_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("title").expect("static selector is valid"))
}

/// Extract Open Graph properties from an HTML document
///
/// Every `<meta>` whose `property` starts with `og:` is recorded as
/// `property -> content`; a repeated property keeps the last value in
/// document order. When `og:title` is missing or empty, the text of the first
/// `<title>` element takes its place.
///
/// # Arguments
///
/// * `html` - The HTML of the page
///
/// # Returns
///
/// The extracted properties, empty when the page declares none
pub fn parse_og_metadata(html: &str) -> OgMetadata {
    let document = Html::parse_document(html);
    let mut metadata = OgMetadata::new();

    for element in document.select(og_selector()) {
        let element = element.value();
        if let Some(property) = element.attr("property") {
            let content = element.attr("content").unwrap_or_default();
            metadata.insert(property, content);
        }
    }

    if metadata.get(OG_TITLE).is_none_or(str::is_empty) {
        if let Some(title) = document.select(title_selector()).next() {
            metadata.insert(OG_TITLE, title.text().collect::<String>());
        }
    }

    debug!("Extracted {} Open Graph properties", metadata.len());
    metadata
}
