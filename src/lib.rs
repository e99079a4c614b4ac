//! # linkpost - Open Graph imports for stored records
//!
//! This crate pulls Open Graph metadata from an external page and folds it into
//! a record's persisted fields: the link itself, its image, description and
//! title, and a display host derived from the URL. The record's title follows
//! the page title.
//!
//! ## Features
//!
//! - Timeout-bounded page fetching with an optional host allow-list
//! - Lenient HTML parsing that never fails an import over bad markup
//! - `<title>` fallback when a page has no `og:title`
//! - Three-way reconciliation: only changed fields are written, and values
//!   a page no longer declares are removed
//! - Best-effort writes with a per-operation report
//! - Pluggable record stores (in-memory and XML files included)
//!
//! ## Example
//!
//! ```rust,no_run
//! use linkpost::fetcher::{Fetcher, FetcherConfig};
//! use linkpost::import::Importer;
//! use linkpost::store::{MemoryStore, RecordId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let importer = Importer::new(Fetcher::new(FetcherConfig::default())?);
//!     let store = MemoryStore::new();
//!     let record = RecordId::new("post-1")?;
//!
//!     let summary = importer
//!         .import(&record, "https://www.example.com/article", &store)
//!         .await?;
//!
//!     for write in &summary.applied_ops {
//!         println!("{}", write);
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod fetcher;
pub mod fields;
pub mod host;
pub mod import;
pub mod metadata;
pub mod reconcile;
pub mod store;

pub use error::{Error, Result};

use serde::Serialize;

use fetcher::Fetcher;
use fields::{DesiredFields, FieldSet};
use metadata::{OgMetadata, parse_og_metadata};

/// What an import would derive from a page, independent of any record
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub url: String,
    pub host: String,
    pub metadata: OgMetadata,
    pub desired: DesiredFields,
}

/// Fetch a page and report its metadata and the fields it implies
pub async fn inspect(url: &str, fetcher: &Fetcher) -> Result<Inspection> {
    let url = url.trim();
    let body = fetcher.fetch(url).await?;
    let metadata = parse_og_metadata(&body);
    let host = host::normalize_host(url)?;
    let desired = FieldSet::desired(url, &host, &metadata);

    Ok(Inspection {
        url: url.to_string(),
        host,
        metadata,
        desired,
    })
}

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::fetcher::{Fetcher, FetcherConfig};
    pub use crate::fields::{FieldKey, FieldSet};
    pub use crate::import::{ImportSummary, Importer};
    pub use crate::store::{RecordId, RecordStore};
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetcher::FetcherConfig;
    use fields::FieldKey;
    use mockito::Server;

    #[tokio::test]
    async fn test_inspect() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<head><meta property="og:image" content="i.png"><title>T</title></head>"#)
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetcherConfig::default()).unwrap();
        let inspection = inspect(&format!("{}/", server.url()), &fetcher)
            .await
            .unwrap();

        assert_eq!(inspection.host, "127.0.0.1");
        assert_eq!(inspection.metadata.get("og:title"), Some("T"));
        assert_eq!(inspection.desired.get(FieldKey::OgImage), Some("i.png"));
    }

    #[tokio::test]
    async fn test_inspect_errors_convert() {
        let fetcher = Fetcher::new(FetcherConfig::default()).unwrap();
        let result = inspect("nope", &fetcher).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
