//! # Import Orchestration Module
//!
//! Ties the pipeline together for a single record:
//!
//! 1. skip entirely when the source URL is empty
//! 2. fetch the page (any failure here aborts before a single write)
//! 3. parse Open Graph metadata and normalize the host
//! 4. read the record's stored fields and reconcile them with the desired ones
//! 5. set the title, then apply each field write
//!
//! Writes are best effort. A failed write is recorded in the summary and the
//! remaining writes still run; nothing is rolled back.
//!
//! Steps 4 and 5 run under a per-record lock, so two imports of the same record
//! through one `Importer` cannot interleave their read and their writes.

mod error;
mod locks;

pub use error::ImportError;
pub use locks::RecordLocks;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::fetcher::Fetcher;
use crate::fields::{DesiredFields, FieldSet};
use crate::host::normalize_host;
use crate::metadata::parse_og_metadata;
use crate::reconcile::{FieldOp, ReconciliationPlan, TitleDecision, reconcile};
use crate::store::{RecordId, RecordStore, StoreError};

/// A write the importer sent to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Write {
    /// The record title was replaced
    Title { value: String },

    /// A field operation from the plan
    Field(FieldOp),
}

impl fmt::Display for Write {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Write::Title { value } => write!(f, "set title = {:?}", value),
            Write::Field(FieldOp::Add { key, value }) => write!(f, "add {} = {:?}", key, value),
            Write::Field(FieldOp::Update { key, value }) => {
                write!(f, "update {} = {:?}", key, value)
            }
            Write::Field(FieldOp::Delete { key }) => write!(f, "delete {}", key),
            Write::Field(FieldOp::NoOp { key }) => write!(f, "keep {}", key),
        }
    }
}

/// A write the store rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedWrite {
    pub write: Write,
    pub reason: String,
}

/// Outcome of one import
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub record_id: RecordId,
    pub url: String,
    pub imported_at: DateTime<Utc>,

    /// True when the URL was empty and nothing was attempted
    pub skipped: bool,

    /// Writes the store accepted, in the order they were sent
    pub applied_ops: Vec<Write>,

    /// Writes the store rejected, in the order they were sent
    pub failed_ops: Vec<FailedWrite>,
}

impl ImportSummary {
    fn new(record: &RecordId, url: &str) -> Self {
        Self {
            record_id: record.clone(),
            url: url.to_string(),
            imported_at: Utc::now(),
            skipped: false,
            applied_ops: Vec::new(),
            failed_ops: Vec::new(),
        }
    }

    fn skipped(record: &RecordId) -> Self {
        Self {
            skipped: true,
            ..Self::new(record, "")
        }
    }

    /// Whether every attempted write succeeded
    pub fn is_complete(&self) -> bool {
        self.failed_ops.is_empty()
    }

    fn record(&mut self, write: Write, result: Result<(), StoreError>) {
        match result {
            Ok(()) => {
                debug!("Applied {}", write);
                self.applied_ops.push(write);
            }
            Err(e) => {
                warn!("Failed to apply {} to {}: {}", write, self.record_id, e);
                self.failed_ops.push(FailedWrite {
                    write,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Imports Open Graph metadata into records
#[derive(Debug)]
pub struct Importer {
    fetcher: Fetcher,
    locks: RecordLocks,
}

impl Importer {
    /// Create an importer that fetches pages with `fetcher`
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            locks: RecordLocks::new(),
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Fetch the page and derive the fields it implies
    async fn desired_fields(&self, url: &str) -> Result<DesiredFields, ImportError> {
        let body = self.fetcher.fetch(url).await?;
        let metadata = parse_og_metadata(&body);
        let host = normalize_host(url).map_err(|e| ImportError::InvalidUrl(e.to_string()))?;
        Ok(FieldSet::desired(url, &host, &metadata))
    }

    /// Compute the plan an import would apply, without writing anything
    ///
    /// Returns `None` for an empty URL.
    #[instrument(skip(self, store), level = "debug")]
    pub async fn plan<S>(
        &self,
        record: &RecordId,
        url: &str,
        store: &S,
    ) -> Result<Option<ReconciliationPlan>, ImportError>
    where
        S: RecordStore + ?Sized,
    {
        let url = url.trim();
        if url.is_empty() {
            return Ok(None);
        }

        let desired = self.desired_fields(url).await?;
        let stored = store
            .get_fields(record)
            .await
            .map_err(ImportError::StoreRead)?;
        Ok(Some(reconcile(&desired, &stored)))
    }

    /// Import the page at `url` into `record`
    ///
    /// # Arguments
    ///
    /// * `record` - The record to update
    /// * `url` - Source page; an empty string makes this a no-op
    /// * `store` - Where the record lives
    ///
    /// # Returns
    ///
    /// The writes that were applied and the ones that failed
    #[instrument(skip(self, store))]
    pub async fn import<S>(
        &self,
        record: &RecordId,
        url: &str,
        store: &S,
    ) -> Result<ImportSummary, ImportError>
    where
        S: RecordStore + ?Sized,
    {
        let url = url.trim();
        if url.is_empty() {
            debug!("No source URL for {}, skipping import", record);
            return Ok(ImportSummary::skipped(record));
        }

        let desired = self.desired_fields(url).await?;

        let _guard = self.locks.lock(record).await;
        let stored = store
            .get_fields(record)
            .await
            .map_err(ImportError::StoreRead)?;
        let plan = reconcile(&desired, &stored);

        let mut summary = ImportSummary::new(record, url);

        if let TitleDecision::Set(title) = plan.title {
            let result = store.set_title(record, &title).await;
            summary.record(Write::Title { value: title }, result);
        }

        for op in plan.ops {
            let result = match &op {
                FieldOp::Add { key, value } => store.add_field(record, *key, value).await,
                FieldOp::Update { key, value } => store.update_field(record, *key, value).await,
                FieldOp::Delete { key } => store.delete_field(record, *key).await,
                FieldOp::NoOp { .. } => continue,
            };
            summary.record(Write::Field(op), result);
        }

        info!(
            "Imported {} into {}: {} applied, {} failed",
            url,
            record,
            summary.applied_ops.len(),
            summary.failed_ops.len()
        );
        Ok(summary)
    }
}
