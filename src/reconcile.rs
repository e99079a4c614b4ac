//! # Field Reconciliation Module
//!
//! Compares the fields an import wants with the fields a record already has
//! and produces the smallest set of writes that gets from one to the other.
//! Planning is pure; nothing here touches a store.
//!
//! ## Decision table
//!
//! | desired | stored  | operation      |
//! |---------|---------|----------------|
//! | value   | empty   | `Add`          |
//! | value   | other   | `Update`       |
//! | value   | same    | `NoOp`         |
//! | empty   | value   | `Delete`       |
//! | empty   | empty   | `NoOp`         |
//!
//! The record title is handled separately: a non-empty desired `og:title` is
//! always written, even if the record already carries that title.

use serde::Serialize;

use crate::fields::{DesiredFields, FieldKey, StoredFields};

/// A planned change to one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldOp {
    /// The field is empty and gets a value
    Add { key: FieldKey, value: String },

    /// The field holds a different value and is overwritten
    Update { key: FieldKey, value: String },

    /// The field holds a value the import no longer finds
    Delete { key: FieldKey },

    /// The field already matches
    NoOp { key: FieldKey },
}

impl FieldOp {
    /// The field this operation targets
    pub fn key(&self) -> FieldKey {
        match self {
            FieldOp::Add { key, .. }
            | FieldOp::Update { key, .. }
            | FieldOp::Delete { key }
            | FieldOp::NoOp { key } => *key,
        }
    }

    /// Whether applying this operation writes to the store
    pub fn is_write(&self) -> bool {
        !matches!(self, FieldOp::NoOp { .. })
    }
}

/// What to do with the record's display title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "title", rename_all = "snake_case")]
pub enum TitleDecision {
    /// Overwrite the title with this value
    Set(String),

    /// Leave the title alone
    Keep,
}

/// Ordered operations for one import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// One operation per field, in `FieldKey::ALL` order
    pub ops: Vec<FieldOp>,

    /// Title change, applied before any field operation
    pub title: TitleDecision,
}

impl ReconciliationPlan {
    /// Operations that write to the store
    pub fn writes(&self) -> impl Iterator<Item = &FieldOp> {
        self.ops.iter().filter(|op| op.is_write())
    }

    /// Whether every field already matches
    pub fn fields_unchanged(&self) -> bool {
        self.writes().next().is_none()
    }
}

/// Decide the operation for a single field
fn reconcile_field(key: FieldKey, desired: Option<&str>, stored: Option<&str>) -> FieldOp {
    match (desired, stored) {
        (Some(d), None) => FieldOp::Add {
            key,
            value: d.to_string(),
        },
        (Some(d), Some(s)) if d != s => FieldOp::Update {
            key,
            value: d.to_string(),
        },
        (None, Some(_)) => FieldOp::Delete { key },
        (Some(_), Some(_)) | (None, None) => FieldOp::NoOp { key },
    }
}

/// Plan the writes that bring `stored` in line with `desired`
///
/// # Arguments
///
/// * `desired` - Fields derived from the fetched page
/// * `stored` - Fields currently persisted for the record
///
/// # Returns
///
/// One operation per field plus the title decision
pub fn reconcile(desired: &DesiredFields, stored: &StoredFields) -> ReconciliationPlan {
    let ops = FieldKey::ALL
        .into_iter()
        .map(|key| reconcile_field(key, desired.get(key), stored.get(key)))
        .collect();

    let title = match desired.get(FieldKey::OgTitle) {
        Some(title) => TitleDecision::Set(title.to_string()),
        None => TitleDecision::Keep,
    };

    ReconciliationPlan { ops, title }
}
