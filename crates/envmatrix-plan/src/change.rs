//! Change detection
//!
//! Row-level semantic deltas between a baseline and a draft matrix.

use envmatrix_model::{Matrix, Row, ValueSignature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of row-level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Row only in the draft
    Create,
    /// Value pool differs
    Update,
    /// Row only in the baseline
    Delete,
    /// Same row id, different key
    Rename,
    /// Assignment map differs
    Retarget,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Rename => "rename",
            Self::Retarget => "retarget",
        }
    }
}

/// One atomic change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixChange {
    /// `<kind>:<rowId>`
    pub change_id: String,
    pub kind: ChangeKind,
    pub row_id: String,
    pub summary: String,
}

impl MatrixChange {
    fn new(kind: ChangeKind, row_id: &str, summary: String) -> Self {
        Self {
            change_id: format!("{}:{row_id}", kind.as_str()),
            kind,
            row_id: row_id.to_string(),
            summary,
        }
    }
}

// Value ids and source refs are bookkeeping; only value semantics count
fn values_fingerprint(row: &Row) -> Vec<ValueSignature> {
    row.values.iter().map(|value| value.signature()).collect()
}

/// Compare two matrices row by row
///
/// Fingerprints are structural, so two equal drafts always yield no changes.
/// Output order: creates (draft order), deletes (baseline order), then
/// rename/update/retarget per surviving draft row.
#[must_use]
pub fn detect_changes(baseline: &Matrix, draft: &Matrix) -> Vec<MatrixChange> {
    let baseline_rows: BTreeMap<&str, &Row> = baseline
        .rows
        .iter()
        .map(|row| (row.row_id.as_str(), row))
        .collect();
    let draft_rows: BTreeMap<&str, &Row> = draft
        .rows
        .iter()
        .map(|row| (row.row_id.as_str(), row))
        .collect();

    let mut changes = Vec::new();

    for row in &draft.rows {
        if !baseline_rows.contains_key(row.row_id.as_str()) {
            changes.push(MatrixChange::new(
                ChangeKind::Create,
                &row.row_id,
                format!("Create key {}", row.key),
            ));
        }
    }

    for row in &baseline.rows {
        if !draft_rows.contains_key(row.row_id.as_str()) {
            changes.push(MatrixChange::new(
                ChangeKind::Delete,
                &row.row_id,
                format!("Delete key {}", row.key),
            ));
        }
    }

    for row in &draft.rows {
        let Some(before) = baseline_rows.get(row.row_id.as_str()) else {
            continue;
        };

        if before.key != row.key {
            changes.push(MatrixChange::new(
                ChangeKind::Rename,
                &row.row_id,
                format!("Rename key {} -> {}", before.key, row.key),
            ));
        }
        if values_fingerprint(before) != values_fingerprint(row) {
            changes.push(MatrixChange::new(
                ChangeKind::Update,
                &row.row_id,
                format!("Update value pool for {}", row.key),
            ));
        }
        if before.assignment_fingerprint() != row.assignment_fingerprint() {
            changes.push(MatrixChange::new(
                ChangeKind::Retarget,
                &row.row_id,
                format!("Update environment assignments for {}", row.key),
            ));
        }
    }

    changes
}
