//! Matrix model
//!
//! Rows keyed by variable name, columns keyed by [`EnvironmentId`], and a
//! per-row value pool that assignments reference by id.

use crate::environment::{EnvironmentColumn, EnvironmentId};
use crate::hash::BaselineHash;
use crate::record::{RawEnvRecord, ReadOnlyReason, ValueType};
use crate::snapshot::Capabilities;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of every value pool id
pub const VALUE_ID_PREFIX: &str = "value-";

/// One optional value id per environment column
pub type Assignments = BTreeMap<EnvironmentId, Option<String>>;

/// Value pool id for a serial number (`value-<n>`)
#[inline]
#[must_use]
pub fn value_id(serial: usize) -> String {
    format!("{VALUE_ID_PREFIX}{serial}")
}

/// Serial number of a `value-<n>` id
#[must_use]
pub fn value_serial(id: &str) -> Option<usize> {
    id.strip_prefix(VALUE_ID_PREFIX)?.parse().ok()
}

/// Back-reference to the raw record a value was built from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueSourceRef {
    pub record_id: String,
}

impl ValueSourceRef {
    #[inline]
    #[must_use]
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
        }
    }
}

/// Deduplication key of a value: two records merge iff these match
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueSignature {
    pub content: String,
    pub value_type: ValueType,
    pub comment: Option<String>,
    pub git_branch: Option<String>,
    pub read_only_reason: Option<ReadOnlyReason>,
}

impl ValueSignature {
    /// Signature of a raw record
    #[must_use]
    pub fn of_record(record: &RawEnvRecord) -> Self {
        Self {
            content: record.value.clone(),
            value_type: record.value_type,
            comment: record.comment.clone(),
            git_branch: record.git_branch.clone(),
            read_only_reason: record.effective_read_only_reason(),
        }
    }
}

/// A deduplicated value in a row's pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValuePoolEntry {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub comment: Option<String>,
    pub git_branch: Option<String>,
    pub read_only_reason: Option<ReadOnlyReason>,
    /// Raw records that produced this exact value
    pub source_rows: Vec<ValueSourceRef>,
}

impl ValuePoolEntry {
    /// Create new empty plain value with no sources
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            value_type: ValueType::Plain,
            comment: None,
            git_branch: None,
            read_only_reason: None,
            source_rows: Vec::new(),
        }
    }

    /// Entry seeded from a record's signature
    #[must_use]
    pub fn from_signature(id: impl Into<String>, signature: &ValueSignature) -> Self {
        Self {
            id: id.into(),
            content: signature.content.clone(),
            value_type: signature.value_type,
            comment: signature.comment.clone(),
            git_branch: signature.git_branch.clone(),
            read_only_reason: signature.read_only_reason,
            source_rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn signature(&self) -> ValueSignature {
        ValueSignature {
            content: self.content.clone(),
            value_type: self.value_type,
            comment: self.comment.clone(),
            git_branch: self.git_branch.clone(),
            read_only_reason: self.read_only_reason,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.value_type == ValueType::Encrypted
    }
}

/// Comparable projection of a row used by undo
#[derive(Debug, PartialEq, Eq)]
pub struct RowFingerprint<'a> {
    key: &'a str,
    values: &'a [ValuePoolEntry],
    assignments: BTreeMap<&'a EnvironmentId, &'a str>,
    is_new: bool,
}

/// One matrix row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub row_id: String,
    pub key: String,
    pub values: Vec<ValuePoolEntry>,
    pub assignments: Assignments,
    /// Raw records that fed this row
    pub source_rows: Vec<RawEnvRecord>,
    /// Created in the draft with no baseline counterpart
    pub is_new: bool,
}

impl Row {
    /// Row id derived from a key (`row:<key>`)
    #[inline]
    #[must_use]
    pub fn id_for_key(key: &str) -> String {
        format!("row:{key}")
    }

    #[must_use]
    pub fn value(&self, value_id: &str) -> Option<&ValuePoolEntry> {
        self.values.iter().find(|value| value.id == value_id)
    }

    #[must_use]
    pub fn value_mut(&mut self, value_id: &str) -> Option<&mut ValuePoolEntry> {
        self.values.iter_mut().find(|value| value.id == value_id)
    }

    /// Non-null assignments whose value exists in the pool
    ///
    /// Dangling ids are treated as unassigned.
    pub fn active_assignments(&self) -> impl Iterator<Item = (&EnvironmentId, &ValuePoolEntry)> {
        self.assignments
            .iter()
            .filter_map(|(environment, value_id)| {
                let value = self.value(value_id.as_deref()?)?;
                Some((environment, value))
            })
    }

    /// Value assigned to one environment, if it exists
    #[must_use]
    pub fn assigned_value(&self, environment: &EnvironmentId) -> Option<&ValuePoolEntry> {
        let value_id = self.assignments.get(environment)?.as_deref()?;
        self.value(value_id)
    }

    #[must_use]
    pub fn is_value_assigned(&self, value_id: &str) -> bool {
        self.assignments
            .values()
            .any(|assigned| assigned.as_deref() == Some(value_id))
    }

    /// Assignments that reference a value missing from the pool
    #[must_use]
    pub fn dangling_assignments(&self) -> Vec<(EnvironmentId, String)> {
        self.assignments
            .iter()
            .filter_map(|(environment, value_id)| {
                let value_id = value_id.as_deref()?;
                self.value(value_id)
                    .is_none()
                    .then(|| (environment.clone(), value_id.to_string()))
            })
            .collect()
    }

    /// Non-null assignments in stable key order
    #[must_use]
    pub fn assignment_fingerprint(&self) -> BTreeMap<&EnvironmentId, &str> {
        self.assignments
            .iter()
            .filter_map(|(environment, value_id)| Some((environment, value_id.as_deref()?)))
            .collect()
    }

    #[must_use]
    pub fn fingerprint(&self) -> RowFingerprint<'_> {
        RowFingerprint {
            key: &self.key,
            values: &self.values,
            assignments: self.assignment_fingerprint(),
            is_new: self.is_new,
        }
    }

    /// Highest `value-<n>` serial in the pool, 0 if none
    #[must_use]
    pub fn highest_value_serial(&self) -> usize {
        self.values
            .iter()
            .filter_map(|value| value_serial(&value.id))
            .max()
            .unwrap_or(0)
    }
}

/// The full row/column model of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    pub project_id: String,
    pub environments: Vec<EnvironmentColumn>,
    pub rows: Vec<Row>,
    /// Record id -> raw record
    pub source_row_index: BTreeMap<String, RawEnvRecord>,
    pub capabilities: Capabilities,
    pub baseline_hash: BaselineHash,
}

impl Matrix {
    #[must_use]
    pub fn row(&self, row_id: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.row_id == row_id)
    }

    #[must_use]
    pub fn row_mut(&mut self, row_id: &str) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.row_id == row_id)
    }

    /// First row with this key (case-sensitive)
    #[must_use]
    pub fn row_by_key(&self, key: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.key == key)
    }

    #[must_use]
    pub fn environment(&self, id: &EnvironmentId) -> Option<&EnvironmentColumn> {
        self.environments.iter().find(|column| &column.id == id)
    }

    /// Raw record by id
    #[must_use]
    pub fn source_row(&self, record_id: &str) -> Option<&RawEnvRecord> {
        self.source_row_index.get(record_id)
    }

    /// Every dangling assignment as `(row_id, environment, value_id)`
    #[must_use]
    pub fn dangling_assignments(&self) -> Vec<(String, EnvironmentId, String)> {
        self.rows
            .iter()
            .flat_map(|row| {
                row.dangling_assignments()
                    .into_iter()
                    .map(|(environment, value_id)| (row.row_id.clone(), environment, value_id))
            })
            .collect()
    }

    /// Assignment map with every column unset
    #[must_use]
    pub fn empty_assignments(&self) -> Assignments {
        self.environments
            .iter()
            .map(|column| (column.id.clone(), None))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::BuiltInEnvironment;

    fn row() -> Row {
        let mut assignments = Assignments::new();
        assignments.insert(BuiltInEnvironment::Production.into(), Some(value_id(1)));
        assignments.insert(BuiltInEnvironment::Preview.into(), Some(value_id(9)));
        assignments.insert(BuiltInEnvironment::Development.into(), None);
        Row {
            row_id: Row::id_for_key("KEY"),
            key: "KEY".to_string(),
            values: vec![ValuePoolEntry::empty(value_id(1)), ValuePoolEntry::empty(value_id(3))],
            assignments,
            source_rows: Vec::new(),
            is_new: false,
        }
    }

    #[test]
    fn value_serial_parses_only_value_ids() {
        assert_eq!(value_serial("value-12"), Some(12));
        assert_eq!(value_serial("value-"), None);
        assert_eq!(value_serial("other-1"), None);
    }

    #[test]
    fn active_assignments_skip_dangling() {
        let row = row();
        let active: Vec<_> = row
            .active_assignments()
            .map(|(environment, value)| (environment.to_string(), value.id.clone()))
            .collect();
        assert_eq!(active, vec![("production".to_string(), "value-1".to_string())]);

        assert_eq!(
            row.dangling_assignments(),
            vec![(BuiltInEnvironment::Preview.into(), "value-9".to_string())]
        );
    }

    #[test]
    fn highest_serial_and_assigned_checks() {
        let row = row();
        assert_eq!(row.highest_value_serial(), 3);
        assert!(row.is_value_assigned("value-1"));
        assert!(!row.is_value_assigned("value-3"));
    }

    #[test]
    fn fingerprint_ignores_null_assignments() {
        let first = row();
        let mut second = row();
        second
            .assignments
            .remove(&EnvironmentId::BuiltIn(BuiltInEnvironment::Development));
        assert_eq!(first.fingerprint(), second.fingerprint());

        second.key = "OTHER".to_string();
        assert_ne!(first.fingerprint(), second.fingerprint());
    }
}
