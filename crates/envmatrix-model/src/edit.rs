//! Draft editing
//!
//! In-place mutations of a draft [`Matrix`]. Every operation keeps the
//! dangling-reference invariant: a non-null assignment always names a value
//! in the same row's pool.

use crate::environment::{EnvironmentId, EnvironmentKind};
use crate::matrix::{value_id, Matrix, Row, ValuePoolEntry};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Prefix of ids minted for draft-only rows
pub const NEW_ROW_PREFIX: &str = "row:new:";

/// Why an assignment cell cannot be edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentBlockReason {
    /// Column is not part of the matrix
    EnvironmentMissing,
    /// Backend cannot write custom environments
    CustomEnvironmentUnsupported,
    /// Row holds an encrypted value
    RowEncrypted,
    /// Row holds a branch-scoped value the backend cannot write
    BranchUnsupported,
}

impl AssignmentBlockReason {
    /// Machine-readable code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnvironmentMissing => "environment_missing",
            Self::CustomEnvironmentUnsupported => "custom_environment_unsupported",
            Self::RowEncrypted => "row_encrypted",
            Self::BranchUnsupported => "branch_unsupported",
        }
    }
}

impl Display for AssignmentBlockReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from draft editing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// No row with this id
    #[error("row not found: {0}")]
    RowNotFound(String),

    /// No value with this id in the row
    #[error("value '{value_id}' not found in row '{row_id}'")]
    ValueNotFound { row_id: String, value_id: String },

    /// Value is still referenced by an assignment
    #[error("value '{value_id}' is still assigned in row '{row_id}'")]
    ValueAssigned { row_id: String, value_id: String },

    /// Column is not part of the matrix
    #[error("environment not found: {0}")]
    EnvironmentMissing(EnvironmentId),

    /// Cell is locked
    #[error("assignment blocked: {0}")]
    AssignmentBlocked(AssignmentBlockReason),
}

impl EditError {
    /// Machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RowNotFound(_) => "row_not_found",
            Self::ValueNotFound { .. } => "not_found",
            Self::ValueAssigned { .. } => "assigned",
            Self::EnvironmentMissing(_) => "environment_missing",
            Self::AssignmentBlocked(reason) => reason.as_str(),
        }
    }
}

impl Matrix {
    fn require_row_mut(&mut self, row_id: &str) -> Result<&mut Row, EditError> {
        self.row_mut(row_id)
            .ok_or_else(|| EditError::RowNotFound(row_id.to_string()))
    }

    /// Append a draft-only row with every column unset
    ///
    /// Returns the new row id (`row:new:<uuid>`).
    pub fn add_row(&mut self, key: impl Into<String>) -> String {
        let row_id = format!("{NEW_ROW_PREFIX}{}", uuid::Uuid::new_v4());
        let assignments = self.empty_assignments();
        self.rows.push(Row {
            row_id: row_id.clone(),
            key: key.into(),
            values: Vec::new(),
            assignments,
            source_rows: Vec::new(),
            is_new: true,
        });
        row_id
    }

    /// Remove a row from the draft
    ///
    /// # Errors
    /// Returns [`EditError::RowNotFound`] for an unknown id
    pub fn remove_row(&mut self, row_id: &str) -> Result<Row, EditError> {
        let position = self
            .rows
            .iter()
            .position(|row| row.row_id == row_id)
            .ok_or_else(|| EditError::RowNotFound(row_id.to_string()))?;
        Ok(self.rows.remove(position))
    }

    /// Change a row's key; returns whether anything changed
    ///
    /// # Errors
    /// Returns [`EditError::RowNotFound`] for an unknown id
    pub fn rename_key(&mut self, row_id: &str, key: impl Into<String>) -> Result<bool, EditError> {
        let row = self.require_row_mut(row_id)?;
        let key = key.into();
        if row.key == key {
            return Ok(false);
        }
        row.key = key;
        Ok(true)
    }

    /// Append an empty plain value named after the highest existing serial
    ///
    /// # Errors
    /// Returns [`EditError::RowNotFound`] for an unknown id
    pub fn add_value(&mut self, row_id: &str) -> Result<String, EditError> {
        let row = self.require_row_mut(row_id)?;
        let id = value_id(row.highest_value_serial() + 1);
        row.values.push(ValuePoolEntry::empty(id.clone()));
        Ok(id)
    }

    /// Replace a value's content; returns whether anything changed
    ///
    /// # Errors
    /// Returns error if the row or value does not exist
    pub fn edit_value(
        &mut self,
        row_id: &str,
        value_id: &str,
        content: impl Into<String>,
    ) -> Result<bool, EditError> {
        let row = self.require_row_mut(row_id)?;
        let value = row
            .value_mut(value_id)
            .ok_or_else(|| EditError::ValueNotFound {
                row_id: row_id.to_string(),
                value_id: value_id.to_string(),
            })?;
        let content = content.into();
        if value.content == content {
            return Ok(false);
        }
        value.content = content;
        Ok(true)
    }

    /// Remove an unassigned value from a row's pool
    ///
    /// # Errors
    /// Returns [`EditError::ValueAssigned`] while any column still points at
    /// the value, [`EditError::ValueNotFound`] when it does not exist
    pub fn remove_value(&mut self, row_id: &str, value_id: &str) -> Result<ValuePoolEntry, EditError> {
        let row = self.require_row_mut(row_id)?;
        let position = row
            .values
            .iter()
            .position(|value| value.id == value_id)
            .ok_or_else(|| EditError::ValueNotFound {
                row_id: row_id.to_string(),
                value_id: value_id.to_string(),
            })?;
        if row.is_value_assigned(value_id) {
            return Err(EditError::ValueAssigned {
                row_id: row_id.to_string(),
                value_id: value_id.to_string(),
            });
        }
        Ok(row.values.remove(position))
    }

    /// Point a cell at a value, or clear it with `None`
    ///
    /// Returns whether anything changed. Does not consult
    /// [`Matrix::can_edit_assignment`].
    ///
    /// # Errors
    /// Returns error for an unknown row, environment or value
    pub fn set_assignment(
        &mut self,
        row_id: &str,
        environment: &EnvironmentId,
        value_id: Option<&str>,
    ) -> Result<bool, EditError> {
        if self.environment(environment).is_none() {
            return Err(EditError::EnvironmentMissing(environment.clone()));
        }
        let row = self.require_row_mut(row_id)?;
        if let Some(value_id) = value_id {
            if row.value(value_id).is_none() {
                return Err(EditError::ValueNotFound {
                    row_id: row_id.to_string(),
                    value_id: value_id.to_string(),
                });
            }
        }

        let slot = row.assignments.entry(environment.clone()).or_insert(None);
        if slot.as_deref() == value_id {
            return Ok(false);
        }
        *slot = value_id.map(str::to_string);
        Ok(true)
    }

    /// Why a cell is locked, if it is
    #[must_use]
    pub fn assignment_block_reason(
        &self,
        row: &Row,
        environment: &EnvironmentId,
    ) -> Option<AssignmentBlockReason> {
        let Some(column) = self.environment(environment) else {
            return Some(AssignmentBlockReason::EnvironmentMissing);
        };
        if column.kind == EnvironmentKind::Custom && !self.capabilities.supports_custom_environments {
            return Some(AssignmentBlockReason::CustomEnvironmentUnsupported);
        }
        if row.values.iter().any(ValuePoolEntry::is_encrypted) {
            return Some(AssignmentBlockReason::RowEncrypted);
        }
        let branch_scoped = row.values.iter().any(|value| value.git_branch.is_some());
        if branch_scoped && !self.capabilities.supports_branch_specific_writes {
            return Some(AssignmentBlockReason::BranchUnsupported);
        }
        None
    }

    /// Check whether a cell may be edited
    ///
    /// # Errors
    /// Returns [`EditError::RowNotFound`] or [`EditError::AssignmentBlocked`]
    pub fn can_edit_assignment(&self, row_id: &str, environment: &EnvironmentId) -> Result<(), EditError> {
        let row = self
            .row(row_id)
            .ok_or_else(|| EditError::RowNotFound(row_id.to_string()))?;
        match self.assignment_block_reason(row, environment) {
            Some(reason) => Err(EditError::AssignmentBlocked(reason)),
            None => Ok(()),
        }
    }
}
