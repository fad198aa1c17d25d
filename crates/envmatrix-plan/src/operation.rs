//! Planned remote operations

use envmatrix_model::{BuiltInEnvironment, RawEnvRecord};
use serde::{Deserialize, Serialize};

/// Remote mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Write a new (value, target set) record
    CreateEnv,
    /// Rewrite an existing record in place
    UpdateEnv,
    /// Remove an existing record
    DeleteEnv,
    /// Whole-row key rename
    RenameKey,
    /// Whole-row assignment change
    Retarget,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateEnv => "create_env",
            Self::UpdateEnv => "update_env",
            Self::DeleteEnv => "delete_env",
            Self::RenameKey => "rename_key",
            Self::Retarget => "retarget",
        }
    }

    /// Execution priority: creates, then in-place rewrites, then deletes
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::CreateEnv => 0,
            Self::UpdateEnv | Self::RenameKey | Self::Retarget => 1,
            Self::DeleteEnv => 2,
        }
    }
}

/// State of one record before or after an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub row_id: String,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub target: Vec<BuiltInEnvironment>,
    #[serde(default)]
    pub custom_environment_ids: Vec<String>,
}

impl OperationSnapshot {
    /// Snapshot of a raw record as it exists remotely
    #[must_use]
    pub fn of_record(row_id: &str, record: &RawEnvRecord) -> Self {
        Self {
            row_id: row_id.to_string(),
            key: record.key.clone(),
            value: Some(record.value.clone()),
            target: record.target.clone(),
            custom_environment_ids: record.custom_environment_ids.clone(),
        }
    }
}

/// One planned remote mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Deterministic id derived from kind and row/value/record identifiers
    pub id: String,
    pub kind: OperationKind,
    pub summary: String,
    pub row_id: String,
    pub before: Option<OperationSnapshot>,
    pub after: Option<OperationSnapshot>,
    pub undo_token: String,
}

impl Operation {
    /// Create new operation; the undo token is derived from the id
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: OperationKind,
        row_id: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            undo_token: format!("undo:{id}"),
            id,
            kind,
            summary: summary.into(),
            row_id: row_id.into(),
            before: None,
            after: None,
        }
    }

    #[must_use]
    pub fn with_before(mut self, before: OperationSnapshot) -> Self {
        self.before = Some(before);
        self
    }

    #[must_use]
    pub fn with_after(mut self, after: OperationSnapshot) -> Self {
        self.after = Some(after);
        self
    }
}

/// Operation counts per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub rename: usize,
    pub retarget: usize,
}

impl PlanSummary {
    #[must_use]
    pub fn of(operations: &[Operation]) -> Self {
        operations
            .iter()
            .fold(Self::default(), |mut summary, operation| {
                match operation.kind {
                    OperationKind::CreateEnv => summary.create += 1,
                    OperationKind::UpdateEnv => summary.update += 1,
                    OperationKind::DeleteEnv => summary.delete += 1,
                    OperationKind::RenameKey => summary.rename += 1,
                    OperationKind::Retarget => summary.retarget += 1,
                }
                summary
            })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.create + self.update + self.delete + self.rename + self.retarget
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_creates_first_and_deletes_last() {
        assert!(OperationKind::CreateEnv.priority() < OperationKind::UpdateEnv.priority());
        assert_eq!(
            OperationKind::RenameKey.priority(),
            OperationKind::Retarget.priority()
        );
        assert!(OperationKind::Retarget.priority() < OperationKind::DeleteEnv.priority());
    }

    #[test]
    fn undo_token_follows_id() {
        let operation = Operation::new("delete-row:env_1", OperationKind::DeleteEnv, "row:K", "x");
        assert_eq!(operation.undo_token, "undo:delete-row:env_1");
    }

    #[test]
    fn summary_counts_kinds() {
        let operations = vec![
            Operation::new("a", OperationKind::CreateEnv, "r", ""),
            Operation::new("b", OperationKind::CreateEnv, "r", ""),
            Operation::new("c", OperationKind::DeleteEnv, "r", ""),
        ];
        let summary = PlanSummary::of(&operations);
        assert_eq!(summary.create, 2);
        assert_eq!(summary.delete, 1);
        assert_eq!(summary.total(), 3);
        assert!(PlanSummary::default().is_empty());
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OperationKind::CreateEnv).unwrap(),
            "\"create_env\""
        );
    }
}
