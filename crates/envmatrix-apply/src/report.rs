//! Per-operation results
//!
//! Action results are folded back into one result per submitted operation:
//! an operation failed if any of its actions failed, was skipped only if
//! every action was skipped, and is done otherwise.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::executor::{ActionResult, ActionStatus};

const DEFAULT_FAILED: &str = "Operation failed.";
const DEFAULT_SKIPPED: &str = "Operation skipped.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation_id: String,
    pub status: ActionStatus,
    pub message: Option<String>,
}

/// Outcome of one apply request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Number of operations submitted
    pub accepted: usize,
    /// One entry per submitted operation, in submission order
    pub results: Vec<OperationResult>,
}

impl ApplyReport {
    #[must_use]
    pub fn count(&self, status: ActionStatus) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == status)
            .count()
    }

    /// True when no operation failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.count(ActionStatus::Failed) == 0
    }

    /// Plain-text rendering, one entry per line
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Accepted operations: {}", self.accepted)];
        self.push_group(&mut lines, "Done", ActionStatus::Done, |result| {
            match &result.message {
                Some(message) => format!("{} ({message})", result.operation_id),
                None => result.operation_id.clone(),
            }
        });
        self.push_group(&mut lines, "Failed", ActionStatus::Failed, |result| {
            format!(
                "{}: {}",
                result.operation_id,
                result.message.as_deref().unwrap_or("failed")
            )
        });
        self.push_group(&mut lines, "Skipped", ActionStatus::Skipped, |result| {
            format!(
                "{}: {}",
                result.operation_id,
                result.message.as_deref().unwrap_or("skipped")
            )
        });
        lines
    }

    fn push_group(
        &self,
        lines: &mut Vec<String>,
        title: &str,
        status: ActionStatus,
        entry: impl Fn(&OperationResult) -> String,
    ) {
        let entries: Vec<String> = self
            .results
            .iter()
            .filter(|result| result.status == status)
            .map(|result| format!("- {}", entry(result)))
            .collect();
        lines.push(format!("{title}: {}", entries.len()));
        lines.extend(entries);
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

/// Fold action results into one result per operation id
#[must_use]
pub fn merge_results<I, S>(operation_ids: I, actions: &[ActionResult]) -> ApplyReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let results: Vec<OperationResult> = operation_ids
        .into_iter()
        .map(|operation_id| merge_one(operation_id.as_ref(), actions))
        .collect();
    ApplyReport {
        accepted: results.len(),
        results,
    }
}

fn merge_one(operation_id: &str, actions: &[ActionResult]) -> OperationResult {
    let own: Vec<&ActionResult> = actions
        .iter()
        .filter(|action| action.operation_id == operation_id)
        .collect();
    let joined = || {
        let messages: Vec<&str> = own
            .iter()
            .filter_map(|action| action.message.as_deref())
            .filter(|message| !message.is_empty())
            .collect();
        (!messages.is_empty()).then(|| messages.join("; "))
    };

    let (status, message) = if own.iter().any(|action| action.status == ActionStatus::Failed) {
        (
            ActionStatus::Failed,
            Some(joined().unwrap_or_else(|| DEFAULT_FAILED.to_string())),
        )
    } else if own.iter().all(|action| action.status == ActionStatus::Skipped) {
        (
            ActionStatus::Skipped,
            Some(joined().unwrap_or_else(|| DEFAULT_SKIPPED.to_string())),
        )
    } else {
        (ActionStatus::Done, None)
    };

    OperationResult {
        operation_id: operation_id.to_string(),
        status,
        message,
    }
}
