//! Operation to CLI action translation
//!
//! The CLI writes one `(key, environment)` pair per invocation, so every
//! planned operation fans out into one action per built-in target. Anything
//! the CLI cannot express becomes a `skip` action carrying the reason.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use envmatrix_driver::is_reserved_runtime_key;
use envmatrix_model::BuiltInEnvironment;
use envmatrix_plan::{Operation, OperationKind, OperationSnapshot};
use serde::{Deserialize, Serialize};

/// What an action does remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// `env add --force`
    Add,
    /// `env rm -y`
    Remove,
    /// Nothing is executed
    Skip,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Skip => "skip",
        }
    }
}

/// Why an operation (or part of one) was not executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingAfterValue,
    MissingBeforeSnapshot,
    UnsupportedCustomEnvironment,
    MissingTargetEnvironment,
    UnsupportedOperationKind,
    ReservedRuntimeKey,
    /// An add in the same batch already overwrites this pair
    SupersededByAdd,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAfterValue => "missing_after_value",
            Self::MissingBeforeSnapshot => "missing_before_snapshot",
            Self::UnsupportedCustomEnvironment => "unsupported_custom_environment",
            Self::MissingTargetEnvironment => "missing_target_environment",
            Self::UnsupportedOperationKind => "unsupported_operation_kind",
            Self::ReservedRuntimeKey => "reserved_runtime_key",
            Self::SupersededByAdd => "superseded_by_add",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CLI invocation (or a recorded skip) derived from an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliAction {
    pub operation_id: String,
    pub kind: ActionKind,
    pub key: Option<String>,
    pub environment: Option<BuiltInEnvironment>,
    /// Only set for adds
    pub value: Option<String>,
    pub reason: Option<SkipReason>,
}

impl CliAction {
    fn add(operation_id: &str, key: &str, environment: BuiltInEnvironment, value: &str) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            kind: ActionKind::Add,
            key: Some(key.to_string()),
            environment: Some(environment),
            value: Some(value.to_string()),
            reason: None,
        }
    }

    fn remove(operation_id: &str, key: &str, environment: BuiltInEnvironment) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            kind: ActionKind::Remove,
            key: Some(key.to_string()),
            environment: Some(environment),
            value: None,
            reason: None,
        }
    }

    fn skip(operation_id: &str, key: Option<&str>, reason: SkipReason) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            kind: ActionKind::Skip,
            key: key.map(str::to_string),
            environment: None,
            value: None,
            reason: Some(reason),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.kind == ActionKind::Skip
    }

    // `BuiltInEnvironment` orders canonically: production, preview, development
    fn execution_cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.environment.cmp(&other.environment))
            .then_with(|| self.operation_id.cmp(&other.operation_id))
    }
}

/// Translate planned operations into ordered CLI actions
///
/// Adds run first, then removes, then skips; ties break on key, environment
/// and operation id. Environments compare in canonical order (production,
/// preview, development), not by name. A remove whose `(key, environment)` an add in the same
/// batch also writes is turned into a `superseded_by_add` skip, because
/// `env add --force` already replaced that value and removing it afterwards
/// would erase the new one.
#[must_use]
pub fn build_actions(operations: &[Operation]) -> Vec<CliAction> {
    let mut actions: Vec<CliAction> = operations.iter().flat_map(actions_for).collect();

    let written: HashSet<(String, BuiltInEnvironment)> = actions
        .iter()
        .filter(|action| action.kind == ActionKind::Add)
        .filter_map(|action| Some((action.key.clone()?, action.environment?)))
        .collect();
    for action in &mut actions {
        if action.kind != ActionKind::Remove {
            continue;
        }
        if let (Some(key), Some(environment)) = (&action.key, action.environment) {
            if written.contains(&(key.clone(), environment)) {
                action.kind = ActionKind::Skip;
                action.reason = Some(SkipReason::SupersededByAdd);
            }
        }
    }

    actions.sort_by(CliAction::execution_cmp);
    actions
}

fn actions_for(operation: &Operation) -> Vec<CliAction> {
    match operation.kind {
        OperationKind::CreateEnv => set_actions(operation),
        OperationKind::UpdateEnv => {
            let mut actions = set_actions(operation);
            if let (Some(before), Some(after)) = (&operation.before, &operation.after) {
                let wrote_new_key = actions.iter().any(|action| action.kind == ActionKind::Add);
                if wrote_new_key && before.key != after.key {
                    actions.extend(remove_actions(&operation.id, before));
                }
            }
            actions
        }
        OperationKind::DeleteEnv => match &operation.before {
            Some(before) => remove_actions(&operation.id, before),
            None => vec![CliAction::skip(
                &operation.id,
                None,
                SkipReason::MissingBeforeSnapshot,
            )],
        },
        OperationKind::RenameKey | OperationKind::Retarget => {
            let key = operation
                .after
                .as_ref()
                .or(operation.before.as_ref())
                .map(|snapshot| snapshot.key.as_str());
            vec![CliAction::skip(
                &operation.id,
                key,
                SkipReason::UnsupportedOperationKind,
            )]
        }
    }
}

fn set_actions(operation: &Operation) -> Vec<CliAction> {
    let id = operation.id.as_str();
    let Some(after) = &operation.after else {
        return vec![CliAction::skip(id, None, SkipReason::MissingAfterValue)];
    };
    let Some(value) = &after.value else {
        return vec![CliAction::skip(id, Some(&after.key), SkipReason::MissingAfterValue)];
    };
    if let Some(reason) = unwritable(after) {
        return vec![CliAction::skip(id, Some(&after.key), reason)];
    }
    after
        .target
        .iter()
        .map(|environment| CliAction::add(id, &after.key, *environment, value))
        .collect()
}

fn remove_actions(operation_id: &str, before: &OperationSnapshot) -> Vec<CliAction> {
    if let Some(reason) = unwritable(before) {
        return vec![CliAction::skip(operation_id, Some(&before.key), reason)];
    }
    before
        .target
        .iter()
        .map(|environment| CliAction::remove(operation_id, &before.key, *environment))
        .collect()
}

fn unwritable(snapshot: &OperationSnapshot) -> Option<SkipReason> {
    if !snapshot.custom_environment_ids.is_empty() {
        Some(SkipReason::UnsupportedCustomEnvironment)
    } else if snapshot.target.is_empty() {
        Some(SkipReason::MissingTargetEnvironment)
    } else if is_reserved_runtime_key(&snapshot.key) {
        Some(SkipReason::ReservedRuntimeKey)
    } else {
        None
    }
}
