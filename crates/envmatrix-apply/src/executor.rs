//! Sequential action execution
//!
//! Actions run strictly one after another in the builder's order. A failed
//! action never stops the ones after it; every action yields exactly one
//! [`ActionResult`].

use std::path::Path;

use envmatrix_driver::{redact_sensitive_text, PlatformCli};
use serde::{Deserialize, Serialize};

use crate::action::{ActionKind, CliAction};

/// Message for an add/remove action without key or environment
pub const INVALID_ACTION: &str = "invalid_action";

/// Outcome of one action or one merged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Done,
    Failed,
    Skipped,
}

impl ActionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub operation_id: String,
    pub kind: ActionKind,
    pub status: ActionStatus,
    /// Skip reason or redacted failure text
    pub message: Option<String>,
}

impl ActionResult {
    fn new(action: &CliAction, status: ActionStatus, message: Option<String>) -> Self {
        Self {
            operation_id: action.operation_id.clone(),
            kind: action.kind,
            status,
            message,
        }
    }
}

/// Run actions against a linked workspace
///
/// Must be called while holding the workspace lock.
pub async fn execute_actions(
    cli: &PlatformCli,
    workspace: &Path,
    scope: Option<&str>,
    actions: &[CliAction],
) -> Vec<ActionResult> {
    let mut results = Vec::with_capacity(actions.len());

    for action in actions {
        if action.kind == ActionKind::Skip {
            let reason = action.reason.map(|reason| reason.as_str().to_string());
            tracing::debug!(
                operation_id = %action.operation_id,
                reason = reason.as_deref().unwrap_or_default(),
                "action skipped"
            );
            results.push(ActionResult::new(action, ActionStatus::Skipped, reason));
            continue;
        }

        let (Some(key), Some(environment)) = (action.key.as_deref(), action.environment) else {
            results.push(ActionResult::new(
                action,
                ActionStatus::Failed,
                Some(INVALID_ACTION.to_string()),
            ));
            continue;
        };

        let outcome = match action.kind {
            ActionKind::Add => {
                let value = action.value.as_deref().unwrap_or_default();
                cli.env_add(workspace, scope, key, environment, value).await
            }
            _ => cli.env_rm(workspace, scope, key, environment).await,
        };

        match outcome {
            Ok(_) => {
                tracing::info!(
                    operation_id = %action.operation_id,
                    action = action.kind.as_str(),
                    key,
                    environment = environment.as_str(),
                    "action done"
                );
                results.push(ActionResult::new(action, ActionStatus::Done, None));
            }
            Err(err) => {
                let message = redact_sensitive_text(&err.detail());
                tracing::warn!(
                    operation_id = %action.operation_id,
                    action = action.kind.as_str(),
                    key,
                    environment = environment.as_str(),
                    code = err.code(),
                    %message,
                    "action failed"
                );
                results.push(ActionResult::new(action, ActionStatus::Failed, Some(message)));
            }
        }
    }

    results
}
