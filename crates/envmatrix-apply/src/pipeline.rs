//! Apply pipeline
//!
//! One request runs as a single async flow:
//!
//! 1. validate the request
//! 2. claim the apply lock for `(project, scope)`, failing fast
//! 3. probe CLI auth
//! 4. reload the remote snapshot and compare its baseline hash
//! 5. resolve the scope and ensure the workspace
//! 6. translate operations into CLI actions
//! 7. under the workspace lock, link and execute
//! 8. fold action results into per-operation results

use envmatrix_driver::PlatformCli;
use envmatrix_model::BaselineHash;
use envmatrix_plan::Operation;
use serde::{Deserialize, Serialize};

use crate::action::build_actions;
use crate::error::ApplyError;
use crate::executor::{execute_actions, ActionStatus};
use crate::lock::ApplyLocks;
use crate::report::{merge_results, ApplyReport};

/// Operations to apply against the state they were planned from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub project_id: String,
    pub scope_id: String,
    /// Baseline hash of the snapshot the operations were planned against
    pub baseline_hash: String,
    pub operations: Vec<Operation>,
}

impl ApplyRequest {
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        scope_id: impl Into<String>,
        baseline_hash: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            scope_id: scope_id.into(),
            baseline_hash: baseline_hash.into(),
            operations,
        }
    }

    /// # Errors
    /// Returns [`ApplyError::InvalidRequest`] naming the first bad field
    pub fn validate(&self) -> Result<(), ApplyError> {
        if self.project_id.trim().is_empty() {
            return Err(ApplyError::invalid("project_id is empty"));
        }
        if self.scope_id.trim().is_empty() {
            return Err(ApplyError::invalid("scope_id is empty"));
        }
        if !BaselineHash::is_well_formed(self.baseline_hash.trim()) {
            return Err(ApplyError::invalid(
                "baseline_hash must be 64 hexadecimal characters",
            ));
        }
        if let Some(index) = self
            .operations
            .iter()
            .position(|operation| operation.id.trim().is_empty())
        {
            return Err(ApplyError::invalid(format!("operations[{index}].id is empty")));
        }
        Ok(())
    }
}

/// Runs apply requests through the platform CLI
#[derive(Debug, Clone)]
pub struct ApplyPipeline {
    cli: PlatformCli,
    locks: ApplyLocks,
}

impl ApplyPipeline {
    /// Pipeline sharing the process-wide apply lock registry
    #[must_use]
    pub fn new(cli: PlatformCli) -> Self {
        Self {
            cli,
            locks: ApplyLocks::global(),
        }
    }

    #[must_use]
    pub fn with_locks(mut self, locks: ApplyLocks) -> Self {
        self.locks = locks;
        self
    }

    #[inline]
    #[must_use]
    pub fn cli(&self) -> &PlatformCli {
        &self.cli
    }

    #[inline]
    #[must_use]
    pub fn locks(&self) -> &ApplyLocks {
        &self.locks
    }

    /// Apply operations if the remote state still matches their baseline
    ///
    /// Individual action failures do not abort the request; they surface in
    /// the returned report.
    ///
    /// # Errors
    /// Returns error on invalid input, a concurrent apply, a missing CLI
    /// session, a changed baseline, or a failure before execution starts
    pub async fn apply(&self, request: &ApplyRequest) -> Result<ApplyReport, ApplyError> {
        request.validate()?;
        let project_id = request.project_id.trim();
        let scope_id = request.scope_id.trim();

        let _apply_guard = self.locks.try_acquire(project_id, scope_id)?;

        let auth = self.cli.auth_status().await;
        if !auth.authenticated {
            return Err(ApplyError::NotAuthenticated(auth.message));
        }

        let current = self.cli.load_snapshot(project_id, scope_id).await?;
        let actual = current.baseline_hash.to_string();
        let expected = request.baseline_hash.trim();
        if !actual.eq_ignore_ascii_case(expected) {
            tracing::warn!(project_id, scope_id, %expected, %actual, "baseline changed, apply rejected");
            return Err(ApplyError::BaselineConflict {
                expected: expected.to_string(),
                actual,
            });
        }

        let scope = self.cli.resolve_scope(scope_id).await?;
        let workspace = self
            .cli
            .workspaces()
            .ensure(project_id, &scope.cache_key)
            .await?;
        let actions = build_actions(&request.operations);
        tracing::info!(
            project_id,
            scope_id,
            operations = request.operations.len(),
            actions = actions.len(),
            "applying operations"
        );

        let results = {
            let _workspace_guard = self.cli.workspaces().locks().acquire(&workspace).await;
            self.cli
                .link(&workspace, project_id, scope.scope_arg())
                .await?;
            execute_actions(&self.cli, &workspace, scope.scope_arg(), &actions).await
        };

        let report = merge_results(
            request.operations.iter().map(|operation| operation.id.as_str()),
            &results,
        );
        tracing::info!(
            project_id,
            accepted = report.accepted,
            done = report.count(ActionStatus::Done),
            failed = report.count(ActionStatus::Failed),
            skipped = report.count(ActionStatus::Skipped),
            "apply finished"
        );
        Ok(report)
    }
}
