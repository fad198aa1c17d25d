//! Editor session
//!
//! Holds one baseline/draft pair. The baseline is never mutated; the draft
//! starts as a deep clone and is edited in place.

use crate::change::{detect_changes, MatrixChange};
use crate::operation::{Operation, PlanSummary};
use crate::planner::plan_operations;
use envmatrix_model::{normalize, undo_row, EditError, EnvironmentId, Matrix, ProjectSnapshot};

/// One baseline/draft editing session
#[derive(Debug, Clone)]
pub struct EditorSession {
    baseline: Matrix,
    draft: Matrix,
}

impl EditorSession {
    /// Create new session from a freshly loaded snapshot
    #[must_use]
    pub fn new(snapshot: &ProjectSnapshot) -> Self {
        Self::from_baseline(normalize(snapshot))
    }

    #[must_use]
    pub fn from_baseline(baseline: Matrix) -> Self {
        let draft = baseline.clone();
        Self { baseline, draft }
    }

    #[inline]
    #[must_use]
    pub fn baseline(&self) -> &Matrix {
        &self.baseline
    }

    #[inline]
    #[must_use]
    pub fn draft(&self) -> &Matrix {
        &self.draft
    }

    #[inline]
    pub fn draft_mut(&mut self) -> &mut Matrix {
        &mut self.draft
    }

    /// Operations that would move the remote state to the draft
    #[must_use]
    pub fn pending_operations(&self) -> Vec<Operation> {
        plan_operations(&self.baseline, &self.draft)
    }

    #[must_use]
    pub fn summary(&self) -> PlanSummary {
        PlanSummary::of(&self.pending_operations())
    }

    #[must_use]
    pub fn changes(&self) -> Vec<MatrixChange> {
        detect_changes(&self.baseline, &self.draft)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.changes().is_empty()
    }

    /// Set a cell, honoring the capability locks
    ///
    /// # Errors
    /// Returns [`EditError::AssignmentBlocked`] for a locked cell, or any
    /// validation error from [`Matrix::set_assignment`]
    pub fn assign(
        &mut self,
        row_id: &str,
        environment: &EnvironmentId,
        value_id: Option<&str>,
    ) -> Result<bool, EditError> {
        self.draft.can_edit_assignment(row_id, environment)?;
        self.draft.set_assignment(row_id, environment, value_id)
    }

    /// Revert one row to baseline; returns whether the draft changed
    pub fn undo_row(&mut self, row_id: &str) -> bool {
        undo_row(&self.baseline, &mut self.draft, row_id)
    }

    /// Discard every draft edit
    pub fn reset(&mut self) {
        self.draft = self.baseline.clone();
    }

    /// Baseline hash the draft was derived from
    #[must_use]
    pub fn baseline_hash(&self) -> String {
        self.baseline.baseline_hash.to_string()
    }
}
