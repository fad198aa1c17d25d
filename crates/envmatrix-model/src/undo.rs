//! Row undo
//!
//! Resets one draft row to its baseline state.

use crate::matrix::Matrix;

/// Revert `row_id` in `draft` to its state in `baseline`
///
/// A draft-only row is removed. A modified row is replaced by a deep clone
/// of the baseline row, so its assignments only ever reference the restored
/// value pool. Returns whether the draft changed.
pub fn undo_row(baseline: &Matrix, draft: &mut Matrix, row_id: &str) -> bool {
    let Some(position) = draft.rows.iter().position(|row| row.row_id == row_id) else {
        return false;
    };

    let Some(baseline_row) = baseline.row(row_id) else {
        draft.rows.remove(position);
        tracing::debug!(row_id, "Undo removed draft-only row");
        return true;
    };

    if draft.rows[position].fingerprint() == baseline_row.fingerprint() {
        return false;
    }

    draft.rows[position] = baseline_row.clone();
    tracing::debug!(row_id, "Undo restored baseline row");
    true
}
