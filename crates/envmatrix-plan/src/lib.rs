//! envmatrix Plan
//!
//! Diff planning between a baseline matrix and an edited draft.
//!
//! # Core Concepts
//!
//! - [`detect_changes`]: row-level create/delete/rename/update/retarget events
//! - [`plan_operations`]: minimal, deterministic remote operations, one per
//!   (value, target set) combination
//! - [`EditorSession`]: a baseline/draft pair with undo and reset
//!
//! # Example
//!
//! ```rust,ignore
//! use envmatrix_plan::EditorSession;
//!
//! let mut session = EditorSession::new(&snapshot);
//! session.draft_mut().edit_value("row:API_KEY", "value-1", "xyz")?;
//! for operation in session.pending_operations() {
//!     println!("{} {}", operation.kind.as_str(), operation.summary);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod change;
mod operation;
mod planner;
mod session;

pub use change::{detect_changes, ChangeKind, MatrixChange};
pub use operation::{Operation, OperationKind, OperationSnapshot, PlanSummary};
pub use planner::plan_operations;
pub use session::EditorSession;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
