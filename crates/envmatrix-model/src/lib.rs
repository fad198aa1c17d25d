//! envmatrix Model
//!
//! Typed matrix model for environment-variable configuration.
//!
//! # Core Concepts
//!
//! - [`RawEnvRecord`]: one remote write record (key, value, target set)
//! - [`ProjectSnapshot`]: loaded remote state plus its [`BaselineHash`]
//! - [`Matrix`]: key x environment view with a per-row value pool
//! - [`normalize`]: pure snapshot -> matrix conversion
//! - [`undo_row`]: reset one draft row to baseline
//!
//! # Example
//!
//! ```rust,ignore
//! use envmatrix_model::{normalize, ProjectSnapshot};
//!
//! let baseline = normalize(&snapshot);
//! let mut draft = baseline.clone();
//! draft.edit_value("row:API_KEY", "value-1", "xyz")?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod edit;
mod environment;
mod hash;
mod matrix;
mod normalize;
mod record;
mod snapshot;
mod undo;

pub use edit::{AssignmentBlockReason, EditError, NEW_ROW_PREFIX};
pub use environment::{
    built_in_columns, sort_columns, sort_targets, BuiltInEnvironment, EnvironmentColumn,
    EnvironmentId, EnvironmentKind, EnvironmentParseError, CUSTOM_ENVIRONMENT_PREFIX,
};
pub use hash::{BaselineHash, HashError, BASELINE_HASH_LEN};
pub use matrix::{
    value_id, value_serial, Assignments, Matrix, Row, RowFingerprint, ValuePoolEntry,
    ValueSignature, ValueSourceRef, VALUE_ID_PREFIX,
};
pub use normalize::normalize;
pub use record::{records_from_json, RawEnvRecord, ReadOnlyReason, ValueType};
pub use snapshot::{compute_baseline_hash, Capabilities, ProjectSnapshot};
pub use undo::undo_row;

/// Convenient re-exports
pub mod prelude {
    pub use super::{
        normalize, undo_row, BuiltInEnvironment, EnvironmentColumn, EnvironmentId, Matrix,
        ProjectSnapshot, RawEnvRecord, Row, ValuePoolEntry,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
