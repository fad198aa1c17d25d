//! envmatrix Apply
//!
//! Safe application of planned operations through the platform CLI.
//!
//! # Core Concepts
//!
//! - [`ApplyLocks`]: at most one apply per (project, scope); a second attempt
//!   fails fast with a conflict
//! - [`build_actions`]: operations fan out into one `add`/`remove` per
//!   built-in target, or a `skip` with a [`SkipReason`]
//! - [`execute_actions`]: strictly sequential, one [`ActionResult`] per action
//! - [`merge_results`]: per-operation `done` / `failed` / `skipped`
//! - [`ApplyPipeline`]: the full request flow with the baseline-hash guard
//!
//! # Example
//!
//! ```rust,ignore
//! use envmatrix_apply::{ApplyPipeline, ApplyRequest};
//! use envmatrix_driver::{DriverConfig, PlatformCli};
//!
//! let pipeline = ApplyPipeline::new(PlatformCli::from_config(DriverConfig::default()));
//! let request = ApplyRequest::new("prj_123", "team:acme", baseline_hash, operations);
//! let report = pipeline.apply(&request).await?;
//! println!("{report}");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod action;
mod error;
mod executor;
mod lock;
mod pipeline;
mod report;

pub use action::{build_actions, ActionKind, CliAction, SkipReason};
pub use error::{ApplyError, BASELINE_CONFLICT_MESSAGE, LOCK_CONFLICT_MESSAGE};
pub use executor::{execute_actions, ActionResult, ActionStatus, INVALID_ACTION};
pub use lock::{ApplyGuard, ApplyLocks};
pub use pipeline::{ApplyPipeline, ApplyRequest};
pub use report::{merge_results, ApplyReport, OperationResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
