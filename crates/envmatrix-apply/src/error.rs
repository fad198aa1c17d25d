//! Apply errors
//!
//! Request-level failures only. Per-action failures never abort an apply;
//! they are reported in the [`ApplyReport`](crate::ApplyReport).

use envmatrix_driver::{CliError, DriverError};

/// Message returned when a second apply races the first
pub const LOCK_CONFLICT_MESSAGE: &str =
    "Another apply request is already in progress for this project scope.";

/// Message returned when the remote state moved since the draft was loaded
pub const BASELINE_CONFLICT_MESSAGE: &str =
    "Baseline changed. Reload the latest snapshot before applying.";

/// Main apply error type
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// Request failed validation
    #[error("invalid apply request: {0}")]
    InvalidRequest(String),

    /// Another apply holds the project/scope lock
    #[error("{LOCK_CONFLICT_MESSAGE}")]
    LockConflict { project_id: String, scope_id: String },

    /// The CLI has no active session
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    /// Remote baseline no longer matches the draft's baseline
    #[error("{BASELINE_CONFLICT_MESSAGE}")]
    BaselineConflict { expected: String, actual: String },

    /// Loading, linking or workspace setup failed
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

impl From<CliError> for ApplyError {
    fn from(err: CliError) -> Self {
        Self::Driver(DriverError::Cli(err))
    }
}

impl ApplyError {
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Stable machine code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "bad_request",
            Self::LockConflict { .. } | Self::BaselineConflict { .. } => "conflict",
            Self::NotAuthenticated(_) => "unauthorized",
            Self::Driver(DriverError::Cli(err)) => err.code(),
            Self::Driver(_) => "internal_error",
        }
    }

    /// Lock and baseline conflicts: reload or wait, then retry
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::LockConflict { .. } | Self::BaselineConflict { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LockConflict { .. } => true,
            Self::Driver(err) => err.is_retryable(),
            _ => false,
        }
    }
}
