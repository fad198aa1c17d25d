//! Error types for the CLI driver
//!
//! Provides the error taxonomy for external command execution:
//! - Executable missing
//! - Deadline exceeded (child killed)
//! - Non-zero exit
//! - Spawn-level I/O failure
//!
//! Parsers never fail; they degrade to partial results instead.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Machine-readable CLI failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliErrorKind {
    /// Executable is not installed or not on `PATH`
    NotFound,
    /// Killed after the command deadline
    Timeout,
    /// The tool ran and rejected the command
    NonZeroExit,
    /// Process could not be started or its pipes failed
    IoError,
}

impl CliErrorKind {
    /// Stable machine code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "cli_not_found",
            Self::Timeout => "cli_timeout",
            Self::NonZeroExit => "cli_non_zero_exit",
            Self::IoError => "cli_io_error",
        }
    }
}

impl Display for CliErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failed CLI invocation with whatever output was captured
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CliError {
    pub kind: CliErrorKind,
    pub message: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CliError {
    /// Create new error without captured output
    #[must_use]
    pub fn new(kind: CliErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(
            CliErrorKind::NotFound,
            "Vercel CLI not found. Install it and retry.",
        )
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self::new(CliErrorKind::Timeout, "Vercel CLI command timed out.")
    }

    #[must_use]
    pub fn io_error() -> Self {
        Self::new(CliErrorKind::IoError, "Failed to start Vercel CLI command.")
    }

    /// Non-zero (or missing) exit status with the captured streams
    #[must_use]
    pub fn non_zero_exit(
        exit_code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            kind: CliErrorKind::NonZeroExit,
            message: "Vercel CLI command failed.".to_string(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Timeouts and spawn failures are worth retrying; a rejection is not
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, CliErrorKind::Timeout | CliErrorKind::IoError)
    }

    /// Message followed by trimmed stderr, not yet redacted
    #[must_use]
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.message.clone()
        } else {
            format!("{} {stderr}", self.message)
        }
    }
}

/// Driver-level errors
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// External command failed
    #[error("cli error: {0}")]
    Cli(#[from] CliError),

    /// Workspace filesystem failure
    #[error("workspace error at {path}: {source}")]
    Workspace {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot hashing failed
    #[error("hash error: {0}")]
    Hash(#[from] envmatrix_model::HashError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl DriverError {
    #[inline]
    pub fn workspace(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Underlying CLI error, if any
    #[must_use]
    pub fn as_cli(&self) -> Option<&CliError> {
        match self {
            Self::Cli(err) => Some(err),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.as_cli().is_some_and(CliError::is_retryable)
    }
}
