//! Driver configuration
//!
//! Loaded from TOML, then overridden by `ENVMATRIX_CLI` and
//! `ENVMATRIX_WORKSPACE_ROOT`. Missing fields fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Environment variable overriding the CLI executable
pub const CLI_ENV_VAR: &str = "ENVMATRIX_CLI";

/// Environment variable overriding the workspace root
pub const WORKSPACE_ROOT_ENV_VAR: &str = "ENVMATRIX_WORKSPACE_ROOT";

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// CLI executable name or path
    pub cli: String,
    /// Directory holding one workspace per (scope, project)
    pub workspace_root: PathBuf,
    /// Idle time after which a workspace is swept, in seconds
    pub workspace_ttl_secs: u64,
    /// Deadline for read commands (`link`, `env ls`, `project list`)
    pub command_timeout_secs: u64,
    /// Deadline for `env add`, `env rm` and `env pull`
    pub mutation_timeout_secs: u64,
    /// Deadline for `whoami`
    pub auth_timeout_secs: u64,
    /// Deadline for `teams list`
    pub teams_timeout_secs: u64,
}

impl DriverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_cli(mut self, cli: impl Into<String>) -> Self {
        self.cli = cli.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_workspace_ttl(mut self, ttl: Duration) -> Self {
        self.workspace_ttl_secs = ttl.as_secs();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_secs = timeout.as_secs();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout_secs = timeout.as_secs();
        self
    }

    #[must_use]
    pub fn workspace_ttl(&self) -> Duration {
        Duration::from_secs(self.workspace_ttl_secs)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    #[must_use]
    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_secs(self.mutation_timeout_secs)
    }

    #[must_use]
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    #[must_use]
    pub fn teams_timeout(&self) -> Duration {
        Duration::from_secs(self.teams_timeout_secs)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`DriverError::Config`] on malformed TOML
    pub fn from_toml_str(text: &str) -> Result<Self, DriverError> {
        toml::from_str(text).map_err(|e| DriverError::Config(e.to_string()))
    }

    /// Read a TOML file, then apply environment overrides
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::from_toml_str(&text)?.with_env_overrides())
    }

    /// Apply `ENVMATRIX_CLI` / `ENVMATRIX_WORKSPACE_ROOT` when set and non-empty
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(cli) = lookup(CLI_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.cli = cli;
        }
        if let Some(root) = lookup(WORKSPACE_ROOT_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.workspace_root = PathBuf::from(root);
        }
        self
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cli: "vercel".to_string(),
            workspace_root: std::env::temp_dir()
                .join("envmatrix")
                .join("cli-workspaces"),
            workspace_ttl_secs: 15 * 60,
            command_timeout_secs: 20,
            mutation_timeout_secs: 30,
            auth_timeout_secs: 10,
            teams_timeout_secs: 15,
        }
    }
}
