//! Workspace -> project linking
//!
//! `link` is idempotent per (workspace, scope, project); the cache skips the
//! CLI round trip after the first success.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;

use crate::error::CliError;
use crate::runner::{CliCommand, CommandRunner};

const PERSONAL_SCOPE: &str = "personal";

/// Keys of workspaces already linked in this process
#[derive(Debug, Default, Clone)]
pub struct LinkCache {
    linked: Arc<DashSet<String>>,
}

impl LinkCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(workspace: &Path, scope: Option<&str>, project: &str) -> String {
        format!(
            "{}::{}::{project}",
            workspace.display(),
            scope.unwrap_or(PERSONAL_SCOPE)
        )
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.linked.contains(key)
    }

    pub fn insert(&self, key: String) {
        self.linked.insert(key);
    }

    /// Drop every entry for a workspace that is about to be deleted
    pub fn forget_workspace(&self, workspace: &Path) {
        let prefix = format!("{}::", workspace.display());
        self.linked.retain(|key| !key.starts_with(&prefix));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.linked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty()
    }
}

/// Link `workspace` to `project` unless this process already did
///
/// # Errors
/// Returns the CLI error when `link` fails; nothing is cached in that case
pub async fn link_workspace(
    runner: &dyn CommandRunner,
    cache: &LinkCache,
    workspace: &Path,
    project: &str,
    scope: Option<&str>,
    timeout: Duration,
) -> Result<(), CliError> {
    let key = LinkCache::key(workspace, scope, project);
    if cache.contains(&key) {
        return Ok(());
    }

    let command = CliCommand::new(["link", "--yes", "--project", project, "--no-color"])
        .scope(scope)
        .cwd(workspace)
        .timeout(timeout);
    runner.run(command).await?;

    tracing::info!(workspace = %workspace.display(), project, "workspace linked");
    cache.insert(key);
    Ok(())
}
