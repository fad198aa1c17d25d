//! CLI workspaces
//!
//! One directory per (scope, project) under a fixed root. A workspace is
//! created lazily with owner-only permissions, stamped with a last-used
//! time, and deleted by an opportunistic sweep once it has been idle longer
//! than the TTL.
//!
//! All bookkeeping (last-used stamps, locks, link cache) is process-local.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use envmatrix_model::BaselineHash;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::link::LinkCache;
use crate::lock::WorkspaceLocks;

/// Maximum length of each sanitized folder-name component
pub const MAX_COMPONENT_LEN: usize = 48;

const FOLDER_DIGEST_LEN: usize = 10;

static UNSAFE_PATH_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("path sanitizer regex is valid"));

/// Process-wide workspace bookkeeping
#[derive(Debug, Default)]
pub struct WorkspaceRegistry {
    last_used: DashMap<PathBuf, Instant>,
    locks: WorkspaceLocks,
    links: LinkCache,
}

static PROCESS_REGISTRY: Lazy<Arc<WorkspaceRegistry>> =
    Lazy::new(|| Arc::new(WorkspaceRegistry::default()));

/// Replace unsafe characters with `-`, trim dashes, cap the length
#[must_use]
pub fn sanitize_path_component(value: &str) -> String {
    let mut sanitized = UNSAFE_PATH_CHARS
        .replace_all(value, "-")
        .trim_matches('-')
        .to_string();
    sanitized.truncate(MAX_COMPONENT_LEN);
    sanitized
}

/// `<scope>-<project>-<digest>`; the digest keeps sanitized collisions apart
#[must_use]
pub fn workspace_folder_name(project_id: &str, scope_key: &str) -> String {
    let digest =
        BaselineHash::compute(format!("{scope_key}::{project_id}").as_bytes()).prefix(FOLDER_DIGEST_LEN);
    format!(
        "{}-{}-{digest}",
        sanitize_path_component(scope_key),
        sanitize_path_component(project_id)
    )
}

/// Creates, locks and sweeps workspaces under one root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    ttl: Duration,
    registry: Arc<WorkspaceRegistry>,
}

impl WorkspaceManager {
    /// Manager with its own registry
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            registry: Arc::new(WorkspaceRegistry::default()),
        }
    }

    /// Manager sharing the process-wide registry
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        Self {
            root: config.workspace_root.clone(),
            ttl: config.workspace_ttl(),
            registry: Arc::clone(&PROCESS_REGISTRY),
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    #[must_use]
    pub fn locks(&self) -> &WorkspaceLocks {
        &self.registry.locks
    }

    #[inline]
    #[must_use]
    pub fn links(&self) -> &LinkCache {
        &self.registry.links
    }

    #[must_use]
    pub fn workspace_path(&self, project_id: &str, scope_key: &str) -> PathBuf {
        self.root.join(workspace_folder_name(project_id, scope_key))
    }

    #[must_use]
    pub fn last_used(&self, path: &Path) -> Option<Instant> {
        self.registry.last_used.get(path).map(|entry| *entry)
    }

    /// Create the workspace if needed and mark it used
    ///
    /// Expired workspaces are swept first.
    ///
    /// # Errors
    /// Returns [`DriverError::Workspace`] if a directory cannot be created
    pub async fn ensure(&self, project_id: &str, scope_key: &str) -> Result<PathBuf, DriverError> {
        let path = self.workspace_path(project_id, scope_key);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DriverError::workspace(&self.root, e))?;
        self.sweep_expired().await;

        let _guard = self.locks().acquire(&path).await;
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&path)
            .await
            .map_err(|e| DriverError::workspace(&path, e))?;
        self.registry.last_used.insert(path.clone(), Instant::now());

        tracing::debug!(workspace = %path.display(), "workspace ready");
        Ok(path)
    }

    /// Delete workspaces idle for longer than the TTL; returns the removed paths
    pub async fn sweep_expired(&self) -> Vec<PathBuf> {
        self.sweep_expired_at(Instant::now()).await
    }

    /// Sweep as if the current time were `now`
    ///
    /// Each removal runs under the workspace lock. Busy workspaces, and ones
    /// re-stamped after the scan, are skipped and stay registered.
    pub async fn sweep_expired_at(&self, now: Instant) -> Vec<PathBuf> {
        let expired: Vec<(PathBuf, Instant)> = self
            .registry
            .last_used
            .iter()
            .filter(|entry| now.saturating_duration_since(*entry.value()) > self.ttl)
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        let mut removed = Vec::new();
        for (path, stamp) in expired {
            let Some(_guard) = self.locks().try_acquire(&path) else {
                tracing::debug!(workspace = %path.display(), "skipping busy workspace");
                continue;
            };
            if self.last_used(&path) != Some(stamp) {
                continue;
            }
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(workspace = %path.display(), error = %err, "workspace sweep failed");
                    continue;
                }
            }
            self.registry.last_used.remove(&path);
            self.links().forget_workspace(&path);
            tracing::info!(workspace = %path.display(), "expired workspace removed");
            removed.push(path);
        }
        removed
    }
}
