//! Per-workspace FIFO lock
//!
//! One fair `tokio::sync::Mutex` per workspace path, kept in a registry and
//! removed once the last holder or waiter leaves. Waiters are served in
//! arrival order and never time out.
//!
//! The registry is process-local. Several processes sharing a workspace
//! root would need a file lock instead.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Registry = DashMap<PathBuf, Arc<Mutex<()>>>;

/// Registry of workspace locks
#[derive(Debug, Default, Clone)]
pub struct WorkspaceLocks {
    locks: Arc<Registry>,
}

impl WorkspaceLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`
    pub async fn acquire(&self, path: &Path) -> WorkspaceGuard {
        let mutex = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = Arc::clone(&mutex).lock_owned().await;
        WorkspaceGuard {
            path: path.to_path_buf(),
            guard: Some(guard),
            mutex,
            registry: Arc::clone(&self.locks),
        }
    }

    /// Take the lock for `path` only if nobody holds or waits for it
    #[must_use]
    pub fn try_acquire(&self, path: &Path) -> Option<WorkspaceGuard> {
        let mutex = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = Arc::clone(&mutex).try_lock_owned().ok();
        let guard = WorkspaceGuard {
            path: path.to_path_buf(),
            guard,
            mutex,
            registry: Arc::clone(&self.locks),
        };
        guard.guard.is_some().then_some(guard)
    }

    /// Run `f` while holding the lock for `path`
    pub async fn with_lock<F, Fut, T>(&self, path: &Path, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(path).await;
        f().await
    }

    /// True while someone holds the lock for `path`
    #[must_use]
    pub fn is_busy(&self, path: &Path) -> bool {
        self.locks
            .get(path)
            .is_some_and(|mutex| mutex.try_lock().is_err())
    }

    /// Number of paths with a holder or waiter
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held workspace lock; released on drop
#[derive(Debug)]
pub struct WorkspaceGuard {
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
    mutex: Arc<Mutex<()>>,
    registry: Arc<Registry>,
}

impl WorkspaceGuard {
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        self.guard.take();
        // registry + our clone means nobody else is queued
        self.registry.remove_if(&self.path, |_, mutex| {
            Arc::ptr_eq(mutex, &self.mutex) && Arc::strong_count(mutex) <= 2
        });
    }
}
