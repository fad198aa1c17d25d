//! Fail-fast apply lock
//!
//! At most one apply per (project, scope) runs at a time. A second attempt
//! is rejected immediately instead of queuing behind the first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::error::ApplyError;

static PROCESS_LOCKS: Lazy<ApplyLocks> = Lazy::new(ApplyLocks::new);

/// Registry of in-flight applies
#[derive(Debug, Default, Clone)]
pub struct ApplyLocks {
    in_flight: Arc<DashMap<String, Instant>>,
}

impl ApplyLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    #[must_use]
    pub fn global() -> Self {
        PROCESS_LOCKS.clone()
    }

    #[must_use]
    pub fn key(project_id: &str, scope_id: &str) -> String {
        format!("{scope_id}::{project_id}")
    }

    /// Claim the lock or fail with [`ApplyError::LockConflict`]
    ///
    /// # Errors
    /// Returns a conflict when an apply for the same pair is in flight
    pub fn try_acquire(&self, project_id: &str, scope_id: &str) -> Result<ApplyGuard, ApplyError> {
        let key = Self::key(project_id, scope_id);
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(held) => {
                tracing::warn!(
                    project_id,
                    scope_id,
                    held_for = ?held.get().elapsed(),
                    "apply rejected, another is in flight"
                );
                return Err(ApplyError::LockConflict {
                    project_id: project_id.to_string(),
                    scope_id: scope_id.to_string(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
            }
        }
        Ok(ApplyGuard {
            key,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    #[must_use]
    pub fn is_locked(&self, project_id: &str, scope_id: &str) -> bool {
        self.in_flight.contains_key(&Self::key(project_id, scope_id))
    }

    /// How long the current apply for this pair has been running
    #[must_use]
    pub fn held_for(&self, project_id: &str, scope_id: &str) -> Option<Duration> {
        self.in_flight
            .get(&Self::key(project_id, scope_id))
            .map(|since| since.elapsed())
    }
}

/// Held apply lock; released on drop
#[derive(Debug)]
pub struct ApplyGuard {
    key: String,
    in_flight: Arc<DashMap<String, Instant>>,
}

impl Drop for ApplyGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_attempt_fails_fast() {
        let locks = ApplyLocks::new();
        let guard = locks.try_acquire("prj", "team:acme").unwrap();
        let err = locks.try_acquire("prj", "team:acme").unwrap_err();
        assert!(err.is_conflict());
        assert!(locks.is_locked("prj", "team:acme"));
        assert!(locks.held_for("prj", "team:acme").is_some());

        drop(guard);
        assert!(!locks.is_locked("prj", "team:acme"));
        assert!(locks.held_for("prj", "team:acme").is_none());
        assert!(locks.try_acquire("prj", "team:acme").is_ok());
    }

    #[test]
    fn pairs_are_independent() {
        let locks = ApplyLocks::new();
        let _a = locks.try_acquire("prj", "team:acme").unwrap();
        assert!(locks.try_acquire("prj", "user:me").is_ok());
        assert!(locks.try_acquire("other", "team:acme").is_ok());
    }

    #[test]
    fn global_registry_is_shared() {
        let guard = ApplyLocks::global()
            .try_acquire("prj-global-test", "team:t")
            .unwrap();
        assert!(ApplyLocks::global().is_locked("prj-global-test", "team:t"));
        drop(guard);
    }
}
