//! Project snapshots
//!
//! A [`ProjectSnapshot`] is the freshly loaded remote state of one project:
//! its environment columns, raw records, backend capabilities and the
//! baseline hash that guards apply against concurrent remote edits.

use crate::environment::EnvironmentColumn;
use crate::hash::{BaselineHash, HashError};
use crate::record::RawEnvRecord;
use serde::{Deserialize, Serialize};

/// What the remote backend can express
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    /// Backend can write custom-environment targets
    pub supports_custom_environments: bool,
    /// Backend can write branch-scoped values
    pub supports_branch_specific_writes: bool,
}

impl Capabilities {
    /// Backend with every capability
    #[inline]
    #[must_use]
    pub const fn full() -> Self {
        Self {
            supports_custom_environments: true,
            supports_branch_specific_writes: true,
        }
    }

    /// Capabilities of the command-line backend
    #[inline]
    #[must_use]
    pub const fn cli() -> Self {
        Self {
            supports_custom_environments: false,
            supports_branch_specific_writes: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Loaded remote state of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project_id: String,
    pub environments: Vec<EnvironmentColumn>,
    pub records: Vec<RawEnvRecord>,
    pub capabilities: Capabilities,
    pub baseline_hash: BaselineHash,
}

// Stable hashing payload: environments and records sorted by id
#[derive(Serialize)]
struct HashPayload<'a> {
    project_id: &'a str,
    capabilities: &'a Capabilities,
    environments: Vec<&'a EnvironmentColumn>,
    records: Vec<&'a RawEnvRecord>,
}

impl ProjectSnapshot {
    /// Create new snapshot, computing its baseline hash
    ///
    /// # Errors
    /// Returns error if the hashing payload cannot be serialized
    pub fn new(
        project_id: impl Into<String>,
        environments: Vec<EnvironmentColumn>,
        records: Vec<RawEnvRecord>,
        capabilities: Capabilities,
    ) -> Result<Self, HashError> {
        let project_id = project_id.into();
        let baseline_hash =
            compute_baseline_hash(&project_id, &environments, &records, &capabilities)?;
        Ok(Self {
            project_id,
            environments,
            records,
            capabilities,
            baseline_hash,
        })
    }

    /// Recompute the hash from the current contents and compare with the stored one
    #[must_use]
    pub fn verify(&self) -> bool {
        compute_baseline_hash(
            &self.project_id,
            &self.environments,
            &self.records,
            &self.capabilities,
        )
        .is_ok_and(|hash| hash == self.baseline_hash)
    }
}

/// SHA-256 over project id, capabilities, environments and records, each list
/// sorted by id so the digest does not depend on input order
///
/// # Errors
/// Returns error if serialization fails
pub fn compute_baseline_hash(
    project_id: &str,
    environments: &[EnvironmentColumn],
    records: &[RawEnvRecord],
    capabilities: &Capabilities,
) -> Result<BaselineHash, HashError> {
    let mut environments: Vec<&EnvironmentColumn> = environments.iter().collect();
    environments.sort_by_key(|column| column.id.to_string());

    let mut records: Vec<&RawEnvRecord> = records.iter().collect();
    records.sort_by(|left, right| left.id.cmp(&right.id));

    BaselineHash::compute_serializable(&HashPayload {
        project_id,
        capabilities,
        environments,
        records,
    })
}
