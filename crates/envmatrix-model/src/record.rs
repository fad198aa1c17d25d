//! Raw environment-variable records
//!
//! A [`RawEnvRecord`] is one remote write record as the platform reports it:
//! a key, a value, and the set of environments it targets. Records arrive as
//! loosely-typed JSON, so [`records_from_json`] validates every field before
//! trusting it.

use crate::environment::{BuiltInEnvironment, EnvironmentId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Readable value
    #[default]
    Plain,
    /// Encrypted at rest, content may be opaque
    Encrypted,
}

impl ValueType {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Encrypted => "encrypted",
        }
    }
}

/// Why a value cannot be edited from the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOnlyReason {
    /// Platform-managed system variable
    System,
    /// Scoped to a git branch
    GitBranch,
}

impl ReadOnlyReason {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::GitBranch => "git_branch",
        }
    }
}

/// One remote environment-variable record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawEnvRecord {
    /// Remote record id
    pub id: String,
    /// Variable name
    pub key: String,
    /// Variable content
    pub value: String,
    /// Plain or encrypted
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    /// Built-in targets, canonical order
    #[serde(default)]
    pub target: Vec<BuiltInEnvironment>,
    /// Custom environment targets (platform ids)
    #[serde(default)]
    pub custom_environment_ids: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    /// Platform-managed variable
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub read_only_reason: Option<ReadOnlyReason>,
}

impl RawEnvRecord {
    /// Create new plain record with no targets
    #[must_use]
    pub fn new(id: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value: value.into(),
            value_type: ValueType::Plain,
            target: Vec::new(),
            custom_environment_ids: Vec::new(),
            comment: None,
            git_branch: None,
            system: false,
            read_only_reason: None,
        }
    }

    /// Set built-in targets (sorted canonically, duplicates dropped)
    #[must_use]
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = BuiltInEnvironment>) -> Self {
        self.target = targets.into_iter().collect();
        crate::environment::sort_targets(&mut self.target);
        self
    }

    #[must_use]
    pub fn with_custom_environments<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_environment_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn with_git_branch(mut self, branch: impl Into<String>) -> Self {
        self.git_branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn with_system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    /// Every environment this record targets, built-ins first
    #[must_use]
    pub fn targets(&self) -> Vec<EnvironmentId> {
        self.target
            .iter()
            .copied()
            .map(EnvironmentId::BuiltIn)
            .chain(
                self.custom_environment_ids
                    .iter()
                    .cloned()
                    .map(EnvironmentId::Custom),
            )
            .collect()
    }

    /// Explicit read-only reason, or one derived from the system flag and branch scope
    #[must_use]
    pub fn effective_read_only_reason(&self) -> Option<ReadOnlyReason> {
        if self.read_only_reason.is_some() {
            return self.read_only_reason;
        }
        if self.system {
            Some(ReadOnlyReason::System)
        } else if self.git_branch.is_some() {
            Some(ReadOnlyReason::GitBranch)
        } else {
            None
        }
    }

    /// Validate one untyped API item
    ///
    /// Returns `None` for non-objects and items without an id or key.
    #[must_use]
    pub fn from_json(item: &Value) -> Option<Self> {
        let object = item.as_object()?;
        let text = |field: &str| object.get(field).and_then(Value::as_str);

        let id = text("id").filter(|id| !id.is_empty())?;
        let key = text("key").filter(|key| !key.is_empty())?;
        let raw_type = text("type");

        let mut record = Self::new(id, key, text("value").unwrap_or_default())
            .with_targets(parse_targets(object.get("target")))
            .with_type(if raw_type == Some("encrypted") {
                ValueType::Encrypted
            } else {
                ValueType::Plain
            })
            .with_system(
                raw_type == Some("system")
                    || object.get("system").and_then(Value::as_bool) == Some(true),
            );

        record.custom_environment_ids = object
            .get("customEnvironmentIds")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        record.comment = text("comment").map(str::to_string);
        record.git_branch = text("gitBranch").map(str::to_string);
        record.read_only_reason = record.effective_read_only_reason();
        Some(record)
    }
}

fn parse_targets(value: Option<&Value>) -> Vec<BuiltInEnvironment> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(known_target)
            .collect(),
        Some(Value::String(single)) => known_target(single).into_iter().collect(),
        _ => Vec::new(),
    }
}

// Exact wire names only; display names are not accepted here
fn known_target(name: &str) -> Option<BuiltInEnvironment> {
    BuiltInEnvironment::ALL
        .into_iter()
        .find(|environment| environment.as_str() == name)
}

/// Normalize an env listing response: a bare array or `{ "envs": [...] }`
///
/// Anything else yields an empty list.
#[must_use]
pub fn records_from_json(response: &Value) -> Vec<RawEnvRecord> {
    let items = match response {
        Value::Array(items) => items,
        Value::Object(object) => match object.get("envs") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items.iter().filter_map(RawEnvRecord::from_json).collect()
}
