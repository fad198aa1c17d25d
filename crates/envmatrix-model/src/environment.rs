//! Deployment environments and matrix columns
//!
//! Provides [`BuiltInEnvironment`], [`EnvironmentId`] and [`EnvironmentColumn`],
//! the addressing scheme for the column axis of the matrix.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Prefix used when rendering a custom environment id
pub const CUSTOM_ENVIRONMENT_PREFIX: &str = "custom:";

/// One of the platform's fixed deployment targets
///
/// Declaration order is the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltInEnvironment {
    /// Production deployments
    Production,
    /// Preview deployments
    Preview,
    /// Local development pulls
    Development,
}

impl BuiltInEnvironment {
    /// All built-ins in canonical order
    pub const ALL: [Self; 3] = [Self::Production, Self::Preview, Self::Development];

    /// Wire name (`production`, `preview`, `development`)
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Preview => "preview",
            Self::Development => "development",
        }
    }

    /// Column title
    #[inline]
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Production => "Production",
            Self::Preview => "Preview",
            Self::Development => "Development",
        }
    }

    /// Parse a human-written environment name, ignoring case and padding
    #[must_use]
    pub fn from_name(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|environment| environment.as_str() == normalized)
    }
}

impl Display for BuiltInEnvironment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltInEnvironment {
    type Err = EnvironmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| EnvironmentParseError::Unknown(s.to_string()))
    }
}

/// Addressable environment: a built-in or a `custom:<id>` target
///
/// Ordering places every built-in before every custom environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnvironmentId {
    /// Fixed platform environment
    BuiltIn(BuiltInEnvironment),
    /// Project-defined custom environment (platform id)
    Custom(String),
}

impl EnvironmentId {
    /// Custom environment id
    #[inline]
    #[must_use]
    pub fn custom(id: impl Into<String>) -> Self {
        Self::Custom(id.into())
    }

    /// Built-in variant, if any
    #[inline]
    #[must_use]
    pub fn as_built_in(&self) -> Option<BuiltInEnvironment> {
        match self {
            Self::BuiltIn(environment) => Some(*environment),
            Self::Custom(_) => None,
        }
    }

    /// Platform id of a custom environment
    #[inline]
    #[must_use]
    pub fn custom_id(&self) -> Option<&str> {
        match self {
            Self::BuiltIn(_) => None,
            Self::Custom(id) => Some(id),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl From<BuiltInEnvironment> for EnvironmentId {
    fn from(value: BuiltInEnvironment) -> Self {
        Self::BuiltIn(value)
    }
}

impl Display for EnvironmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuiltIn(environment) => f.write_str(environment.as_str()),
            Self::Custom(id) => write!(f, "{CUSTOM_ENVIRONMENT_PREFIX}{id}"),
        }
    }
}

impl FromStr for EnvironmentId {
    type Err = EnvironmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix(CUSTOM_ENVIRONMENT_PREFIX) {
            if id.is_empty() {
                return Err(EnvironmentParseError::EmptyCustomId);
            }
            return Ok(Self::Custom(id.to_string()));
        }
        s.parse::<BuiltInEnvironment>().map(Self::BuiltIn)
    }
}

// Serialized as its display string so it can key JSON maps
impl Serialize for EnvironmentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EnvironmentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Column kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    /// Fixed platform environment
    BuiltIn,
    /// Project-defined environment
    Custom,
}

/// One addressable deployment target (a matrix column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentColumn {
    /// Column id
    pub id: EnvironmentId,
    /// Title shown to users
    pub name: String,
    /// Built-in or custom
    pub kind: EnvironmentKind,
    /// Platform id for custom columns
    pub custom_environment_id: Option<String>,
}

impl EnvironmentColumn {
    /// Column for a built-in environment
    #[must_use]
    pub fn built_in(environment: BuiltInEnvironment) -> Self {
        Self {
            id: EnvironmentId::BuiltIn(environment),
            name: environment.display_name().to_string(),
            kind: EnvironmentKind::BuiltIn,
            custom_environment_id: None,
        }
    }

    /// Column for a custom environment
    #[must_use]
    pub fn custom(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            id: EnvironmentId::Custom(id.clone()),
            name: name.into(),
            kind: EnvironmentKind::Custom,
            custom_environment_id: Some(id),
        }
    }

    /// Canonical column ordering: built-ins in declaration order, then
    /// custom columns by name and id
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (&self.id, &other.id) {
            (EnvironmentId::BuiltIn(left), EnvironmentId::BuiltIn(right)) => left.cmp(right),
            (EnvironmentId::BuiltIn(_), EnvironmentId::Custom(_)) => Ordering::Less,
            (EnvironmentId::Custom(_), EnvironmentId::BuiltIn(_)) => Ordering::Greater,
            (EnvironmentId::Custom(left), EnvironmentId::Custom(right)) => self
                .name
                .cmp(&other.name)
                .then_with(|| left.cmp(right)),
        }
    }
}

/// The three built-in columns in canonical order
#[must_use]
pub fn built_in_columns() -> Vec<EnvironmentColumn> {
    BuiltInEnvironment::ALL
        .into_iter()
        .map(EnvironmentColumn::built_in)
        .collect()
}

/// Sort columns canonically and drop duplicate ids
///
/// The result is independent of the input order.
pub fn sort_columns(columns: &mut Vec<EnvironmentColumn>) {
    columns.sort_by(EnvironmentColumn::canonical_cmp);
    columns.dedup_by(|right, left| left.id == right.id);
}

/// Sort built-in environments canonically and drop duplicates
pub fn sort_targets(targets: &mut Vec<BuiltInEnvironment>) {
    targets.sort_unstable();
    targets.dedup();
}

/// Errors parsing environment identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentParseError {
    /// Not a known built-in name
    #[error("unknown environment: '{0}'")]
    Unknown(String),

    /// `custom:` prefix without an id
    #[error("custom environment id is empty")]
    EmptyCustomId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_from_name_ignores_case_and_padding() {
        assert_eq!(
            BuiltInEnvironment::from_name("  Production "),
            Some(BuiltInEnvironment::Production)
        );
        assert_eq!(
            BuiltInEnvironment::from_name("PREVIEW"),
            Some(BuiltInEnvironment::Preview)
        );
        assert_eq!(BuiltInEnvironment::from_name("staging"), None);
    }

    #[test]
    fn environment_id_display_and_parse() {
        let custom = EnvironmentId::custom("env_123");
        assert_eq!(custom.to_string(), "custom:env_123");
        assert_eq!("custom:env_123".parse::<EnvironmentId>().unwrap(), custom);
        assert_eq!(
            "development".parse::<EnvironmentId>().unwrap(),
            EnvironmentId::BuiltIn(BuiltInEnvironment::Development)
        );
        assert!(matches!(
            "custom:".parse::<EnvironmentId>(),
            Err(EnvironmentParseError::EmptyCustomId)
        ));
    }

    #[test]
    fn environment_id_serializes_as_string_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(EnvironmentId::custom("qa"), 1);
        map.insert(EnvironmentId::BuiltIn(BuiltInEnvironment::Preview), 2);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"preview":2,"custom:qa":1}"#);

        let decoded: std::collections::BTreeMap<EnvironmentId, i32> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn sort_columns_is_input_order_independent() {
        let mut first = vec![
            EnvironmentColumn::custom("b", "staging"),
            EnvironmentColumn::built_in(BuiltInEnvironment::Development),
            EnvironmentColumn::custom("a", "qa"),
            EnvironmentColumn::built_in(BuiltInEnvironment::Production),
            EnvironmentColumn::built_in(BuiltInEnvironment::Preview),
        ];
        let mut second = first.clone();
        second.reverse();

        sort_columns(&mut first);
        sort_columns(&mut second);

        assert_eq!(first, second);
        let ids: Vec<String> = first.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(
            ids,
            vec!["production", "preview", "development", "custom:a", "custom:b"]
        );
    }

    #[test]
    fn sort_columns_drops_duplicate_ids() {
        let mut columns = vec![
            EnvironmentColumn::built_in(BuiltInEnvironment::Preview),
            EnvironmentColumn::built_in(BuiltInEnvironment::Preview),
        ];
        sort_columns(&mut columns);
        assert_eq!(columns.len(), 1);
    }
}
