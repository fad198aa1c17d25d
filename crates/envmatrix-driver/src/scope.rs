//! Scope resolution
//!
//! A scope id is `user:<name>` (personal account), `team:<slug>`, or a raw
//! team id that has to be looked up in the team listing.

use serde::{Deserialize, Serialize};

use crate::parse::TeamScope;

const USER_PREFIX: &str = "user:";
const TEAM_PREFIX: &str = "team:";

/// Parsed scope id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeRef {
    /// Personal account; commands run without `--scope`
    Personal(String),
    /// Team addressed by slug
    TeamSlug(String),
    /// Team addressed by id; needs a `teams list` lookup
    TeamId(String),
}

impl ScopeRef {
    #[must_use]
    pub fn parse(scope_id: &str) -> Self {
        if scope_id.starts_with(USER_PREFIX) {
            Self::Personal(scope_id.to_string())
        } else if let Some(slug) = scope_id.strip_prefix(TEAM_PREFIX) {
            Self::TeamSlug(slug.to_string())
        } else {
            Self::TeamId(scope_id.to_string())
        }
    }

    #[inline]
    #[must_use]
    pub fn needs_team_lookup(&self) -> bool {
        matches!(self, Self::TeamId(_))
    }

    /// Resolve against a team listing; only [`ScopeRef::TeamId`] consults it
    #[must_use]
    pub fn resolve(&self, teams: &[TeamScope]) -> ResolvedScope {
        match self {
            Self::Personal(scope_id) => ResolvedScope {
                scope_arg: None,
                cache_key: scope_id.clone(),
            },
            Self::TeamSlug(slug) => ResolvedScope::team(slug),
            Self::TeamId(id) => match teams.iter().find(|team| &team.id == id) {
                Some(team) => ResolvedScope::team(&team.slug),
                None => ResolvedScope {
                    scope_arg: Some(id.clone()),
                    cache_key: format!("unknown:{id}"),
                },
            },
        }
    }
}

/// Scope as passed to the CLI plus the key used for workspace and lock maps
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedScope {
    /// Value for `--scope`, absent for the personal account
    pub scope_arg: Option<String>,
    pub cache_key: String,
}

impl ResolvedScope {
    fn team(slug: &str) -> Self {
        Self {
            scope_arg: Some(slug.to_string()),
            cache_key: format!("{TEAM_PREFIX}{slug}"),
        }
    }

    #[inline]
    #[must_use]
    pub fn scope_arg(&self) -> Option<&str> {
        self.scope_arg.as_deref()
    }
}
