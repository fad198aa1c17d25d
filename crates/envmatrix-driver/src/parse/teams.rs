//! `teams list` output

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{clean_lines, split_columns};

static SKIP: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)^vercel cli").expect("banner regex is valid"),
        Regex::new(r"(?i)^fetching").expect("progress regex is valid"),
        Regex::new(r"(?i)^id\s+").expect("header regex is valid"),
    ]
});

static CURRENT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^>\s*").expect("current prefix regex is valid"));

static CURRENT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(current\)").expect("current suffix regex is valid"));

static TEAM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bteam_[a-zA-Z0-9]+\b").expect("team id regex is valid"));

static NON_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex is valid"));

/// One team the CLI user belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScope {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub is_current: bool,
}

/// Lowercase, dash-separated form of a display name
#[must_use]
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    NON_SLUG
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Parse the team table; lines without a `team_` id are ignored
#[must_use]
pub fn parse_teams_output(output: &str) -> Vec<TeamScope> {
    clean_lines(output)
        .iter()
        .filter(|line| !SKIP.iter().any(|pattern| pattern.is_match(line.trim_start())))
        .filter_map(|line| parse_team_line(line))
        .collect()
}

fn parse_team_line(line: &str) -> Option<TeamScope> {
    let line = line.trim_start();
    let is_current = CURRENT_PREFIX.is_match(line) || CURRENT_SUFFIX.is_match(line);
    let without_prefix = CURRENT_PREFIX.replace(line, "");
    let normalized = CURRENT_SUFFIX.replace_all(&without_prefix, "");
    let normalized = normalized.trim();

    let id = TEAM_ID.find(normalized)?.as_str().to_string();
    let columns = split_columns(normalized);

    let (name, slug) = if columns.first() == Some(&id.as_str()) {
        let name = columns.get(1).map_or_else(|| id.clone(), ToString::to_string);
        let slug = columns.get(2).map(ToString::to_string);
        (name, slug)
    } else {
        let index = columns.iter().position(|column| column.contains(&id));
        let after = |offset: usize| index.and_then(|i| columns.get(i + offset)).copied();
        let name = after(1)
            .or_else(|| columns.first().copied())
            .map_or_else(|| id.clone(), ToString::to_string);
        (name, after(2).map(ToString::to_string))
    };

    let slug = slug
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| slugify(&name));

    Some(TeamScope {
        id,
        slug,
        name,
        is_current,
    })
}
