//! `whoami` output

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SCOPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)scope:\s*(\S+)").expect("scope regex is valid"));

/// Logged-in CLI user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliIdentity {
    pub username: String,
    pub active_scope: Option<String>,
}

/// First line that is not a banner or progress message is the username
#[must_use]
pub fn parse_whoami_output(output: &str) -> Option<CliIdentity> {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let username = lines
        .iter()
        .find(|line| !line.starts_with("Vercel CLI") && !line.starts_with("Retrieving"))?;

    let active_scope = SCOPE
        .captures(&lines.join("\n"))
        .map(|caps| caps[1].to_string());

    Some(CliIdentity {
        username: (*username).to_string(),
        active_scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_after_banner() {
        let identity = parse_whoami_output("Vercel CLI 48.0.0\n\n  octocat  \n").unwrap();
        assert_eq!(identity.username, "octocat");
        assert_eq!(identity.active_scope, None);
    }

    #[test]
    fn scope_line_is_picked_up() {
        let identity =
            parse_whoami_output("Vercel CLI 48.0.0\noctocat\nScope: acme-inc\n").unwrap();
        assert_eq!(identity.active_scope.as_deref(), Some("acme-inc"));
    }

    #[test]
    fn banner_only_has_no_identity() {
        assert_eq!(parse_whoami_output("Vercel CLI 48.0.0\nRetrieving user…\n"), None);
        assert_eq!(parse_whoami_output(""), None);
    }
}
