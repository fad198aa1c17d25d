//! CLI output parsers
//!
//! Pure string -> structure functions over human-readable CLI output:
//! - Team listing (`teams list`)
//! - Environment topology (`env ls`)
//! - Identity (`whoami`)
//! - Project listing JSON (`project list --json`)
//! - Pulled dotenv files
//!
//! The text format is an unversioned external contract, so every parser
//! skips lines it does not recognize and returns whatever it could read.

use once_cell::sync::Lazy;
use regex::Regex;

mod dotenv;
mod env_list;
mod projects;
mod teams;
mod whoami;

pub use dotenv::{parse_dotenv, parse_dotenv_file};
pub use env_list::{parse_environment_list, parse_env_list_output, EnvTopologyRow};
pub use projects::{parse_project_list, ProjectSummary};
pub use teams::{parse_teams_output, slugify, TeamScope};
pub use whoami::{parse_whoami_output, CliIdentity};

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi regex is valid"));

static COLUMN_GAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("column gap regex is valid"));

/// Remove SGR color sequences
#[must_use]
pub fn strip_ansi(line: &str) -> String {
    ANSI_ESCAPE.replace_all(line, "").into_owned()
}

/// Color-stripped, right-trimmed, non-blank lines
pub(crate) fn clean_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| strip_ansi(line).trim_end().to_string())
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Split a whitespace-padded table row on runs of two or more spaces
pub(crate) fn split_columns(line: &str) -> Vec<&str> {
    COLUMN_GAP
        .split(line.trim())
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi("\u{1b}[1mAPI_KEY\u{1b}[22m"), "API_KEY");
        assert_eq!(strip_ansi("\u{1b}[38;5;8mdim\u{1b}[0m"), "dim");
    }

    #[test]
    fn clean_lines_drops_blank_and_crlf() {
        let lines = clean_lines("a  \r\n\r\n   \n\u{1b}[2mb\u{1b}[0m\n");
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn columns_need_two_spaces() {
        assert_eq!(
            split_columns("  API_KEY   Encrypted  Production, Preview   3d ago "),
            vec!["API_KEY", "Encrypted", "Production, Preview", "3d ago"]
        );
    }
}
