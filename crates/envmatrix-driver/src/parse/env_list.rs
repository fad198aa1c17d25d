//! `env ls` output
//!
//! Only the key and the environment cell are read. Values are never printed
//! by this command, so the rows describe topology: which keys exist and
//! which target set each record covers.

use envmatrix_model::{sort_targets, BuiltInEnvironment};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{clean_lines, split_columns};

static SKIP: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)^vercel cli").expect("banner regex is valid"),
        Regex::new(r"(?i)^retrieving project").expect("progress regex is valid"),
        Regex::new(r"(?i)^>\s*environment variables").expect("title regex is valid"),
        Regex::new(r"(?i)^name\s{2,}").expect("header regex is valid"),
    ]
});

static LIST_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i),|\band\b").expect("list separator regex is valid"));

/// One remote record as listed by `env ls`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvTopologyRow {
    pub key: String,
    pub target: Vec<BuiltInEnvironment>,
}

/// Parse a free-text environment cell such as `Production, Preview and Development`
///
/// Unknown names are dropped; the result is in canonical environment order.
#[must_use]
pub fn parse_environment_list(raw: &str) -> Vec<BuiltInEnvironment> {
    let mut targets: Vec<BuiltInEnvironment> = LIST_SEPARATOR
        .split(raw)
        .filter_map(BuiltInEnvironment::from_name)
        .collect();
    sort_targets(&mut targets);
    targets
}

/// Parse the variable table; rows without a key or a known target are skipped
#[must_use]
pub fn parse_env_list_output(output: &str) -> Vec<EnvTopologyRow> {
    clean_lines(output)
        .iter()
        .filter(|line| !SKIP.iter().any(|pattern| pattern.is_match(line.trim_start())))
        .filter_map(|line| {
            let columns = split_columns(line);
            if columns.len() < 3 {
                return None;
            }
            let key = columns[0].trim();
            let target = parse_environment_list(columns[2]);
            if key.is_empty() || target.is_empty() {
                return None;
            }
            Some(EnvTopologyRow {
                key: key.to_string(),
                target,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use BuiltInEnvironment::{Development, Preview, Production};

    const FIXTURE: &str = "Vercel CLI 48.0.0\n\
        Retrieving project…\n\
        > Environment Variables found for acme/web [120ms]\n\
        \n \
        name               value               environments                        created\n \
        \u{1b}[1mAPI_URL\u{1b}[22m            Encrypted           Production                          3d ago\n \
        SHARED_KEY         Encrypted           Development, Preview and Production  1h ago\n \
        PREVIEW_ONLY       Encrypted           Preview                             2m ago\n \
        BROKEN_ROW         Encrypted\n";

    #[test]
    fn parses_captured_listing() {
        assert_eq!(
            parse_env_list_output(FIXTURE),
            vec![
                EnvTopologyRow {
                    key: "API_URL".to_string(),
                    target: vec![Production],
                },
                EnvTopologyRow {
                    key: "SHARED_KEY".to_string(),
                    target: vec![Production, Preview, Development],
                },
                EnvTopologyRow {
                    key: "PREVIEW_ONLY".to_string(),
                    target: vec![Preview],
                },
            ]
        );
    }

    #[test]
    fn environment_cell_variants() {
        assert_eq!(
            parse_environment_list("development and PREVIEW"),
            vec![Preview, Development]
        );
        assert_eq!(parse_environment_list("Production,  Staging"), vec![Production]);
        assert!(parse_environment_list("Staging").is_empty());
    }

    #[test]
    fn rows_without_known_targets_are_skipped() {
        assert!(parse_env_list_output("FOO   Encrypted   Staging   1d ago").is_empty());
    }
}
