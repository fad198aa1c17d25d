//! `project list --json` output
//!
//! Every field is untyped until checked; items without a string id and name
//! are dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Project row for pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub framework: Option<String>,
    /// Milliseconds since the epoch, 0 when absent
    pub updated_at: i64,
}

impl ProjectSummary {
    fn from_json(item: &Value) -> Option<Self> {
        Some(Self {
            id: item.get("id")?.as_str()?.to_string(),
            name: item.get("name")?.as_str()?.to_string(),
            framework: item
                .get("framework")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            updated_at: item
                .get("updatedAt")
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                .unwrap_or(0),
        })
    }
}

/// Parse the listing, filter by a case-insensitive name substring, newest first
///
/// Malformed JSON yields an empty list.
#[must_use]
pub fn parse_project_list(output: &str, search: &str) -> Vec<ProjectSummary> {
    let parsed: Value = match serde_json::from_str(output) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "project list output is not JSON");
            return Vec::new();
        }
    };

    let items = match &parsed {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("projects")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice),
        _ => &[],
    };

    let search = search.trim().to_lowercase();
    let mut projects: Vec<ProjectSummary> = items
        .iter()
        .filter_map(ProjectSummary::from_json)
        .filter(|project| search.is_empty() || project.name.to_lowercase().contains(&search))
        .collect();
    projects.sort_by(|left, right| {
        right
            .updated_at
            .cmp(&left.updated_at)
            .then_with(|| left.name.cmp(&right.name))
    });
    projects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_listing_sorted_newest_first() {
        let output = r#"{"projects":[
            {"id":"prj_1","name":"web","framework":"nextjs","updatedAt":100},
            {"id":"prj_2","name":"api","framework":null,"updatedAt":300},
            {"id":"prj_3","name":"docs"},
            {"id":4,"name":"broken"}
        ]}"#;
        let projects = parse_project_list(output, "");
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["api", "web", "docs"]);
        assert_eq!(projects[1].framework.as_deref(), Some("nextjs"));
        assert_eq!(projects[2].updated_at, 0);
    }

    #[test]
    fn bare_array_with_search() {
        let output = r#"[{"id":"a","name":"Marketing-Site"},{"id":"b","name":"api"}]"#;
        let projects = parse_project_list(output, "  SITE ");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "a");
    }

    #[test]
    fn ties_break_on_name() {
        let output = r#"[{"id":"b","name":"beta","updatedAt":5},{"id":"a","name":"alpha","updatedAt":5}]"#;
        let projects = parse_project_list(output, "");
        assert_eq!(projects[0].name, "alpha");
    }

    #[test]
    fn non_json_is_empty() {
        assert!(parse_project_list("Error: not logged in", "").is_empty());
        assert!(parse_project_list("42", "").is_empty());
    }
}
