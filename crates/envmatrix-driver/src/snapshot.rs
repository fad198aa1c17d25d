//! Snapshot building from pulled environment files
//!
//! `env pull` yields one flat key/value map per built-in environment and
//! `env ls` yields which target set each remote record covers. Together
//! they reconstruct the remote records:
//!
//! 1. Topology rows first, one record per `(key, target set)`, valued from
//!    the first target that has the key.
//! 2. Every `(environment, key)` pair not covered by a topology row becomes
//!    a single-target record.
//!
//! Record ids are derived from key, targets and an ordinal, so reloading an
//! unchanged project yields the same ids and the same baseline hash.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use envmatrix_model::{
    built_in_columns, sort_targets, BaselineHash, BuiltInEnvironment, Capabilities, HashError,
    ProjectSnapshot, RawEnvRecord,
};

use crate::parse::EnvTopologyRow;
use crate::reserved::filter_reserved_keys;

/// Prefix of record ids synthesized from CLI output
pub const CLI_RECORD_PREFIX: &str = "cli:";

const RECORD_DIGEST_LEN: usize = 12;

/// Pulled key/value maps per built-in environment
pub type PulledEnvironments = BTreeMap<BuiltInEnvironment, BTreeMap<String, String>>;

/// `cli:<targets joined by +>:<digest>`
#[must_use]
pub fn cli_record_id(key: &str, target: &[BuiltInEnvironment], ordinal: usize) -> String {
    let names: Vec<&str> = target.iter().map(|environment| environment.as_str()).collect();
    let digest = BaselineHash::compute(format!("{}::{key}::{ordinal}", names.join(",")).as_bytes())
        .prefix(RECORD_DIGEST_LEN);
    format!("{CLI_RECORD_PREFIX}{}:{digest}", names.join("+"))
}

/// Reconstruct remote records; reserved runtime keys are dropped
#[must_use]
pub fn records_from_pulled(
    pulled: &PulledEnvironments,
    topology: &[EnvTopologyRow],
) -> Vec<RawEnvRecord> {
    let editable: BTreeMap<BuiltInEnvironment, BTreeMap<String, String>> = BuiltInEnvironment::ALL
        .into_iter()
        .map(|environment| {
            let values = pulled.get(&environment).cloned().unwrap_or_default();
            (environment, filter_reserved_keys(values).0)
        })
        .collect();
    let value_in = |environment: BuiltInEnvironment, key: &str| {
        editable.get(&environment).and_then(|values| values.get(key))
    };

    let mut ordered: Vec<(String, Vec<BuiltInEnvironment>)> = topology
        .iter()
        .map(|row| {
            let mut target = row.target.clone();
            sort_targets(&mut target);
            (row.key.clone(), target)
        })
        .collect();
    ordered.sort_by_cached_key(|(key, target)| (key.clone(), join_names(target)));

    let mut records = Vec::new();
    let mut covered: BTreeSet<(BuiltInEnvironment, String)> = BTreeSet::new();
    let mut ordinals: HashMap<(String, Vec<BuiltInEnvironment>), usize> = HashMap::new();

    for (key, target) in ordered {
        if target.is_empty() {
            continue;
        }
        let Some(value) = target.iter().find_map(|environment| value_in(*environment, &key)) else {
            continue;
        };
        for environment in &target {
            covered.insert((*environment, key.clone()));
        }
        let ordinal = ordinals.entry((key.clone(), target.clone())).or_insert(0);
        *ordinal += 1;

        records.push(
            RawEnvRecord::new(cli_record_id(&key, &target, *ordinal), key.clone(), value.clone())
                .with_targets(target),
        );
    }

    for (environment, values) in &editable {
        for (key, value) in values {
            if covered.contains(&(*environment, key.clone())) {
                continue;
            }
            records.push(
                RawEnvRecord::new(cli_record_id(key, &[*environment], 0), key.clone(), value.clone())
                    .with_targets([*environment]),
            );
        }
    }

    records.sort_by(|left, right| {
        left.key
            .cmp(&right.key)
            .then_with(|| left.target.first().cmp(&right.target.first()))
    });
    records
}

/// Build a hashed snapshot with CLI capabilities and the built-in columns
///
/// # Errors
/// Returns error if the baseline hash cannot be computed
pub fn build_snapshot(
    project_id: &str,
    pulled: &PulledEnvironments,
    topology: &[EnvTopologyRow],
) -> Result<ProjectSnapshot, HashError> {
    ProjectSnapshot::new(
        project_id,
        built_in_columns(),
        records_from_pulled(pulled, topology),
        Capabilities::cli(),
    )
}

fn join_names(target: &[BuiltInEnvironment]) -> String {
    target
        .iter()
        .map(|environment| environment.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use BuiltInEnvironment::{Development, Preview, Production};

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn summary(records: &[RawEnvRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| format!("{}:{}", record.key, record.target[0]))
            .collect()
    }

    #[test]
    fn per_environment_records_filter_reserved_keys() {
        let pulled = PulledEnvironments::from([
            (
                Development,
                map(&[
                    ("SHARED_KEY", "dev-shared"),
                    ("DEV_ONLY", "dev-only"),
                    ("NX_DAEMON", "1"),
                    ("TURBO_CACHE", "local:rw"),
                    ("VERCEL", "1"),
                    ("VERCEL_OIDC_TOKEN", "secret-token"),
                ]),
            ),
            (Preview, map(&[("SHARED_KEY", "preview-shared")])),
            (
                Production,
                map(&[("SHARED_KEY", "prod-shared"), ("PROD_ONLY", "prod-only")]),
            ),
        ]);

        let snapshot = build_snapshot("prj_1", &pulled, &[]).unwrap();
        assert_eq!(snapshot.capabilities, Capabilities::cli());
        assert_eq!(
            summary(&snapshot.records),
            vec![
                "DEV_ONLY:development",
                "PROD_ONLY:production",
                "SHARED_KEY:production",
                "SHARED_KEY:preview",
                "SHARED_KEY:development",
            ]
        );
        assert!(snapshot.records.iter().all(|r| !r.key.starts_with("VERCEL")));
    }

    #[test]
    fn missing_keys_produce_no_record() {
        let pulled = PulledEnvironments::from([
            (Development, map(&[("API_KEY", "dev")])),
            (Preview, BTreeMap::new()),
            (Production, map(&[("API_KEY", "prod")])),
        ]);
        let records = records_from_pulled(&pulled, &[]);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.target != vec![Preview]));
    }

    #[test]
    fn topology_rows_group_targets() {
        let pulled = PulledEnvironments::from([
            (Development, map(&[("IN_ALL", "reallyAll")])),
            (Preview, map(&[("IN_ALL", "reallyAll")])),
            (Production, map(&[("IN_ALL", "reallyAll")])),
        ]);
        let topology = vec![
            EnvTopologyRow {
                key: "IN_ALL".to_string(),
                target: vec![Development],
            },
            EnvTopologyRow {
                key: "IN_ALL".to_string(),
                target: vec![Preview, Production],
            },
        ];

        let records = records_from_pulled(&pulled, &topology);
        let targets: Vec<Vec<BuiltInEnvironment>> =
            records.iter().map(|r| r.target.clone()).collect();
        assert_eq!(targets, vec![vec![Production, Preview], vec![Development]]);
        assert!(records[0].id.starts_with("cli:production+preview:"));
    }

    #[test]
    fn topology_row_without_pulled_value_is_skipped() {
        let pulled = PulledEnvironments::from([(Production, map(&[("A", "1")]))]);
        let topology = vec![EnvTopologyRow {
            key: "GHOST".to_string(),
            target: vec![Production],
        }];
        let records = records_from_pulled(&pulled, &topology);
        assert_eq!(summary(&records), vec!["A:production"]);
    }

    #[test]
    fn reload_is_stable() {
        let pulled = PulledEnvironments::from([(Production, map(&[("A", "1"), ("B", "2")]))]);
        let first = build_snapshot("prj", &pulled, &[]).unwrap();
        let second = build_snapshot("prj", &pulled, &[]).unwrap();
        assert_eq!(first.baseline_hash, second.baseline_hash);
        assert_eq!(first.records[0].id, cli_record_id("A", &[Production], 0));
        assert_eq!(first.records[0].id.len(), "cli:production:".len() + RECORD_DIGEST_LEN);
    }
}
