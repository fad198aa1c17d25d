//! Record, snapshot and matrix builders

use envmatrix_model::{
    built_in_columns, normalize, BuiltInEnvironment, Capabilities, Matrix, ProjectSnapshot,
    RawEnvRecord,
};

pub fn record(id: &str, key: &str, value: &str, targets: &[BuiltInEnvironment]) -> RawEnvRecord {
    RawEnvRecord::new(id, key, value).with_targets(targets.iter().copied())
}

/// Snapshot over the built-in columns with CLI capabilities
pub fn snapshot(project_id: &str, records: Vec<RawEnvRecord>) -> ProjectSnapshot {
    ProjectSnapshot::new(project_id, built_in_columns(), records, Capabilities::cli()).unwrap()
}

pub fn matrix(project_id: &str, records: Vec<RawEnvRecord>) -> Matrix {
    normalize(&snapshot(project_id, records))
}
