//! Operation planner
//!
//! Plans one remote write per (value, target set) combination. Each row's
//! desired combos (from draft assignments) are matched against its baseline
//! combos in three passes:
//!
//! 1. exact match (content, targets, customs, unchanged key): nothing to do
//! 2. same target shape: `update_env` against each baseline source record
//! 3. leftovers: `create_env` for desired, `delete_env` for baseline records
//!
//! Whole-row change events are surfaced for rows that had no combos to diff.
//! The result is deduplicated by id and sorted by kind priority, then id.

use crate::change::{detect_changes, ChangeKind, MatrixChange};
use crate::operation::{Operation, OperationKind, OperationSnapshot};
use envmatrix_model::{BuiltInEnvironment, EnvironmentId, Matrix, RawEnvRecord, Row};
use std::collections::{BTreeMap, BTreeSet};

/// A (value, target set) pairing
#[derive(Debug, Clone, PartialEq, Eq)]
struct Combo {
    value_id: String,
    content: String,
    targets: Vec<BuiltInEnvironment>,
    customs: Vec<String>,
    sources: Vec<String>,
}

impl Combo {
    fn same_shape(&self, other: &Self) -> bool {
        self.targets == other.targets && self.customs == other.customs
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.content == other.content && self.same_shape(other)
    }

    fn shares_source(&self, other: &Self) -> bool {
        self.sources
            .iter()
            .any(|source| other.sources.contains(source))
    }
}

/// Group a row's active assignments by value; dangling ids are ignored
fn combos(row: &Row) -> Vec<Combo> {
    let mut grouped: BTreeMap<&str, (BTreeSet<BuiltInEnvironment>, BTreeSet<&str>)> =
        BTreeMap::new();
    for (environment, value) in row.active_assignments() {
        let (targets, customs) = grouped.entry(value.id.as_str()).or_default();
        match environment {
            EnvironmentId::BuiltIn(built_in) => {
                targets.insert(*built_in);
            }
            EnvironmentId::Custom(id) => {
                customs.insert(id.as_str());
            }
        }
    }

    row.values
        .iter()
        .filter_map(|value| {
            let (targets, customs) = grouped.remove(value.id.as_str())?;
            Some(Combo {
                value_id: value.id.clone(),
                content: value.content.clone(),
                targets: targets.into_iter().collect(),
                customs: customs.into_iter().map(str::to_string).collect(),
                sources: value
                    .source_rows
                    .iter()
                    .map(|source| source.record_id.clone())
                    .collect(),
            })
        })
        .collect()
}

fn source_record<'a>(
    baseline: &'a Matrix,
    row: &'a Row,
    record_id: &str,
) -> Option<&'a RawEnvRecord> {
    row.source_rows
        .iter()
        .find(|record| record.id == record_id)
        .or_else(|| baseline.source_row(record_id))
}

fn combo_snapshot(row: &Row, combo: &Combo) -> OperationSnapshot {
    OperationSnapshot {
        row_id: row.row_id.clone(),
        key: row.key.clone(),
        value: Some(combo.content.clone()),
        target: combo.targets.clone(),
        custom_environment_ids: combo.customs.clone(),
    }
}

fn row_snapshot(row: &Row) -> OperationSnapshot {
    let mut target = BTreeSet::new();
    let mut customs = BTreeSet::new();
    for (environment, _) in row.active_assignments() {
        match environment {
            EnvironmentId::BuiltIn(built_in) => {
                target.insert(*built_in);
            }
            EnvironmentId::Custom(id) => {
                customs.insert(id.clone());
            }
        }
    }
    OperationSnapshot {
        row_id: row.row_id.clone(),
        key: row.key.clone(),
        value: row.values.first().map(|value| value.content.clone()),
        target: target.into_iter().collect(),
        custom_environment_ids: customs.into_iter().collect(),
    }
}

/// Combo operations for one row present in the baseline, the draft, or both
fn plan_row(baseline: &Matrix, before: Option<&Row>, after: Option<&Row>) -> Vec<Operation> {
    let mut desired: Vec<(Combo, bool)> = after
        .map(combos)
        .unwrap_or_default()
        .into_iter()
        .map(|combo| (combo, false))
        .collect();
    let mut existing: Vec<(Combo, bool)> = before
        .map(combos)
        .unwrap_or_default()
        .into_iter()
        .map(|combo| (combo, false))
        .collect();
    let key_unchanged = matches!((before, after), (Some(b), Some(a)) if b.key == a.key);

    let mut operations = Vec::new();

    if key_unchanged {
        for (wanted, wanted_done) in &mut desired {
            let wanted: &Combo = wanted;
            if let Some((_, have_done)) = existing
                .iter_mut()
                .find(|(have, done)| !*done && have.same_signature(wanted))
            {
                *wanted_done = true;
                *have_done = true;
            }
        }
    }

    if let (Some(before), Some(after)) = (before, after) {
        for (wanted, wanted_done) in desired.iter_mut().filter(|(_, done)| !*done) {
            let wanted: &Combo = wanted;
            let candidate = existing
                .iter()
                .position(|(have, done)| {
                    !*done && have.same_shape(wanted) && have.shares_source(wanted)
                })
                .or_else(|| {
                    existing
                        .iter()
                        .position(|(have, done)| !*done && have.same_shape(wanted))
                });
            let Some(index) = candidate else {
                continue;
            };

            let (have, have_done) = &mut existing[index];
            *have_done = true;
            *wanted_done = true;

            for record_id in &have.sources {
                let Some(record) = source_record(baseline, before, record_id) else {
                    continue;
                };
                let id = format!("update-row:{record_id}");
                let targets = describe_targets(&record.target, &record.custom_environment_ids);
                let summary = if before.key == after.key {
                    format!("Update {} in {targets}", after.key)
                } else {
                    format!("Rename {} -> {} in {targets}", before.key, after.key)
                };
                let mut next = OperationSnapshot::of_record(&after.row_id, record);
                next.key = after.key.clone();
                next.value = Some(wanted.content.clone());
                operations.push(
                    Operation::new(id, OperationKind::UpdateEnv, &after.row_id, summary)
                        .with_before(OperationSnapshot::of_record(&before.row_id, record))
                        .with_after(next),
                );
            }
        }
    }

    if let Some(after) = after {
        for (wanted, _) in desired.iter().filter(|(_, done)| !*done) {
            let targets = describe_targets(&wanted.targets, &wanted.customs);
            operations.push(
                Operation::new(
                    format!("create-env:{}:{}", after.row_id, wanted.value_id),
                    OperationKind::CreateEnv,
                    &after.row_id,
                    format!("Create {} in {targets}", after.key),
                )
                .with_after(combo_snapshot(after, wanted)),
            );
        }
    }

    if let Some(before) = before {
        for (have, _) in existing.iter().filter(|(_, done)| !*done) {
            for record_id in &have.sources {
                let Some(record) = source_record(baseline, before, record_id) else {
                    continue;
                };
                operations.push(
                    Operation::new(
                        format!("delete-row:{record_id}"),
                        OperationKind::DeleteEnv,
                        &before.row_id,
                        format!(
                            "Delete {} from {}",
                            record.key,
                            describe_targets(&record.target, &record.custom_environment_ids)
                        ),
                    )
                    .with_before(OperationSnapshot::of_record(&before.row_id, record)),
                );
            }
        }
    }

    operations
}

fn describe_targets(targets: &[BuiltInEnvironment], customs: &[String]) -> String {
    let names: Vec<String> = targets
        .iter()
        .map(|target| target.as_str().to_string())
        .chain(customs.iter().map(|id| format!("custom:{id}")))
        .collect();
    if names.is_empty() {
        "no environments".to_string()
    } else {
        names.join(", ")
    }
}

fn change_operation(change: &MatrixChange, before: Option<&Row>, after: Option<&Row>) -> Operation {
    let kind = match change.kind {
        ChangeKind::Create => OperationKind::CreateEnv,
        ChangeKind::Update => OperationKind::UpdateEnv,
        ChangeKind::Delete => OperationKind::DeleteEnv,
        ChangeKind::Rename => OperationKind::RenameKey,
        ChangeKind::Retarget => OperationKind::Retarget,
    };
    let mut operation = Operation::new(&change.change_id, kind, &change.row_id, &change.summary);
    operation.before = before.map(row_snapshot);
    operation.after = after.map(row_snapshot);
    operation
}

/// Plan the remote operations that move `baseline` to `draft`
///
/// Never fails: inconsistent drafts (dangling assignments) plan as if the
/// cell were empty. Calling twice with the same inputs yields identical ids
/// in identical order.
#[must_use]
pub fn plan_operations(baseline: &Matrix, draft: &Matrix) -> Vec<Operation> {
    let before_rows: BTreeMap<&str, &Row> = baseline
        .rows
        .iter()
        .map(|row| (row.row_id.as_str(), row))
        .collect();
    let after_rows: BTreeMap<&str, &Row> = draft
        .rows
        .iter()
        .map(|row| (row.row_id.as_str(), row))
        .collect();
    let row_ids: BTreeSet<&str> = before_rows.keys().chain(after_rows.keys()).copied().collect();

    let mut planned: BTreeMap<String, Operation> = BTreeMap::new();
    let mut rows_with_combo_ops: BTreeSet<&str> = BTreeSet::new();

    for row_id in &row_ids {
        let before = before_rows.get(row_id).copied();
        let after = after_rows.get(row_id).copied();
        let operations = plan_row(baseline, before, after);
        if !operations.is_empty() {
            rows_with_combo_ops.insert(row_id);
        }
        for operation in operations {
            planned.entry(operation.id.clone()).or_insert(operation);
        }
    }

    for change in detect_changes(baseline, draft) {
        let before = before_rows.get(change.row_id.as_str()).copied();
        let after = after_rows.get(change.row_id.as_str()).copied();
        // Records only targeting unknown environments leave a row without combos
        let had_combos = before.is_some_and(|row| !combos(row).is_empty());
        if had_combos || rows_with_combo_ops.contains(change.row_id.as_str()) {
            continue;
        }
        let operation = change_operation(&change, before, after);
        planned.entry(operation.id.clone()).or_insert(operation);
    }

    let mut operations: Vec<Operation> = planned.into_values().collect();
    operations.sort_by(|left, right| {
        left.kind
            .priority()
            .cmp(&right.kind.priority())
            .then_with(|| left.id.cmp(&right.id))
    });

    tracing::debug!(
        project_id = %draft.project_id,
        operations = operations.len(),
        "Planned operations"
    );
    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmatrix_model::{
        built_in_columns, normalize, Capabilities, EnvironmentColumn, ProjectSnapshot,
    };
    use pretty_assertions::assert_eq;

    use BuiltInEnvironment::{Development, Preview, Production};

    fn matrix(records: Vec<RawEnvRecord>) -> Matrix {
        let snapshot =
            ProjectSnapshot::new("prj_1", built_in_columns(), records, Capabilities::full())
                .unwrap();
        normalize(&snapshot)
    }

    fn ids(operations: &[Operation]) -> Vec<&str> {
        operations.iter().map(|operation| operation.id.as_str()).collect()
    }

    #[test]
    fn unchanged_draft_plans_nothing() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_1", "API_KEY", "abc").with_targets([Production]),
        ]);
        assert!(plan_operations(&baseline, &baseline.clone()).is_empty());
    }

    #[test]
    fn split_topology_shared_value_plans_nothing() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_prod", "IN_ALL", "shared").with_targets([Production]),
            RawEnvRecord::new("env_non_prod", "IN_ALL", "shared")
                .with_targets([Preview, Development]),
        ]);
        let row = baseline.row("row:IN_ALL").unwrap();
        assert_eq!(row.source_rows.len(), 2);
        assert!(plan_operations(&baseline, &baseline.clone()).is_empty());
    }

    #[test]
    fn content_edit_plans_single_update() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_1", "API_KEY", "abc").with_targets([Production]),
        ]);
        let mut draft = baseline.clone();
        draft.edit_value("row:API_KEY", "value-1", "xyz").unwrap();

        let operations = plan_operations(&baseline, &draft);
        assert_eq!(ids(&operations), vec!["update-row:env_1"]);

        let operation = &operations[0];
        assert_eq!(operation.kind, OperationKind::UpdateEnv);
        let after = operation.after.as_ref().unwrap();
        assert_eq!(after.value.as_deref(), Some("xyz"));
        assert_eq!(after.target, vec![Production]);
        assert_eq!(
            operation.before.as_ref().unwrap().value.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn new_row_plans_single_create() {
        let baseline = matrix(Vec::new());
        let mut draft = baseline.clone();
        let row_id = draft.add_row("NEW_KEY");
        let value = draft.add_value(&row_id).unwrap();
        draft.edit_value(&row_id, &value, "v").unwrap();
        draft
            .set_assignment(&row_id, &Development.into(), Some(&value))
            .unwrap();

        let operations = plan_operations(&baseline, &draft);
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].kind, OperationKind::CreateEnv);
        assert_eq!(operations[0].id, format!("create-env:{row_id}:value-1"));
        let after = operations[0].after.as_ref().unwrap();
        assert_eq!(after.target, vec![Development]);
        assert_eq!(after.key, "NEW_KEY");
    }

    #[test]
    fn isolated_create_update_delete() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_update", "UPDATE_ME", "old").with_targets([Production]),
            RawEnvRecord::new("env_delete", "DELETE_ME", "gone").with_targets([Production]),
        ]);
        let mut draft = baseline.clone();
        draft.edit_value("row:UPDATE_ME", "value-1", "new").unwrap();
        draft
            .set_assignment("row:DELETE_ME", &Production.into(), None)
            .unwrap();
        let created = draft.add_row("CREATE_ME");
        let value = draft.add_value(&created).unwrap();
        draft.edit_value(&created, &value, "created").unwrap();
        draft
            .set_assignment(&created, &Production.into(), Some(&value))
            .unwrap();

        let operations = plan_operations(&baseline, &draft);
        let kinds: Vec<OperationKind> = operations.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::CreateEnv,
                OperationKind::UpdateEnv,
                OperationKind::DeleteEnv
            ]
        );
        assert_eq!(operations[1].id, "update-row:env_update");
        assert_eq!(operations[2].id, "delete-row:env_delete");
    }

    #[test]
    fn removed_row_deletes_every_source_record() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_a", "GONE", "1").with_targets([Production]),
            RawEnvRecord::new("env_b", "GONE", "2").with_targets([Preview]),
        ]);
        let mut draft = baseline.clone();
        draft.remove_row("row:GONE").unwrap();

        let operations = plan_operations(&baseline, &draft);
        assert_eq!(ids(&operations), vec!["delete-row:env_a", "delete-row:env_b"]);
    }

    #[test]
    fn removed_row_without_known_targets_still_plans_delete() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_1", "ORPHAN", "v").with_custom_environments(["ce_gone"]),
        ]);
        assert!(baseline.rows[0].assignments.values().all(Option::is_none));
        let mut draft = baseline.clone();
        draft.remove_row("row:ORPHAN").unwrap();

        let operations = plan_operations(&baseline, &draft);
        assert_eq!(ids(&operations), vec!["delete:row:ORPHAN"]);
        assert_eq!(operations[0].kind, OperationKind::DeleteEnv);
        assert_eq!(operations[0].before.as_ref().unwrap().key, "ORPHAN");
        assert!(operations[0].after.is_none());
    }

    #[test]
    fn rename_rewrites_every_source_record() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_prod", "OLD_NAME", "shared").with_targets([Production]),
            RawEnvRecord::new("env_rest", "OLD_NAME", "shared")
                .with_targets([Preview, Development]),
        ]);
        let mut draft = baseline.clone();
        draft.rename_key("row:OLD_NAME", "NEW_NAME").unwrap();

        let operations = plan_operations(&baseline, &draft);
        assert_eq!(ids(&operations), vec!["update-row:env_prod", "update-row:env_rest"]);
        for operation in &operations {
            assert_eq!(operation.before.as_ref().unwrap().key, "OLD_NAME");
            assert_eq!(operation.after.as_ref().unwrap().key, "NEW_NAME");
        }
        assert_eq!(
            operations[1].after.as_ref().unwrap().target,
            vec![Preview, Development]
        );
    }

    #[test]
    fn partial_combo_split_deletes_old_and_creates_new() {
        let baseline = matrix(vec![RawEnvRecord::new("env_1", "SPLIT", "shared")
            .with_targets([Production, Preview, Development])]);
        let mut draft = baseline.clone();
        let value = draft.add_value("row:SPLIT").unwrap();
        draft.edit_value("row:SPLIT", &value, "preview-only").unwrap();
        draft
            .set_assignment("row:SPLIT", &Preview.into(), Some(&value))
            .unwrap();

        let operations = plan_operations(&baseline, &draft);
        assert_eq!(
            ids(&operations),
            vec![
                "create-env:row:SPLIT:value-1",
                "create-env:row:SPLIT:value-2",
                "delete-row:env_1"
            ]
        );
        assert_eq!(
            operations[0].after.as_ref().unwrap().target,
            vec![Production, Development]
        );
        assert_eq!(operations[1].after.as_ref().unwrap().target, vec![Preview]);
    }

    #[test]
    fn empty_new_row_surfaces_whole_row_create() {
        let baseline = matrix(Vec::new());
        let mut draft = baseline.clone();
        let row_id = draft.add_row("EMPTY");

        let operations = plan_operations(&baseline, &draft);
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].id, format!("create:{row_id}"));
        assert!(operations[0].after.as_ref().unwrap().target.is_empty());
    }

    #[test]
    fn dangling_assignment_is_treated_as_empty() {
        let baseline = matrix(vec![
            RawEnvRecord::new("env_1", "API_KEY", "abc").with_targets([Production]),
        ]);
        let mut draft = baseline.clone();
        draft.rows[0]
            .assignments
            .insert(Preview.into(), Some("value-99".to_string()));

        assert!(plan_operations(&baseline, &draft).is_empty());
    }

    #[test]
    fn custom_environment_targets_are_part_of_the_combo() {
        let mut environments = built_in_columns();
        environments.push(EnvironmentColumn::custom("ce_qa", "QA"));
        let snapshot = ProjectSnapshot::new(
            "prj_1",
            environments,
            vec![RawEnvRecord::new("env_1", "K", "v")
                .with_targets([Production])
                .with_custom_environments(["ce_qa"])],
            Capabilities::full(),
        )
        .unwrap();
        let baseline = normalize(&snapshot);
        assert!(plan_operations(&baseline, &baseline.clone()).is_empty());

        let mut draft = baseline.clone();
        draft
            .set_assignment("row:K", &EnvironmentId::custom("ce_qa"), None)
            .unwrap();
        let operations = plan_operations(&baseline, &draft);
        assert_eq!(
            ids(&operations),
            vec!["create-env:row:K:value-1", "delete-row:env_1"]
        );
        assert!(operations[0]
            .after
            .as_ref()
            .unwrap()
            .custom_environment_ids
            .is_empty());
    }
}
