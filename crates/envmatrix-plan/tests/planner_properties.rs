use envmatrix_model::{normalize, BuiltInEnvironment, EnvironmentId, Matrix};
use envmatrix_plan::{plan_operations, OperationKind};
use envmatrix_test_utils::fixtures::{record, snapshot};
use proptest::prelude::*;

use BuiltInEnvironment::{Development, Preview, Production};

fn environment() -> impl Strategy<Value = BuiltInEnvironment> {
    prop_oneof![Just(Production), Just(Preview), Just(Development)]
}

fn baseline_strategy() -> impl Strategy<Value = Matrix> {
    prop::collection::vec(
        (
            prop_oneof![Just("API_URL"), Just("TOKEN"), Just("IN_ALL")],
            prop_oneof![Just("a"), Just("b")],
            prop::collection::vec(environment(), 1..3),
        ),
        0..7,
    )
    .prop_map(|raw| {
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(index, (key, value, targets))| {
                record(&format!("env_{index:02}"), key, value, &targets)
            })
            .collect();
        normalize(&snapshot("prj", records))
    })
}

fn edited(baseline: &Matrix, edits: &[(usize, BuiltInEnvironment, Option<String>)]) -> Matrix {
    let mut draft = baseline.clone();
    for (row, environment, content) in edits {
        if draft.rows.is_empty() {
            break;
        }
        let row_id = draft.rows[row % draft.rows.len()].row_id.clone();
        let target = EnvironmentId::BuiltIn(*environment);
        match content {
            Some(content) => {
                if let Ok(value_id) = draft.add_value(&row_id) {
                    let _ = draft.edit_value(&row_id, &value_id, content.clone());
                    let _ = draft.set_assignment(&row_id, &target, Some(&value_id));
                }
            }
            None => {
                let _ = draft.set_assignment(&row_id, &target, None);
            }
        }
    }
    draft
}

proptest! {
    #[test]
    fn prop_clone_plans_no_operations(baseline in baseline_strategy()) {
        let draft = baseline.clone();
        prop_assert!(plan_operations(&baseline, &draft).is_empty());
    }

    #[test]
    fn prop_planning_is_deterministic(
        baseline in baseline_strategy(),
        edits in prop::collection::vec(
            (0..4usize, environment(), prop::option::of("[a-c]{1,2}")),
            0..6
        )
    ) {
        let draft = edited(&baseline, &edits);
        let first = plan_operations(&baseline, &draft);
        let second = plan_operations(&baseline, &draft);
        prop_assert_eq!(&first, &second);

        // Creates precede rewrites, rewrites precede deletes
        let priorities: Vec<u8> = first.iter().map(|op| op.kind.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        prop_assert_eq!(priorities, sorted);

        let mut ids: Vec<&str> = first.iter().map(|op| op.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), first.len());
    }
}

#[test]
fn example_value_edit_is_one_update() {
    let baseline = normalize(&snapshot(
        "prj",
        vec![record("env_1", "API_KEY", "abc", &[Production])],
    ));
    let mut draft = baseline.clone();
    draft.edit_value("row:API_KEY", "value-1", "xyz").unwrap();

    let operations = plan_operations(&baseline, &draft);
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].kind, OperationKind::UpdateEnv);
    let after = operations[0].after.as_ref().unwrap();
    assert_eq!(after.value.as_deref(), Some("xyz"));
    assert_eq!(after.target, vec![Production]);
}

#[test]
fn example_new_row_is_one_create() {
    let baseline = normalize(&snapshot("prj", Vec::new()));
    let mut draft = baseline.clone();
    let row_id = draft.add_row("NEW_KEY");
    let value_id = draft.add_value(&row_id).unwrap();
    draft.edit_value(&row_id, &value_id, "v").unwrap();
    draft
        .set_assignment(&row_id, &Development.into(), Some(&value_id))
        .unwrap();

    let operations = plan_operations(&baseline, &draft);
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].kind, OperationKind::CreateEnv);
    assert_eq!(
        operations[0].after.as_ref().unwrap().target,
        vec![Development]
    );
}

#[test]
fn one_of_three_shared_targets_reassigned() {
    let baseline = normalize(&snapshot(
        "prj",
        vec![
            record("env_prod", "IN_ALL", "shared", &[Production]),
            record("env_rest", "IN_ALL", "shared", &[Preview, Development]),
        ],
    ));
    let mut draft = baseline.clone();
    draft
        .set_assignment("row:IN_ALL", &Development.into(), None)
        .unwrap();

    let operations = plan_operations(&baseline, &draft);
    let ids: Vec<&str> = operations.iter().map(|op| op.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "create-env:row:IN_ALL:value-1",
            "delete-row:env_prod",
            "delete-row:env_rest"
        ]
    );
    assert_eq!(
        operations[0].after.as_ref().unwrap().target,
        vec![Production, Preview]
    );
}
