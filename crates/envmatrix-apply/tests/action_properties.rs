use std::collections::HashSet;

use envmatrix_apply::{build_actions, ActionKind, SkipReason};
use envmatrix_model::BuiltInEnvironment;
use envmatrix_plan::{Operation, OperationKind, OperationSnapshot};
use proptest::prelude::*;

fn environment() -> impl Strategy<Value = BuiltInEnvironment> {
    prop::sample::select(BuiltInEnvironment::ALL.to_vec())
}

fn snapshot() -> impl Strategy<Value = OperationSnapshot> {
    (
        prop::sample::select(vec!["API_KEY", "DB_URL", "TOKEN", "VERCEL_ENV"]),
        prop::option::of("[a-z]{1,6}"),
        prop::collection::vec(environment(), 0..4),
    )
        .prop_map(|(key, value, mut target)| {
            target.sort();
            target.dedup();
            OperationSnapshot {
                row_id: format!("row:{key}"),
                key: key.to_string(),
                value,
                target,
                custom_environment_ids: Vec::new(),
            }
        })
}

fn operation() -> impl Strategy<Value = Operation> {
    (
        0u32..1000,
        prop::sample::select(vec![
            OperationKind::CreateEnv,
            OperationKind::UpdateEnv,
            OperationKind::DeleteEnv,
            OperationKind::RenameKey,
        ]),
        prop::option::of(snapshot()),
        prop::option::of(snapshot()),
    )
        .prop_map(|(serial, kind, before, after)| {
            let mut operation = Operation::new(format!("op-{serial}"), kind, "row", "generated");
            operation.before = before;
            operation.after = after;
            operation
        })
}

proptest! {
    #[test]
    fn no_executed_remove_targets_a_written_pair(operations in prop::collection::vec(operation(), 0..8)) {
        let actions = build_actions(&operations);

        let written: HashSet<(Option<String>, Option<BuiltInEnvironment>)> = actions
            .iter()
            .filter(|action| action.kind == ActionKind::Add)
            .map(|action| (action.key.clone(), action.environment))
            .collect();
        for action in actions.iter().filter(|action| action.kind == ActionKind::Remove) {
            prop_assert!(!written.contains(&(action.key.clone(), action.environment)));
        }
    }

    #[test]
    fn reserved_keys_are_never_executed(operations in prop::collection::vec(operation(), 0..8)) {
        for action in build_actions(&operations) {
            if action.key.as_deref() == Some("VERCEL_ENV") {
                prop_assert_eq!(action.kind, ActionKind::Skip);
            }
        }
    }

    #[test]
    fn adds_then_removes_then_skips(operations in prop::collection::vec(operation(), 0..8)) {
        let kinds: Vec<ActionKind> = build_actions(&operations).iter().map(|a| a.kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        prop_assert_eq!(kinds, sorted);
    }

    #[test]
    fn every_operation_yields_an_action(operations in prop::collection::vec(operation(), 0..8)) {
        let actions = build_actions(&operations);
        for operation in &operations {
            prop_assert!(actions.iter().any(|action| action.operation_id == operation.id));
        }
        for action in actions.iter().filter(|action| action.kind == ActionKind::Skip) {
            prop_assert!(action.reason.is_some());
            if action.reason == Some(SkipReason::SupersededByAdd) {
                prop_assert!(action.environment.is_some());
            }
        }
    }
}
