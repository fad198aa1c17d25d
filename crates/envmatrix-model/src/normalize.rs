//! Snapshot normalization
//!
//! Turns the flat record list of a [`ProjectSnapshot`] into a [`Matrix`]:
//! one row per key, one deduplicated value per distinct signature, and one
//! optional value id per environment column.

use crate::environment::{sort_columns, EnvironmentColumn, EnvironmentId};
use crate::matrix::{value_id, Assignments, Matrix, Row, ValuePoolEntry, ValueSignature, ValueSourceRef};
use crate::record::RawEnvRecord;
use crate::snapshot::ProjectSnapshot;
use std::collections::{BTreeMap, BTreeSet};

/// Build the matrix for a snapshot
///
/// Pure and deterministic: the same records in any order produce an
/// identical matrix.
#[must_use]
pub fn normalize(snapshot: &ProjectSnapshot) -> Matrix {
    let mut environments = snapshot.environments.clone();
    sort_columns(&mut environments);
    let known: BTreeSet<&EnvironmentId> = environments.iter().map(|column| &column.id).collect();

    let mut groups: BTreeMap<&str, Vec<&RawEnvRecord>> = BTreeMap::new();
    for record in &snapshot.records {
        groups.entry(record.key.as_str()).or_default().push(record);
    }

    let rows = groups
        .into_iter()
        .map(|(key, mut records)| {
            records.sort_by(|left, right| left.id.cmp(&right.id));
            normalize_key_group(key, &records, &environments, &known)
        })
        .collect();

    let source_row_index = snapshot
        .records
        .iter()
        .map(|record| (record.id.clone(), record.clone()))
        .collect();

    Matrix {
        project_id: snapshot.project_id.clone(),
        environments,
        rows,
        source_row_index,
        capabilities: snapshot.capabilities,
        baseline_hash: snapshot.baseline_hash,
    }
}

struct PoolSlot {
    signature: ValueSignature,
    first_seen: usize,
    sources: Vec<ValueSourceRef>,
    targets: Vec<EnvironmentId>,
}

fn normalize_key_group(
    key: &str,
    records: &[&RawEnvRecord],
    environments: &[EnvironmentColumn],
    known: &BTreeSet<&EnvironmentId>,
) -> Row {
    let mut slots: Vec<PoolSlot> = Vec::new();
    let mut by_signature: BTreeMap<ValueSignature, usize> = BTreeMap::new();

    for record in records {
        let signature = ValueSignature::of_record(record);
        let index = *by_signature.entry(signature.clone()).or_insert_with(|| {
            slots.push(PoolSlot {
                signature,
                first_seen: slots.len(),
                sources: Vec::new(),
                targets: Vec::new(),
            });
            slots.len() - 1
        });

        let slot = &mut slots[index];
        slot.sources.push(ValueSourceRef::new(&record.id));
        for target in record.targets() {
            if known.contains(&target) {
                slot.targets.push(target);
            } else {
                tracing::debug!(
                    record_id = %record.id,
                    target = %target,
                    "Dropping unknown target from assignments"
                );
            }
        }
    }

    slots.sort_by(|left, right| {
        left.signature
            .cmp(&right.signature)
            .then(left.first_seen.cmp(&right.first_seen))
    });

    let mut assignments: Assignments = environments
        .iter()
        .map(|column| (column.id.clone(), None))
        .collect();
    let mut values = Vec::with_capacity(slots.len());

    for (position, slot) in slots.into_iter().enumerate() {
        let id = value_id(position + 1);
        for target in slot.targets {
            assignments.insert(target, Some(id.clone()));
        }
        let mut entry = ValuePoolEntry::from_signature(id, &slot.signature);
        entry.source_rows = slot.sources;
        values.push(entry);
    }

    Row {
        row_id: Row::id_for_key(key),
        key: key.to_string(),
        values,
        assignments,
        source_rows: records.iter().map(|record| (*record).clone()).collect(),
        is_new: false,
    }
}
