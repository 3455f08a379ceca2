//! Preview / diff reconstruction.
//!
//! Pending batches are simulated against the *current* snapshot: operations
//! with an unresolved fatal conflict are excluded from the after-state and
//! surfaced separately as rejected. Executed batches are NOT re-simulated —
//! the live state has since diverged — their stored operation log is
//! replayed literally, with the weight resolver seeded from the occupant
//! counts recorded at apply time.

use crate::classify::classify_batch;
use crate::simulate::{Snapshot, WorkingView};
use crate::suggest::SuffixStrategy;
use crate::weight::WeightResolver;
use crate::{ConflictCheck, EngineError};
use codetable_model::{Code, Entry, EntryStatus, EntryType, PendingOperation};
use codetable_storage::{CodeTypeCount, EntryStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Diff types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchDiff {
    pub groups: Vec<CodeDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedOperation>,
}

/// Per-code diff entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeDiff {
    pub code: Code,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<Entry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<Entry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modified: Vec<ModifiedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiedEntry {
    pub before: Entry,
    pub after: Entry,
}

/// A pending operation excluded from the simulated after-state because its
/// fatal conflict is unresolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedOperation {
    pub index: usize,
    pub operation: PendingOperation,
    pub impact: String,
}

// ============================================================================
// Pending batches
// ============================================================================

/// Simulate a pending batch against current persisted state and group the
/// outcome per code.
pub fn preview_pending<S: EntryStore + ?Sized>(
    store: &S,
    operations: &[PendingOperation],
) -> Result<BatchDiff, EngineError> {
    let strategy = SuffixStrategy::default();
    let snapshot = Snapshot::load(store, operations, &strategy)?;
    let checks = classify_batch(&snapshot, operations, &strategy);

    let rejected = operations
        .iter()
        .zip(&checks)
        .enumerate()
        .filter(|(_, (_, check))| check.is_blocking())
        .map(|(index, (op, check))| RejectedOperation {
            index,
            operation: op.clone(),
            impact: check.impact.clone().unwrap_or_default(),
        })
        .collect();

    let mut view = WorkingView::new(&snapshot);
    for (index, (op, check)) in operations.iter().zip(&checks).enumerate() {
        if !check.has_conflict {
            view.apply(index, op, check.calculated_weight);
        }
    }

    let before = snapshot.to_map();
    let after = view.into_map();
    let renames = rename_pairs(operations, Some(&checks));

    Ok(BatchDiff {
        groups: diff_groups(&before, &after, &renames),
        rejected,
    })
}

// ============================================================================
// Executed batches
// ============================================================================

/// Reconstruct the before/after diff of an already-executed batch from its
/// literal stored operation log. `counts` are the per-(code, type) occupant
/// counts recorded at apply time; they seed the weight resolver so created
/// entries display the weights that were actually committed.
///
/// Rows that existed before the batch are reconstructed from the removals in
/// the log; their historical weights are not recorded, so they display as 0.
pub fn preview_executed(operations: &[PendingOperation], counts: &[CodeTypeCount]) -> BatchDiff {
    let count_of = |code: &Code, entry_type: EntryType| {
        counts
            .iter()
            .find(|c| &c.code == code && c.entry_type == entry_type)
            .map_or(0, |c| c.count)
    };

    // Pass 1: every pair the log removes without first introducing it must
    // have existed before the batch.
    let mut before: BTreeMap<Code, Vec<Entry>> = BTreeMap::new();
    let mut introduced: BTreeSet<(String, Code)> = BTreeSet::new();
    for op in operations {
        if let Some((word, code)) = op.removes() {
            let key = (word.to_string(), code.clone());
            if !introduced.contains(&key)
                && !before
                    .get(code)
                    .is_some_and(|bucket| bucket.iter().any(|e| e.word == word))
            {
                before.entry(code.clone()).or_default().push(Entry {
                    word: word.to_string(),
                    code: code.clone(),
                    entry_type: op.entry_type(),
                    weight: 0,
                    status: EntryStatus::Active,
                });
            }
        }
        if let Some((word, code)) = op.introduces() {
            introduced.insert((word.to_string(), code.clone()));
        }
    }

    // Pass 2: replay the log over the reconstructed before-state.
    let mut after = before.clone();
    let mut resolver = WeightResolver::new();
    for op in operations {
        if let Some((word, code)) = op.removes() {
            if let Some(bucket) = after.get_mut(code) {
                bucket.retain(|e| e.word != word);
            }
        }
        if let Some((word, code)) = op.introduces() {
            let removed_weight = before
                .get(code)
                .and_then(|bucket| {
                    op.removes()
                        .and_then(|(old, _)| bucket.iter().find(|e| e.word == old))
                })
                .map(|e| e.weight);
            let weight = match op {
                PendingOperation::Create { entry_type, .. } => op.explicit_weight().unwrap_or_else(
                    || resolver.next_weight(code, *entry_type, count_of(code, *entry_type)),
                ),
                _ => op
                    .explicit_weight()
                    .or(removed_weight)
                    .unwrap_or_else(|| op.entry_type().base_weight()),
            };
            after.entry(code.clone()).or_default().push(Entry {
                word: word.to_string(),
                code: code.clone(),
                entry_type: op.entry_type(),
                weight,
                status: EntryStatus::Active,
            });
        }
        resolver.record(op);
    }

    let renames = rename_pairs(operations, None);
    BatchDiff {
        groups: diff_groups(&before, &after, &renames),
        rejected: Vec::new(),
    }
}

// ============================================================================
// Diffing
// ============================================================================

fn rename_pairs(
    operations: &[PendingOperation],
    checks: Option<&[ConflictCheck]>,
) -> Vec<(Code, String, String)> {
    operations
        .iter()
        .enumerate()
        .filter(|(index, _)| {
            checks.map_or(true, |checks| !checks[*index].has_conflict)
        })
        .filter_map(|(_, op)| match op {
            PendingOperation::Change {
                old_word,
                word,
                code,
                ..
            } if old_word != word => Some((code.clone(), old_word.clone(), word.clone())),
            _ => None,
        })
        .collect()
}

fn diff_groups(
    before: &BTreeMap<Code, Vec<Entry>>,
    after: &BTreeMap<Code, Vec<Entry>>,
    renames: &[(Code, String, String)],
) -> Vec<CodeDiff> {
    let codes: BTreeSet<&Code> = before.keys().chain(after.keys()).collect();
    let mut groups = Vec::new();

    for code in codes {
        let empty = Vec::new();
        let before_bucket = before.get(code).unwrap_or(&empty);
        let after_bucket = after.get(code).unwrap_or(&empty);

        let mut added = Vec::new();
        let mut modified = Vec::new();
        for entry in after_bucket {
            match before_bucket.iter().find(|b| b.word == entry.word) {
                None => added.push(entry.clone()),
                Some(b) if b != entry => modified.push(ModifiedEntry {
                    before: b.clone(),
                    after: entry.clone(),
                }),
                Some(_) => {}
            }
        }
        let mut removed: Vec<Entry> = before_bucket
            .iter()
            .filter(|b| !after_bucket.iter().any(|a| a.word == b.word))
            .cloned()
            .collect();

        // Fold renames (Change old>new under one code) into modified rows.
        for (rename_code, old_word, new_word) in renames {
            if rename_code != code {
                continue;
            }
            let removed_at = removed.iter().position(|e| &e.word == old_word);
            let added_at = added.iter().position(|e| &e.word == new_word);
            if let (Some(removed_at), Some(added_at)) = (removed_at, added_at) {
                let before_entry = removed.remove(removed_at);
                let after_entry = added.remove(added_at);
                modified.push(ModifiedEntry {
                    before: before_entry,
                    after: after_entry,
                });
            }
        }

        if !(added.is_empty() && removed.is_empty() && modified.is_empty()) {
            groups.push(CodeDiff {
                code: code.clone(),
                added,
                removed,
                modified,
            });
        }
    }

    groups
}
