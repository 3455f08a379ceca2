//! Commit executor.
//!
//! Applies an Approved batch as one all-or-nothing transaction, in original
//! array order. Validation results are never trusted across the
//! validation→commit gap: the batch is re-checked against current persisted
//! state here, and the store re-checks uniqueness/existence again inside
//! `apply`. Create weights come from the same resolver the checker used, so
//! committed weights are bit-exact with what validation reported.

use crate::classify::classify_batch;
use crate::simulate::Snapshot;
use crate::suggest::SuffixStrategy;
use crate::{submit_gate, SubmitRejection};
use codetable_model::{Entry, PendingOperation};
use codetable_storage::{
    Batch, BatchId, BatchStatus, CodeTypeCount, EntryMutation, EntryStoreMut, StoreError,
};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("batch in status {status:?} cannot be applied")]
    NotApplicable { status: BatchStatus },

    #[error("batch has unresolved conflicts: {0}")]
    Conflicts(SubmitRejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplySummary {
    pub batch_id: BatchId,
    pub created: usize,
    pub changed: usize,
    pub deleted: usize,
}

/// Apply an Approved batch atomically. On success the batch is marked
/// Published and carries the occupant counts its weights were resolved
/// against (for executed-batch preview). On any failure the store is
/// untouched and the batch keeps its status.
pub fn apply_batch<S: EntryStoreMut + ?Sized>(
    store: &S,
    batch: &mut Batch,
) -> Result<ApplySummary, ApplyError> {
    if !batch.status.can_apply() {
        return Err(ApplyError::NotApplicable {
            status: batch.status,
        });
    }

    let strategy = SuffixStrategy::default();
    let snapshot = Snapshot::load(store, &batch.operations, &strategy)?;
    let checks = classify_batch(&snapshot, &batch.operations, &strategy);
    submit_gate(&batch.operations, &checks).map_err(ApplyError::Conflicts)?;

    // Occupant counts the weights were resolved against, recorded for
    // executed-batch preview.
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut counts = Vec::new();
    for op in &batch.operations {
        let key = (op.code().as_str().to_string(), op.entry_type().to_string());
        if seen.insert(key) {
            counts.push(CodeTypeCount {
                code: op.code().clone(),
                entry_type: op.entry_type(),
                count: snapshot.count(op.code(), op.entry_type()),
            });
        }
    }

    let mut summary = ApplySummary {
        batch_id: batch.id,
        created: 0,
        changed: 0,
        deleted: 0,
    };
    let mut mutations = Vec::with_capacity(batch.operations.len());
    for (op, check) in batch.operations.iter().zip(&checks) {
        match op {
            PendingOperation::Create {
                word,
                code,
                entry_type,
                ..
            } => {
                let weight = check
                    .calculated_weight
                    .expect("non-fatal create carries a calculated weight");
                mutations.push(EntryMutation::Insert {
                    entry: Entry::new(word.clone(), code.clone(), *entry_type, weight),
                });
                summary.created += 1;
            }
            PendingOperation::Change {
                old_word,
                word,
                code,
                entry_type,
                weight,
                ..
            } => {
                let weight = weight
                    .or_else(|| snapshot.pair(old_word, code).map(|e| e.weight))
                    .unwrap_or_else(|| entry_type.base_weight());
                mutations.push(EntryMutation::Replace {
                    word: old_word.clone(),
                    code: code.clone(),
                    entry: Entry::new(word.clone(), code.clone(), *entry_type, weight),
                });
                summary.changed += 1;
            }
            PendingOperation::Delete { word, code, .. } => {
                mutations.push(EntryMutation::Remove {
                    word: word.clone(),
                    code: code.clone(),
                });
                summary.deleted += 1;
            }
        }
    }

    // Single atomic application; a batch ordered against its dependency
    // edges fails here wholesale (the store refuses the stale mutation).
    store.apply(&mutations)?;

    batch.snapshot_counts = Some(counts);
    batch.set_status(BatchStatus::Published);
    tracing::info!(
        batch = %batch.id,
        created = summary.created,
        changed = summary.changed,
        deleted = summary.deleted,
        "applied batch"
    );
    Ok(summary)
}
