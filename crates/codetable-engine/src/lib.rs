//! Codetable batch conflict & weight resolution engine
//!
//! Given the persisted entry set and an ordered list of pending operations,
//! the engine decides per operation whether it is safe, what dynamic weight a
//! new entry receives, which alternate codes to suggest, and which operations
//! are only safe because a later operation in the same batch neutralizes
//! them:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      BATCH VALIDATION                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  operations ──► Snapshot (one bulk EntryStore::find)             │
//! │                     │                                            │
//! │                     ▼                                            │
//! │              Backward pass: working occupant view                │
//! │              (ops 0..i-1 folded in before evaluating i)          │
//! │                     │                                            │
//! │                     ▼                                            │
//! │              Classifier ──► Forward scan (i+1..end)              │
//! │               │    │         "resolved by operation N"          │
//! │               │    ▼                                             │
//! │               │  Weight resolver (base + occupancy arithmetic)   │
//! │               ▼                                                  │
//! │          Suggestion strategy (pluggable alternate codes)         │
//! │                     │                                            │
//! │                     ▼                                            │
//! │          ConflictCheck[] ──► dependencies / submit gate /        │
//! │                              preview diff / commit executor      │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is synchronous, stateless across calls, and never mutates
//! persisted state; results are recomputed on every call. Conflicts are
//! structured data, never exceptions — only infrastructure failures (store
//! unavailable) surface as [`EngineError`].

mod classify;
mod deps;
mod simulate;

pub mod apply;
pub mod preview;
pub mod suggest;
pub mod weight;

pub use apply::{apply_batch, ApplyError, ApplySummary};
pub use deps::build_dependencies;
pub use preview::{preview_executed, preview_pending, BatchDiff, CodeDiff, ModifiedEntry, RejectedOperation};
pub use suggest::{SuffixStrategy, SuggestStrategy};
pub use weight::WeightResolver;

use codetable_model::{Code, Entry, PendingOperation};
use codetable_storage::{EntryStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Impact texts (user-facing, mirrored in the platform UI)
// ============================================================================

/// Create where the exact (word, code) pair is already taken.
pub const IMPACT_PAIR_EXISTS: &str = "组合已存在";
/// Second or later identical Create inside one batch.
pub const IMPACT_BATCH_DUPLICATE: &str = "批次内重复";
/// Change/Delete whose referenced pair is absent from persisted state.
pub const IMPACT_MISSING: &str = "不存在";

// ============================================================================
// Results
// ============================================================================

/// Structured conflict taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Create where (word, code) already exists. Fatal.
    ExactDuplicate,
    /// Create where the code is occupied by a different word. Informational;
    /// duplicate codes are allowed.
    DuplicateCode,
    /// Change/Delete whose target pair does not exist in persisted state.
    /// Fatal unless a later operation introduces the pair.
    StaleReference,
    /// Repeated identical Create within the batch. Fatal, never downgraded.
    BatchDuplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    /// Relocate the existing occupant to another code.
    Move,
    /// Use an alternate code for the new word.
    Adjust,
    /// Nothing to do: a later operation in this batch neutralizes the
    /// conflict.
    Resolved,
    /// Withdraw the operation.
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub action: SuggestionAction,
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_code: Option<Code>,
    pub reason: String,
}

impl Suggestion {
    pub(crate) fn cancel(word: &str) -> Self {
        Self {
            action: SuggestionAction::Cancel,
            word: word.to_string(),
            to_code: None,
            reason: "建议取消该操作".to_string(),
        }
    }

    pub(crate) fn resolved(word: &str, op_index: usize) -> Self {
        Self {
            action: SuggestionAction::Resolved,
            word: word.to_string(),
            to_code: None,
            reason: format!("操作 {} 将解决该冲突", op_index + 1),
        }
    }
}

/// Per-operation validation result, same order as the input batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCheck {
    /// True only for fatal conflicts; informational duplicate-code results
    /// and in-batch-resolved results report false.
    pub has_conflict: bool,
    pub code: Code,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConflictKind>,
    /// Occupant visible at evaluation time, when one is involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_entry: Option<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    /// Index of the later operation that neutralizes this one, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<usize>,
    /// Present for every non-fatal Create: the weight the commit step will
    /// persist (explicit weight passed through, or resolved dynamically).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_weight: Option<i64>,
}

impl ConflictCheck {
    pub(crate) fn clean(code: Code, calculated_weight: Option<i64>) -> Self {
        Self {
            has_conflict: false,
            code,
            kind: None,
            current_entry: None,
            impact: None,
            suggestions: Vec::new(),
            resolved_by: None,
            calculated_weight,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.suggestions
            .iter()
            .any(|s| s.action == SuggestionAction::Resolved)
    }

    /// Whether this result blocks submission.
    pub fn is_blocking(&self) -> bool {
        self.has_conflict && !self.is_resolved()
    }
}

// ============================================================================
// Errors & gate
// ============================================================================

/// Infrastructure failure: aborts the whole validation call. Distinct from
/// the conflict taxonomy, which is ordinary result data.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("entry store failure: {0}")]
    Store(#[from] StoreError),
}

/// One conflict blocking submission, returned verbatim for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedConflict {
    pub index: usize,
    pub code: Code,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum SubmitRejection {
    #[error("batch has no operations")]
    EmptyBatch,
    #[error("batch has {} unresolved conflicts", .conflicts.len())]
    Unresolved { conflicts: Vec<UnresolvedConflict> },
}

/// Validate a batch with the default suggestion strategy.
///
/// One bulk read seeds the simulator; the backward and forward passes then
/// run entirely in memory. The result array has the same length and order as
/// the input.
pub fn check_batch<S: EntryStore + ?Sized>(
    store: &S,
    operations: &[PendingOperation],
) -> Result<Vec<ConflictCheck>, EngineError> {
    check_batch_with(store, operations, &SuffixStrategy::default())
}

/// Validate a batch with a caller-supplied suggestion strategy.
pub fn check_batch_with<S: EntryStore + ?Sized>(
    store: &S,
    operations: &[PendingOperation],
    strategy: &dyn SuggestStrategy,
) -> Result<Vec<ConflictCheck>, EngineError> {
    let snapshot = simulate::Snapshot::load(store, operations, strategy)?;
    let checks = classify::classify_batch(&snapshot, operations, strategy);
    tracing::debug!(
        operations = operations.len(),
        fatal = checks.iter().filter(|c| c.has_conflict).count(),
        "checked batch"
    );
    Ok(checks)
}

/// Submission gate: a batch is submittable iff it is non-empty and every
/// check either reports no conflict or carries a Resolved suggestion. On
/// rejection the unresolved subset is returned verbatim.
pub fn submit_gate(
    operations: &[PendingOperation],
    checks: &[ConflictCheck],
) -> Result<(), SubmitRejection> {
    if operations.is_empty() {
        return Err(SubmitRejection::EmptyBatch);
    }
    let conflicts: Vec<UnresolvedConflict> = checks
        .iter()
        .enumerate()
        .filter(|(_, check)| check.is_blocking())
        .map(|(index, check)| UnresolvedConflict {
            index,
            code: check.code.clone(),
            impact: check.impact.clone(),
            suggestions: check.suggestions.clone(),
        })
        .collect();
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(SubmitRejection::Unresolved { conflicts })
    }
}
