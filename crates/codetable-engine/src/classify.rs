//! Conflict classification.
//!
//! Operations are processed strictly in batch order. Existence checks read
//! the backward-accumulated occupant view (persisted snapshot + operations
//! 0..i-1); the forward scan over i+1..end is consulted for exactly one
//! purpose: downgrading a duplicate-code or stale-reference conflict to
//! "resolved by operation N". It never upgrades, and exact-duplicate /
//! batch-duplicate conflicts are never downgraded.

use crate::simulate::{find_introduction, find_removal, Snapshot, WorkingView};
use crate::suggest::{duplicate_code_suggestions, SuggestStrategy};
use crate::weight::WeightResolver;
use crate::{ConflictCheck, ConflictKind, Suggestion, IMPACT_BATCH_DUPLICATE, IMPACT_MISSING, IMPACT_PAIR_EXISTS};
use codetable_model::{Code, EntryType, PendingOperation};
use std::collections::HashMap;

pub(crate) fn classify_batch(
    snapshot: &Snapshot,
    operations: &[PendingOperation],
    strategy: &dyn SuggestStrategy,
) -> Vec<ConflictCheck> {
    let mut view = WorkingView::new(snapshot);
    let mut resolver = WeightResolver::new();
    // (word, code) of every Create already seen, regardless of its verdict.
    let mut seen_creates: HashMap<(String, Code), usize> = HashMap::new();
    let mut checks = Vec::with_capacity(operations.len());

    for (index, op) in operations.iter().enumerate() {
        let check = match op {
            PendingOperation::Create {
                word,
                code,
                entry_type,
                weight,
                ..
            } => classify_create(
                index,
                word,
                code,
                *entry_type,
                *weight,
                snapshot,
                &view,
                &resolver,
                &seen_creates,
                operations,
                strategy,
            ),
            PendingOperation::Change { old_word, code, .. } => {
                classify_reference(index, old_word, code, snapshot, operations)
            }
            PendingOperation::Delete { word, code, .. } => {
                classify_reference(index, word, code, snapshot, operations)
            }
        };

        if let PendingOperation::Create { word, code, .. } = op {
            seen_creates
                .entry((word.clone(), code.clone()))
                .or_insert(index);
        }
        // Fatal operations never commit, so they must not shadow later
        // classifications in the working view.
        if !check.has_conflict {
            view.apply(index, op, check.calculated_weight);
        }
        resolver.record(op);
        checks.push(check);
    }

    checks
}

#[allow(clippy::too_many_arguments)]
fn classify_create(
    index: usize,
    word: &str,
    code: &Code,
    entry_type: EntryType,
    explicit_weight: Option<i64>,
    snapshot: &Snapshot,
    view: &WorkingView,
    resolver: &WeightResolver,
    seen_creates: &HashMap<(String, Code), usize>,
    operations: &[PendingOperation],
    strategy: &dyn SuggestStrategy,
) -> ConflictCheck {
    // Batch-local duplicate takes precedence over everything and is never
    // downgraded by forward resolution.
    if seen_creates.contains_key(&(word.to_string(), code.clone())) {
        return ConflictCheck {
            has_conflict: true,
            code: code.clone(),
            kind: Some(ConflictKind::BatchDuplicate),
            current_entry: view.pair(word, code).map(|o| o.entry.clone()),
            impact: Some(IMPACT_BATCH_DUPLICATE.to_string()),
            suggestions: vec![Suggestion::cancel(word)],
            resolved_by: None,
            calculated_weight: None,
        };
    }

    // The exact pair is taken in the simulated state.
    if let Some(occupant) = view.pair(word, code) {
        return ConflictCheck {
            has_conflict: true,
            code: code.clone(),
            kind: Some(ConflictKind::ExactDuplicate),
            current_entry: Some(occupant.entry.clone()),
            impact: Some(IMPACT_PAIR_EXISTS.to_string()),
            suggestions: vec![Suggestion::cancel(word)],
            resolved_by: None,
            calculated_weight: None,
        };
    }

    let weight = explicit_weight
        .unwrap_or_else(|| resolver.next_weight(code, entry_type, snapshot.count(code, entry_type)));

    // Code occupied by a different word: allowed ("duplicate code"), but the
    // author gets told who is there and what their options are.
    if let Some(occupant) = view.preferred_other(code, word) {
        if let Some(resolver_op) = find_removal(operations, index, &occupant.entry.word, code) {
            return ConflictCheck {
                has_conflict: false,
                code: code.clone(),
                kind: Some(ConflictKind::DuplicateCode),
                current_entry: Some(occupant.entry.clone()),
                impact: Some(format!(
                    "编码 {code} 已被「{}」占用，操作 {} 将移除该词条",
                    occupant.entry.word,
                    resolver_op + 1
                )),
                suggestions: vec![Suggestion::resolved(&occupant.entry.word, resolver_op)],
                resolved_by: Some(resolver_op),
                calculated_weight: Some(weight),
            };
        }
        return ConflictCheck {
            has_conflict: false,
            code: code.clone(),
            kind: Some(ConflictKind::DuplicateCode),
            current_entry: Some(occupant.entry.clone()),
            impact: Some(format!(
                "编码 {code} 已被「{}」占用（允许重码）",
                occupant.entry.word
            )),
            suggestions: duplicate_code_suggestions(strategy, view, code, word, occupant),
            resolved_by: None,
            calculated_weight: Some(weight),
        };
    }

    ConflictCheck::clean(code.clone(), Some(weight))
}

/// Change/Delete both reduce to: does the referenced pair exist in persisted
/// state? Batch-local introductions from earlier operations are deliberately
/// NOT consulted — only the persisted snapshot resolves references.
fn classify_reference(
    index: usize,
    word: &str,
    code: &Code,
    snapshot: &Snapshot,
    operations: &[PendingOperation],
) -> ConflictCheck {
    if let Some(existing) = snapshot.pair(word, code) {
        return ConflictCheck {
            has_conflict: false,
            code: code.clone(),
            kind: None,
            current_entry: Some(existing.clone()),
            impact: None,
            suggestions: Vec::new(),
            resolved_by: None,
            calculated_weight: None,
        };
    }

    if let Some(resolver_op) = find_introduction(operations, index, word, code) {
        return ConflictCheck {
            has_conflict: false,
            code: code.clone(),
            kind: Some(ConflictKind::StaleReference),
            current_entry: None,
            impact: Some(format!(
                "「{word}」在编码 {code} 下{IMPACT_MISSING}，操作 {} 将补充该词条",
                resolver_op + 1
            )),
            suggestions: vec![Suggestion::resolved(word, resolver_op)],
            resolved_by: Some(resolver_op),
            calculated_weight: None,
        };
    }

    ConflictCheck {
        has_conflict: true,
        code: code.clone(),
        kind: Some(ConflictKind::StaleReference),
        current_entry: None,
        impact: Some(IMPACT_MISSING.to_string()),
        suggestions: vec![Suggestion::cancel(word)],
        resolved_by: None,
        calculated_weight: None,
    }
}
