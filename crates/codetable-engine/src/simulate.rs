//! Batch simulator: the occupant view the classifier reads.
//!
//! The snapshot is fetched once, for every code the batch (or any suggestion
//! candidate) touches, and never mutated. The working view starts as a copy
//! of the snapshot and folds in the net effect of operations 0..i-1 before
//! operation i is evaluated: Create adds, Delete/Change-away removes,
//! Change-into adds the new word. Operations classified fatal are excluded
//! from the working view — they will never commit, so they must not shadow
//! later classifications.

use crate::suggest::SuggestStrategy;
use codetable_model::{Code, Entry, EntryStatus, EntryType, PendingOperation};
use codetable_storage::{EntryStore, StoreError};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Persisted snapshot
// ============================================================================

pub(crate) struct Snapshot {
    by_code: BTreeMap<Code, Vec<Entry>>,
}

impl Snapshot {
    /// One bulk read covering every code referenced by the batch plus every
    /// alternate-code candidate the suggestion strategy could propose.
    pub fn load<S: EntryStore + ?Sized>(
        store: &S,
        operations: &[PendingOperation],
        strategy: &dyn SuggestStrategy,
    ) -> Result<Self, StoreError> {
        let mut codes: BTreeSet<Code> = BTreeSet::new();
        for op in operations {
            codes.insert(op.code().clone());
            if matches!(op, PendingOperation::Create { .. }) {
                codes.extend(strategy.candidates(op.code()));
            }
        }
        let codes: Vec<Code> = codes.into_iter().collect();
        let entries = store.find(&codes, None)?;
        tracing::debug!(codes = codes.len(), entries = entries.len(), "loaded snapshot");

        let mut by_code: BTreeMap<Code, Vec<Entry>> = BTreeMap::new();
        for entry in entries {
            by_code.entry(entry.code.clone()).or_default().push(entry);
        }
        for bucket in by_code.values_mut() {
            bucket.sort_by_key(|e| e.weight);
        }
        Ok(Self { by_code })
    }

    pub fn entries(&self, code: &Code) -> &[Entry] {
        self.by_code.get(code).map_or(&[], Vec::as_slice)
    }

    /// Exact-pair lookup against persisted state only.
    pub fn pair(&self, word: &str, code: &Code) -> Option<&Entry> {
        self.entries(code).iter().find(|e| e.word == word)
    }

    /// Persisted occupant count for a (code, type).
    pub fn count(&self, code: &Code, entry_type: EntryType) -> usize {
        self.entries(code)
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .count()
    }

    pub fn to_map(&self) -> BTreeMap<Code, Vec<Entry>> {
        self.by_code.clone()
    }
}

// ============================================================================
// Working view
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Occupant {
    pub entry: Entry,
    /// Index of the batch operation that introduced this occupant; None for
    /// persisted rows.
    pub origin: Option<usize>,
}

pub(crate) struct WorkingView {
    occupants: BTreeMap<Code, Vec<Occupant>>,
}

impl WorkingView {
    pub fn new(snapshot: &Snapshot) -> Self {
        let occupants = snapshot
            .by_code
            .iter()
            .map(|(code, entries)| {
                let occupants = entries
                    .iter()
                    .map(|entry| Occupant {
                        entry: entry.clone(),
                        origin: None,
                    })
                    .collect();
                (code.clone(), occupants)
            })
            .collect();
        Self { occupants }
    }

    pub fn occupants(&self, code: &Code) -> &[Occupant] {
        self.occupants.get(code).map_or(&[], Vec::as_slice)
    }

    pub fn pair(&self, word: &str, code: &Code) -> Option<&Occupant> {
        self.occupants(code).iter().find(|o| o.entry.word == word)
    }

    /// The occupant a duplicate-code conflict reports: lowest weight among
    /// occupants with a different word, earliest on ties.
    pub fn preferred_other(&self, code: &Code, word: &str) -> Option<&Occupant> {
        let mut best: Option<&Occupant> = None;
        for occupant in self.occupants(code) {
            if occupant.entry.word == word {
                continue;
            }
            if best.map_or(true, |b| occupant.entry.weight < b.entry.weight) {
                best = Some(occupant);
            }
        }
        best
    }

    pub fn is_occupied(&self, code: &Code) -> bool {
        !self.occupants(code).is_empty()
    }

    /// Fold a non-fatal operation into the view. `create_weight` is the
    /// resolved weight when the operation is a Create.
    pub fn apply(&mut self, index: usize, op: &PendingOperation, create_weight: Option<i64>) {
        let removed = op
            .removes()
            .and_then(|(word, code)| self.remove_pair(word, code));

        if let Some((word, code)) = op.introduces() {
            let weight = match op {
                PendingOperation::Create { .. } => create_weight
                    .unwrap_or_else(|| op.entry_type().base_weight()),
                _ => op
                    .explicit_weight()
                    .or(removed.as_ref().map(|o| o.entry.weight))
                    .unwrap_or_else(|| op.entry_type().base_weight()),
            };
            let entry = Entry {
                word: word.to_string(),
                code: code.clone(),
                entry_type: op.entry_type(),
                weight,
                status: EntryStatus::Active,
            };
            self.occupants
                .entry(code.clone())
                .or_default()
                .push(Occupant {
                    entry,
                    origin: Some(index),
                });
        }
    }

    fn remove_pair(&mut self, word: &str, code: &Code) -> Option<Occupant> {
        let bucket = self.occupants.get_mut(code)?;
        let pos = bucket.iter().position(|o| o.entry.word == word)?;
        Some(bucket.remove(pos))
    }

    pub fn into_map(self) -> BTreeMap<Code, Vec<Entry>> {
        self.occupants
            .into_iter()
            .map(|(code, occupants)| {
                (code, occupants.into_iter().map(|o| o.entry).collect())
            })
            .collect()
    }
}

// ============================================================================
// Forward scans
// ============================================================================

/// First operation after `index` that removes the exact (word, code) pair —
/// a Delete of it, or a Change renaming it away.
pub(crate) fn find_removal(
    operations: &[PendingOperation],
    index: usize,
    word: &str,
    code: &Code,
) -> Option<usize> {
    operations
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, op)| {
            op.removes()
                .map_or(false, |(w, c)| w == word && c == code)
        })
        .map(|(j, _)| j)
}

/// First operation after `index` that introduces the exact (word, code) pair
/// — a Create of it, or a Change renaming into it.
pub(crate) fn find_introduction(
    operations: &[PendingOperation],
    index: usize,
    word: &str,
    code: &Code,
) -> Option<usize> {
    operations
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, op)| {
            op.introduces()
                .map_or(false, |(w, c)| w == word && c == code)
        })
        .map(|(j, _)| j)
}
