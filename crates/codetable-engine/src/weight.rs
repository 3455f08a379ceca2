//! Dynamic weight resolution.
//!
//! A Create without an explicit weight lands at
//! `base_weight(type) + effective_count`, where the effective count is the
//! persisted occupant count of the (code, type) adjusted by the batch-local
//! operations before it: Delete subtracts one, Create and Change add one.
//! The commit executor replays the same arithmetic over the same operation
//! list, so the weight a validation reports is exactly the weight a commit
//! persists.

use codetable_model::{Code, EntryType, PendingOperation};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct WeightResolver {
    deletes: HashMap<(Code, EntryType), i64>,
    additions: HashMap<(Code, EntryType), i64>,
}

impl WeightResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight for a Create on (code, type) evaluated now, given the persisted
    /// occupant count. Operations already folded in via [`record`] shift the
    /// result; the Create itself must be recorded *after* calling this.
    ///
    /// [`record`]: Self::record
    pub fn next_weight(&self, code: &Code, entry_type: EntryType, persisted_count: usize) -> i64 {
        let key = (code.clone(), entry_type);
        let deletes = self.deletes.get(&key).copied().unwrap_or(0);
        let additions = self.additions.get(&key).copied().unwrap_or(0);
        entry_type.base_weight() + persisted_count as i64 - deletes + additions
    }

    /// Fold one operation into the running counts.
    pub fn record(&mut self, op: &PendingOperation) {
        let key = (op.code().clone(), op.entry_type());
        match op {
            PendingOperation::Delete { .. } => {
                *self.deletes.entry(key).or_insert(0) += 1;
            }
            PendingOperation::Create { .. } | PendingOperation::Change { .. } => {
                *self.additions.entry(key).or_insert(0) += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetable_model::Code;

    fn code(s: &str) -> Code {
        Code::new(s).unwrap()
    }

    fn create(word: &str, c: &str) -> PendingOperation {
        PendingOperation::Create {
            word: word.to_string(),
            code: code(c),
            entry_type: EntryType::Phrase,
            weight: None,
            remark: None,
        }
    }

    fn delete(word: &str, c: &str) -> PendingOperation {
        PendingOperation::Delete {
            word: word.to_string(),
            code: code(c),
            entry_type: EntryType::Phrase,
            remark: None,
        }
    }

    fn change(old: &str, new: &str, c: &str) -> PendingOperation {
        PendingOperation::Change {
            old_word: old.to_string(),
            word: new.to_string(),
            code: code(c),
            entry_type: EntryType::Phrase,
            weight: None,
            remark: None,
        }
    }

    #[test]
    fn first_create_lands_at_base_plus_count() {
        let resolver = WeightResolver::new();
        assert_eq!(resolver.next_weight(&code("felk"), EntryType::Phrase, 1), 101);
        assert_eq!(resolver.next_weight(&code("felk"), EntryType::Phrase, 0), 100);
        assert_eq!(resolver.next_weight(&code("felk"), EntryType::Single, 0), 10);
    }

    #[test]
    fn consecutive_creates_increase_by_one() {
        let mut resolver = WeightResolver::new();
        let mut weights = Vec::new();
        for i in 0..4 {
            weights.push(resolver.next_weight(&code("abc"), EntryType::Phrase, 2));
            resolver.record(&create(&format!("词{i}"), "abc"));
        }
        assert_eq!(weights, vec![102, 103, 104, 105]);
    }

    #[test]
    fn deleting_all_occupants_resets_to_base() {
        let mut resolver = WeightResolver::new();
        resolver.record(&delete("一", "abc"));
        resolver.record(&delete("二", "abc"));
        resolver.record(&delete("三", "abc"));
        assert_eq!(resolver.next_weight(&code("abc"), EntryType::Phrase, 3), 100);
    }

    #[test]
    fn delete_change_create_chain() {
        // Persisted: three phrase entries on "chain" (weights 100, 101, 102).
        let mut resolver = WeightResolver::new();
        resolver.record(&delete("一", "chain"));
        resolver.record(&change("二", "贰", "chain"));
        assert_eq!(
            resolver.next_weight(&code("chain"), EntryType::Phrase, 3),
            103
        );
    }

    #[test]
    fn counts_are_scoped_per_code_and_type() {
        let mut resolver = WeightResolver::new();
        resolver.record(&delete("一", "abc"));
        assert_eq!(resolver.next_weight(&code("abd"), EntryType::Phrase, 0), 100);
        assert_eq!(resolver.next_weight(&code("abc"), EntryType::Single, 0), 10);
        assert_eq!(resolver.next_weight(&code("abc"), EntryType::Phrase, 1), 100);
    }
}
