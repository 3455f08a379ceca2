//! Property tests: the checker is a pure function of (snapshot, batch), and
//! weight accumulation behaves arithmetically.

use codetable_engine::check_batch;
use codetable_model::{Code, Entry, EntryType, PendingOperation};
use codetable_storage::MemoryStore;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn code(s: &str) -> Code {
    Code::new(s).unwrap()
}

fn create(word: String, c: &str) -> PendingOperation {
    PendingOperation::Create {
        word,
        code: code(c),
        entry_type: EntryType::Phrase,
        weight: None,
        remark: None,
    }
}

const WORDS: [&str; 5] = ["一", "二", "三", "四", "五"];
const CODES: [&str; 3] = ["ab", "cd", "abx"];

fn op_strategy() -> impl Strategy<Value = PendingOperation> {
    (
        0..3u8,
        prop::sample::select(WORDS.as_slice()),
        prop::sample::select(WORDS.as_slice()),
        prop::sample::select(CODES.as_slice()),
    )
        .prop_map(|(action, word, other, c)| match action {
            0 => PendingOperation::Create {
                word: word.to_string(),
                code: code(c),
                entry_type: EntryType::Phrase,
                weight: None,
                remark: None,
            },
            1 => PendingOperation::Delete {
                word: word.to_string(),
                code: code(c),
                entry_type: EntryType::Phrase,
                remark: None,
            },
            _ => PendingOperation::Change {
                old_word: word.to_string(),
                word: other.to_string(),
                code: code(c),
                entry_type: EntryType::Phrase,
                weight: None,
                remark: None,
            },
        })
}

fn seed_strategy() -> impl Strategy<Value = Vec<Entry>> {
    prop::collection::vec(
        (
            prop::sample::select(WORDS.as_slice()),
            prop::sample::select(CODES.as_slice()),
            0..50i64,
        ),
        0..6,
    )
    .prop_map(|rows| {
        let mut seen = BTreeSet::new();
        rows.into_iter()
            .filter(|(word, c, _)| seen.insert((*word, *c)))
            .map(|(word, c, weight)| {
                Entry::new(word, code(c), EntryType::Phrase, 100 + weight)
            })
            .collect()
    })
}

proptest! {
    /// Identical input + unchanged persisted state => identical results.
    #[test]
    fn checker_is_idempotent(
        seed in seed_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..10),
    ) {
        let store = MemoryStore::new();
        store.seed(seed).unwrap();

        let first = check_batch(&store, &ops).unwrap();
        let second = check_batch(&store, &ops).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), ops.len());
    }

    /// N consecutive creates on one (code, type) with no intervening delete
    /// climb strictly by 1 from base + existing count.
    #[test]
    fn create_weights_climb_by_one(
        existing in 0usize..5,
        fresh in 1usize..8,
    ) {
        let store = MemoryStore::new();
        store
            .seed((0..existing).map(|i| {
                Entry::new(
                    format!("旧{i}"),
                    code("run"),
                    EntryType::Phrase,
                    100 + i as i64,
                )
            }))
            .unwrap();

        let ops: Vec<PendingOperation> = (0..fresh)
            .map(|i| create(format!("新{i}"), "run"))
            .collect();
        let checks = check_batch(&store, &ops).unwrap();

        for (i, check) in checks.iter().enumerate() {
            prop_assert!(!check.has_conflict);
            prop_assert_eq!(
                check.calculated_weight,
                Some(EntryType::Phrase.base_weight() + (existing + i) as i64)
            );
        }
    }

    /// Deleting every persisted occupant first resets the next create to
    /// exactly the base weight.
    #[test]
    fn weight_resets_after_clearing_a_code(existing in 1usize..6) {
        let store = MemoryStore::new();
        store
            .seed((0..existing).map(|i| {
                Entry::new(
                    format!("旧{i}"),
                    code("rst"),
                    EntryType::Phrase,
                    100 + i as i64,
                )
            }))
            .unwrap();

        let mut ops: Vec<PendingOperation> = (0..existing)
            .map(|i| PendingOperation::Delete {
                word: format!("旧{i}"),
                code: code("rst"),
                entry_type: EntryType::Phrase,
                remark: None,
            })
            .collect();
        ops.push(create("新".to_string(), "rst"));

        let checks = check_batch(&store, &ops).unwrap();
        prop_assert!(checks.iter().all(|c| !c.has_conflict));
        prop_assert_eq!(
            checks.last().unwrap().calculated_weight,
            Some(EntryType::Phrase.base_weight())
        );
    }
}
