//! End-to-end tests for the storage layer

use super::*;
use crate::persistence::FileStore;
use codetable_model::{Code, Entry, EntryType, PendingOperation};
use tempfile::tempdir;

fn code(s: &str) -> Code {
    Code::new(s).unwrap()
}

fn entry(word: &str, c: &str, weight: i64) -> Entry {
    Entry::new(word, code(c), EntryType::Phrase, weight)
}

#[test]
fn find_filters_by_code_and_type() {
    let store = MemoryStore::new();
    store
        .seed([
            entry("如果", "rjgl", 100),
            entry("茹果", "rjgl", 101),
            Entry::new("里", code("felk"), EntryType::Single, 10),
        ])
        .unwrap();

    let hits = store.find(&[code("rjgl")], None).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].word, "如果", "lower weight sorts first");

    let singles = store
        .find(&[code("rjgl"), code("felk")], Some(&[EntryType::Single]))
        .unwrap();
    assert_eq!(singles.len(), 1);
    assert_eq!(singles[0].word, "里");

    let none = store.find(&[code("zzzz")], None).unwrap();
    assert!(none.is_empty());
}

#[test]
fn find_one_is_exact_pair() {
    let store = MemoryStore::new();
    store.seed([entry("如果", "rjgl", 100)]).unwrap();

    assert!(store.find_one("如果", &code("rjgl")).unwrap().is_some());
    assert!(store.find_one("茹果", &code("rjgl")).unwrap().is_none());
    assert!(store.find_one("如果", &code("rjgk")).unwrap().is_none());
}

#[test]
fn seed_rejects_duplicate_pair() {
    let store = MemoryStore::new();
    let err = store
        .seed([entry("如果", "rjgl", 100), entry("如果", "rjgl", 101)])
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicatePair { .. }));
}

#[test]
fn apply_is_all_or_nothing() {
    let store = MemoryStore::new();
    store.seed([entry("如果", "rjgl", 100)]).unwrap();

    // Second mutation fails (missing pair): the first must not land either.
    let err = store
        .apply(&[
            EntryMutation::Insert {
                entry: entry("茹果", "rjgl", 101),
            },
            EntryMutation::Remove {
                word: "不存在的".to_string(),
                code: code("rjgl"),
            },
        ])
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingPair { .. }));
    assert_eq!(store.len(), 1);
    assert!(store.find_one("茹果", &code("rjgl")).unwrap().is_none());
}

#[test]
fn apply_checks_uniqueness_at_apply_time() {
    let store = MemoryStore::new();
    store.seed([entry("如果", "rjgl", 100)]).unwrap();

    let err = store
        .apply(&[EntryMutation::Insert {
            entry: entry("如果", "rjgl", 200),
        }])
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicatePair { .. }));
}

#[test]
fn replace_renames_within_a_code() {
    let store = MemoryStore::new();
    store.seed([entry("如果", "rjgl", 100)]).unwrap();

    store
        .apply(&[EntryMutation::Replace {
            word: "如果".to_string(),
            code: code("rjgl"),
            entry: entry("茹果", "rjgl", 100),
        }])
        .unwrap();

    assert!(store.find_one("如果", &code("rjgl")).unwrap().is_none());
    let renamed = store.find_one("茹果", &code("rjgl")).unwrap().unwrap();
    assert_eq!(renamed.weight, 100);
}

#[test]
fn batch_status_gating() {
    let ops = vec![PendingOperation::Create {
        word: "茹果".to_string(),
        code: code("rjgl"),
        entry_type: EntryType::Phrase,
        weight: None,
        remark: None,
    }];
    let mut batch = Batch::new("test", ops);

    assert!(batch.ensure_validatable().is_ok());
    assert!(batch.ensure_applicable().is_err());

    batch.set_status(BatchStatus::Submitted);
    assert!(matches!(
        batch.ensure_validatable().unwrap_err(),
        StoreError::NotEditable {
            status: BatchStatus::Submitted
        }
    ));

    batch.set_status(BatchStatus::Rejected);
    assert!(batch.ensure_validatable().is_ok());

    batch.set_status(BatchStatus::Approved);
    assert!(batch.ensure_applicable().is_ok());

    batch.set_status(BatchStatus::Published);
    assert!(batch.ensure_applicable().is_err());
    assert!(batch.status.is_executed());
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempdir().unwrap();

    {
        let store = FileStore::open(dir.path()).unwrap();
        store
            .seed([entry("如果", "rjgl", 100), entry("这里", "felk", 100)])
            .unwrap();
    }

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.entries().len(), 2);
    assert!(store.find_one("如果", &code("rjgl")).unwrap().is_some());
}

#[test]
fn file_store_round_trips_batches() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let batch = Batch::new(
        "first",
        vec![PendingOperation::Delete {
            word: "如果".to_string(),
            code: code("rjgl"),
            entry_type: EntryType::Phrase,
            remark: None,
        }],
    );
    store.save_batch(&batch).unwrap();

    let loaded = store.load_batch(batch.id).unwrap();
    assert_eq!(loaded.id, batch.id);
    assert_eq!(loaded.operations, batch.operations);
    assert_eq!(loaded.status, BatchStatus::Draft);

    let all = store.list_batches().unwrap();
    assert_eq!(all.len(), 1);

    let missing = store.load_batch(uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(missing, StoreError::BatchNotFound(_)));
}

#[test]
fn changelog_records_digest() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.seed([entry("如果", "rjgl", 100)]).unwrap();

    let batch = Batch::new("applied", Vec::new());
    let recorded = store.append_changelog(&batch).unwrap();
    assert!(recorded.digest.starts_with("fnv1a64:"));

    let log = store.changelog().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].batch_id, batch.id);
}
