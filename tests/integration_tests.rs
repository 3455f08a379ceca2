//! Integration tests for the complete codetable pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - batch text → operations → conflict checks → submit gate
//! - FileStore → check → apply → changelog → executed preview
//!
//! Run with: cargo test --test integration_tests

use codetable_engine::{
    apply_batch, build_dependencies, check_batch, preview_executed, preview_pending, submit_gate,
};
use codetable_model::{batch_v1, Code, Entry, EntryType};
use codetable_storage::persistence::FileStore;
use codetable_storage::{Batch, BatchStatus, EntryStore};
use tempfile::tempdir;

fn code(s: &str) -> Code {
    Code::new(s).unwrap()
}

fn phrase(word: &str, c: &str, weight: i64) -> Entry {
    Entry::new(word, code(c), EntryType::Phrase, weight)
}

// ============================================================================
// Bot text → checker
// ============================================================================

#[test]
fn text_batch_flows_through_the_checker() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.seed([phrase("如果", "rjgl", 100)]).unwrap();

    let text = "\
# proposed by chat bot
+ 茹果 rjgl
- 如果 rjgl
";
    let operations = batch_v1::parse_batch_v1(text).unwrap();
    let checks = check_batch(&store, &operations).unwrap();

    assert_eq!(checks.len(), 2);
    assert!(!checks[0].has_conflict);
    assert_eq!(checks[0].resolved_by, Some(1));
    assert!(checks[0].impact.as_ref().unwrap().contains("操作 2"));
    assert!(!checks[1].has_conflict);

    assert!(submit_gate(&operations, &checks).is_ok());

    let edges = build_dependencies(&operations, &checks);
    assert_eq!(edges.len(), 1);
    assert_eq!((edges[0].dependent, edges[0].depends_on), (0, 1));
}

#[test]
fn malformed_text_batch_is_a_hard_error() {
    let err = batch_v1::parse_batch_v1("+ 好 rjgl\nnot an operation\n").unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

// ============================================================================
// Full lifecycle: draft → validate → apply → changelog → executed preview
// ============================================================================

#[test]
fn batch_lifecycle_end_to_end() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store
        .seed([
            phrase("一", "chain", 100),
            phrase("二", "chain", 101),
            phrase("三", "chain", 102),
        ])
        .unwrap();

    let operations = batch_v1::parse_batch_v1("- 一 chain\n~ 二>贰 chain\n+ 新 chain\n").unwrap();

    // Draft batches validate; the gate passes.
    let mut batch = Batch::new("chain rework", operations);
    batch.ensure_validatable().unwrap();
    let checks = check_batch(&store, &batch.operations).unwrap();
    assert!(checks.iter().all(|c| !c.has_conflict));
    assert_eq!(checks[2].calculated_weight, Some(103));
    submit_gate(&batch.operations, &checks).unwrap();
    batch.dependencies = build_dependencies(&batch.operations, &checks);

    // Pending preview against the live snapshot.
    let pending = preview_pending(&store, &batch.operations).unwrap();
    assert_eq!(pending.groups.len(), 1);
    assert!(pending.rejected.is_empty());

    // Submitted batches are frozen.
    batch.set_status(BatchStatus::Submitted);
    assert!(batch.ensure_validatable().is_err());

    // Approve and apply atomically.
    batch.set_status(BatchStatus::Approved);
    let summary = apply_batch(&store, &mut batch).unwrap();
    assert_eq!(
        (summary.created, summary.changed, summary.deleted),
        (1, 1, 1)
    );
    assert_eq!(batch.status, BatchStatus::Published);
    store.save_batch(&batch).unwrap();
    store.append_changelog(&batch).unwrap();

    // The committed weight is exactly what validation reported.
    let committed = store.find_one("新", &code("chain")).unwrap().unwrap();
    assert_eq!(committed.weight, 103);
    assert!(store.find_one("一", &code("chain")).unwrap().is_none());
    assert_eq!(
        store.find_one("贰", &code("chain")).unwrap().unwrap().weight,
        101
    );

    // Reload everything from disk: the executed batch replays from its log.
    let reopened = FileStore::open(dir.path()).unwrap();
    let stored = reopened.load_batch(batch.id).unwrap();
    assert!(stored.status.is_executed());
    let replay = preview_executed(&stored.operations, stored.snapshot_counts.as_deref().unwrap());
    let group = &replay.groups[0];
    assert_eq!(group.added[0].word, "新");
    assert_eq!(group.added[0].weight, 103);
    assert_eq!(group.removed[0].word, "一");
    assert_eq!(group.modified[0].after.word, "贰");

    let log = reopened.changelog().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].batch_id, batch.id);
    assert!(log[0].digest.starts_with("fnv1a64:"));
}

#[test]
fn stale_validation_cannot_corrupt_the_store() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.seed([phrase("如果", "rjgl", 100)]).unwrap();

    // Validated while "如果" still existed...
    let operations = batch_v1::parse_batch_v1("- 如果 rjgl\n").unwrap();
    let checks = check_batch(&store, &operations).unwrap();
    assert!(checks.iter().all(|c| !c.has_conflict));

    // ...but another batch removes it before this one is applied.
    let mut racing = Batch::new(
        "racing",
        batch_v1::parse_batch_v1("- 如果 rjgl\n").unwrap(),
    );
    racing.set_status(BatchStatus::Approved);
    apply_batch(&store, &mut racing).unwrap();

    // The commit step re-validates: the stale batch is refused, store intact.
    let mut stale = Batch::new("stale", operations);
    stale.set_status(BatchStatus::Approved);
    assert!(apply_batch(&store, &mut stale).is_err());
    assert!(store.entries().is_empty());
}
