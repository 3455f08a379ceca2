//! Codetable storage layer
//!
//! Provides the persistence seam between the conflict engine and whatever
//! actually holds the codebook:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    STORAGE LAYER                           │
//! ├────────────────────────────────────────────────────────────┤
//! │                                                            │
//! │  ┌──────────┐   EntryStore    ┌─────────────┐              │
//! │  │ Conflict │────────────────►│ MemoryStore │              │
//! │  │  Engine  │   (read-only)   │  (RwLock)   │              │
//! │  └──────────┘                 └──────┬──────┘              │
//! │       │                              │                     │
//! │       │ EntryStoreMut::apply         │ snapshot            │
//! │       ▼ (atomic, all-or-nothing)     ▼                     │
//! │  ┌──────────┐                 ┌─────────────┐              │
//! │  │  Batch   │                 │  FileStore  │              │
//! │  │ records  │                 │ (JSON +     │              │
//! │  │ + gating │                 │  changelog) │              │
//! │  └──────────┘                 └─────────────┘              │
//! │                                                            │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine only ever sees the [`EntryStore`] / [`EntryStoreMut`] traits, so
//! it can be unit-tested against [`MemoryStore`] without any files. Batches
//! live alongside the codebook as records with a status whose only job here
//! is gating: Draft/Rejected batches may be validated and edited, only
//! Approved batches may be applied. Review workflow itself is someone else's
//! problem.

pub mod persistence;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use codetable_model::{Code, DependencyEdge, Entry, EntryType, PendingOperation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a batch.
pub type BatchId = Uuid;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("entry pair already exists: {word}@{code}")]
    DuplicatePair { word: String, code: Code },

    #[error("entry pair not found: {word}@{code}")]
    MissingPair { word: String, code: Code },

    #[error("batch {0} not found")]
    BatchNotFound(BatchId),

    #[error("batch in status {status:?} cannot be validated or edited")]
    NotEditable { status: BatchStatus },

    #[error("batch in status {status:?} cannot be applied")]
    NotApplicable { status: BatchStatus },
}

// ============================================================================
// Store traits
// ============================================================================

/// Read access to the persisted entry set.
pub trait EntryStore {
    /// Bulk lookup by code set, optionally narrowed by type. The conflict
    /// engine calls this exactly once per validation, with every code the
    /// batch (and its suggestion candidates) touches.
    fn find(&self, codes: &[Code], types: Option<&[EntryType]>) -> Result<Vec<Entry>, StoreError>;

    /// Exact-pair lookup.
    fn find_one(&self, word: &str, code: &Code) -> Result<Option<Entry>, StoreError>;
}

/// One mutation of the entry set, produced by the commit executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryMutation {
    Insert { entry: Entry },
    Remove { word: String, code: Code },
    Replace { word: String, code: Code, entry: Entry },
}

/// Write access. `apply` is all-or-nothing: either every mutation lands or
/// the store is untouched, and uniqueness/existence are re-checked at apply
/// time regardless of what any earlier validation concluded.
pub trait EntryStoreMut: EntryStore {
    fn apply(&self, mutations: &[EntryMutation]) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory entry store, keyed by code. Doubles as the unit-test fake and
/// as the working set behind [`persistence::FileStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Code, Vec<Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with initial entries, enforcing (word, code) uniqueness.
    pub fn seed(&self, entries: impl IntoIterator<Item = Entry>) -> Result<(), StoreError> {
        let mut map = self.entries.write();
        for entry in entries {
            let bucket = map.entry(entry.code.clone()).or_default();
            if bucket.iter().any(|e| e.word == entry.word) {
                return Err(StoreError::DuplicatePair {
                    word: entry.word,
                    code: entry.code,
                });
            }
            bucket.push(entry);
        }
        Ok(())
    }

    /// Every entry, sorted by (code, weight, word) for stable output.
    pub fn all(&self) -> Vec<Entry> {
        let map = self.entries.read();
        let mut out: Vec<Entry> = map.values().flatten().cloned().collect();
        out.sort_by(|a, b| {
            (&a.code, a.weight, &a.word).cmp(&(&b.code, b.weight, &b.word))
        });
        out
    }

    pub fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply_to(
        map: &mut BTreeMap<Code, Vec<Entry>>,
        mutation: &EntryMutation,
    ) -> Result<(), StoreError> {
        match mutation {
            EntryMutation::Insert { entry } => {
                let bucket = map.entry(entry.code.clone()).or_default();
                if bucket.iter().any(|e| e.word == entry.word) {
                    return Err(StoreError::DuplicatePair {
                        word: entry.word.clone(),
                        code: entry.code.clone(),
                    });
                }
                bucket.push(entry.clone());
            }
            EntryMutation::Remove { word, code } => {
                Self::remove_pair(map, word, code)?;
            }
            EntryMutation::Replace { word, code, entry } => {
                Self::remove_pair(map, word, code)?;
                Self::apply_to(map, &EntryMutation::Insert {
                    entry: entry.clone(),
                })?;
            }
        }
        Ok(())
    }

    fn remove_pair(
        map: &mut BTreeMap<Code, Vec<Entry>>,
        word: &str,
        code: &Code,
    ) -> Result<(), StoreError> {
        let bucket = map.get_mut(code).ok_or_else(|| StoreError::MissingPair {
            word: word.to_string(),
            code: code.clone(),
        })?;
        let idx = bucket
            .iter()
            .position(|e| e.word == word)
            .ok_or_else(|| StoreError::MissingPair {
                word: word.to_string(),
                code: code.clone(),
            })?;
        bucket.remove(idx);
        if bucket.is_empty() {
            map.remove(code);
        }
        Ok(())
    }
}

impl EntryStore for MemoryStore {
    fn find(&self, codes: &[Code], types: Option<&[EntryType]>) -> Result<Vec<Entry>, StoreError> {
        let map = self.entries.read();
        let mut out = Vec::new();
        for code in codes {
            let Some(bucket) = map.get(code) else {
                continue;
            };
            for entry in bucket {
                if types.map_or(true, |tys| tys.contains(&entry.entry_type)) {
                    out.push(entry.clone());
                }
            }
        }
        out.sort_by(|a, b| {
            (&a.code, a.weight, &a.word).cmp(&(&b.code, b.weight, &b.word))
        });
        Ok(out)
    }

    fn find_one(&self, word: &str, code: &Code) -> Result<Option<Entry>, StoreError> {
        let map = self.entries.read();
        Ok(map
            .get(code)
            .and_then(|bucket| bucket.iter().find(|e| e.word == word))
            .cloned())
    }
}

impl EntryStoreMut for MemoryStore {
    fn apply(&self, mutations: &[EntryMutation]) -> Result<(), StoreError> {
        let mut map = self.entries.write();
        // Mutate a clone, swap on success: a failing mutation anywhere leaves
        // the store exactly as it was.
        let mut next = map.clone();
        for mutation in mutations {
            Self::apply_to(&mut next, mutation)?;
        }
        *map = next;
        tracing::debug!(mutations = mutations.len(), "applied entry mutations");
        Ok(())
    }
}

// ============================================================================
// Batches
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Draft,
    Submitted,
    Approved,
    Published,
    Rejected,
}

impl BatchStatus {
    /// Only Draft and Rejected batches may be validated or edited.
    pub const fn can_validate(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    pub const fn can_edit(self) -> bool {
        self.can_validate()
    }

    /// Only Approved batches may be applied.
    pub const fn can_apply(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Executed batches are previewed by replaying their stored operation
    /// log, never by re-simulating against the (since diverged) live state.
    pub const fn is_executed(self) -> bool {
        matches!(self, Self::Published)
    }
}

/// Persisted per-(code, type) occupant count, recorded on a batch when it is
/// applied so executed-batch previews can replay weights faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTypeCount {
    pub code: Code,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub count: usize,
}

/// An ordered, user-curated list of pending operations submitted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub name: String,
    pub status: BatchStatus,
    pub operations: Vec<PendingOperation>,
    /// Ordering edges recorded at validation time for display.
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    /// Occupant counts at apply time, for executed-batch preview fidelity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_counts: Option<Vec<CodeTypeCount>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn new(name: impl Into<String>, operations: Vec<PendingOperation>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: BatchStatus::Draft,
            operations,
            dependencies: Vec::new(),
            snapshot_counts: None,
            remark: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ensure_validatable(&self) -> Result<(), StoreError> {
        if self.status.can_validate() {
            Ok(())
        } else {
            Err(StoreError::NotEditable {
                status: self.status,
            })
        }
    }

    pub fn ensure_applicable(&self) -> Result<(), StoreError> {
        if self.status.can_apply() {
            Ok(())
        } else {
            Err(StoreError::NotApplicable {
                status: self.status,
            })
        }
    }

    pub fn set_status(&mut self, status: BatchStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Changelog
// ============================================================================

/// One applied batch, as recorded in the changelog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: Uuid,
    pub batch_id: BatchId,
    pub applied_at: DateTime<Utc>,
    pub operations: usize,
    /// Digest of the codebook snapshot after this batch landed.
    pub digest: String,
}
