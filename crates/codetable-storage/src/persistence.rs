//! File-backed codebook store.
//!
//! Layout under the store root:
//!
//! - `codebook.json` — the full entry snapshot (versioned file schema),
//! - `batches/<id>.json` — one file per batch record,
//! - `changelog.json` — applied batches with snapshot digests.
//!
//! Writes go through a temp-file-then-rename so a crash mid-write never
//! leaves a half-written snapshot behind.

use crate::{
    Batch, BatchId, ChangeLogEntry, EntryMutation, EntryStore, EntryStoreMut, MemoryStore,
    StoreError,
};
use chrono::Utc;
use codetable_model::digest::snapshot_digest_v1;
use codetable_model::{Code, Entry, EntryType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CODEBOOK_FILE_VERSION_V1: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CodebookFileV1 {
    version: u32,
    entries: Vec<Entry>,
}

/// Codebook store persisted as JSON files.
pub struct FileStore {
    root: PathBuf,
    inner: MemoryStore,
    // Serializes snapshot writes; readers go through `inner` without touching
    // the filesystem.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or initialize) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("batches"))?;

        let inner = MemoryStore::new();
        let codebook_path = root.join("codebook.json");
        if codebook_path.exists() {
            let text = fs::read_to_string(&codebook_path)?;
            let file: CodebookFileV1 =
                serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                    path: codebook_path.clone(),
                    source,
                })?;
            inner.seed(file.entries)?;
        }

        tracing::debug!(root = %root.display(), entries = inner.len(), "opened file store");
        Ok(Self {
            root,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every persisted entry, sorted.
    pub fn entries(&self) -> Vec<Entry> {
        self.inner.all()
    }

    /// Seed initial entries and persist the snapshot.
    pub fn seed(&self, entries: impl IntoIterator<Item = Entry>) -> Result<(), StoreError> {
        self.inner.seed(entries)?;
        self.save()
    }

    /// Persist the current snapshot.
    pub fn save(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let bytes = self.snapshot_bytes()?;
        write_atomic(&self.root.join("codebook.json"), &bytes)?;
        Ok(())
    }

    fn snapshot_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let file = CodebookFileV1 {
            version: CODEBOOK_FILE_VERSION_V1,
            entries: self.inner.all(),
        };
        Ok(serde_json::to_vec_pretty(&file).expect("codebook snapshot serialization is infallible"))
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    fn batch_path(&self, id: BatchId) -> PathBuf {
        self.root.join("batches").join(format!("{id}.json"))
    }

    pub fn save_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(batch).expect("batch serialization is infallible");
        write_atomic(&self.batch_path(batch.id), &bytes)
    }

    pub fn load_batch(&self, id: BatchId) -> Result<Batch, StoreError> {
        let path = self.batch_path(id);
        if !path.exists() {
            return Err(StoreError::BatchNotFound(id));
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// All batch records, oldest first.
    pub fn list_batches(&self) -> Result<Vec<Batch>, StoreError> {
        let mut batches = Vec::new();
        for item in fs::read_dir(self.root.join("batches"))? {
            let path = item?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let text = fs::read_to_string(&path)?;
                let batch: Batch =
                    serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                batches.push(batch);
            }
        }
        batches.sort_by_key(|b| b.created_at);
        Ok(batches)
    }

    // ------------------------------------------------------------------
    // Changelog
    // ------------------------------------------------------------------

    fn changelog_path(&self) -> PathBuf {
        self.root.join("changelog.json")
    }

    pub fn changelog(&self) -> Result<Vec<ChangeLogEntry>, StoreError> {
        let path = self.changelog_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// Record an applied batch, with a digest of the snapshot it produced.
    pub fn append_changelog(&self, batch: &Batch) -> Result<ChangeLogEntry, StoreError> {
        let entry = ChangeLogEntry {
            id: Uuid::new_v4(),
            batch_id: batch.id,
            applied_at: Utc::now(),
            operations: batch.operations.len(),
            digest: snapshot_digest_v1(&self.snapshot_bytes()?),
        };
        let mut log = self.changelog()?;
        log.push(entry.clone());
        let bytes = serde_json::to_vec_pretty(&log).expect("changelog serialization is infallible");
        write_atomic(&self.changelog_path(), &bytes)?;
        tracing::info!(batch = %batch.id, digest = %entry.digest, "recorded applied batch");
        Ok(entry)
    }
}

impl EntryStore for FileStore {
    fn find(&self, codes: &[Code], types: Option<&[EntryType]>) -> Result<Vec<Entry>, StoreError> {
        self.inner.find(codes, types)
    }

    fn find_one(&self, word: &str, code: &Code) -> Result<Option<Entry>, StoreError> {
        self.inner.find_one(word, code)
    }
}

impl EntryStoreMut for FileStore {
    fn apply(&self, mutations: &[EntryMutation]) -> Result<(), StoreError> {
        self.inner.apply(mutations)?;
        self.save()
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
