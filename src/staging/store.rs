//! Durable storage for the staging buffer.
//!
//! The whole buffer lives under one global key; every save replaces it.

use crate::error::StorageError;
use crate::staging::StagedEntry;
use parking_lot::Mutex;
use sled::{Db, Tree};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

const TREE_STAGING: &str = "staging";
const STAGING_KEY: &[u8] = b"staging_buffer";

pub trait StagingStore: Send + Sync {
    fn load(&self) -> Result<Vec<StagedEntry>, StorageError>;
    fn save(&self, entries: &[StagedEntry]) -> Result<(), StorageError>;
}

/// Sled-backed staging store
#[derive(Clone)]
pub struct SledStagingStore {
    db: Db,
    tree: Tree,
}

impl SledStagingStore {
    /// Open (or create) a sled database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_STAGING)?;
        Ok(Self { db, tree })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.tree.flush()?;
        Ok(())
    }
}

impl StagingStore for SledStagingStore {
    fn load(&self) -> Result<Vec<StagedEntry>, StorageError> {
        let Some(raw) = self.tree.get(STAGING_KEY)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    fn save(&self, entries: &[StagedEntry]) -> Result<(), StorageError> {
        let value = serde_json::to_vec(entries)?;
        self.tree.insert(STAGING_KEY, value)?;
        self.tree.flush()?;
        Ok(())
    }
}

/// Volatile staging store, optionally failing writes.
#[derive(Default)]
pub struct MemoryStagingStore {
    entries: Mutex<Vec<StagedEntry>>,
    fail_writes: AtomicBool,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl StagingStore for MemoryStagingStore {
    fn load(&self) -> Result<Vec<StagedEntry>, StorageError> {
        Ok(self.entries.lock().clone())
    }

    fn save(&self, entries: &[StagedEntry]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "staging store is read-only",
            )));
        }
        *self.entries.lock() = entries.to_vec();
        Ok(())
    }
}
