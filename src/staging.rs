//! Staging Buffer Manager
//!
//! A single, house-agnostic list of nodes marked for relocation. The manager is
//! shared by reference (`Arc`) with every navigation context; all mutation goes
//! through its API. Each mutation persists the full buffer first and only then
//! swaps the in-memory copy, so a failed write leaves the buffer unchanged.

pub mod store;

pub use store::{MemoryStagingStore, SledStagingStore, StagingStore};

use crate::error::ApiError;
use crate::types::{HouseId, Node, NodeId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// A staged node snapshot plus where it was staged from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedEntry {
    pub node: Node,
    pub origin_house_id: HouseId,
    pub origin_house_name: String,
    /// Breadcrumb of the node's parent chain at staging time
    pub origin_path_label: String,
    pub staged_at: DateTime<Utc>,
}

impl StagedEntry {
    pub fn new(node: Node, origin: StagingOrigin) -> Self {
        Self {
            node,
            origin_house_id: origin.house_id,
            origin_house_name: origin.house_name,
            origin_path_label: origin.path_label,
            staged_at: Utc::now(),
        }
    }

    pub fn is_same(&self, house: &HouseId, node: &NodeId) -> bool {
        &self.origin_house_id == house && &self.node.id == node
    }
}

/// Origin context captured when a node is staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingOrigin {
    pub house_id: HouseId,
    pub house_name: String,
    pub path_label: String,
}

pub struct StagingManager {
    entries: Mutex<Vec<StagedEntry>>,
    store: Arc<dyn StagingStore>,
    updates: watch::Sender<Vec<StagedEntry>>,
}

impl StagingManager {
    /// Load the persisted buffer from `store`.
    pub fn open(store: Arc<dyn StagingStore>) -> Result<Self, ApiError> {
        let entries = store.load()?;
        debug!(count = entries.len(), "Loaded staging buffer");
        let (updates, _) = watch::channel(entries.clone());
        Ok(Self {
            entries: Mutex::new(entries),
            store,
            updates,
        })
    }

    pub fn shared(store: Arc<dyn StagingStore>) -> Result<Arc<Self>, ApiError> {
        Ok(Arc::new(Self::open(store)?))
    }

    /// Buffer with a volatile store.
    pub fn in_memory() -> Arc<Self> {
        let (updates, _) = watch::channel(Vec::new());
        Arc::new(Self {
            entries: Mutex::new(Vec::new()),
            store: Arc::new(MemoryStagingStore::new()),
            updates,
        })
    }

    pub fn entries(&self) -> Vec<StagedEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<StagedEntry> {
        self.entries.lock().get(index).cloned()
    }

    pub fn contains(&self, house: &HouseId, node: &NodeId) -> bool {
        self.entries.lock().iter().any(|e| e.is_same(house, node))
    }

    /// Receive the full buffer after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<StagedEntry>> {
        self.updates.subscribe()
    }

    /// Append a node. Houses cannot be staged; a node is staged at most once.
    pub fn stage(&self, node: Node, origin: StagingOrigin) -> Result<StagedEntry, ApiError> {
        if node.is_house() {
            return Err(ApiError::InvalidOperation(format!(
                "house {} cannot be staged",
                node.name
            )));
        }
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.is_same(&origin.house_id, &node.id)) {
            return Err(ApiError::AlreadyStaged(node.id));
        }
        let entry = StagedEntry::new(node, origin);
        let mut next = entries.clone();
        next.push(entry.clone());
        self.commit(&mut entries, next)?;
        info!(
            node = %entry.node.id,
            house = %entry.origin_house_id,
            staged = entries.len(),
            "Staged node"
        );
        Ok(entry)
    }

    pub fn unstage(&self, index: usize) -> Result<StagedEntry, ApiError> {
        let mut entries = self.entries.lock();
        let len = entries.len();
        if index >= len {
            return Err(ApiError::IndexOutOfRange { index, len });
        }
        let mut next = entries.clone();
        let removed = next.remove(index);
        self.commit(&mut entries, next)?;
        debug!(node = %removed.node.id, "Unstaged node");
        Ok(removed)
    }

    /// Empty the buffer. Returns how many entries were dropped.
    pub fn clear(&self) -> Result<usize, ApiError> {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        self.commit(&mut entries, Vec::new())?;
        info!(dropped, "Cleared staging buffer");
        Ok(dropped)
    }

    /// Drop the given entries (matched by origin house and node id), keeping the rest in order.
    pub fn remove_entries(&self, done: &[StagedEntry]) -> Result<usize, ApiError> {
        let mut entries = self.entries.lock();
        let next: Vec<StagedEntry> = entries
            .iter()
            .filter(|e| !done.iter().any(|d| e.is_same(&d.origin_house_id, &d.node.id)))
            .cloned()
            .collect();
        let removed = entries.len() - next.len();
        if removed > 0 {
            self.commit(&mut entries, next)?;
        }
        Ok(removed)
    }

    fn commit(
        &self,
        current: &mut Vec<StagedEntry>,
        next: Vec<StagedEntry>,
    ) -> Result<(), ApiError> {
        self.store.save(&next)?;
        *current = next;
        self.updates.send_replace(current.clone());
        Ok(())
    }
}
