//! In-process inventory forest.
//!
//! Backs the engine in tests and in the CLI `fixture` backend. The forest can be
//! loaded from and saved to a JSON snapshot, and supports fault injection for
//! transport failures, rejected moves and corrupted parent chains.

use crate::client::TreeAccess;
use crate::error::{ApiError, StorageError};
use crate::types::{HouseId, LogEntry, Node, NodeDetail, NodeId, NodeKind};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serializable form of one house tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseSnapshot {
    pub id: HouseId,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub activity: Vec<LogEntry>,
}

/// Serializable form of the whole forest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForestSnapshot {
    pub houses: Vec<HouseSnapshot>,
}

#[derive(Debug, Default)]
struct Faults {
    offline: bool,
    listings_offline: bool,
    failing_moves: HashSet<NodeId>,
}

pub struct MemoryTree {
    forest: RwLock<Vec<HouseSnapshot>>,
    faults: Mutex<Faults>,
    calls: AtomicUsize,
    log_seq: AtomicUsize,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::from_snapshot(ForestSnapshot::default())
    }

    pub fn from_snapshot(snapshot: ForestSnapshot) -> Self {
        let log_seq = snapshot.houses.iter().map(|h| h.activity.len()).sum();
        Self {
            forest: RwLock::new(snapshot.houses),
            faults: Mutex::new(Faults::default()),
            calls: AtomicUsize::new(0),
            log_seq: AtomicUsize::new(log_seq),
        }
    }

    pub fn load_json(path: &Path) -> Result<Self, StorageError> {
        let raw = std::fs::read(path)?;
        let snapshot: ForestSnapshot = serde_json::from_slice(&raw)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save_json(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(&self.snapshot())?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn snapshot(&self) -> ForestSnapshot {
        ForestSnapshot {
            houses: self.forest.read().clone(),
        }
    }

    pub fn add_house(&self, id: impl Into<HouseId>, name: impl Into<String>) -> HouseId {
        let id = id.into();
        self.forest.write().push(HouseSnapshot {
            id: id.clone(),
            name: name.into(),
            nodes: Vec::new(),
            activity: Vec::new(),
        });
        id
    }

    /// Insert a node. The parent must exist in the same house and accept children.
    pub fn add_node(&self, house: &HouseId, node: Node) -> Result<(), ApiError> {
        if node.is_house() {
            return Err(ApiError::InvalidOperation(
                "houses are added with add_house".to_string(),
            ));
        }
        let mut forest = self.forest.write();
        let tree = find_house_mut(&mut forest, house)?;
        if tree.nodes.iter().any(|n| n.id == node.id) {
            return Err(ApiError::InvalidOperation(format!(
                "node {} already exists in house {}",
                node.id, house
            )));
        }
        if let Some(parent_id) = &node.parent_id {
            let parent = tree
                .nodes
                .iter()
                .find(|n| &n.id == parent_id)
                .ok_or_else(|| ApiError::NotFound {
                    house: house.clone(),
                    node: parent_id.clone(),
                })?;
            if !parent.kind.can_contain() {
                return Err(ApiError::InvalidOperation(format!(
                    "{} cannot contain children",
                    parent.id
                )));
            }
        }
        tree.nodes.push(node);
        Ok(())
    }

    /// Delete a node and its subtree without going through the engine.
    pub fn remove_node(&self, house: &HouseId, node: &NodeId) -> Result<(), ApiError> {
        let mut forest = self.forest.write();
        let tree = find_house_mut(&mut forest, house)?;
        let doomed = subtree_ids(&tree.nodes, node);
        if doomed.is_empty() {
            return Err(ApiError::NotFound {
                house: house.clone(),
                node: node.clone(),
            });
        }
        tree.nodes.retain(|n| !doomed.contains(&n.id));
        Ok(())
    }

    /// Overwrite a parent pointer with no validation, e.g. to build a loop.
    pub fn set_parent_unchecked(&self, house: &HouseId, node: &NodeId, parent: Option<NodeId>) {
        let mut forest = self.forest.write();
        if let Ok(tree) = find_house_mut(&mut forest, house) {
            if let Some(n) = tree.nodes.iter_mut().find(|n| &n.id == node) {
                n.parent_id = parent;
            }
        }
    }

    /// Every call fails with a transport error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().offline = offline;
    }

    /// House and child listings fail with a transport error; detail and moves still work.
    pub fn set_listings_offline(&self, offline: bool) {
        self.faults.lock().listings_offline = offline;
    }

    /// Reject any move of `node` with a backend error.
    pub fn fail_moves_for(&self, node: impl Into<NodeId>) {
        self.faults.lock().failing_moves.insert(node.into());
    }

    /// Number of collaborator calls served so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Parent of `node`, or `None` when it sits at the house root or is unknown.
    pub fn parent_of(&self, house: &HouseId, node: &NodeId) -> Option<NodeId> {
        let forest = self.forest.read();
        let tree = forest.iter().find(|h| &h.id == house)?;
        tree.nodes
            .iter()
            .find(|n| &n.id == node)
            .and_then(|n| n.parent_id.clone())
    }

    fn enter(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().offline {
            return Err(ApiError::NetworkFailure(
                "memory backend is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn enter_listing(&self) -> Result<(), ApiError> {
        self.enter()?;
        if self.faults.lock().listings_offline {
            return Err(ApiError::NetworkFailure(
                "memory backend listings are offline".to_string(),
            ));
        }
        Ok(())
    }

    fn check_move_allowed(&self, node: &NodeId) -> Result<(), ApiError> {
        if self.faults.lock().failing_moves.contains(node) {
            return Err(ApiError::Backend(format!("move of {} rejected", node)));
        }
        Ok(())
    }

    fn log(&self, tree: &mut HouseSnapshot, node: &Node, action: &str) {
        let seq = self.log_seq.fetch_add(1, Ordering::SeqCst) + 1;
        tree.activity.push(LogEntry {
            id: format!("log-{}", seq),
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            action: action.to_string(),
            occurred_at: Utc::now(),
            actor: None,
        });
    }
}

fn find_house<'a>(forest: &'a [HouseSnapshot], house: &HouseId) -> Result<&'a HouseSnapshot, ApiError> {
    forest
        .iter()
        .find(|h| &h.id == house)
        .ok_or_else(|| ApiError::NotFound {
            house: house.clone(),
            node: NodeId::new(house.as_str()),
        })
}

fn find_house_mut<'a>(
    forest: &'a mut [HouseSnapshot],
    house: &HouseId,
) -> Result<&'a mut HouseSnapshot, ApiError> {
    forest
        .iter_mut()
        .find(|h| &h.id == house)
        .ok_or_else(|| ApiError::NotFound {
            house: house.clone(),
            node: NodeId::new(house.as_str()),
        })
}

fn with_child_count(nodes: &[Node], node: &Node) -> Node {
    let mut out = node.clone();
    out.child_count = if node.kind.can_contain() {
        nodes
            .iter()
            .filter(|n| n.parent_id.as_ref() == Some(&node.id))
            .count() as u32
    } else {
        0
    };
    out
}

fn children_of(nodes: &[Node], parent: Option<&NodeId>) -> Vec<Node> {
    nodes
        .iter()
        .filter(|n| n.parent_id.as_ref() == parent)
        .map(|n| with_child_count(nodes, n))
        .collect()
}

/// Ids of `root` and everything beneath it. Empty if `root` is unknown.
fn subtree_ids(nodes: &[Node], root: &NodeId) -> HashSet<NodeId> {
    let mut out = HashSet::new();
    if !nodes.iter().any(|n| &n.id == root) {
        return out;
    }
    let mut frontier = vec![root.clone()];
    while let Some(current) = frontier.pop() {
        if !out.insert(current.clone()) {
            continue;
        }
        frontier.extend(
            nodes
                .iter()
                .filter(|n| n.parent_id.as_ref() == Some(&current))
                .map(|n| n.id.clone()),
        );
    }
    out
}

fn validate_destination(
    tree: &HouseSnapshot,
    house: &HouseId,
    new_parent: Option<&NodeId>,
) -> Result<(), ApiError> {
    let Some(parent_id) = new_parent else {
        return Ok(());
    };
    let parent = tree
        .nodes
        .iter()
        .find(|n| &n.id == parent_id)
        .ok_or_else(|| ApiError::NotFound {
            house: house.clone(),
            node: parent_id.clone(),
        })?;
    if !parent.kind.can_contain() {
        return Err(ApiError::InvalidOperation(format!(
            "{} cannot contain children",
            parent.name
        )));
    }
    Ok(())
}

#[async_trait]
impl TreeAccess for MemoryTree {
    async fn list_houses(&self) -> Result<Vec<Node>, ApiError> {
        self.enter_listing()?;
        let forest = self.forest.read();
        Ok(forest
            .iter()
            .map(|h| {
                let roots = h.nodes.iter().filter(|n| n.parent_id.is_none()).count();
                Node::house(&h.id, h.name.clone(), roots as u32)
            })
            .collect())
    }

    async fn list_children(
        &self,
        house: &HouseId,
        parent_id: Option<&NodeId>,
    ) -> Result<Vec<Node>, ApiError> {
        self.enter_listing()?;
        let forest = self.forest.read();
        let tree = find_house(&forest, house)?;
        if let Some(parent) = parent_id {
            if !tree.nodes.iter().any(|n| &n.id == parent) {
                return Err(ApiError::NotFound {
                    house: house.clone(),
                    node: parent.clone(),
                });
            }
        }
        Ok(children_of(&tree.nodes, parent_id))
    }

    async fn get_node_detail(
        &self,
        house: &HouseId,
        node: &NodeId,
    ) -> Result<NodeDetail, ApiError> {
        self.enter()?;
        let forest = self.forest.read();
        let tree = find_house(&forest, house)?;
        let found = tree
            .nodes
            .iter()
            .find(|n| &n.id == node)
            .ok_or_else(|| ApiError::NotFound {
                house: house.clone(),
                node: node.clone(),
            })?;
        Ok(NodeDetail {
            node: with_child_count(&tree.nodes, found),
            child_preview: children_of(&tree.nodes, Some(node)),
        })
    }

    async fn reparent(
        &self,
        house: &HouseId,
        node: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<(), ApiError> {
        self.enter()?;
        self.check_move_allowed(node)?;
        let mut forest = self.forest.write();
        let tree = find_house_mut(&mut forest, house)?;
        let subtree = subtree_ids(&tree.nodes, node);
        if subtree.is_empty() {
            return Err(ApiError::NotFound {
                house: house.clone(),
                node: node.clone(),
            });
        }
        if let Some(parent) = new_parent {
            if subtree.contains(parent) {
                return Err(ApiError::InvalidOperation(format!(
                    "cannot move {} beneath itself",
                    node
                )));
            }
        }
        validate_destination(tree, house, new_parent)?;
        let mut moved = None;
        if let Some(n) = tree.nodes.iter_mut().find(|n| &n.id == node) {
            n.parent_id = new_parent.cloned();
            moved = Some(n.clone());
        }
        if let Some(moved) = moved {
            self.log(tree, &moved, "moved");
        }
        Ok(())
    }

    async fn move_across_house(
        &self,
        from_house: &HouseId,
        node: &NodeId,
        to_house: &HouseId,
        new_parent: Option<&NodeId>,
    ) -> Result<(), ApiError> {
        self.enter()?;
        self.check_move_allowed(node)?;
        if from_house == to_house {
            return Err(ApiError::InvalidOperation(
                "cross-house move within one house".to_string(),
            ));
        }
        let mut forest = self.forest.write();
        let source_index = forest
            .iter()
            .position(|h| &h.id == from_house)
            .ok_or_else(|| ApiError::NotFound {
                house: from_house.clone(),
                node: NodeId::new(from_house.as_str()),
            })?;
        let target_index = forest
            .iter()
            .position(|h| &h.id == to_house)
            .ok_or_else(|| ApiError::NotFound {
                house: to_house.clone(),
                node: NodeId::new(to_house.as_str()),
            })?;

        let subtree = subtree_ids(&forest[source_index].nodes, node);
        if subtree.is_empty() {
            return Err(ApiError::NotFound {
                house: from_house.clone(),
                node: node.clone(),
            });
        }
        validate_destination(&forest[target_index], to_house, new_parent)?;
        if forest[target_index]
            .nodes
            .iter()
            .any(|n| subtree.contains(&n.id))
        {
            return Err(ApiError::Backend(format!(
                "id collision moving {} into house {}",
                node, to_house
            )));
        }

        let (moving, staying): (Vec<Node>, Vec<Node>) = forest[source_index]
            .nodes
            .drain(..)
            .partition(|n| subtree.contains(&n.id));
        forest[source_index].nodes = staying;

        let mut root = None;
        let moving: Vec<Node> = moving
            .into_iter()
            .map(|mut n| {
                if &n.id == node {
                    n.parent_id = new_parent.cloned();
                    root = Some(n.clone());
                }
                n
            })
            .collect();
        forest[target_index].nodes.extend(moving);
        if let Some(root) = root {
            self.log(&mut forest[source_index], &root, "moved out");
            self.log(&mut forest[target_index], &root, "moved in");
        }
        Ok(())
    }

    async fn search_nodes(&self, house: &HouseId, query: &str) -> Result<Vec<Node>, ApiError> {
        self.enter()?;
        let forest = self.forest.read();
        let tree = find_house(&forest, house)?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(tree
            .nodes
            .iter()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .map(|n| with_child_count(&tree.nodes, n))
            .collect())
    }

    async fn list_recent_activity(
        &self,
        house: &HouseId,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ApiError> {
        self.enter()?;
        let forest = self.forest.read();
        let tree = find_house(&forest, house)?;
        Ok(tree.activity.iter().rev().take(limit).cloned().collect())
    }
}
