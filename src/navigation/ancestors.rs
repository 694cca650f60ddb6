//! Ancestor Resolver
//!
//! Reconstructs a node's position in its house by walking parent pointers one
//! lookup at a time. The backend does not prevent parent cycles, so the walk is
//! bounded and reports `CycleDetected` instead of looping.

use crate::client::TreeAccess;
use crate::error::ApiError;
use crate::types::{HouseId, Node, NodeId};
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Root-to-leaf chain ending at (and including) the resolved node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorChain {
    pub ids: Vec<NodeId>,
    pub names: Vec<String>,
    /// The node the walk started from, as the backend reported it
    pub target: Node,
}

impl AncestorChain {
    pub fn depth(&self) -> usize {
        self.ids.len()
    }

    /// Chain without the target itself: the target's parent path.
    pub fn parent_path(&self) -> (Vec<NodeId>, Vec<String>) {
        let keep = self.ids.len().saturating_sub(1);
        (self.ids[..keep].to_vec(), self.names[..keep].to_vec())
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.ids.contains(node)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AncestorResolver {
    max_depth: usize,
}

impl Default for AncestorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl AncestorResolver {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Walk from `node` to the house root.
    ///
    /// Fails with `CycleDetected` when a node is revisited or the chain grows
    /// past the depth bound; either way the walk stops and nothing is truncated.
    pub async fn resolve(
        &self,
        client: &dyn TreeAccess,
        house: &HouseId,
        node: &NodeId,
    ) -> Result<AncestorChain, ApiError> {
        let target = client.get_node_detail(house, node).await?.node;
        let mut ids = vec![target.id.clone()];
        let mut names = vec![target.name.clone()];
        let mut seen: HashSet<NodeId> = HashSet::from([target.id.clone()]);
        let mut parent = target.parent_id.clone();

        while let Some(parent_id) = parent {
            if ids.len() >= self.max_depth || !seen.insert(parent_id.clone()) {
                warn!(
                    house = %house,
                    node = %node,
                    depth = ids.len(),
                    "Ancestor walk aborted: parent chain loops or exceeds bound"
                );
                return Err(ApiError::CycleDetected {
                    node: node.clone(),
                    depth: ids.len(),
                });
            }
            let ancestor = client.get_node_detail(house, &parent_id).await?.node;
            ids.push(ancestor.id.clone());
            names.push(ancestor.name.clone());
            parent = ancestor.parent_id.clone();
        }

        ids.reverse();
        names.reverse();
        debug!(house = %house, node = %node, depth = ids.len(), "Resolved ancestor chain");
        Ok(AncestorChain { ids, names, target })
    }
}
