//! Tree Access Client
//!
//! Collaborator contract for reading and mutating the remote inventory forest.
//! Implementations translate backend type codes into [`NodeKind`](crate::types::NodeKind)
//! at this edge; the rest of the engine only sees typed nodes.

use crate::error::ApiError;
use crate::types::{HouseId, LogEntry, Node, NodeDetail, NodeId};
use async_trait::async_trait;

pub mod http;
pub mod memory;

pub use http::HttpTreeClient;
pub use memory::MemoryTree;

/// Inventory backend interface
#[async_trait]
pub trait TreeAccess: Send + Sync {
    /// List every house visible to the caller, as `House` nodes with child counts.
    async fn list_houses(&self) -> Result<Vec<Node>, ApiError>;

    /// Ordered direct children of `parent_id`, or of the house root when `None`.
    async fn list_children(
        &self,
        house: &HouseId,
        parent_id: Option<&NodeId>,
    ) -> Result<Vec<Node>, ApiError>;

    /// Full detail for one node plus a shallow preview of its children.
    async fn get_node_detail(&self, house: &HouseId, node: &NodeId)
        -> Result<NodeDetail, ApiError>;

    /// Same-house move. `new_parent` of `None` means the house root.
    async fn reparent(
        &self,
        house: &HouseId,
        node: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<(), ApiError>;

    /// Transfer a node (and its subtree) into another house's tree.
    async fn move_across_house(
        &self,
        from_house: &HouseId,
        node: &NodeId,
        to_house: &HouseId,
        new_parent: Option<&NodeId>,
    ) -> Result<(), ApiError>;

    async fn search_nodes(&self, house: &HouseId, query: &str) -> Result<Vec<Node>, ApiError>;

    async fn list_recent_activity(
        &self,
        house: &HouseId,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ApiError>;
}
