//! Detail Sync Controller
//!
//! Every selection issues a ticket stamped with a fresh generation; issuing a
//! new ticket cancels every earlier one. A response is applied only if its
//! ticket is still current (last issued wins, not last arrived).

use crate::client::TreeAccess;
use crate::error::ApiError;
use crate::types::{HouseId, Node, NodeDetail, NodeId};
use tracing::debug;

/// Cancellation token for one in-flight detail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    generation: u64,
    house: HouseId,
    node: Node,
}

impl DetailTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node.id
    }

    pub fn house(&self) -> &HouseId {
        &self.house
    }
}

/// Result of a detail fetch, still bound to the ticket that issued it.
#[derive(Debug)]
pub struct DetailResponse {
    pub ticket: DetailTicket,
    pub result: Result<NodeDetail, ApiError>,
}

#[derive(Debug, Default)]
pub struct DetailSync {
    generation: u64,
}

impl DetailSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket; any earlier ticket is cancelled from now on.
    pub fn issue(&mut self, house: HouseId, node: Node) -> DetailTicket {
        self.generation += 1;
        DetailTicket {
            generation: self.generation,
            house,
            node,
        }
    }

    /// Cancel whatever is in flight without issuing a replacement.
    pub fn cancel_all(&mut self) {
        self.generation += 1;
    }

    pub fn is_current(&self, ticket: &DetailTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Fetch authoritative detail for a ticket. Does not touch state.
    pub async fn fetch(client: &dyn TreeAccess, ticket: DetailTicket) -> DetailResponse {
        let result = if ticket.node.is_house() {
            // Houses have no node detail endpoint; the root listing is their preview.
            client
                .list_children(&ticket.house, None)
                .await
                .map(|children| NodeDetail {
                    node: Node {
                        child_count: children.len() as u32,
                        ..ticket.node.clone()
                    },
                    child_preview: children,
                })
        } else {
            client.get_node_detail(&ticket.house, &ticket.node.id).await
        };
        DetailResponse { ticket, result }
    }

    /// Returns the response if it may be applied, `None` if it is stale.
    pub fn accept(&self, response: DetailResponse) -> Option<DetailResponse> {
        if self.is_current(&response.ticket) {
            Some(response)
        } else {
            debug!(
                node = %response.ticket.node.id,
                generation = response.ticket.generation,
                current = self.generation,
                "Discarding stale detail response"
            );
            None
        }
    }
}
