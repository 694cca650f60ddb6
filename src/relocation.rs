//! Relocation Executor
//!
//! Drains staged entries into a destination. Each entry is moved on its own:
//! same-house entries are re-parented, entries from another house go through the
//! cross-house transfer. There is no cross-item atomicity; failures are collected
//! per entry and never stop the rest of the batch.

use crate::client::TreeAccess;
use crate::error::{ApiError, ErrorKind};
use crate::navigation::ancestors::{AncestorChain, AncestorResolver};
use crate::staging::StagedEntry;
use crate::types::{HouseId, NodeId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Resolved relocation target. `parent_id` of `None` is the house root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub house_id: HouseId,
    pub parent_id: Option<NodeId>,
    pub label: String,
}

impl Destination {
    pub fn house_root(house_id: HouseId, house_name: &str) -> Self {
        Self {
            house_id,
            parent_id: None,
            label: house_name.to_string(),
        }
    }

    pub fn container(house_id: HouseId, parent_id: NodeId, label: impl Into<String>) -> Self {
        Self {
            house_id,
            parent_id: Some(parent_id),
            label: label.into(),
        }
    }

    pub fn is_house_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationFailure {
    pub entry: StagedEntry,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Outcome of one relocation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationReport {
    pub destination: Destination,
    pub succeeded: Vec<StagedEntry>,
    pub failed: Vec<RelocationFailure>,
}

impl RelocationReport {
    fn new(destination: Destination) -> Self {
        Self {
            destination,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn failed_entries(&self) -> Vec<StagedEntry> {
        self.failed.iter().map(|f| f.entry.clone()).collect()
    }

    /// Some, but not all, entries failed.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.succeeded.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!(
                "Moved {} item(s) to {}",
                self.succeeded_count(),
                self.destination.label
            )
        } else {
            format!(
                "Moved {} item(s) to {}, {} failed",
                self.succeeded_count(),
                self.destination.label,
                self.failed_count()
            )
        }
    }

    fn record_failure(&mut self, entry: &StagedEntry, err: &ApiError) {
        warn!(
            node = %entry.node.id,
            origin = %entry.origin_house_id,
            error = %err,
            "Relocation of staged entry failed"
        );
        self.failed.push(RelocationFailure {
            entry: entry.clone(),
            kind: err.kind(),
            reason: err.to_string(),
        });
    }
}

pub struct RelocationExecutor<'a> {
    client: &'a dyn TreeAccess,
    resolver: AncestorResolver,
}

impl<'a> RelocationExecutor<'a> {
    pub fn new(client: &'a dyn TreeAccess, resolver: AncestorResolver) -> Self {
        Self { client, resolver }
    }

    /// Move every entry to `destination`.
    ///
    /// Returns `Err` only when the batch as a whole cannot proceed: the
    /// destination is missing or cannot hold children, or the transport failed
    /// for the destination check or for every attempted entry.
    pub async fn execute(
        &self,
        entries: &[StagedEntry],
        destination: &Destination,
    ) -> Result<RelocationReport, ApiError> {
        let destination_chain = self.check_destination(destination).await?;
        let mut report = RelocationReport::new(destination.clone());

        for entry in entries {
            match self.relocate(entry, destination, destination_chain.as_ref()).await {
                Ok(()) => {
                    info!(
                        node = %entry.node.id,
                        from = %entry.origin_house_id,
                        to = %destination.house_id,
                        parent = ?destination.parent_id,
                        "Relocated staged entry"
                    );
                    report.succeeded.push(entry.clone());
                }
                Err(err) => report.record_failure(entry, &err),
            }
        }

        let all_transport =
            !report.failed.is_empty() && report.failed.iter().all(|f| f.kind == ErrorKind::Network);
        if report.succeeded.is_empty() && all_transport {
            return Err(ApiError::NetworkFailure(format!(
                "all {} relocation(s) failed: {}",
                report.failed_count(),
                report.failed[0].reason
            )));
        }
        Ok(report)
    }

    async fn check_destination(
        &self,
        destination: &Destination,
    ) -> Result<Option<AncestorChain>, ApiError> {
        let Some(parent_id) = &destination.parent_id else {
            return Ok(None);
        };
        let chain = self
            .resolver
            .resolve(self.client, &destination.house_id, parent_id)
            .await?;
        if !chain.target.kind.can_contain() {
            return Err(ApiError::InvalidOperation(format!(
                "{} is an item and cannot hold other nodes",
                chain.target.name
            )));
        }
        Ok(Some(chain))
    }

    async fn relocate(
        &self,
        entry: &StagedEntry,
        destination: &Destination,
        destination_chain: Option<&AncestorChain>,
    ) -> Result<(), ApiError> {
        let node = &entry.node.id;
        if entry.origin_house_id == destination.house_id {
            if destination_chain.is_some_and(|chain| chain.contains(node)) {
                return Err(ApiError::InvalidOperation(format!(
                    "cannot move {} into itself or its own contents",
                    entry.node.name
                )));
            }
            self.client
                .reparent(&entry.origin_house_id, node, destination.parent_id.as_ref())
                .await
        } else {
            self.client
                .move_across_house(
                    &entry.origin_house_id,
                    node,
                    &destination.house_id,
                    destination.parent_id.as_ref(),
                )
                .await
        }
    }
}
