//! Navigation State Machine
//!
//! Owns the current house, path, sibling and child lists, and the selected
//! node with its detail panel. List fetches for a transition are issued
//! together and committed together: a failed fetch leaves every view at its
//! last good value and records a retryable status line instead of returning
//! an error. Methods return `Err` only when the requested transition is not
//! valid from the current state.

pub mod ancestors;
pub mod detail;
pub mod state;

pub use ancestors::{AncestorChain, AncestorResolver};
pub use detail::{DetailResponse, DetailSync, DetailTicket};
pub use state::{
    DetailPanel, NavPhase, NavigationSnapshot, NavigationState, StatusLevel, StatusLine,
};

use crate::client::TreeAccess;
use crate::config::NavigationConfig;
use crate::error::{ApiError, ErrorKind};
use crate::relocation::{Destination, RelocationExecutor, RelocationReport};
use crate::staging::{StagedEntry, StagingManager, StagingOrigin};
use crate::types::{HouseId, LogEntry, Node, NodeId};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Whether a transition was committed or failed on a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Failed,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// A navigation action that can be re-issued after a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    LoadHouses,
    EnterHouse(Node),
    DrillDown(Node),
    BreadcrumbJump(isize),
    SiblingDrill(Node),
    Teleport(NodeId),
    Refresh,
}

pub struct Navigator {
    client: Arc<dyn TreeAccess>,
    staging: Arc<StagingManager>,
    resolver: AncestorResolver,
    detail_sync: DetailSync,
    state: NavigationState,
    houses: Vec<Node>,
    status: Option<StatusLine>,
    failed_action: Option<NavAction>,
    activity_limit: usize,
    snapshots: watch::Sender<NavigationSnapshot>,
}

impl Navigator {
    pub fn new(client: Arc<dyn TreeAccess>, staging: Arc<StagingManager>) -> Self {
        Self::with_config(client, staging, &NavigationConfig::default())
    }

    pub fn with_config(
        client: Arc<dyn TreeAccess>,
        staging: Arc<StagingManager>,
        config: &NavigationConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(NavigationSnapshot {
            staged_count: staging.len(),
            ..NavigationSnapshot::default()
        });
        Self {
            client,
            staging,
            resolver: AncestorResolver::new(config.max_ancestor_depth),
            detail_sync: DetailSync::new(),
            state: NavigationState::default(),
            houses: Vec::new(),
            status: None,
            failed_action: None,
            activity_limit: config.activity_limit,
            snapshots,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn phase(&self) -> NavPhase {
        self.state.phase()
    }

    pub fn houses(&self) -> &[Node] {
        &self.houses
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn staging(&self) -> &Arc<StagingManager> {
        &self.staging
    }

    /// Action that failed last and can be re-issued with [`Navigator::retry`].
    pub fn failed_action(&self) -> Option<&NavAction> {
        self.failed_action.as_ref()
    }

    pub fn set_activity_limit(&mut self, limit: usize) {
        self.activity_limit = limit.max(1);
    }

    pub fn subscribe(&self) -> watch::Receiver<NavigationSnapshot> {
        self.snapshots.subscribe()
    }

    fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            phase: self.state.phase(),
            state: self.state.clone(),
            houses: self.houses.clone(),
            status: self.status.clone(),
            staged_count: self.staging.len(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn require_house(&self) -> Result<(Node, HouseId), ApiError> {
        match (self.state.house(), self.state.house_id()) {
            (Some(house), Some(id)) => Ok((house.clone(), id)),
            _ => Err(ApiError::InvalidOperation("no house entered".to_string())),
        }
    }

    fn fail(&mut self, action: NavAction, err: ApiError) -> Outcome {
        warn!(action = ?action, error = %err, "Navigation fetch failed; keeping previous views");
        let message = match &err {
            ApiError::NotFound { .. } => format!("{} (it may have been moved or deleted)", err),
            _ => err.to_string(),
        };
        self.status = Some(StatusLine::error(err.kind(), message, err.is_retryable()));
        self.failed_action = Some(action);
        self.publish();
        Outcome::Failed
    }

    fn succeed(&mut self) {
        self.failed_action = None;
        if self.status.as_ref().is_some_and(StatusLine::is_error) {
            self.status = None;
        }
        self.publish();
    }

    /// Fetch siblings and children for `path` in one go.
    async fn fetch_views(
        &self,
        house: &HouseId,
        path: &[NodeId],
    ) -> Result<(Vec<Node>, Vec<Node>), ApiError> {
        let client = self.client.as_ref();
        let children = client.list_children(house, path.last());
        if path.is_empty() {
            return Ok((Vec::new(), children.await?));
        }
        let parent = path.len().checked_sub(2).map(|i| &path[i]);
        let siblings = client.list_children(house, parent);
        futures::try_join!(siblings, children)
    }

    // --- detail -----------------------------------------------------------

    /// Select a node from already-loaded list data. No network call: the
    /// detail panel shows the list copy until the returned ticket's fetch is
    /// applied.
    pub fn select(&mut self, node: Node) -> Option<DetailTicket> {
        let house = node.house_id().or_else(|| self.state.house_id())?;
        self.state.selected = Some(node.clone());
        self.state.detail = Some(DetailPanel::optimistic(node.clone()));
        let ticket = self.detail_sync.issue(house, node);
        debug!(node = %ticket.node_id(), generation = ticket.generation(), "Selected node");
        self.publish();
        Some(ticket)
    }

    /// Issue the authoritative fetch for a ticket. Leaves state untouched.
    pub async fn fetch_detail(&self, ticket: DetailTicket) -> DetailResponse {
        DetailSync::fetch(self.client.as_ref(), ticket).await
    }

    /// Apply a detail response if its ticket is still current.
    /// Returns false when the response was stale and dropped.
    pub fn apply_detail(&mut self, response: DetailResponse) -> bool {
        let Some(response) = self.detail_sync.accept(response) else {
            return false;
        };
        match response.result {
            Ok(detail) => {
                self.state.selected = Some(detail.node.clone());
                self.state.detail = Some(DetailPanel::from_detail(detail));
            }
            Err(err @ ApiError::NotFound { .. }) => {
                let name = self
                    .state
                    .selected
                    .as_ref()
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| response.ticket.node_id().to_string());
                warn!(node = %response.ticket.node_id(), "Selected node no longer exists");
                self.state.selected = None;
                self.state.detail = None;
                self.status = Some(StatusLine::error(
                    err.kind(),
                    format!("{} no longer exists", name),
                    false,
                ));
            }
            Err(err) => {
                warn!(node = %response.ticket.node_id(), error = %err, "Detail fetch failed");
                self.status = Some(StatusLine::error(
                    err.kind(),
                    err.to_string(),
                    err.is_retryable(),
                ));
            }
        }
        self.publish();
        true
    }

    /// Select, fetch and apply in sequence.
    pub async fn sync_detail(&mut self, node: Node) -> bool {
        let Some(ticket) = self.select(node) else {
            return false;
        };
        let response = self.fetch_detail(ticket).await;
        self.apply_detail(response)
    }

    // --- house list -------------------------------------------------------

    pub async fn load_houses(&mut self) -> Outcome {
        match self.client.list_houses().await {
            Ok(houses) => {
                self.houses = houses;
                self.refresh_house_summary();
                self.succeed();
                Outcome::Applied
            }
            Err(err) => self.fail(NavAction::LoadHouses, err),
        }
    }

    fn refresh_house_summary(&mut self) {
        if let Some(current) = self.state.house.as_mut() {
            if let Some(fresh) = self.houses.iter().find(|h| h.id == current.id) {
                *current = fresh.clone();
            }
        }
    }

    /// Select a house on the house list without entering it.
    pub async fn select_house(&mut self, house: Node) -> Result<bool, ApiError> {
        if !house.is_house() {
            return Err(ApiError::InvalidOperation(format!(
                "{} is not a house",
                house.name
            )));
        }
        Ok(self.sync_detail(house).await)
    }

    pub async fn enter_house(&mut self, house: Node) -> Result<Outcome, ApiError> {
        let Some(house_id) = house.house_id() else {
            return Err(ApiError::InvalidOperation(format!(
                "{} is not a house",
                house.name
            )));
        };
        let children = match self.fetch_views(&house_id, &[]).await {
            Ok((_, children)) => children,
            Err(err) => return Ok(self.fail(NavAction::EnterHouse(house), err)),
        };
        self.detail_sync.cancel_all();
        self.state.clear();
        self.state.house = Some(house.clone());
        self.state.children = children;
        info!(house = %house_id, "Entered house");
        self.succeed();
        self.sync_detail(house).await;
        Ok(Outcome::Applied)
    }

    /// Back to the house list. Position and views are discarded.
    pub fn leave_house(&mut self) {
        self.detail_sync.cancel_all();
        self.state.clear();
        debug!("Left house");
        self.succeed();
    }

    // --- drilling ---------------------------------------------------------

    /// Descend one level into `node`, relative to the current position.
    pub async fn drill_down(&mut self, node: Node) -> Result<Outcome, ApiError> {
        let (_, house_id) = self.require_house()?;
        if !node.kind.can_contain() || node.is_house() {
            return Err(ApiError::InvalidOperation(format!(
                "cannot drill into {} {}",
                node.kind, node.name
            )));
        }
        if !self.state.children.iter().any(|n| n.id == node.id) {
            return Err(ApiError::InvalidOperation(format!(
                "{} is not a child of the current position",
                node.name
            )));
        }
        let mut path = self.state.path.clone();
        path.push(node.id.clone());
        let (siblings, children) = match self.fetch_views(&house_id, &path).await {
            Ok(views) => views,
            Err(err) => return Ok(self.fail(NavAction::DrillDown(node), err)),
        };
        let fresh = siblings
            .iter()
            .find(|n| n.id == node.id)
            .cloned()
            .unwrap_or(node);
        self.state.push_segment(&fresh);
        self.state.siblings = siblings;
        self.state.children = children;
        debug!(node = %fresh.id, depth = self.state.path.len(), "Drilled down");
        self.succeed();
        self.sync_detail(fresh).await;
        Ok(Outcome::Applied)
    }

    /// Truncate the path to `index + 1` elements; `-1` is the house root.
    pub async fn breadcrumb_jump(&mut self, index: isize) -> Result<Outcome, ApiError> {
        let (house, house_id) = self.require_house()?;
        let len = self.state.path.len();
        if index < -1 {
            return Err(ApiError::InvalidOperation(format!(
                "breadcrumb index {} is below -1",
                index
            )));
        }
        if index >= len as isize {
            return Err(ApiError::IndexOutOfRange {
                index: index as usize,
                len,
            });
        }
        let keep = (index + 1) as usize;
        let path = self.state.path[..keep].to_vec();
        let (siblings, children) = match self.fetch_views(&house_id, &path).await {
            Ok(views) => views,
            Err(err) => return Ok(self.fail(NavAction::BreadcrumbJump(index), err)),
        };
        self.state.truncate_path(keep);
        self.state.siblings = siblings;
        self.state.children = children;
        debug!(depth = keep, "Jumped to breadcrumb");
        self.succeed();

        let target = match path.last() {
            None => Some(house),
            Some(id) => self.state.siblings.iter().find(|n| &n.id == id).cloned(),
        };
        match target {
            Some(node) => {
                self.sync_detail(node).await;
            }
            None => {
                self.detail_sync.cancel_all();
                self.state.selected = None;
                self.state.detail = None;
                self.publish();
            }
        }
        Ok(Outcome::Applied)
    }

    /// One level up; at the house root this returns to the house list.
    pub async fn drill_up(&mut self) -> Result<Outcome, ApiError> {
        self.require_house()?;
        match self.state.path.len() {
            0 => {
                self.leave_house();
                Ok(Outcome::Applied)
            }
            len => self.breadcrumb_jump(len as isize - 2).await,
        }
    }

    /// Move laterally: replace the last path segment with a sibling.
    pub async fn sibling_drill(&mut self, node: Node) -> Result<Outcome, ApiError> {
        let (_, house_id) = self.require_house()?;
        if self.state.path.is_empty() {
            return Err(ApiError::InvalidOperation(
                "no siblings at the house root".to_string(),
            ));
        }
        if !self.state.siblings.iter().any(|n| n.id == node.id) {
            return Err(ApiError::InvalidOperation(format!(
                "{} is not a sibling of the current position",
                node.name
            )));
        }
        if !node.kind.can_contain() {
            return Err(ApiError::InvalidOperation(format!(
                "cannot drill into {} {}",
                node.kind, node.name
            )));
        }
        let children = match self.client.list_children(&house_id, Some(&node.id)).await {
            Ok(children) => children,
            Err(err) => return Ok(self.fail(NavAction::SiblingDrill(node), err)),
        };
        self.state.replace_tail(&node);
        self.state.children = children;
        debug!(node = %node.id, depth = self.state.path.len(), "Drilled into sibling");
        self.succeed();
        self.sync_detail(node).await;
        Ok(Outcome::Applied)
    }

    // --- teleport ---------------------------------------------------------

    /// Land directly on a node's position. Items are shown from their parent
    /// container and selected without joining the path.
    pub async fn teleport(&mut self, node_id: NodeId) -> Result<Outcome, ApiError> {
        let (_, house_id) = self.require_house()?;
        let chain = match self
            .resolver
            .resolve(self.client.as_ref(), &house_id, &node_id)
            .await
        {
            Ok(chain) => chain,
            Err(err) => return Ok(self.fail(NavAction::Teleport(node_id), err)),
        };
        let (ids, names) = if chain.target.is_item() {
            chain.parent_path()
        } else {
            (chain.ids.clone(), chain.names.clone())
        };
        let (siblings, children) = match self.fetch_views(&house_id, &ids).await {
            Ok(views) => views,
            Err(err) => return Ok(self.fail(NavAction::Teleport(node_id), err)),
        };
        self.state.set_path(ids, names);
        self.state.siblings = siblings;
        self.state.children = children;
        info!(node = %node_id, depth = self.state.path.len(), "Teleported");
        self.succeed();
        self.sync_detail(chain.target).await;
        Ok(Outcome::Applied)
    }

    pub async fn teleport_to_activity(&mut self, entry: &LogEntry) -> Result<Outcome, ApiError> {
        self.teleport(entry.node_id.clone()).await
    }

    /// Search the current house. Failures become a status line and an empty result.
    pub async fn search(&mut self, query: &str) -> Result<Vec<Node>, ApiError> {
        let (_, house_id) = self.require_house()?;
        match self.client.search_nodes(&house_id, query).await {
            Ok(nodes) => Ok(nodes),
            Err(err) => {
                warn!(query, error = %err, "Search failed");
                self.status = Some(StatusLine::error(
                    err.kind(),
                    err.to_string(),
                    err.is_retryable(),
                ));
                self.publish();
                Ok(Vec::new())
            }
        }
    }

    /// Recent activity of the current house. Failures become a status line and an empty result.
    pub async fn recent_activity(&mut self) -> Result<Vec<LogEntry>, ApiError> {
        let (_, house_id) = self.require_house()?;
        match self
            .client
            .list_recent_activity(&house_id, self.activity_limit)
            .await
        {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(error = %err, "Activity fetch failed");
                self.status = Some(StatusLine::error(
                    err.kind(),
                    err.to_string(),
                    err.is_retryable(),
                ));
                self.publish();
                Ok(Vec::new())
            }
        }
    }

    // --- refresh & retry --------------------------------------------------

    /// Re-fetch houses and the current views. The path is re-resolved from its
    /// deepest node so moves of path ancestors are reflected; if that node is
    /// gone the position falls back to the house root. The selection is kept
    /// by identity when it still exists.
    pub async fn refresh(&mut self) -> Outcome {
        let houses = match self.client.list_houses().await {
            Ok(houses) => houses,
            Err(err) => return self.fail(NavAction::Refresh, err),
        };
        let Ok((_, house_id)) = self.require_house() else {
            self.houses = houses;
            self.succeed();
            return Outcome::Applied;
        };

        let (ids, names, path_node) = match self.state.path.last().cloned() {
            None => (Vec::new(), Vec::new(), None),
            Some(current) => {
                match self
                    .resolver
                    .resolve(self.client.as_ref(), &house_id, &current)
                    .await
                {
                    Ok(chain) => (chain.ids, chain.names, Some(chain.target)),
                    Err(ApiError::NotFound { .. }) => {
                        warn!(node = %current, "Current position vanished; returning to house root");
                        (Vec::new(), Vec::new(), None)
                    }
                    Err(err) => return self.fail(NavAction::Refresh, err),
                }
            }
        };
        let (siblings, children) = match self.fetch_views(&house_id, &ids).await {
            Ok(views) => views,
            Err(err) => return self.fail(NavAction::Refresh, err),
        };

        self.houses = houses;
        self.refresh_house_summary();
        self.state.set_path(ids, names);
        self.state.siblings = siblings;
        self.state.children = children;
        self.succeed();

        let house = self.state.house.clone();
        let selection = self
            .state
            .selected
            .as_ref()
            .and_then(|sel| {
                if sel.is_house() {
                    house.clone().filter(|h| h.id == sel.id)
                } else {
                    self.state
                        .find_visible(&sel.id)
                        .cloned()
                        .or_else(|| path_node.clone().filter(|n| n.id == sel.id))
                }
            })
            .or(path_node)
            .or(house);
        if let Some(node) = selection {
            self.sync_detail(node).await;
        }
        Outcome::Applied
    }

    /// Re-issue the last failed action. Never called automatically.
    pub async fn retry(&mut self) -> Result<Outcome, ApiError> {
        let Some(action) = self.failed_action.take() else {
            return Err(ApiError::InvalidOperation("nothing to retry".to_string()));
        };
        debug!(action = ?action, "Retrying navigation action");
        match action {
            NavAction::LoadHouses => Ok(self.load_houses().await),
            NavAction::EnterHouse(house) => self.enter_house(house).await,
            NavAction::DrillDown(node) => self.drill_down(node).await,
            NavAction::BreadcrumbJump(index) => self.breadcrumb_jump(index).await,
            NavAction::SiblingDrill(node) => self.sibling_drill(node).await,
            NavAction::Teleport(node) => self.teleport(node).await,
            NavAction::Refresh => Ok(self.refresh().await),
        }
    }

    // --- staging ----------------------------------------------------------

    /// Stage a node from the current house. Staging the container the user is
    /// inside moves the view up one level first, so the views never show the
    /// contents of a withdrawn node.
    pub async fn stage(&mut self, node: &Node) -> Result<StagedEntry, ApiError> {
        let (house, house_id) = self.require_house()?;
        let is_current = self.state.current_node_id() == Some(&node.id);
        let in_parent_level = is_current || self.state.siblings.iter().any(|n| n.id == node.id);
        let depth = self.state.path_names.len();
        let parent_names = if in_parent_level {
            &self.state.path_names[..depth.saturating_sub(1)]
        } else {
            &self.state.path_names[..]
        };
        let mut label = vec![house.name.clone()];
        label.extend(parent_names.iter().cloned());

        let entry = self.staging.stage(
            node.clone(),
            StagingOrigin {
                house_id,
                house_name: house.name.clone(),
                path_label: label.join(" / "),
            },
        )?;
        if is_current && self.drill_up().await? == Outcome::Failed {
            // Still inside the staged folder; keep the fetch error visible.
            if let Some(status) = self.status.as_mut() {
                status.message = format!("Staged {}; {}", entry.node.name, status.message);
            }
            self.publish();
            return Ok(entry);
        }
        self.status = Some(StatusLine::info(format!("Staged {}", entry.node.name)));
        self.publish();
        Ok(entry)
    }

    pub async fn stage_selected(&mut self) -> Result<StagedEntry, ApiError> {
        let node = self
            .state
            .selected
            .clone()
            .ok_or_else(|| ApiError::InvalidOperation("nothing selected".to_string()))?;
        self.stage(&node).await
    }

    pub fn unstage(&mut self, index: usize) -> Result<StagedEntry, ApiError> {
        let entry = self.staging.unstage(index)?;
        self.publish();
        Ok(entry)
    }

    pub fn clear_staging(&mut self) -> Result<usize, ApiError> {
        let dropped = self.staging.clear()?;
        self.publish();
        Ok(dropped)
    }

    // --- relocation -------------------------------------------------------

    /// Destination implied by the current selection: a selected house means its
    /// root, a selected container means that container, otherwise the deepest
    /// path element (or the house root at the top). A selected item is refused.
    pub fn resolve_destination(&self) -> Result<Destination, ApiError> {
        if let Some(selected) = &self.state.selected {
            if let Some(house_id) = selected.house_id() {
                return Ok(Destination::house_root(house_id, &selected.name));
            }
            if selected.is_item() {
                return Err(ApiError::InvalidOperation(format!(
                    "{} is an item; select a house or container as destination",
                    selected.name
                )));
            }
        }
        let (house, house_id) = self.require_house().map_err(|_| {
            ApiError::InvalidOperation("select a house or container as destination".to_string())
        })?;
        if let Some(selected) = self.state.selected.as_ref().filter(|n| n.kind.can_contain()) {
            let label = if self.state.current_node_id() == Some(&selected.id) {
                self.state.breadcrumb()
            } else {
                format!("{} / {}", self.state.breadcrumb(), selected.name)
            };
            return Ok(Destination::container(house_id, selected.id.clone(), label));
        }
        match self.state.current_node_id() {
            Some(current) => Ok(Destination::container(
                house_id,
                current.clone(),
                self.state.breadcrumb(),
            )),
            None => Ok(Destination::house_root(house_id, &house.name)),
        }
    }

    pub async fn relocate_all(&mut self) -> Result<RelocationReport, ApiError> {
        let destination = self.resolve_destination()?;
        self.relocate_all_to(destination).await
    }

    pub async fn relocate_all_to(
        &mut self,
        destination: Destination,
    ) -> Result<RelocationReport, ApiError> {
        let entries = self.staging.entries();
        if entries.is_empty() {
            return Err(ApiError::InvalidOperation(
                "staging buffer is empty".to_string(),
            ));
        }
        self.run_relocation(entries, destination).await
    }

    pub async fn relocate_one(&mut self, index: usize) -> Result<RelocationReport, ApiError> {
        let destination = self.resolve_destination()?;
        self.relocate_one_to(index, destination).await
    }

    pub async fn relocate_one_to(
        &mut self,
        index: usize,
        destination: Destination,
    ) -> Result<RelocationReport, ApiError> {
        let entry = self.staging.get(index).ok_or(ApiError::IndexOutOfRange {
            index,
            len: self.staging.len(),
        })?;
        self.run_relocation(vec![entry], destination).await
    }

    async fn run_relocation(
        &mut self,
        entries: Vec<StagedEntry>,
        destination: Destination,
    ) -> Result<RelocationReport, ApiError> {
        let result = RelocationExecutor::new(self.client.as_ref(), self.resolver)
            .execute(&entries, &destination)
            .await;
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "Relocation batch failed");
                self.status = Some(StatusLine::error(
                    err.kind(),
                    err.to_string(),
                    err.is_retryable(),
                ));
                self.publish();
                return Err(err);
            }
        };
        self.staging.remove_entries(&report.succeeded)?;
        let refreshed = self.refresh().await;
        info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            destination = %destination.label,
            refreshed = refreshed == Outcome::Applied,
            "Relocation batch finished"
        );
        if refreshed == Outcome::Failed {
            // Views are stale; the refresh error stays retryable.
            if let Some(status) = self.status.as_mut() {
                status.message = format!(
                    "{}; views not refreshed: {}",
                    report.summary(),
                    status.message
                );
            }
        } else {
            self.status = Some(match report.failed.first() {
                None => StatusLine::info(report.summary()),
                Some(first) => StatusLine::error(first.kind, report.summary(), false),
            });
        }
        self.publish();
        Ok(report)
    }
}
