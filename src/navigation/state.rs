//! Navigation state: position, list views, selection and detail panel.

use crate::error::ErrorKind;
use crate::types::{HouseId, Node, NodeDetail, NodeId};
use serde::{Deserialize, Serialize};

/// Coarse state of the navigation machine, derived from the current position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavPhase {
    #[default]
    AtHouseList,
    AtHouseRoot,
    Drilled(usize),
}

/// Detail panel content for the selected node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailPanel {
    pub node: Node,
    pub child_preview: Vec<Node>,
    /// False while only list data is shown; true once the backend answered.
    pub authoritative: bool,
}

impl DetailPanel {
    pub fn optimistic(node: Node) -> Self {
        Self {
            node,
            child_preview: Vec::new(),
            authoritative: false,
        }
    }

    pub fn from_detail(detail: NodeDetail) -> Self {
        Self {
            node: detail.node,
            child_preview: detail.child_preview,
            authoritative: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    Info,
    Error,
}

/// User-visible status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub message: String,
    pub error_kind: Option<ErrorKind>,
    pub retryable: bool,
}

impl StatusLine {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            message: message.into(),
            error_kind: None,
            retryable: false,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            level: StatusLevel::Error,
            message: message.into(),
            error_kind: Some(kind),
            retryable,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

/// Where the user is and what the views show.
///
/// `path` and `path_names` always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub(crate) house: Option<Node>,
    pub(crate) path: Vec<NodeId>,
    pub(crate) path_names: Vec<String>,
    pub(crate) siblings: Vec<Node>,
    pub(crate) children: Vec<Node>,
    pub(crate) selected: Option<Node>,
    pub(crate) detail: Option<DetailPanel>,
}

impl NavigationState {
    pub fn phase(&self) -> NavPhase {
        match (&self.house, self.path.len()) {
            (None, _) => NavPhase::AtHouseList,
            (Some(_), 0) => NavPhase::AtHouseRoot,
            (Some(_), depth) => NavPhase::Drilled(depth),
        }
    }

    pub fn house(&self) -> Option<&Node> {
        self.house.as_ref()
    }

    pub fn house_id(&self) -> Option<HouseId> {
        self.house.as_ref().and_then(Node::house_id)
    }

    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn path_names(&self) -> &[String] {
        &self.path_names
    }

    pub fn siblings(&self) -> &[Node] {
        &self.siblings
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn selected(&self) -> Option<&Node> {
        self.selected.as_ref()
    }

    pub fn detail(&self) -> Option<&DetailPanel> {
        self.detail.as_ref()
    }

    /// Deepest path element, i.e. the container currently displayed.
    pub fn current_node_id(&self) -> Option<&NodeId> {
        self.path.last()
    }

    /// Parent of the current position (`None` = house root).
    pub fn parent_of_current(&self) -> Option<&NodeId> {
        match self.path.len() {
            0 | 1 => None,
            len => self.path.get(len - 2),
        }
    }

    /// Human-readable breadcrumb: house name followed by path names.
    pub fn breadcrumb(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.path_names.len() + 1);
        if let Some(house) = &self.house {
            parts.push(house.name.as_str());
        }
        parts.extend(self.path_names.iter().map(String::as_str));
        parts.join(" / ")
    }

    /// Look up a node among everything currently on screen.
    pub fn find_visible(&self, id: &NodeId) -> Option<&Node> {
        self.siblings
            .iter()
            .chain(self.children.iter())
            .find(|n| &n.id == id)
    }

    pub(crate) fn clear(&mut self) {
        *self = NavigationState::default();
    }

    pub(crate) fn truncate_path(&mut self, len: usize) {
        self.path.truncate(len);
        self.path_names.truncate(len);
    }

    pub(crate) fn push_segment(&mut self, node: &Node) {
        self.path.push(node.id.clone());
        self.path_names.push(node.name.clone());
    }

    pub(crate) fn replace_tail(&mut self, node: &Node) {
        match self.path.len() {
            0 => self.push_segment(node),
            len => {
                self.path[len - 1] = node.id.clone();
                self.path_names[len - 1] = node.name.clone();
            }
        }
    }

    pub(crate) fn set_path(&mut self, ids: Vec<NodeId>, names: Vec<String>) {
        debug_assert_eq!(ids.len(), names.len());
        self.path = ids;
        self.path_names = names;
    }
}

/// Read model published to subscribers after every committed transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub phase: NavPhase,
    pub state: NavigationState,
    pub houses: Vec<Node>,
    pub status: Option<StatusLine>,
    pub staged_count: usize,
}
