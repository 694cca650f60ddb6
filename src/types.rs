//! Core domain types: identifiers, node kinds and inventory nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque house identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseId(String);

/// Opaque node identifier, unique within a house
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(HouseId);
string_id!(NodeId);

/// Kind of an inventory node. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    House,
    Area,
    Box,
    Item,
}

impl NodeKind {
    /// Translate a backend type code. Only the client edge calls this.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "HOUSE" => Some(NodeKind::House),
            "AREA" => Some(NodeKind::Area),
            "BOX" => Some(NodeKind::Box),
            "ITEM" => Some(NodeKind::Item),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            NodeKind::House => "HOUSE",
            NodeKind::Area => "AREA",
            NodeKind::Box => "BOX",
            NodeKind::Item => "ITEM",
        }
    }

    /// Items never have children.
    pub fn can_contain(self) -> bool {
        !matches!(self, NodeKind::Item)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::House => "house",
            NodeKind::Area => "area",
            NodeKind::Box => "box",
            NodeKind::Item => "item",
        };
        f.write_str(label)
    }
}

/// One entry in an inventory tree.
///
/// The authoritative copy lives in the backend; values held by the engine are
/// read-through snapshots and may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    /// `None` for direct children of the house root and for houses themselves
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub child_count: u32,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

impl Node {
    /// A house summary, represented as a node of kind `House`.
    pub fn house(id: &HouseId, name: impl Into<String>, child_count: u32) -> Self {
        Self {
            id: NodeId::new(id.as_str()),
            kind: NodeKind::House,
            name: name.into(),
            parent_id: None,
            child_count,
            quantity: None,
            owner_id: None,
            memo: None,
        }
    }

    pub fn container(
        id: impl Into<NodeId>,
        kind: NodeKind,
        name: impl Into<String>,
        parent_id: Option<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            parent_id,
            child_count: 0,
            quantity: None,
            owner_id: None,
            memo: None,
        }
    }

    pub fn item(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        parent_id: Option<NodeId>,
        quantity: u32,
    ) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::container(id, NodeKind::Item, name, parent_id)
        }
    }

    pub fn is_house(&self) -> bool {
        self.kind == NodeKind::House
    }

    pub fn is_item(&self) -> bool {
        self.kind == NodeKind::Item
    }

    /// House identifier for a node of kind `House`.
    pub fn house_id(&self) -> Option<HouseId> {
        self.is_house().then(|| HouseId::new(self.id.as_str()))
    }
}

/// Authoritative detail for a node plus a shallow preview of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetail {
    pub node: Node,
    pub child_preview: Vec<Node>,
}

/// One entry of a house's recent-activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub node_id: NodeId,
    pub node_name: String,
    pub action: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub actor: Option<String>,
}
