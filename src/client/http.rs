//! HTTP implementation of [`TreeAccess`] against the inventory REST backend.

use crate::client::TreeAccess;
use crate::error::ApiError;
use crate::types::{HouseId, LogEntry, Node, NodeDetail, NodeId, NodeKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ROOT_PARENT: &str = "root";

/// Container as the backend serializes it. Type codes are strings on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireNode {
    pub id: String,
    pub container_type: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_count: Option<u32>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

impl WireNode {
    pub fn into_node(self) -> Result<Node, ApiError> {
        let kind = NodeKind::from_code(&self.container_type).ok_or_else(|| {
            ApiError::Backend(format!(
                "Unknown container type '{}' for node {}",
                self.container_type, self.id
            ))
        })?;
        let is_item = kind == NodeKind::Item;
        Ok(Node {
            id: NodeId::new(self.id),
            kind,
            name: self.name,
            parent_id: self.parent_id.map(NodeId::new),
            child_count: if is_item { 0 } else { self.child_count.unwrap_or(0) },
            quantity: if is_item { self.quantity } else { None },
            owner_id: if is_item { self.owner_id } else { None },
            memo: if is_item { self.memo } else { None },
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireHouse {
    id: String,
    name: String,
    #[serde(default)]
    child_count: u32,
}

#[derive(Debug, Deserialize)]
struct WireDetail {
    container: WireNode,
    #[serde(default)]
    children: Vec<WireNode>,
}

#[derive(Debug, Deserialize)]
struct WireLogEntry {
    id: String,
    container_id: String,
    container_name: String,
    action: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    actor_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReparentBody<'a> {
    parent_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    to_house_id: &'a str,
    parent_id: Option<&'a str>,
}

fn into_nodes(wire: Vec<WireNode>) -> Result<Vec<Node>, ApiError> {
    wire.into_iter().map(WireNode::into_node).collect()
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_decode() {
        ApiError::Backend(format!("Failed to decode response: {}", error))
    } else if error.is_timeout() {
        ApiError::NetworkFailure(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::NetworkFailure(format!("Connection error: {}", error))
    } else {
        ApiError::NetworkFailure(format!("HTTP error: {}", error))
    }
}

/// REST client for the inventory backend.
///
/// The bearer credential is supplied by the caller; session handling lives elsewhere.
pub struct HttpTreeClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTreeClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        house: &HouseId,
        node: Option<&NodeId>,
    ) -> Result<Response, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(map_http_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(match status {
            StatusCode::NOT_FOUND => ApiError::NotFound {
                house: house.clone(),
                node: node
                    .cloned()
                    .unwrap_or_else(|| NodeId::new(house.as_str())),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(body),
            _ => ApiError::Backend(format!("Request failed with status {}: {}", status, body)),
        })
    }
}

#[async_trait]
impl TreeAccess for HttpTreeClient {
    async fn list_houses(&self) -> Result<Vec<Node>, ApiError> {
        let request = self.client.get(self.url("/houses"));
        let response = self
            .send(request, &HouseId::from("*"), None)
            .await?;
        let houses: Vec<WireHouse> = response.json().await.map_err(map_http_error)?;
        Ok(houses
            .into_iter()
            .map(|h| Node::house(&HouseId::new(h.id), h.name, h.child_count))
            .collect())
    }

    async fn list_children(
        &self,
        house: &HouseId,
        parent_id: Option<&NodeId>,
    ) -> Result<Vec<Node>, ApiError> {
        let parent = parent_id.map(NodeId::as_str).unwrap_or(ROOT_PARENT);
        debug!(house = %house, parent = parent, "GET children");
        let request = self
            .client
            .get(self.url(&format!("/houses/{}/containers", house)))
            .query(&[("parent_id", parent)]);
        let response = self.send(request, house, parent_id).await?;
        let wire: Vec<WireNode> = response.json().await.map_err(map_http_error)?;
        into_nodes(wire)
    }

    async fn get_node_detail(
        &self,
        house: &HouseId,
        node: &NodeId,
    ) -> Result<NodeDetail, ApiError> {
        debug!(house = %house, node = %node, "GET detail");
        let request = self
            .client
            .get(self.url(&format!("/houses/{}/containers/{}", house, node)));
        let response = self.send(request, house, Some(node)).await?;
        let wire: WireDetail = response.json().await.map_err(map_http_error)?;
        Ok(NodeDetail {
            node: wire.container.into_node()?,
            child_preview: into_nodes(wire.children)?,
        })
    }

    async fn reparent(
        &self,
        house: &HouseId,
        node: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .patch(self.url(&format!("/houses/{}/containers/{}/parent", house, node)))
            .json(&ReparentBody {
                parent_id: new_parent.map(NodeId::as_str),
            });
        self.send(request, house, Some(node)).await?;
        Ok(())
    }

    async fn move_across_house(
        &self,
        from_house: &HouseId,
        node: &NodeId,
        to_house: &HouseId,
        new_parent: Option<&NodeId>,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url(&format!(
                "/houses/{}/containers/{}/transfer",
                from_house, node
            )))
            .json(&TransferBody {
                to_house_id: to_house.as_str(),
                parent_id: new_parent.map(NodeId::as_str),
            });
        self.send(request, from_house, Some(node)).await?;
        Ok(())
    }

    async fn search_nodes(&self, house: &HouseId, query: &str) -> Result<Vec<Node>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/houses/{}/containers/search", house)))
            .query(&[("q", query)]);
        let response = self.send(request, house, None).await?;
        let wire: Vec<WireNode> = response.json().await.map_err(map_http_error)?;
        into_nodes(wire)
    }

    async fn list_recent_activity(
        &self,
        house: &HouseId,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/houses/{}/logs", house)))
            .query(&[("limit", limit)]);
        let response = self.send(request, house, None).await?;
        let wire: Vec<WireLogEntry> = response.json().await.map_err(map_http_error)?;
        Ok(wire
            .into_iter()
            .map(|e| LogEntry {
                id: e.id,
                node_id: NodeId::new(e.container_id),
                node_name: e.container_name,
                action: e.action,
                occurred_at: e.created_at,
                actor: e.actor_name,
            })
            .collect())
    }
}
