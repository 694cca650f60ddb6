//! Error types for the stowage navigation and relocation engine.

use crate::types::{HouseId, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Local storage errors (staging buffer persistence, fixture files)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Engine-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Node {node} no longer exists in house {house}")]
    NotFound { house: HouseId, node: NodeId },

    #[error("Ancestor walk from {node} exceeded depth {depth}; the parent chain loops")]
    CycleDetected { node: NodeId, depth: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Node {0} is already staged")]
    AlreadyStaged(NodeId),

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Stable classification of an [`ApiError`], used in status lines and
/// relocation failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    NotFound,
    CycleDetected,
    Invalid,
    Storage,
    Backend,
    Config,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NetworkFailure(_) => ErrorKind::Network,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::CycleDetected { .. } => ErrorKind::CycleDetected,
            ApiError::InvalidOperation(_)
            | ApiError::AlreadyStaged(_)
            | ApiError::IndexOutOfRange { .. } => ErrorKind::Invalid,
            ApiError::Backend(_) | ApiError::Unauthorized(_) => ErrorKind::Backend,
            ApiError::StorageError(_) => ErrorKind::Storage,
            ApiError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Whether re-issuing the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Backend)
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("sled: {}", err),
        ))
    }
}
