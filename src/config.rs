//! Configuration System
//!
//! Layered configuration: built-in defaults, the user-level file, workspace
//! files and finally `STOWAGE_*` environment variables. Validation reports
//! every problem at once instead of stopping at the first.

use crate::logging::LoggingConfig;
use crate::navigation::ancestors::DEFAULT_MAX_DEPTH;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StowageConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub staging: StagingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote inventory service over HTTP
    #[default]
    Http,
    /// Local JSON forest file, loaded into memory and written back after moves
    Fixture,
}

/// Where the inventory tree lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Base URL of the inventory service (http backend)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Forest snapshot file (fixture backend)
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

fn default_token_env() -> String {
    "STOWAGE_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            base_url: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            fixture_path: None,
        }
    }
}

impl BackendConfig {
    /// Bearer token from the configured environment variable, if set.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        match self.kind {
            BackendKind::Http if self.base_url.as_deref().unwrap_or("").is_empty() => {
                Err("base_url is required for the http backend".to_string())
            }
            BackendKind::Fixture if self.fixture_path.is_none() => {
                Err("fixture_path is required for the fixture backend".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Bound on parent-pointer walks
    #[serde(default = "default_max_ancestor_depth")]
    pub max_ancestor_depth: usize,

    /// Entries requested for recent activity
    #[serde(default = "default_activity_limit")]
    pub activity_limit: usize,
}

fn default_max_ancestor_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_activity_limit() -> usize {
    20
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_ancestor_depth: default_max_ancestor_depth(),
            activity_limit: default_activity_limit(),
        }
    }
}

impl NavigationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_ancestor_depth == 0 {
            return Err("max_ancestor_depth must be greater than zero".to_string());
        }
        if self.activity_limit == 0 {
            return Err("activity_limit must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Sled directory for the staging buffer; per-user data dir when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl StagingConfig {
    pub fn resolve_store_path(&self) -> PathBuf {
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        ProjectDirs::from("", "", "stowage")
            .map(|dirs| dirs.data_dir().join("staging"))
            .unwrap_or_else(|| PathBuf::from(".stowage").join("staging"))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Backend(String),
    Navigation(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Backend(msg) => write!(f, "Backend: {}", msg),
            ValidationError::Navigation(msg) => write!(f, "Navigation: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl StowageConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if let Err(e) = self.backend.validate() {
            errors.push(ValidationError::Backend(e));
        }
        if let Err(e) = self.navigation.validate() {
            errors.push(ValidationError::Navigation(e));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
