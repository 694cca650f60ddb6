//! Entry points for loading configuration.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::StowageConfig;
use crate::error::ApiError;
use config::{Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Sources, lowest precedence first: built-in defaults, the user-level file,
    /// `config/config.toml`, `config/{STOWAGE_ENV}.toml`, then environment
    /// variables such as `STOWAGE_BACKEND__BASE_URL`.
    pub fn load(workspace_root: &Path) -> Result<StowageConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(env_source()).build()?;
        let loaded: StowageConfig = config.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), backend = ?loaded.backend.kind, "Loaded configuration");
        Ok(loaded)
    }

    /// Load configuration from a single file; environment overrides still apply.
    pub fn load_from_file(path: &Path) -> Result<StowageConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(env_source())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Defaults only.
    pub fn default() -> StowageConfig {
        StowageConfig::default()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("STOWAGE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
