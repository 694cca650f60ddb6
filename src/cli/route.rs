//! CLI route: single route table and run context. Dispatches to the navigator and presentation.

use crate::cli::help::{command_name, is_mutating};
use crate::cli::parse::{Commands, StageCommands};
use crate::cli::presentation;
use crate::client::{HttpTreeClient, MemoryTree, TreeAccess};
use crate::config::{BackendKind, ConfigLoader, StowageConfig};
use crate::error::{ApiError, ErrorKind, StorageError};
use crate::navigation::{Navigator, Outcome};
use crate::relocation::Destination;
use crate::staging::{SledStagingStore, StagingManager};
use crate::types::{Node, NodeId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Backend handle kept alongside the trait object so fixture changes can be written back.
enum Backend {
    Remote,
    Fixture { tree: Arc<MemoryTree>, path: PathBuf },
}

/// Runtime context for CLI execution: config, backend, staging buffer and navigator.
pub struct RunContext {
    runtime: tokio::runtime::Runtime,
    session: Session,
}

struct Session {
    config: StowageConfig,
    backend: Backend,
    navigator: Navigator,
    house: Option<String>,
    assume_yes: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        house: Option<String>,
    ) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        config.validate().map_err(|errors| {
            ApiError::ConfigError(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let (client, backend): (Arc<dyn TreeAccess>, Backend) = match config.backend.kind {
            BackendKind::Http => {
                let base_url = config.backend.base_url.clone().unwrap_or_default();
                let client = HttpTreeClient::new(
                    base_url,
                    config.backend.token(),
                    Duration::from_secs(config.backend.timeout_secs),
                )?;
                let client: Arc<dyn TreeAccess> = Arc::new(client);
                (client, Backend::Remote)
            }
            BackendKind::Fixture => {
                let path = config.backend.fixture_path.clone().unwrap_or_default();
                let path = if path.is_relative() {
                    workspace_root.join(path)
                } else {
                    path
                };
                let tree = Arc::new(MemoryTree::load_json(&path)?);
                let client: Arc<dyn TreeAccess> = tree.clone();
                (client, Backend::Fixture { tree, path })
            }
        };

        let store_path = config.staging.resolve_store_path();
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let staging = StagingManager::shared(Arc::new(SledStagingStore::open(&store_path)?))?;
        debug!(store = %store_path.display(), staged = staging.len(), "Opened staging buffer");

        let mut context = Self::with_backend(config, client, staging, house)?;
        context.session.backend = backend;
        Ok(context)
    }

    /// Build a context over an existing backend and staging buffer.
    pub fn with_backend(
        config: StowageConfig,
        client: Arc<dyn TreeAccess>,
        staging: Arc<StagingManager>,
        house: Option<String>,
    ) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;
        let navigator = Navigator::with_config(client, staging, &config.navigation);
        Ok(Self {
            runtime,
            session: Session {
                config,
                backend: Backend::Remote,
                navigator,
                house,
                assume_yes: false,
            },
        })
    }

    /// Answer yes to every confirmation prompt.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.session.assume_yes = yes;
        self
    }

    pub fn navigator(&self) -> &Navigator {
        &self.session.navigator
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        let result = self.runtime.block_on(self.session.execute(command));
        if result.is_ok() && is_mutating(command) {
            self.session.persist_backend()?;
        }
        info!(
            command = %name,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }
}

impl Session {
    async fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Houses { format } => {
                self.load_houses().await?;
                presentation::format_houses(self.navigator.houses(), format)
            }
            Commands::Ls { node, format } => {
                self.enter_house().await?;
                if let Some(node) = node {
                    self.go_to(node).await?;
                }
                presentation::format_listing(self.navigator.state(), format)
            }
            Commands::Show { node, format } => {
                self.enter_house().await?;
                self.go_to(node).await?;
                presentation::format_detail(self.navigator.state(), format)
            }
            Commands::Search { query, format } => {
                self.enter_house().await?;
                let results = self.navigator.search(query).await?;
                self.check_status()?;
                presentation::format_search_results(query, &results, format)
            }
            Commands::Activity { limit, format } => {
                self.enter_house().await?;
                if let Some(limit) = limit {
                    self.navigator.set_activity_limit(*limit);
                }
                let entries = self.navigator.recent_activity().await?;
                self.check_status()?;
                presentation::format_activity(&entries, format)
            }
            Commands::Stage { command } => self.handle_stage(command).await,
            Commands::Relocate { node, index, yes } => {
                self.handle_relocate(node.as_deref(), *index, *yes).await
            }
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e))),
        }
    }

    async fn handle_stage(&mut self, command: &StageCommands) -> Result<String, ApiError> {
        match command {
            StageCommands::Add { node } => {
                self.enter_house().await?;
                self.go_to(node).await?;
                let entry = self.navigator.stage_selected().await?;
                Ok(format!(
                    "Staged {} from {} ({} staged)",
                    entry.node.name,
                    entry.origin_path_label,
                    self.navigator.staging().len()
                ))
            }
            StageCommands::List { format } => {
                presentation::format_staging(&self.navigator.staging().entries(), format)
            }
            StageCommands::Remove { index } => {
                let position = to_position(*index, self.navigator.staging().len())?;
                let entry = self.navigator.unstage(position)?;
                Ok(format!("Unstaged {}", entry.node.name))
            }
            StageCommands::Clear { yes } => {
                let count = self.navigator.staging().len();
                if count == 0 {
                    return Ok("Staging buffer is already empty".to_string());
                }
                if !self.confirm(*yes, &format!("Drop {} staged entr(ies)?", count))? {
                    return Ok("Clear cancelled".to_string());
                }
                let dropped = self.navigator.clear_staging()?;
                Ok(format!("Cleared {} staged entr(ies)", dropped))
            }
        }
    }

    async fn handle_relocate(
        &mut self,
        node: Option<&str>,
        index: Option<usize>,
        yes: bool,
    ) -> Result<String, ApiError> {
        let staged = self.navigator.staging().len();
        if staged == 0 {
            return Err(ApiError::InvalidOperation(
                "staging buffer is empty".to_string(),
            ));
        }
        let position = index.map(|i| to_position(i, staged)).transpose()?;
        let house = self.enter_house().await?;

        let destination = match node {
            Some(node) => {
                self.go_to(node).await?;
                self.navigator.resolve_destination()?
            }
            None => {
                let house_id = house.house_id().ok_or_else(|| {
                    ApiError::InvalidOperation(format!("{} is not a house", house.name))
                })?;
                Destination::house_root(house_id, &house.name)
            }
        };

        let count = if position.is_some() { 1 } else { staged };
        if !self.confirm(
            yes,
            &format!("Move {} staged item(s) to {}?", count, destination.label),
        )? {
            return Ok("Relocation cancelled".to_string());
        }

        let report = match position {
            Some(position) => self.navigator.relocate_one_to(position, destination).await?,
            None => self.navigator.relocate_all_to(destination).await?,
        };
        Ok(presentation::format_relocation_report(&report))
    }

    async fn load_houses(&mut self) -> Result<(), ApiError> {
        match self.navigator.load_houses().await {
            Outcome::Applied => Ok(()),
            Outcome::Failed => Err(self.status_error()),
        }
    }

    /// Load houses and enter the one named by `--house` (or the only one).
    async fn enter_house(&mut self) -> Result<Node, ApiError> {
        self.load_houses().await?;
        let houses = self.navigator.houses();
        let house = match &self.house {
            Some(wanted) => houses
                .iter()
                .find(|h| h.id.as_str() == wanted)
                .or_else(|| houses.iter().find(|h| h.name.eq_ignore_ascii_case(wanted)))
                .cloned()
                .ok_or_else(|| ApiError::InvalidOperation(format!("no house named {}", wanted)))?,
            None => match houses {
                [only] => only.clone(),
                [] => return Err(ApiError::InvalidOperation("no houses found".to_string())),
                _ => {
                    return Err(ApiError::InvalidOperation(
                        "several houses exist; pass --house".to_string(),
                    ))
                }
            },
        };
        match self.navigator.enter_house(house.clone()).await? {
            Outcome::Applied => Ok(house),
            Outcome::Failed => Err(self.status_error()),
        }
    }

    async fn go_to(&mut self, node: &str) -> Result<(), ApiError> {
        match self.navigator.teleport(NodeId::from(node)).await? {
            Outcome::Applied => self.check_status(),
            Outcome::Failed => Err(self.status_error()),
        }
    }

    /// Surface a failure the navigator recorded on its status line.
    fn check_status(&self) -> Result<(), ApiError> {
        match self.navigator.status() {
            Some(status) if status.is_error() => Err(self.status_error()),
            _ => Ok(()),
        }
    }

    fn status_error(&self) -> ApiError {
        let Some(status) = self.navigator.status() else {
            return ApiError::Backend("request failed".to_string());
        };
        let message = status.message.clone();
        match status.error_kind {
            Some(ErrorKind::Network) => ApiError::NetworkFailure(message),
            Some(ErrorKind::Invalid) => ApiError::InvalidOperation(message),
            Some(ErrorKind::Config) => ApiError::ConfigError(message),
            _ => ApiError::Backend(message),
        }
    }

    fn confirm(&self, yes: bool, prompt: &str) -> Result<bool, ApiError> {
        if yes || self.assume_yes {
            return Ok(true);
        }
        use dialoguer::Confirm;
        Confirm::new()
            .with_prompt(prompt)
            .interact()
            .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))
    }

    fn persist_backend(&self) -> Result<(), ApiError> {
        if let Backend::Fixture { tree, path } = &self.backend {
            tree.save_json(path)?;
            debug!(path = %path.display(), "Saved fixture forest");
        }
        Ok(())
    }
}

/// Convert a 1-based position from the CLI into a buffer index.
fn to_position(index: usize, len: usize) -> Result<usize, ApiError> {
    if index == 0 || index > len {
        return Err(ApiError::IndexOutOfRange { index, len });
    }
    Ok(index - 1)
}
