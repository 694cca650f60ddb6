//! CLI command-name contract for logging.

use crate::cli::parse::{Commands, StageCommands};

/// Command name string for log fields (e.g. "houses", "stage.add").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Houses { .. } => "houses".to_string(),
        Commands::Ls { .. } => "ls".to_string(),
        Commands::Show { .. } => "show".to_string(),
        Commands::Search { .. } => "search".to_string(),
        Commands::Activity { .. } => "activity".to_string(),
        Commands::Stage { command } => format!("stage.{}", stage_command_name(command)),
        Commands::Relocate { .. } => "relocate".to_string(),
        Commands::Config => "config".to_string(),
    }
}

pub fn stage_command_name(command: &StageCommands) -> &'static str {
    match command {
        StageCommands::Add { .. } => "add",
        StageCommands::List { .. } => "list",
        StageCommands::Remove { .. } => "remove",
        StageCommands::Clear { .. } => "clear",
    }
}

/// Commands that change the backend or the staging buffer.
pub fn is_mutating(command: &Commands) -> bool {
    match command {
        Commands::Relocate { .. } => true,
        Commands::Stage { command } => !matches!(command, StageCommands::List { .. }),
        _ => false,
    }
}
