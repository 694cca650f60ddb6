//! CLI parse: clap types for Stowage. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stowage CLI - browse inventory houses and relocate staged items
#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "Browse hierarchical inventory houses and move staged items between them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (for config/config.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// House to operate in, by id or name (optional when only one house exists)
    #[arg(long, global = true)]
    pub house: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List houses
    Houses {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List the contents of the house root or of a container
    Ls {
        /// Container (or item, to list its surroundings) to open
        #[arg(long)]
        node: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show details for one node
    Show {
        #[arg(long)]
        node: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Search nodes in a house by name
    Search {
        query: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show recent activity in a house
    Activity {
        /// Number of entries (defaults to navigation.activity_limit)
        #[arg(long)]
        limit: Option<usize>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Manage the staging buffer
    Stage {
        #[command(subcommand)]
        command: StageCommands,
    },
    /// Move staged items into a container (or the house root)
    Relocate {
        /// Destination container; the house root when omitted
        #[arg(long)]
        node: Option<String>,
        /// Move only this staged entry (position as shown by `stage list`)
        #[arg(long)]
        index: Option<usize>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StageCommands {
    /// Stage a node from the selected house
    Add {
        #[arg(long)]
        node: String,
    },
    /// List staged entries across all houses
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Remove one entry (position as shown by `stage list`)
    Remove { index: usize },
    /// Remove every staged entry
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}
