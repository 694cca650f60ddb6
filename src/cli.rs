//! CLI domain: parse, route, help, output, and presentation only.
//! No navigation logic; the single route table dispatches to the navigator.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, StageCommands};
pub use presentation::{
    format_activity, format_detail, format_houses, format_listing, format_relocation_report,
    format_search_results, format_staging,
};
pub use route::RunContext;
