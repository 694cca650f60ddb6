//! Integration tests for the stowage navigation and relocation engine

mod cli_commands;
mod config_integration;
mod detail_sync;
mod relocation_batches;
mod staging_buffer;
