//! Stowage: Hierarchical Inventory Navigation and Relocation
//!
//! Browses a forest of inventory houses (areas, boxes and items nested under a
//! house root), keeps a persistent staging buffer of nodes picked up along the
//! way, and relocates them into a chosen container or house root.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod relocation;
pub mod staging;
pub mod types;
