//! CLI route table driven against the in-memory forest

use crate::integration::test_utils::{cabin, id, sample_forest};
use std::sync::Arc;
use stowage::cli::{Commands, RunContext, StageCommands};
use stowage::client::MemoryTree;
use stowage::config::StowageConfig;
use stowage::error::ApiError;
use stowage::staging::StagingManager;

fn context(tree: &Arc<MemoryTree>, house: Option<&str>) -> RunContext {
    RunContext::with_backend(
        StowageConfig::default(),
        tree.clone(),
        StagingManager::in_memory(),
        house.map(String::from),
    )
    .unwrap()
    .assume_yes(true)
}

fn text(format: &str) -> String {
    format.to_string()
}

#[test]
fn houses_lists_every_house() {
    let tree = sample_forest();
    let mut ctx = context(&tree, None);
    let out = ctx.execute(&Commands::Houses { format: text("text") }).unwrap();
    assert!(out.contains("Home"));
    assert!(out.contains("Cabin"));

    let json = ctx.execute(&Commands::Houses { format: text("json") }).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["total"], 2);
}

#[test]
fn house_must_be_chosen_when_several_exist() {
    let tree = sample_forest();
    let mut ctx = context(&tree, None);
    let err = ctx
        .execute(&Commands::Ls {
            node: None,
            format: text("text"),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidOperation(_)));
}

#[test]
fn ls_and_show_by_house_name() {
    let tree = sample_forest();
    let mut ctx = context(&tree, Some("home"));
    let out = ctx
        .execute(&Commands::Ls {
            node: Some("b4".to_string()),
            format: text("text"),
        })
        .unwrap();
    assert!(out.contains("Home / Kitchen / Drawer"));
    assert!(out.contains("Spoon"));

    let out = ctx
        .execute(&Commands::Show {
            node: "i3".to_string(),
            format: text("json"),
        })
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["node"]["name"], "Spoon");
    assert_eq!(value["location"], "Home / Kitchen / Drawer");
}

#[test]
fn missing_node_is_reported() {
    let tree = sample_forest();
    let mut ctx = context(&tree, Some("Home"));
    let err = ctx
        .execute(&Commands::Show {
            node: "nope".to_string(),
            format: text("text"),
        })
        .unwrap_err();
    assert!(err.to_string().contains("no longer exists"));
}

#[test]
fn stage_and_relocate_across_houses() {
    let tree = sample_forest();
    let staging = StagingManager::in_memory();
    let mut home_ctx = RunContext::with_backend(
        StowageConfig::default(),
        tree.clone(),
        staging.clone(),
        Some("home".to_string()),
    )
    .unwrap();
    let out = home_ctx
        .execute(&Commands::Stage {
            command: StageCommands::Add {
                node: "b4".to_string(),
            },
        })
        .unwrap();
    assert!(out.contains("Staged Drawer from Home / Kitchen"));

    let listing = home_ctx
        .execute(&Commands::Stage {
            command: StageCommands::List { format: text("text") },
        })
        .unwrap();
    assert!(listing.contains("Drawer"));

    let mut cabin_ctx = RunContext::with_backend(
        StowageConfig::default(),
        tree.clone(),
        staging.clone(),
        Some("Cabin".to_string()),
    )
    .unwrap();
    let out = cabin_ctx
        .execute(&Commands::Relocate {
            node: Some("c1".to_string()),
            index: Some(1),
            yes: true,
        })
        .unwrap();
    assert!(out.contains("Moved 1 item(s) to Cabin / Shed"));
    assert!(staging.is_empty());
    assert_eq!(tree.parent_of(&cabin(), &id("b4")), Some(id("c1")));
    assert_eq!(tree.parent_of(&cabin(), &id("i3")), Some(id("b4")));
}

#[test]
fn stage_remove_uses_list_positions() {
    let tree = sample_forest();
    let mut ctx = context(&tree, Some("home"));
    for node in ["i1", "i2"] {
        ctx.execute(&Commands::Stage {
            command: StageCommands::Add {
                node: node.to_string(),
            },
        })
        .unwrap();
    }
    let out = ctx
        .execute(&Commands::Stage {
            command: StageCommands::Remove { index: 2 },
        })
        .unwrap();
    assert_eq!(out, "Unstaged Rake");
    assert!(ctx
        .execute(&Commands::Stage {
            command: StageCommands::Remove { index: 0 },
        })
        .is_err());

    let out = ctx
        .execute(&Commands::Stage {
            command: StageCommands::Clear { yes: false },
        })
        .unwrap();
    assert_eq!(out, "Cleared 1 staged entr(ies)");
    assert!(ctx.navigator().staging().is_empty());
}

#[test]
fn relocate_with_empty_buffer_fails() {
    let tree = sample_forest();
    let mut ctx = context(&tree, Some("home"));
    let err = ctx
        .execute(&Commands::Relocate {
            node: None,
            index: None,
            yes: true,
        })
        .unwrap_err();
    assert!(err.to_string().contains("staging buffer is empty"));
}

#[test]
fn offline_backend_surfaces_network_error() {
    let tree = sample_forest();
    tree.set_offline(true);
    let mut ctx = context(&tree, Some("home"));
    let err = ctx
        .execute(&Commands::Houses { format: text("text") })
        .unwrap_err();
    assert!(matches!(err, ApiError::NetworkFailure(_)));
}

#[test]
fn config_prints_toml() {
    let tree = sample_forest();
    let mut ctx = context(&tree, None);
    let out = ctx.execute(&Commands::Config).unwrap();
    assert!(out.contains("[navigation]"));
    assert!(out.contains("max_ancestor_depth = 64"));
}
