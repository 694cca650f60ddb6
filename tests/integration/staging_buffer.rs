//! Staging buffer behaviour through the navigator and across restarts

use crate::integration::test_utils::{cabin, child, home, house_node, id, sample_forest};
use std::sync::Arc;
use stowage::error::{ApiError, ErrorKind};
use stowage::navigation::{NavAction, Navigator, StatusLevel};
use stowage::staging::{SledStagingStore, StagingManager, StagingStore};
use tempfile::TempDir;

fn sled_staging(dir: &TempDir) -> Arc<StagingManager> {
    let store: Arc<dyn StagingStore> = Arc::new(SledStagingStore::open(dir.path()).unwrap());
    StagingManager::shared(store).unwrap()
}

#[tokio::test]
async fn staging_the_current_folder_moves_up_one_level() {
    let tree = sample_forest();
    let staging = StagingManager::in_memory();
    let mut nav = Navigator::new(tree.clone(), staging.clone());
    nav.load_houses().await;
    nav.enter_house(house_node(&nav, &home())).await.unwrap();
    nav.teleport(id("b2")).await.unwrap();
    assert_eq!(nav.state().path().len(), 3);

    let bin = nav.state().selected().cloned().unwrap();
    let entry = nav.stage(&bin).await.unwrap();
    assert_eq!(entry.origin_path_label, "Home / Garage / Shelf");
    assert_eq!(nav.state().path(), &[id("a1"), id("b1")]);
    assert_eq!(nav.state().path_names().len(), 2);
    assert_eq!(staging.len(), 1);
}

#[tokio::test]
async fn staging_the_current_folder_offline_keeps_the_error_visible() {
    let tree = sample_forest();
    let mut nav = crate::integration::test_utils::navigator_in(&tree, &home()).await;
    let garage = child(&nav, "a1");
    nav.drill_down(garage.clone()).await.unwrap();
    tree.set_offline(true);

    let entry = nav.stage(&garage).await.unwrap();
    assert_eq!(entry.node.id, id("a1"));
    assert_eq!(nav.staging().len(), 1);
    assert_eq!(nav.state().path(), &[id("a1")]);
    let status = nav.status().unwrap();
    assert_eq!(status.level, StatusLevel::Error);
    assert_eq!(status.error_kind, Some(ErrorKind::Network));
    assert!(status.message.starts_with("Staged Garage; "));
    assert_eq!(nav.failed_action(), Some(&NavAction::BreadcrumbJump(-1)));

    tree.set_offline(false);
    nav.retry().await.unwrap();
    assert!(nav.state().path().is_empty());
    assert!(nav.state().path_names().is_empty());
}

#[tokio::test]
async fn staging_a_child_keeps_position() {
    let tree = sample_forest();
    let mut nav = crate::integration::test_utils::navigator_in(&tree, &home()).await;
    nav.teleport(id("b4")).await.unwrap();
    let spoon = child(&nav, "i3");
    let entry = nav.stage(&spoon).await.unwrap();
    assert_eq!(entry.origin_path_label, "Home / Kitchen / Drawer");
    assert_eq!(entry.origin_house_name, "Home");
    assert_eq!(nav.state().path(), &[id("a2"), id("b4")]);

    assert!(matches!(
        nav.stage(&spoon).await,
        Err(ApiError::AlreadyStaged(_))
    ));
}

#[tokio::test]
async fn buffer_is_shared_across_houses() {
    let tree = sample_forest();
    let staging = StagingManager::in_memory();
    let mut in_home = Navigator::new(tree.clone(), staging.clone());
    let mut in_cabin = Navigator::new(tree.clone(), staging.clone());

    in_home.load_houses().await;
    in_home
        .enter_house(house_node(&in_home, &home()))
        .await
        .unwrap();
    in_home.teleport(id("i2")).await.unwrap();
    in_home.stage_selected().await.unwrap();

    in_cabin.load_houses().await;
    in_cabin
        .enter_house(house_node(&in_cabin, &cabin()))
        .await
        .unwrap();
    assert_eq!(in_cabin.staging().len(), 1);
    let mut updates = in_cabin.subscribe();

    let report = in_cabin.relocate_all().await.unwrap();
    assert_eq!(report.succeeded_count(), 1);
    assert!(staging.is_empty());
    assert_eq!(report.succeeded[0].origin_path_label, "Home / Garage");
    assert!(in_cabin
        .state()
        .children()
        .iter()
        .any(|n| n.id == id("i2")));
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().staged_count, 0);
}

#[tokio::test]
async fn sled_buffer_survives_restart() {
    let dir = TempDir::new().unwrap();
    let tree = sample_forest();
    {
        let staging = sled_staging(&dir);
        let mut nav = Navigator::new(tree.clone(), staging);
        nav.load_houses().await;
        nav.enter_house(house_node(&nav, &home())).await.unwrap();
        nav.teleport(id("i1")).await.unwrap();
        nav.stage_selected().await.unwrap();
        nav.teleport(id("i3")).await.unwrap();
        nav.stage_selected().await.unwrap();
    }

    let staging = sled_staging(&dir);
    let entries = staging.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].node.name, "Screwdriver");
    assert_eq!(entries[0].origin_path_label, "Home / Garage / Shelf / Bin / Tin");
    assert_eq!(entries[1].node.name, "Spoon");

    staging.unstage(0).unwrap();
    drop(staging);
    assert_eq!(sled_staging(&dir).len(), 1);
}

#[tokio::test]
async fn houses_cannot_be_staged() {
    let tree = sample_forest();
    let mut nav = crate::integration::test_utils::navigator_in(&tree, &home()).await;
    let house = nav.state().house().cloned().unwrap();
    assert!(matches!(
        nav.stage(&house).await,
        Err(ApiError::InvalidOperation(_))
    ));
    assert!(nav.staging().is_empty());
}
