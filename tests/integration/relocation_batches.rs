//! Relocation batches through the navigator

use crate::integration::test_utils::{cabin, child, home, id, names, navigator_in, sample_forest};
use stowage::client::TreeAccess;
use stowage::error::{ApiError, ErrorKind};
use stowage::navigation::{NavAction, StatusLevel};
use stowage::relocation::Destination;

#[tokio::test]
async fn relocate_one_item_to_house_root_updates_counts() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    let root_before = tree.list_children(&home(), None).await.unwrap().len();
    let drawer_before = tree.get_node_detail(&home(), &id("b4")).await.unwrap();
    assert_eq!(drawer_before.node.child_count, 2);

    nav.teleport(id("i3")).await.unwrap();
    nav.stage_selected().await.unwrap();
    nav.teleport(id("i1")).await.unwrap();
    nav.stage_selected().await.unwrap();
    assert_eq!(nav.staging().len(), 2);

    let report = nav
        .relocate_one_to(0, Destination::house_root(home(), "Home"))
        .await
        .unwrap();
    assert_eq!(report.succeeded_count(), 1);
    assert_eq!(nav.staging().len(), 1);
    assert_eq!(nav.staging().get(0).unwrap().node.id, id("i1"));

    let root_after = tree.list_children(&home(), None).await.unwrap();
    assert_eq!(root_after.len(), root_before + 1);
    assert!(root_after.iter().any(|n| n.id == id("i3")));
    let drawer_after = tree.get_node_detail(&home(), &id("b4")).await.unwrap();
    assert_eq!(drawer_after.node.child_count, 1);

    let house = nav
        .houses()
        .iter()
        .find(|h| h.id.as_str() == "home")
        .unwrap();
    assert_eq!(house.child_count as usize, root_before + 1);
}

#[tokio::test]
async fn partial_failure_keeps_exactly_the_failed_entries() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    for node in ["i1", "i2", "i3", "i4"] {
        nav.teleport(id(node)).await.unwrap();
        nav.stage_selected().await.unwrap();
    }
    tree.fail_moves_for("i2");
    tree.fail_moves_for("i4");

    let destination = Destination::container(cabin(), id("c2"), "Cabin / Shed / Crate");
    let report = nav.relocate_all_to(destination).await.unwrap();

    assert!(report.is_partial());
    assert_eq!(report.succeeded_count(), 2);
    assert_eq!(report.failed_count(), 2);
    let left: Vec<_> = nav.staging().entries().into_iter().map(|e| e.node.id).collect();
    assert_eq!(left, [id("i2"), id("i4")]);
    assert_eq!(tree.parent_of(&cabin(), &id("i1")), Some(id("c2")));

    let status = nav.status().unwrap();
    assert_eq!(status.level, StatusLevel::Error);
    assert_eq!(status.message, "Moved 2 item(s) to Cabin / Shed / Crate, 2 failed");
}

#[tokio::test]
async fn relocation_refreshes_views_and_keeps_selection() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    nav.teleport(id("i4")).await.unwrap();
    nav.stage_selected().await.unwrap();

    nav.breadcrumb_jump(-1).await.unwrap();
    let kitchen = child(&nav, "a2");
    nav.sync_detail(kitchen).await;

    let report = nav.relocate_all().await.unwrap();
    assert_eq!(report.destination.parent_id, Some(id("a2")));
    assert_eq!(report.destination.label, "Home / Kitchen");
    assert_eq!(nav.state().selected().unwrap().id, id("a2"));
    // Kitchen now holds the Drawer and the Fork.
    let kitchen = child(&nav, "a2");
    assert_eq!(kitchen.child_count, 2);
    assert_eq!(nav.status().unwrap().message, "Moved 1 item(s) to Home / Kitchen");
}

#[tokio::test]
async fn refresh_failure_after_relocation_is_reported() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    nav.teleport(id("i3")).await.unwrap();
    nav.stage_selected().await.unwrap();
    nav.breadcrumb_jump(-1).await.unwrap();
    let root_before = names(nav.state().children());

    tree.set_listings_offline(true);
    let report = nav
        .relocate_all_to(Destination::house_root(home(), "Home"))
        .await
        .unwrap();
    assert_eq!(report.succeeded_count(), 1);
    assert!(nav.staging().is_empty());
    assert_eq!(tree.parent_of(&home(), &id("i3")), None);

    // Views still show the pre-move listing.
    assert_eq!(names(nav.state().children()), root_before);
    let status = nav.status().unwrap();
    assert_eq!(status.level, StatusLevel::Error);
    assert!(status.retryable);
    assert!(status
        .message
        .starts_with("Moved 1 item(s) to Home; views not refreshed: "));
    assert_eq!(nav.failed_action(), Some(&NavAction::Refresh));

    tree.set_listings_offline(false);
    nav.retry().await.unwrap();
    assert!(nav.state().children().iter().any(|n| n.id == id("i3")));
    assert!(nav.status().map_or(true, |s| !s.is_error()));
}

#[tokio::test]
async fn container_moves_into_itself_are_refused_per_item() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    let garage = child(&nav, "a1");
    nav.stage(&garage).await.unwrap();

    let report = nav
        .relocate_all_to(Destination::container(home(), id("b2"), "Home / Garage / Shelf / Bin"))
        .await
        .unwrap();
    assert_eq!(report.succeeded_count(), 0);
    assert_eq!(report.failed[0].kind, ErrorKind::Invalid);
    assert_eq!(nav.staging().len(), 1);
    assert_eq!(names(nav.state().children()), ["Garage", "Kitchen"]);
}

#[tokio::test]
async fn wholesale_transport_failure_is_a_hard_error() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    nav.teleport(id("i3")).await.unwrap();
    nav.stage_selected().await.unwrap();

    tree.set_offline(true);
    let err = nav
        .relocate_all_to(Destination::house_root(home(), "Home"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NetworkFailure(_)));
    assert_eq!(nav.staging().len(), 1);
    assert_eq!(nav.status().unwrap().error_kind, Some(ErrorKind::Network));
}

#[tokio::test]
async fn empty_buffer_and_bad_index_are_rejected() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    assert!(matches!(
        nav.relocate_all().await,
        Err(ApiError::InvalidOperation(_))
    ));
    assert!(matches!(
        nav.relocate_one(3).await,
        Err(ApiError::IndexOutOfRange { index: 3, len: 0 })
    ));
}
