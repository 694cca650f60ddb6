//! Detail panel: optimistic selection and last-issued-wins fetches

use crate::integration::test_utils::{child, home, id, navigator_in, sample_forest};
use stowage::error::ErrorKind;

#[tokio::test]
async fn later_selection_wins_even_if_earlier_response_arrives_last() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    let garage = child(&nav, "a1");
    let kitchen = child(&nav, "a2");

    let ticket_a = nav.select(garage).unwrap();
    let ticket_b = nav.select(kitchen.clone()).unwrap();
    let (response_a, response_b) =
        futures::join!(nav.fetch_detail(ticket_a), nav.fetch_detail(ticket_b));

    // B resolves first, A straggles in afterwards.
    assert!(nav.apply_detail(response_b));
    assert!(!nav.apply_detail(response_a));

    let detail = nav.state().detail().unwrap();
    assert_eq!(detail.node.id, kitchen.id);
    assert!(detail.authoritative);
    assert_eq!(detail.child_preview.len(), 1);
    assert_eq!(nav.state().selected().unwrap().id, id("a2"));
}

#[tokio::test]
async fn earlier_response_arriving_first_is_still_dropped() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    let garage = child(&nav, "a1");
    let kitchen = child(&nav, "a2");

    let ticket_a = nav.select(garage).unwrap();
    let response_a = nav.fetch_detail(ticket_a).await;
    let ticket_b = nav.select(kitchen).unwrap();

    assert!(!nav.apply_detail(response_a));
    // Panel still shows the optimistic copy of B.
    let detail = nav.state().detail().unwrap();
    assert_eq!(detail.node.id, id("a2"));
    assert!(!detail.authoritative);

    let response_b = nav.fetch_detail(ticket_b).await;
    assert!(nav.apply_detail(response_b));
    assert!(nav.state().detail().unwrap().authoritative);
}

#[tokio::test]
async fn navigation_cancels_in_flight_detail() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    let kitchen = child(&nav, "a2");
    let ticket = nav.select(kitchen).unwrap();
    let response = nav.fetch_detail(ticket).await;

    nav.drill_up().await.unwrap();
    assert!(!nav.apply_detail(response));
    assert!(nav.state().detail().is_none());
}

#[tokio::test]
async fn node_removed_between_list_and_detail() {
    let tree = sample_forest();
    let mut nav = navigator_in(&tree, &home()).await;
    let kitchen = child(&nav, "a2");
    tree.remove_node(&home(), &id("a2")).unwrap();

    let ticket = nav.select(kitchen).unwrap();
    let response = nav.fetch_detail(ticket).await;
    assert!(nav.apply_detail(response));
    assert!(nav.state().selected().is_none());
    assert!(nav.state().detail().is_none());
    let status = nav.status().unwrap();
    assert_eq!(status.error_kind, Some(ErrorKind::NotFound));
    assert_eq!(status.message, "Kitchen no longer exists");
    // Lists are untouched until the next refresh.
    assert_eq!(nav.state().children().len(), 2);
}
