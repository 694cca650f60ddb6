//! Property-based tests for path bookkeeping under random navigation

use proptest::prelude::*;
use std::sync::Arc;
use stowage::client::{MemoryTree, TreeAccess};
use stowage::navigation::Navigator;
use stowage::staging::StagingManager;
use stowage::types::{HouseId, Node, NodeId, NodeKind};

#[derive(Debug, Clone)]
enum Step {
    Down(usize),
    Up,
    Jump(isize),
    Sideways(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0usize..4).prop_map(Step::Down),
        1 => Just(Step::Up),
        1 => (-1isize..6).prop_map(Step::Jump),
        1 => (0usize..4).prop_map(Step::Sideways),
    ]
}

/// Every container holds `fanout` boxes plus one item, `depth` levels deep.
fn build_tree(depth: usize, fanout: usize) -> Arc<MemoryTree> {
    let tree = MemoryTree::new();
    let house = tree.add_house("h", "House");
    let mut frontier: Vec<Option<NodeId>> = vec![None];
    for level in 0..depth {
        let mut next = Vec::new();
        for parent in &frontier {
            let prefix = parent.as_ref().map(|p| p.to_string()).unwrap_or_default();
            for i in 0..fanout {
                let node_id = format!("{}{}{}", prefix, if level == 0 { "a" } else { "b" }, i);
                let kind = if level == 0 { NodeKind::Area } else { NodeKind::Box };
                tree.add_node(
                    &house,
                    Node::container(node_id.as_str(), kind, node_id.as_str(), parent.clone()),
                )
                .unwrap();
                next.push(Some(NodeId::from(node_id)));
            }
            let item_id = format!("{}item", prefix);
            tree.add_node(&house, Node::item(item_id.as_str(), "thing", parent.clone(), 1))
                .unwrap();
        }
        frontier = next;
    }
    Arc::new(tree)
}

async fn run_steps(tree: Arc<MemoryTree>, steps: Vec<Step>) -> Result<(), TestCaseError> {
    let mut nav = Navigator::new(tree.clone(), StagingManager::in_memory());
    nav.load_houses().await;
    let house = nav.houses()[0].clone();
    nav.enter_house(house).await.unwrap();
    let root_listing = tree.list_children(&HouseId::from("h"), None).await.unwrap();

    for step in steps {
        let before = nav.state().path().len();
        match step {
            Step::Down(i) => {
                let target = nav.state().children().get(i).cloned();
                if let Some(node) = target {
                    let result = nav.drill_down(node.clone()).await;
                    if node.is_item() {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(nav.state().path().len(), before);
                    } else {
                        prop_assert!(result.is_ok());
                        prop_assert_eq!(nav.state().path().len(), before + 1);
                        prop_assert_eq!(nav.state().path().last(), Some(&node.id));
                    }
                }
            }
            Step::Up => {
                if before == 0 {
                    continue;
                }
                nav.drill_up().await.unwrap();
                prop_assert_eq!(nav.state().path().len(), before - 1);
            }
            Step::Jump(index) => {
                let result = nav.breadcrumb_jump(index).await;
                if index < before as isize {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(nav.state().path().len(), (index + 1) as usize);
                } else {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(nav.state().path().len(), before);
                }
                if index == -1 {
                    prop_assert!(nav.state().siblings().is_empty());
                    prop_assert_eq!(nav.state().children(), root_listing.as_slice());
                }
            }
            Step::Sideways(i) => {
                let target = nav.state().siblings().get(i).cloned();
                if let Some(node) = target.filter(|n| n.kind.can_contain()) {
                    nav.sibling_drill(node.clone()).await.unwrap();
                    prop_assert_eq!(nav.state().path().len(), before);
                    prop_assert_eq!(nav.state().path().last(), Some(&node.id));
                }
            }
        }
        prop_assert_eq!(nav.state().path().len(), nav.state().path_names().len());
        prop_assert!(nav.state().house().is_some());
    }
    Ok(())
}

#[test]
fn path_and_names_stay_in_lockstep() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runner
        .run(
            &(1usize..5, 1usize..4, prop::collection::vec(step(), 1..40)),
            |(depth, fanout, steps)| runtime.block_on(run_steps(build_tree(depth, fanout), steps)),
        )
        .unwrap();
}

#[test]
fn names_match_the_resolved_chain_after_teleport() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runner
        .run(&(1usize..6, 0usize..3), |(depth, pick)| {
            runtime.block_on(async {
                let tree = build_tree(depth, 3);
                let mut nav = Navigator::new(tree.clone(), StagingManager::in_memory());
                nav.load_houses().await;
                let house = nav.houses()[0].clone();
                nav.enter_house(house).await.unwrap();

                // Node ids spell their own ancestry: "a1b0b2" sits under "a1b0" under "a1".
                let mut target = format!("a{}", pick);
                for _ in 1..depth {
                    target.push_str(&format!("b{}", pick));
                }
                nav.teleport(NodeId::from(target.as_str())).await.unwrap();

                let path = nav.state().path();
                prop_assert_eq!(path.len(), depth);
                prop_assert_eq!(path.last().map(NodeId::as_str), Some(target.as_str()));
                let names: Vec<&str> = nav.state().path_names().iter().map(String::as_str).collect();
                let ids: Vec<&str> = path.iter().map(NodeId::as_str).collect();
                prop_assert_eq!(names, ids);
                Ok(())
            })
        })
        .unwrap();
}
