//! End-to-end expiry scenarios on the labelled sample tree.

use std::collections::BTreeMap;

use rstest::rstest;
use weaktree::application::{ApplicationError, SampleTree, SAMPLE_LABELS};
use weaktree::{CleanupMode, TraversalOrder, TreeError};

#[ctor::ctor]
fn init() {
    weaktree::util::testing::init_test_setup();
}

fn sorted(labels: &[&str]) -> Vec<String> {
    let mut labels: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
    labels.sort();
    labels
}

#[rstest]
#[case::prune(CleanupMode::Prune, &["root", "1", "5", "2", "6", "3", "7"])]
#[case::default_prunes(CleanupMode::Default, &["root", "1", "5", "2", "6", "3", "7"])]
#[case::reparent(CleanupMode::Reparent, &["root", "1", "8", "9", "5", "2", "6", "3", "7"])]
#[case::no_cleanup(CleanupMode::NoCleanup, &["root", "1", "4", "8", "9", "5", "2", "6", "3", "7"])]
fn given_uniform_mode_when_node_4_expires_then_live_nodes_match(
    #[case] mode: CleanupMode,
    #[case] expected: &[&str],
) {
    let mut sample = SampleTree::build(mode);

    sample.expire("4").unwrap();

    assert_eq!(sample.live_labels(), sorted(expected));
}

#[test]
fn given_reparent_when_node_1_expires_then_grandchildren_hang_off_root() {
    let mut sample = SampleTree::build(CleanupMode::Reparent);

    sample.expire("1").unwrap();

    let root = sample.root().clone();
    let four = sample.node("4").unwrap();
    let five = sample.node("5").unwrap();
    assert_eq!(four.parent(), Some(root.clone()));
    assert_eq!(five.parent(), Some(root.clone()));
    assert_eq!(root.child_count(), 4);
    assert_eq!(
        sample.walk(TraversalOrder::ToRoot, Some("9")).unwrap(),
        vec!["9", "8", "4", "root"]
    );
}

#[test]
fn given_reparent_override_under_prune_when_subtree_expires_then_only_override_splices() {
    let overrides = BTreeMap::from([("8".to_string(), CleanupMode::Reparent)]);
    let mut sample = SampleTree::build_with(CleanupMode::Prune, &overrides);

    sample.expire("8").unwrap();
    assert_eq!(
        sample.walk(TraversalOrder::ToRoot, Some("9")).unwrap(),
        vec!["9", "4", "1", "root"]
    );

    sample.expire("1").unwrap();
    assert_eq!(sample.live_labels(), sorted(&["root", "2", "6", "3", "7"]));
}

#[test]
fn given_no_cleanup_root_when_default_leaf_expires_then_leaf_stays_expired() {
    let overrides = BTreeMap::from([("root".to_string(), CleanupMode::NoCleanup)]);
    let mut sample = SampleTree::build_with(CleanupMode::Default, &overrides);

    sample.expire("9").unwrap();

    assert_eq!(sample.live_labels().len(), SAMPLE_LABELS.len());
    assert!(sample.node("9").unwrap().is_expired());
    assert!(sample.attached_labels().contains(&"<expired>".to_string()));
}

#[test]
fn given_whole_tree_when_every_value_expires_then_only_root_remains() {
    let mut sample = SampleTree::build(CleanupMode::Default);

    for label in SAMPLE_LABELS.iter().rev() {
        sample.expire(label).unwrap();
    }

    assert_eq!(sample.live_labels(), vec!["root".to_string()]);
    assert_eq!(sample.root().child_count(), 0);
}

#[test]
fn given_dropped_node_when_walking_from_it_then_reports_dropped() {
    let mut sample = SampleTree::build(CleanupMode::Prune);
    sample.expire("3").unwrap();

    let result = sample.walk(TraversalOrder::Breadth, Some("7"));

    assert!(matches!(
        result,
        Err(ApplicationError::Tree(TreeError::NodeDropped))
    ));
}

#[test]
fn given_hidden_expired_when_rendering_then_expired_branch_is_left_out() {
    let mut sample = SampleTree::build(CleanupMode::NoCleanup);
    sample.expire("2").unwrap();

    let shown = sample.render(true).to_string();
    let hidden = sample.render(false).to_string();

    assert!(shown.contains("<expired>"));
    assert!(shown.contains('6'));
    assert!(!hidden.contains("<expired>"));
    assert!(!hidden.contains('6'));
}
