//! Fixed sample tree with labelled values, for exploring cleanup behaviour.
//!
//! ```text
//! root
//! ├── 1
//! │   ├── 4
//! │   │   └── 8
//! │   │       └── 9
//! │   └── 5
//! ├── 2
//! │   └── 6
//! └── 3
//!     └── 7
//! ```

use std::collections::BTreeMap;

use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{CleanupMode, Node, TraversalOrder, Tracked, TreeError, ValueView, WeakNode};
use crate::render::{TreeRender, EXPIRED_LABEL};

pub const SAMPLE_LABELS: [&str; 10] = ["root", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

// (parent, child), in insertion order
const SAMPLE_EDGES: [(&str, &str); 9] = [
    ("root", "1"),
    ("1", "4"),
    ("4", "8"),
    ("8", "9"),
    ("1", "5"),
    ("root", "2"),
    ("2", "6"),
    ("root", "3"),
    ("3", "7"),
];

/// The sample tree plus the only strong owners of its values.
///
/// Nodes are tracked weakly by label, so pruned nodes really disappear.
pub struct SampleTree {
    root: Node<String>,
    values: BTreeMap<String, Tracked<String>>,
    nodes: BTreeMap<String, WeakNode<String>>,
}

impl SampleTree {
    /// Builds the sample tree with every node set to `mode`.
    pub fn build(mode: CleanupMode) -> Self {
        Self::build_with(mode, &BTreeMap::new())
    }

    /// Builds the sample tree with `mode`, except for the labels in `overrides`.
    #[instrument(level = "debug", skip(overrides))]
    pub fn build_with(mode: CleanupMode, overrides: &BTreeMap<String, CleanupMode>) -> Self {
        let mode_of = |label: &str| overrides.get(label).copied().unwrap_or(mode);

        let values: BTreeMap<String, Tracked<String>> = SAMPLE_LABELS
            .iter()
            .map(|label| (label.to_string(), Tracked::new(label.to_string())))
            .collect();

        let root = Node::builder(&values["root"])
            .cleanup_mode(mode_of("root"))
            .build();

        let mut handles: BTreeMap<String, Node<String>> = BTreeMap::new();
        handles.insert("root".to_string(), root.clone());
        for (parent, child) in SAMPLE_EDGES {
            let node = handles[parent].add_child_with_mode(&values[child], mode_of(child));
            handles.insert(child.to_string(), node);
        }

        let nodes = handles
            .iter()
            .map(|(label, node)| (label.clone(), node.downgrade()))
            .collect();
        debug!(nodes = handles.len(), "built sample tree");

        Self {
            root,
            values,
            nodes,
        }
    }

    pub fn root(&self) -> &Node<String> {
        &self.root
    }

    /// The node carrying `label`, if it still exists.
    pub fn node(&self, label: &str) -> ApplicationResult<Node<String>> {
        let weak = self
            .nodes
            .get(label)
            .ok_or_else(|| ApplicationError::UnknownLabel(label.to_string()))?;
        weak.upgrade()
            .ok_or_else(|| ApplicationError::Tree(TreeError::NodeDropped))
    }

    /// Drops the only strong handle to `label`'s value, triggering its node's cleanup.
    #[instrument(level = "debug", skip(self))]
    pub fn expire(&mut self, label: &str) -> ApplicationResult<()> {
        match self.values.remove(label) {
            Some(value) => {
                drop(value);
                Ok(())
            }
            None if self.nodes.contains_key(label) => {
                Err(ApplicationError::AlreadyExpired(label.to_string()))
            }
            None => Err(ApplicationError::UnknownLabel(label.to_string())),
        }
    }

    /// Labels whose node object still exists.
    pub fn live_labels(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, weak)| weak.is_alive())
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Labels reachable from the root through child links, root included.
    pub fn attached_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .root
            .values()
            .breadth()
            .map(|v| v.map_or_else(|| EXPIRED_LABEL.to_string(), |v| v.to_string()))
            .collect();
        labels.sort();
        labels
    }

    /// Labels emitted by a walk from `from` (the root when `None`).
    pub fn walk(&self, order: TraversalOrder, from: Option<&str>) -> ApplicationResult<Vec<String>> {
        let start = match from {
            Some(label) => self.node(label)?,
            None => self.root.clone(),
        };
        Ok(ValueView::new(&start)
            .walk(order)
            .map(|v| v.map_or_else(|| EXPIRED_LABEL.to_string(), |v| v.to_string()))
            .collect())
    }

    pub fn render(&self, show_expired: bool) -> Tree<String> {
        self.root.to_tree_string_with(show_expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_sample_when_built_then_all_nodes_attached() {
        let sample = SampleTree::build(CleanupMode::Default);
        assert_eq!(sample.attached_labels().len(), SAMPLE_LABELS.len());
        assert_eq!(sample.live_labels().len(), SAMPLE_LABELS.len());
    }

    #[test]
    fn given_unknown_label_when_expiring_then_errors() {
        let mut sample = SampleTree::build(CleanupMode::Default);
        assert!(matches!(
            sample.expire("42"),
            Err(ApplicationError::UnknownLabel(_))
        ));
    }

    #[test]
    fn given_expired_label_when_expiring_again_then_errors() {
        let mut sample = SampleTree::build(CleanupMode::NoCleanup);
        sample.expire("5").unwrap();
        assert!(matches!(
            sample.expire("5"),
            Err(ApplicationError::AlreadyExpired(_))
        ));
    }

    #[test]
    fn given_pruned_branch_when_looking_up_node_then_reports_dropped() {
        let mut sample = SampleTree::build(CleanupMode::Prune);
        sample.expire("4").unwrap();
        assert!(matches!(
            sample.node("9"),
            Err(ApplicationError::Tree(TreeError::NodeDropped))
        ));
        assert!(!sample.live_labels().contains(&"8".to_string()));
    }

    #[test]
    fn given_override_when_building_then_node_uses_it() {
        let overrides = BTreeMap::from([("1".to_string(), CleanupMode::Reparent)]);
        let sample = SampleTree::build_with(CleanupMode::Default, &overrides);
        assert_eq!(
            sample.node("1").unwrap().cleanup_mode(),
            CleanupMode::Reparent
        );
        assert_eq!(
            sample.node("2").unwrap().cleanup_mode(),
            CleanupMode::Default
        );
    }

    #[test]
    fn given_walk_from_leaf_towards_root_then_lists_ancestors() {
        let sample = SampleTree::build(CleanupMode::Default);
        let chain = sample.walk(TraversalOrder::ToRoot, Some("9")).unwrap();
        assert_eq!(chain, vec!["9", "8", "4", "1", "root"]);
    }
}
