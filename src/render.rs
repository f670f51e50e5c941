//! Rendering node subtrees as `termtree` trees.

use std::fmt::Display;

use termtree::Tree;
use tracing::instrument;

use crate::domain::Node;

/// Label used for nodes whose value has expired.
pub const EXPIRED_LABEL: &str = "<expired>";

pub trait TreeRender {
    /// Renders the whole subtree, expired nodes included.
    fn to_tree_string(&self) -> Tree<String> {
        self.to_tree_string_with(true)
    }

    /// Renders the subtree; with `show_expired` unset, expired nodes and
    /// everything below them are left out.
    fn to_tree_string_with(&self, show_expired: bool) -> Tree<String>;
}

// A node whose children are still being rendered.
struct Frame<T> {
    node: Node<T>,
    pending: std::vec::IntoIter<Node<T>>,
    leaves: Vec<Tree<String>>,
}

impl<T: Display> Frame<T> {
    fn new(node: &Node<T>, show_expired: bool) -> Self {
        let children: Vec<_> = node
            .children()
            .into_iter()
            .filter(|c| show_expired || !c.is_expired())
            .collect();
        Self {
            node: node.clone(),
            pending: children.into_iter(),
            leaves: Vec::new(),
        }
    }

    fn finish(self) -> Tree<String> {
        Tree::new(label(&self.node)).with_leaves(self.leaves)
    }
}

impl<T: Display> TreeRender for Node<T> {
    /// Builds the tree with an explicit stack. `termtree::Tree` itself still
    /// drops recursively, so extremely deep subtrees remain bounded by the
    /// thread's stack once the rendering is released.
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string_with(&self, show_expired: bool) -> Tree<String> {
        let mut stack = vec![Frame::new(self, show_expired)];
        let mut rendered = None;

        while let Some(frame) = stack.last_mut() {
            match frame.pending.next() {
                Some(child) => stack.push(Frame::new(&child, show_expired)),
                None => {
                    let Some(done) = stack.pop() else { break };
                    let tree = done.finish();
                    match stack.last_mut() {
                        Some(parent) => parent.leaves.push(tree),
                        None => rendered = Some(tree),
                    }
                }
            }
        }

        rendered.unwrap_or_else(|| Tree::new(label(self)))
    }
}

/// The value's `Display` text, or [`EXPIRED_LABEL`].
pub fn label<T: Display>(node: &Node<T>) -> String {
    node.value()
        .map(|v| v.to_string())
        .unwrap_or_else(|| EXPIRED_LABEL.to_string())
}
