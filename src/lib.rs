//! A forest of nodes that refer to their values weakly.
//!
//! Application code owns values through [`Tracked`] handles; nodes only keep
//! a [`ValueSlot`]. When the last `Tracked` handle of a value is dropped, the
//! node that referred to it applies its [`CleanupMode`]: prune its subtree,
//! splice its children into its parent, or leave the structure alone.
//!
//! ```
//! use weaktree::{CleanupMode, Node, Tracked};
//!
//! let root_value = Tracked::new("root");
//! let root = Node::new(&root_value);
//!
//! let middle_value = Tracked::new("middle");
//! let middle = root.add_child_with_mode(&middle_value, CleanupMode::Reparent);
//! let leaf_value = Tracked::new("leaf");
//! let leaf = middle.add_child(&leaf_value);
//!
//! drop(middle_value);
//!
//! assert!(!root.has_child(&middle));
//! assert_eq!(leaf.parent(), Some(root.clone()));
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod render;
pub mod util;

pub use domain::{
    CleanupMode, HookId, ItemsView, Node, NodeBuilder, NodeView, Strategy, TraversalOrder, Tracked,
    TreeError, TreeResult, ValueSlot, ValueView, View, WeakNode,
};
pub use render::TreeRender;
