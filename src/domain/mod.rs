//! Domain layer: nodes, value slots, cleanup policy and traversal
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod cleanup;
pub mod error;
pub mod node;
pub mod slot;
pub mod view;

pub use cleanup::{CleanupMode, Strategy};
pub use error::{TreeError, TreeResult};
pub use node::{ExpireCallback, Node, NodeBuilder, WeakNode};
pub use slot::{HookId, Tracked, ValueSlot};
pub use view::{
    Breadth, Depth, Items, ItemsView, NodeView, Nodes, Projection, TowardsRoot, TraversalOrder,
    ValueView, Values, View,
};
