//! Cleanup policy: what a node does to the tree once its value expires.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::error::TreeError;
use crate::domain::node::{Node, WeakNode};

/// Policy stored on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupMode {
    /// Defer to the nearest ancestor's mode; prune when there is none.
    #[default]
    Default,
    /// Detach the node and release its whole subtree.
    Prune,
    /// Detach the node and splice its children into its parent.
    Reparent,
    /// Leave the structure untouched.
    NoCleanup,
}

impl CleanupMode {
    pub const ALL: [CleanupMode; 4] = [
        CleanupMode::Default,
        CleanupMode::Prune,
        CleanupMode::Reparent,
        CleanupMode::NoCleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupMode::Default => "default",
            CleanupMode::Prune => "prune",
            CleanupMode::Reparent => "reparent",
            CleanupMode::NoCleanup => "no-cleanup",
        }
    }
}

impl fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleanupMode {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "default" => Ok(CleanupMode::Default),
            "prune" => Ok(CleanupMode::Prune),
            "reparent" => Ok(CleanupMode::Reparent),
            "no-cleanup" | "none" => Ok(CleanupMode::NoCleanup),
            _ => Err(TreeError::UnknownMode(s.to_string())),
        }
    }
}

/// The concrete action a resolved `CleanupMode` maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Prune,
    Reparent,
    Idle,
}

impl Strategy {
    /// Resolves the strategy for `node`, walking up through `Default` ancestors.
    ///
    /// Loops forever on a parent cycle; building one is a caller error.
    pub fn resolve<T>(node: &Node<T>) -> Strategy {
        let mut current = node.clone();
        loop {
            match current.cleanup_mode() {
                CleanupMode::Prune => return Strategy::Prune,
                CleanupMode::Reparent => return Strategy::Reparent,
                CleanupMode::NoCleanup => return Strategy::Idle,
                CleanupMode::Default => match current.parent() {
                    Some(parent) => current = parent,
                    None => return Strategy::Prune,
                },
            }
        }
    }

    #[instrument(level = "trace", skip(node))]
    pub fn apply<T>(self, node: &Node<T>) {
        match self {
            Strategy::Prune => prune(node),
            Strategy::Reparent => reparent(node),
            Strategy::Idle => {}
        }
    }
}

/// Detaches `node` from its parent and releases every child it owns.
///
/// Children kept alive elsewhere survive detached; their parent link still
/// refers to `node`.
fn prune<T>(node: &Node<T>) {
    node.detach();
    let released = node.take_children();
    trace!(released = released.len(), "pruned subtree");
    drop(released);
}

/// Detaches `node` and moves each of its children under `node`'s former parent.
fn reparent<T>(node: &Node<T>) {
    let parent = node.parent();
    node.detach();
    for child in node.children() {
        child.set_parent(parent.as_ref());
    }
    trace!(top_level = parent.is_none(), "reparented children");
}

/// Release hook body: runs the caller's callback, then cleanup.
///
/// Both are skipped when the node no longer exists.
pub(crate) fn on_value_expired<T>(node: WeakNode<T>) {
    let Some(node) = node.upgrade() else {
        trace!("value expired after its node was dropped");
        return;
    };
    if let Some(callback) = node.take_expire_callback() {
        callback(&node);
    }
    let strategy = Strategy::resolve(&node);
    debug!(?strategy, mode = %node.cleanup_mode(), "value expired");
    strategy.apply(&node);
}
