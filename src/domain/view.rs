//! Traversal engine and the node / value / item views built on it.
//!
//! Every walk is lazy and single pass. Children and parents are read live
//! at each step, so nodes that are queued but not yet emitted must not be
//! relinked while a pass is running.

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::error::{TreeError, TreeResult};
use crate::domain::node::{Node, WeakNode};
use crate::domain::slot::Tracked;

/// What a view emits for each visited node.
pub trait Projection<T> {
    type Item;

    fn project(node: &Node<T>) -> Self::Item;
}

/// Emits the node itself.
#[derive(Debug, Clone, Copy)]
pub struct Nodes;

/// Emits the node's value, `None` when expired.
#[derive(Debug, Clone, Copy)]
pub struct Values;

/// Emits `(node, value)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct Items;

impl<T> Projection<T> for Nodes {
    type Item = Node<T>;

    fn project(node: &Node<T>) -> Node<T> {
        node.clone()
    }
}

impl<T> Projection<T> for Values {
    type Item = Option<Tracked<T>>;

    fn project(node: &Node<T>) -> Option<Tracked<T>> {
        node.value()
    }
}

impl<T> Projection<T> for Items {
    type Item = (Node<T>, Option<Tracked<T>>);

    fn project(node: &Node<T>) -> Self::Item {
        (node.clone(), node.value())
    }
}

/// Walk order, as selected from configuration or the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalOrder {
    #[default]
    Breadth,
    Depth,
    ToRoot,
}

impl fmt::Display for TraversalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TraversalOrder::Breadth => "breadth",
            TraversalOrder::Depth => "depth",
            TraversalOrder::ToRoot => "to-root",
        })
    }
}

impl FromStr for TraversalOrder {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "breadth" | "bfs" => Ok(TraversalOrder::Breadth),
            "depth" | "dfs" => Ok(TraversalOrder::Depth),
            "to-root" | "towards-root" => Ok(TraversalOrder::ToRoot),
            _ => Err(TreeError::UnknownOrder(s.to_string())),
        }
    }
}

/// A starting node plus a projection; produces fresh walks on demand.
pub struct View<T, P> {
    start: Node<T>,
    _projection: PhantomData<fn() -> P>,
}

pub type NodeView<T> = View<T, Nodes>;
pub type ValueView<T> = View<T, Values>;
pub type ItemsView<T> = View<T, Items>;

impl<T, P: Projection<T>> View<T, P> {
    pub fn new(start: &Node<T>) -> Self {
        Self {
            start: start.clone(),
            _projection: PhantomData,
        }
    }

    /// Builds a view from a weak handle, failing when the node is gone.
    pub fn from_weak(start: &WeakNode<T>) -> TreeResult<Self> {
        start
            .upgrade()
            .map(|node| Self::new(&node))
            .ok_or(TreeError::NodeDropped)
    }

    pub fn start(&self) -> &Node<T> {
        &self.start
    }

    /// Breadth-first; sibling order unspecified.
    #[instrument(level = "trace", skip(self))]
    pub fn breadth(&self) -> Breadth<T, P> {
        Breadth::new(self.start.clone())
    }

    /// Depth-first; sibling order unspecified, so not a canonical pre-order.
    #[instrument(level = "trace", skip(self))]
    pub fn depth(&self) -> Depth<T, P> {
        Depth::new(self.start.clone())
    }

    /// The start node, then each ancestor up to the top-level node.
    #[instrument(level = "trace", skip(self))]
    pub fn towards_root(&self) -> TowardsRoot<T, P> {
        TowardsRoot::new(self.start.clone())
    }

    /// Walks in the given order.
    pub fn walk(&self, order: TraversalOrder) -> Box<dyn Iterator<Item = P::Item>>
    where
        T: 'static,
        P: 'static,
    {
        match order {
            TraversalOrder::Breadth => Box::new(self.breadth()),
            TraversalOrder::Depth => Box::new(self.depth()),
            TraversalOrder::ToRoot => Box::new(self.towards_root()),
        }
    }
}

impl<T, P> Clone for View<T, P> {
    fn clone(&self) -> Self {
        Self {
            start: self.start.clone(),
            _projection: PhantomData,
        }
    }
}

impl<T: fmt::Debug, P> fmt::Debug for View<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View").field("start", &self.start).finish()
    }
}

impl<'a, T, P: Projection<T>> IntoIterator for &'a View<T, P> {
    type Item = P::Item;
    type IntoIter = Breadth<T, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.breadth()
    }
}

/// FIFO walk.
pub struct Breadth<T, P> {
    queue: VecDeque<Node<T>>,
    _projection: PhantomData<fn() -> P>,
}

impl<T, P> Breadth<T, P> {
    pub(crate) fn new(start: Node<T>) -> Self {
        Self {
            queue: VecDeque::from([start]),
            _projection: PhantomData,
        }
    }
}

impl<T, P: Projection<T>> Iterator for Breadth<T, P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children());
        Some(P::project(&node))
    }
}

impl<T, P: Projection<T>> FusedIterator for Breadth<T, P> {}

/// LIFO walk.
pub struct Depth<T, P> {
    stack: Vec<Node<T>>,
    _projection: PhantomData<fn() -> P>,
}

impl<T, P> Depth<T, P> {
    pub(crate) fn new(start: Node<T>) -> Self {
        Self {
            stack: vec![start],
            _projection: PhantomData,
        }
    }
}

impl<T, P: Projection<T>> Iterator for Depth<T, P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children());
        Some(P::project(&node))
    }
}

impl<T, P: Projection<T>> FusedIterator for Depth<T, P> {}

/// Parent-chain walk.
pub struct TowardsRoot<T, P> {
    next: Option<Node<T>>,
    _projection: PhantomData<fn() -> P>,
}

impl<T, P> TowardsRoot<T, P> {
    pub(crate) fn new(start: Node<T>) -> Self {
        Self {
            next: Some(start),
            _projection: PhantomData,
        }
    }
}

impl<T, P: Projection<T>> Iterator for TowardsRoot<T, P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next.take()?;
        self.next = node.parent();
        Some(P::project(&node))
    }
}

impl<T, P: Projection<T>> FusedIterator for TowardsRoot<T, P> {}
