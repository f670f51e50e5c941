//! Tree vertex with a weak value, a weak parent link and owned children.
//!
//! `Node<T>` is an owning handle: cloning it adds an owner, exactly like
//! cloning an `Rc`. A parent owns its children; a child refers to its parent
//! through a `Weak` link only, so ownership flows strictly downwards.
//!
//! The value is never owned by the tree. Application code owns it through
//! [`Tracked`] handles, and once the last one is dropped the node runs its
//! cleanup policy (see [`crate::domain::cleanup`]).
//!
//! # Caller obligations
//!
//! The structure must remain a forest. Making a node its own ancestor via
//! [`Node::set_parent`] is not detected; cleanup resolution and
//! [`Node::towards_root`] would never terminate on such a cycle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use tracing::{instrument, trace};

use crate::domain::cleanup::{self, CleanupMode, Strategy};
use crate::domain::slot::{HookId, Tracked, ValueSlot};
use crate::domain::view::{Breadth, Depth, ItemsView, NodeView, Nodes, TowardsRoot, ValueView};

/// Caller hook invoked when a node's value expires, before cleanup runs.
pub type ExpireCallback<T> = Box<dyn FnOnce(&Node<T>)>;

struct NodeInner<T> {
    value: ValueSlot<T>,
    parent: RefCell<Weak<NodeInner<T>>>,
    children: RefCell<Vec<Node<T>>>,
    cleanup_mode: CleanupMode,
    release_hook: Cell<Option<HookId>>,
    on_expire: RefCell<Option<ExpireCallback<T>>>,
}

impl<T> Drop for NodeInner<T> {
    // Withdraws the release hook, then releases the subtree iteratively so
    // very tall trees do not overflow the stack.
    fn drop(&mut self) {
        if let Some(id) = self.release_hook.take() {
            self.value.remove_hook(id);
        }
        let mut pending = std::mem::take(self.children.get_mut());
        while let Some(child) = pending.pop() {
            if let Ok(mut inner) = Rc::try_unwrap(child.0) {
                pending.append(inner.children.get_mut());
            }
        }
    }
}

/// Owning handle to a tree node.
pub struct Node<T>(Rc<NodeInner<T>>);

/// Non-owning handle to a tree node.
pub struct WeakNode<T>(Weak<NodeInner<T>>);

impl<T: 'static> Node<T> {
    /// Creates a top-level node referring to `value` with `CleanupMode::Default`.
    pub fn new(value: &Tracked<T>) -> Self {
        Self::builder(value).build()
    }

    /// Starts building a node referring to `value`.
    pub fn builder(value: &Tracked<T>) -> NodeBuilder<'_, T> {
        NodeBuilder {
            value,
            parent: None,
            cleanup_mode: CleanupMode::Default,
            on_expire: None,
        }
    }

    /// Creates a child of `self` with `CleanupMode::Default`.
    ///
    /// The returned handle and `self` both own the new node.
    pub fn add_child(&self, value: &Tracked<T>) -> Node<T> {
        self.branch(value).build()
    }

    pub fn add_child_with_mode(&self, value: &Tracked<T>, mode: CleanupMode) -> Node<T> {
        self.branch(value).cleanup_mode(mode).build()
    }

    /// Starts building a child of `self`, for setting a mode or an expiry callback.
    pub fn branch<'a>(&'a self, value: &'a Tracked<T>) -> NodeBuilder<'a, T> {
        Self::builder(value).parent(self)
    }
}

impl<T> Node<T> {
    /// The referenced value, or `None` once its last owner released it.
    pub fn value(&self) -> Option<Tracked<T>> {
        self.0.value.get()
    }

    pub fn is_expired(&self) -> bool {
        self.0.value.is_expired()
    }

    pub fn cleanup_mode(&self) -> CleanupMode {
        self.0.cleanup_mode
    }

    /// The strategy that would run if the value expired now.
    pub fn effective_strategy(&self) -> Strategy {
        Strategy::resolve(self)
    }

    pub fn parent(&self) -> Option<Node<T>> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn is_top_level(&self) -> bool {
        self.parent().is_none()
    }

    /// Moves this node under `new_parent`, or makes it top-level for `None`.
    ///
    /// Removes it from the old parent's children, repoints the weak parent
    /// link, then registers it with the new parent.
    #[instrument(level = "trace", skip_all, fields(top_level = new_parent.is_none()))]
    pub fn set_parent(&self, new_parent: Option<&Node<T>>) {
        let released = self.parent().and_then(|old| old.remove_child(self));
        match new_parent {
            Some(parent) => {
                *self.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
                parent.insert_child(self.clone());
            }
            None => *self.0.parent.borrow_mut() = Weak::new(),
        }
        trace!("relinked node");
        drop(released);
    }

    /// Snapshot of the current children.
    ///
    /// Sibling order is not part of the contract.
    pub fn children(&self) -> Vec<Node<T>> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn has_child(&self, node: &Node<T>) -> bool {
        self.0.children.borrow().iter().any(|c| c.ptr_eq(node))
    }

    /// Number of ancestors above this node.
    pub fn level(&self) -> usize {
        self.towards_root().count() - 1
    }

    /// The furthest ancestor, or `self` when top-level.
    pub fn top(&self) -> Node<T> {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Nodes of this subtree without children.
    pub fn leaves(&self) -> Vec<Node<T>> {
        self.breadth().filter(|n| n.child_count() == 0).collect()
    }

    /// Breadth-first walk of this subtree, starting with `self`.
    pub fn breadth(&self) -> Breadth<T, Nodes> {
        Breadth::new(self.clone())
    }

    /// Depth-first walk of this subtree; sibling order unspecified.
    pub fn depth(&self) -> Depth<T, Nodes> {
        Depth::new(self.clone())
    }

    /// `self`, then each ancestor up to the top-level node.
    pub fn towards_root(&self) -> TowardsRoot<T, Nodes> {
        TowardsRoot::new(self.clone())
    }

    pub fn view(&self) -> NodeView<T> {
        NodeView::new(self)
    }

    pub fn values(&self) -> ValueView<T> {
        ValueView::new(self)
    }

    pub fn items(&self) -> ItemsView<T> {
        ItemsView::new(self)
    }

    pub fn downgrade(&self) -> WeakNode<T> {
        WeakNode(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Node<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of owning handles, the parent's entry included.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Hands out the expiry callback; later calls get `None`.
    pub(crate) fn take_expire_callback(&self) -> Option<ExpireCallback<T>> {
        self.0.on_expire.borrow_mut().take()
    }

    /// Removes this node from its parent and clears its parent link.
    pub(crate) fn detach(&self) {
        let released = self.parent().and_then(|parent| parent.remove_child(self));
        *self.0.parent.borrow_mut() = Weak::new();
        drop(released);
    }

    /// Empties the child set, handing ownership of the former children to the caller.
    pub(crate) fn take_children(&self) -> Vec<Node<T>> {
        std::mem::take(&mut *self.0.children.borrow_mut())
    }

    fn insert_child(&self, child: Node<T>) {
        let mut children = self.0.children.borrow_mut();
        if !children.iter().any(|c| c.ptr_eq(&child)) {
            children.push(child);
        }
    }

    // The removed handle is returned so it is dropped after the borrow ends.
    fn remove_child(&self, child: &Node<T>) -> Option<Node<T>> {
        let mut children = self.0.children.borrow_mut();
        let pos = children.iter().position(|c| c.ptr_eq(child))?;
        Some(children.remove(pos))
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Node<T> {}

impl<T> Hash for Node<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state)
    }
}

impl<'a, T> IntoIterator for &'a Node<T> {
    type Item = Node<T>;
    type IntoIter = Breadth<T, Nodes>;

    fn into_iter(self) -> Self::IntoIter {
        self.breadth()
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value())
            .field("cleanup_mode", &self.cleanup_mode())
            .field("children", &self.child_count())
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "Node({})", value),
            None => write!(f, "Node(<expired>)"),
        }
    }
}

impl<T> WeakNode<T> {
    pub fn upgrade(&self) -> Option<Node<T>> {
        self.0.upgrade().map(Node)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn ptr_eq(&self, other: &WeakNode<T>) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for WeakNode<T> {
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}

impl<T> fmt::Debug for WeakNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNode")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Configures a node before it is created and wired to its value.
pub struct NodeBuilder<'a, T> {
    value: &'a Tracked<T>,
    parent: Option<&'a Node<T>>,
    cleanup_mode: CleanupMode,
    on_expire: Option<ExpireCallback<T>>,
}

impl<'a, T: 'static> NodeBuilder<'a, T> {
    /// Links the new node under `parent`, as `set_parent` would.
    pub fn parent(mut self, parent: &'a Node<T>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn cleanup_mode(mut self, mode: CleanupMode) -> Self {
        self.cleanup_mode = mode;
        self
    }

    /// Callback run when the value expires, before cleanup.
    ///
    /// Runs under every mode, but only while the node exists; it is dropped
    /// together with the node.
    pub fn on_expire(mut self, callback: impl FnOnce(&Node<T>) + 'static) -> Self {
        self.on_expire = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Node<T> {
        let node = Node(Rc::new(NodeInner {
            value: self.value.slot(),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            cleanup_mode: self.cleanup_mode,
            release_hook: Cell::new(None),
            on_expire: RefCell::new(self.on_expire),
        }));

        let weak = node.downgrade();
        let id = self
            .value
            .on_release(move || cleanup::on_value_expired(weak));
        node.0.release_hook.set(Some(id));

        if let Some(parent) = self.parent {
            node.set_parent(Some(parent));
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[ctor::ctor]
    fn init() {
        crate::util::testing::init_test_setup();
    }

    fn values(n: usize) -> Vec<Tracked<usize>> {
        (0..n).map(Tracked::new).collect()
    }

    #[test]
    fn given_new_node_then_is_top_level_with_value() {
        let value = Tracked::new("root");
        let node = Node::new(&value);
        assert!(node.is_top_level());
        assert_eq!(node.value().map(|v| *v), Some("root"));
        assert_eq!(node.cleanup_mode(), CleanupMode::Default);
        assert_eq!(node.child_count(), 0);
    }

    #[test]
    fn given_add_child_when_inspecting_then_links_both_ways() {
        let vs = values(2);
        let root = Node::new(&vs[0]);
        let child = root.add_child(&vs[1]);

        assert_eq!(child.parent(), Some(root.clone()));
        assert!(root.has_child(&child));
        assert_eq!(child.strong_count(), 2, "handle plus parent entry");
    }

    #[test]
    fn given_returned_handle_dropped_then_parent_keeps_child_alive() {
        let vs = values(2);
        let root = Node::new(&vs[0]);
        let weak = root.add_child(&vs[1]).downgrade();
        assert!(weak.is_alive());
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn given_parent_dropped_then_child_handle_sees_no_parent() {
        let vs = values(2);
        let root = Node::new(&vs[0]);
        let child = root.add_child(&vs[1]);
        drop(root);
        assert!(child.parent().is_none());
    }

    #[test]
    fn given_set_parent_when_relinking_then_moves_between_child_sets() {
        let vs = values(3);
        let a = Node::new(&vs[0]);
        let b = Node::new(&vs[1]);
        let child = a.add_child(&vs[2]);

        child.set_parent(Some(&b));

        assert!(!a.has_child(&child));
        assert!(b.has_child(&child));
        assert_eq!(child.parent(), Some(b.clone()));
    }

    #[test]
    fn given_set_parent_none_then_node_becomes_top_level() {
        let vs = values(2);
        let root = Node::new(&vs[0]);
        let child = root.add_child(&vs[1]);

        child.set_parent(None);

        assert!(child.is_top_level());
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn given_same_parent_when_set_again_then_membership_stays_unique() {
        let vs = values(2);
        let root = Node::new(&vs[0]);
        let child = root.add_child(&vs[1]);

        child.set_parent(Some(&root));
        child.set_parent(Some(&root));

        assert_eq!(root.child_count(), 1);
        assert!(root.has_child(&child));
    }

    #[test]
    fn given_builder_with_parent_then_links_like_set_parent() {
        let vs = values(2);
        let root = Node::new(&vs[0]);
        let child = Node::builder(&vs[1])
            .parent(&root)
            .cleanup_mode(CleanupMode::Reparent)
            .build();
        assert!(root.has_child(&child));
        assert_eq!(child.cleanup_mode(), CleanupMode::Reparent);
    }

    #[test]
    fn given_value_released_then_node_reports_expired() {
        let root_value = Tracked::new(0);
        let root = Node::new(&root_value);
        let value = Tracked::new(1);
        let child = root.add_child_with_mode(&value, CleanupMode::NoCleanup);

        drop(value);

        assert!(child.value().is_none());
        assert!(child.is_expired());
        assert!(root.has_child(&child));
    }

    #[test]
    fn given_value_held_by_caller_when_reading_then_value_stays_alive() {
        let value = Tracked::new(5);
        let node = Node::new(&value);
        let read = node.value();
        drop(value);
        assert_eq!(read.as_deref(), Some(&5));
        assert!(!node.is_expired());
        drop(read);
        assert!(node.is_expired());
    }

    #[test]
    fn given_on_expire_when_node_already_dropped_then_callback_never_runs() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let value = Tracked::new(1);
        let node = Node::builder(&value)
            .on_expire(move |_| counter.set(counter.get() + 1))
            .build();

        drop(node);
        assert_eq!(Rc::strong_count(&calls), 1, "callback dropped with its node");
        drop(value);

        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn given_on_expire_then_runs_before_cleanup() {
        let root_value = Tracked::new(0);
        let root = Node::new(&root_value);
        let value = Tracked::new(1);
        let attached_during_callback = Rc::new(Cell::new(false));
        let flag = Rc::clone(&attached_during_callback);
        let child = root
            .branch(&value)
            .cleanup_mode(CleanupMode::Prune)
            .on_expire(move |node| flag.set(node.parent().is_some()))
            .build();

        drop(value);

        assert!(attached_during_callback.get());
        assert!(!root.has_child(&child));
    }

    #[test]
    fn given_many_short_lived_nodes_on_one_value_then_hooks_do_not_accumulate() {
        let value = Tracked::new(0);
        for _ in 0..10_000 {
            drop(Node::new(&value));
        }
        assert_eq!(Tracked::pending_hooks(&value), 0);

        let kept = Node::new(&value);
        assert_eq!(Tracked::pending_hooks(&value), 1);
        drop(kept);
        assert_eq!(Tracked::pending_hooks(&value), 0);
    }

    #[test]
    fn given_dropped_subtree_then_every_node_withdraws_its_hook() {
        let value = Tracked::new(0);
        let root = Node::new(&value);
        let child = root.add_child(&value);
        child.add_child(&value);
        drop(child);
        assert_eq!(Tracked::pending_hooks(&value), 3);

        drop(root);

        assert_eq!(Tracked::pending_hooks(&value), 0);
    }

    #[test]
    fn given_chain_when_querying_level_and_top_then_counts_ancestors() {
        let vs = values(4);
        let root = Node::new(&vs[0]);
        let a = root.add_child(&vs[1]);
        let b = a.add_child(&vs[2]);
        let c = b.add_child(&vs[3]);

        assert_eq!(root.level(), 0);
        assert_eq!(c.level(), 3);
        assert_eq!(c.top(), root);
    }

    #[test]
    fn given_tall_chain_when_dropped_then_does_not_overflow() {
        let vs = values(100_000);
        let root = Node::new(&vs[0]);
        let mut tip = root.clone();
        for v in &vs[1..] {
            tip = tip.add_child(v);
        }
        drop(tip);
        drop(root);
    }

    #[test]
    fn given_display_then_shows_value_or_expired() {
        let value = Tracked::new("x");
        let node = Node::builder(&value)
            .cleanup_mode(CleanupMode::NoCleanup)
            .build();
        assert_eq!(node.to_string(), "Node(x)");
        drop(value);
        assert_eq!(node.to_string(), "Node(<expired>)");
    }
}
