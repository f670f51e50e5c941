//! Value ownership: strong `Tracked` handles and the weak `ValueSlot` a node keeps.
//!
//! A `Tracked<T>` is the only way application code owns a value that a tree
//! refers to. Nodes never hold one; they hold a `ValueSlot<T>`, which can be
//! upgraded while some `Tracked<T>` is still alive. When the last `Tracked<T>`
//! is dropped, every release hook still registered on it runs exactly once.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

type ReleaseHook = Box<dyn FnOnce()>;

/// Identifies a registered release hook so its owner can withdraw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Shared<T> {
    value: T,
    next_hook: Cell<u64>,
    hooks: RefCell<Vec<(HookId, ReleaseHook)>>,
}

impl<T> Shared<T> {
    // The removed hook is returned so it is dropped after the borrow ends.
    fn take_hook(&self, id: HookId) -> Option<ReleaseHook> {
        let mut hooks = self.hooks.borrow_mut();
        let pos = hooks.iter().position(|(hook_id, _)| *hook_id == id)?;
        Some(hooks.remove(pos).1)
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // strong count is already zero here, so no slot can upgrade anymore
        let hooks = std::mem::take(self.hooks.get_mut());
        for (_, hook) in hooks {
            hook();
        }
    }
}

/// Shared-ownership handle to a value that notifies when its last clone is dropped.
pub struct Tracked<T>(Rc<Shared<T>>);

impl<T> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(Shared {
            value,
            next_hook: Cell::new(0),
            hooks: RefCell::new(Vec::new()),
        }))
    }

    /// Registers a hook that runs once, when the last strong handle is dropped.
    ///
    /// Hooks run in registration order. The returned id withdraws the hook
    /// again through [`ValueSlot::remove_hook`].
    pub fn on_release(&self, hook: impl FnOnce() + 'static) -> HookId {
        let id = HookId(self.0.next_hook.get());
        self.0.next_hook.set(id.0 + 1);
        self.0.hooks.borrow_mut().push((id, Box::new(hook)));
        id
    }

    /// Number of hooks waiting for this value to be released.
    pub fn pending_hooks(this: &Self) -> usize {
        this.0.hooks.borrow().len()
    }

    /// Number of live strong handles to this value.
    pub fn strong_count(this: &Self) -> usize {
        Rc::strong_count(&this.0)
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    /// A non-owning reference to this value.
    pub fn slot(&self) -> ValueSlot<T> {
        ValueSlot {
            inner: Rc::downgrade(&self.0),
        }
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&self.0.value).finish()
    }
}

impl<T: fmt::Display> fmt::Display for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.value.fmt(f)
    }
}

/// Non-owning reference to a tracked value.
pub struct ValueSlot<T> {
    inner: Weak<Shared<T>>,
}

impl<T> ValueSlot<T> {
    /// A slot that never held a value.
    pub fn empty() -> Self {
        Self { inner: Weak::new() }
    }

    /// Strong handle to the value, or `None` once it expired.
    pub fn get(&self) -> Option<Tracked<T>> {
        self.inner.upgrade().map(Tracked)
    }

    pub fn is_expired(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Withdraws a release hook; a no-op once the value expired.
    pub fn remove_hook(&self, id: HookId) {
        if let Some(shared) = self.inner.upgrade() {
            let removed = shared.take_hook(id);
            drop(removed);
        }
    }
}

impl<T> Clone for ValueSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ValueSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSlot")
            .field("expired", &self.is_expired())
            .finish()
    }
}
