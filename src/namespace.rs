use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

/// The holder of "the thing statements run against". The console owns one
/// namespace per run; clones are handles onto the same slot, so a swap is
/// observed everywhere at once and nothing can keep the displaced context
/// alive through the handle.
pub struct Namespace<C> {
    inner: Rc<RefCell<C>>,
}

impl<C> Clone for Namespace<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C> Namespace<C> {
    pub fn new(context: C) -> Self {
        Self {
            inner: Rc::new(RefCell::new(context)),
        }
    }

    /// Swap in a new context in one step, returning the displaced one.
    pub fn replace(&self, context: C) -> C {
        mem::replace(&mut *self.inner.borrow_mut(), context)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn with_ref<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.inner.borrow())
    }
}
