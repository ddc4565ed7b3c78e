//! Reentrant execution-context guard
//!
//! The embedded runtime has a single execution context that at most one
//! thread may be inside at a time. [`ContextGuard::acquire`] blocks until the
//! calling thread owns that context, or succeeds immediately if it already
//! does (a handler dispatching another event). Only the outermost
//! [`ContextEntry`] releases the lock and leaves the isolate when dropped.
//!
//! ```text
//! thread A: acquire ──► enter isolate ──► acquire (depth 2) ──► drop ──► drop ──► exit isolate
//! thread B:        acquire ··· blocked ······························································► owns
//! ```

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::runtime::EmbeddedRuntime;

/// Snapshot of who owns the execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ownership {
    /// Owning thread, if any
    pub owner: Option<ThreadId>,
    /// Nesting depth of the owner's entries (0 when unowned)
    pub depth: usize,
}

#[derive(Default)]
struct ContextState {
    ownership: Ownership,
    // Runtime whose isolate the owner entered during this span
    entered: Option<Arc<dyn EmbeddedRuntime>>,
}

/// Serializes entry into the embedded runtime's execution context
pub struct ContextGuard {
    lock: ReentrantMutex<RefCell<ContextState>>,
}

impl ContextGuard {
    /// Create an unowned guard
    pub fn new() -> Self {
        Self {
            lock: ReentrantMutex::new(RefCell::new(ContextState::default())),
        }
    }

    /// Take (or re-take) the execution context for the calling thread.
    ///
    /// Blocks while another thread owns it. The context is released when the
    /// returned entry is dropped.
    pub fn acquire(&self) -> ContextEntry<'_> {
        let lock = self.lock.lock();
        let current = thread::current().id();
        let took_ownership = {
            let mut state = lock.borrow_mut();
            let ownership = &mut state.ownership;
            if ownership.depth > 0 && ownership.owner == Some(current) {
                ownership.depth += 1;
                false
            } else {
                ownership.owner = Some(current);
                ownership.depth = 1;
                true
            }
        };
        tracing::trace!(took_ownership, "execution context acquired");
        ContextEntry {
            lock,
            took_ownership,
        }
    }

    /// Whether the calling thread is inside an entry of this guard.
    ///
    /// Never blocks: a context owned by another thread reports `false`.
    pub fn is_held_by_current_thread(&self) -> bool {
        match self.lock.try_lock() {
            Some(lock) => {
                let ownership = lock.borrow().ownership;
                ownership.depth > 0 && ownership.owner == Some(thread::current().id())
            }
            None => false,
        }
    }

    /// Current owner and depth.
    ///
    /// Waits for the context to be free unless called by its owner.
    pub fn ownership(&self) -> Ownership {
        let lock = self.lock.lock();
        let ownership = lock.borrow().ownership;
        ownership
    }
}

impl Default for ContextGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lock.try_lock() {
            Some(lock) => f
                .debug_struct("ContextGuard")
                .field("ownership", &lock.borrow().ownership)
                .finish(),
            None => f.debug_struct("ContextGuard").finish_non_exhaustive(),
        }
    }
}

/// One (possibly nested) hold on the execution context
pub struct ContextEntry<'a> {
    lock: ReentrantMutexGuard<'a, RefCell<ContextState>>,
    took_ownership: bool,
}

impl ContextEntry<'_> {
    /// Whether this is the outermost entry on its thread
    pub fn took_ownership(&self) -> bool {
        self.took_ownership
    }

    /// Nesting depth including this entry
    pub fn depth(&self) -> usize {
        self.lock.borrow().ownership.depth
    }

    /// Make the runtime's isolate current, unless already entered in this span
    pub fn enter(&self, runtime: &Arc<dyn EmbeddedRuntime>) {
        let mut state = self.lock.borrow_mut();
        if state.entered.is_none() {
            runtime.enter_isolate();
            state.entered = Some(runtime.clone());
        }
    }

    /// Whether an isolate is current in this span
    pub fn is_entered(&self) -> bool {
        self.lock.borrow().entered.is_some()
    }

    /// Shut down the entered isolate.
    ///
    /// Returns false if no isolate was entered. Afterwards the outermost
    /// entry has nothing left to exit.
    pub fn shutdown_isolate(&self) -> bool {
        let entered = self.lock.borrow_mut().entered.take();
        match entered {
            Some(runtime) => {
                runtime.shutdown_isolate();
                true
            }
            None => false,
        }
    }
}

impl Drop for ContextEntry<'_> {
    fn drop(&mut self) {
        let entered = {
            let mut state = self.lock.borrow_mut();
            if self.took_ownership {
                state.ownership = Ownership::default();
                state.entered.take()
            } else {
                state.ownership.depth -= 1;
                None
            }
        };
        if let Some(runtime) = entered {
            runtime.exit_isolate();
        }
        tracing::trace!(took_ownership = self.took_ownership, "execution context released");
    }
}
