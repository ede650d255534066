//! Level-triggered boolean conditions.
//!
//! A [`Latch`] holds a boolean state and lets tasks wait for it to become
//! `true` or `false`. Unlike a [`Signal`](crate::signal::Signal), a latch is
//! level-triggered: waiting for the state it is already in completes
//! immediately.
//!
//! A [`Fuse`] is a latch that can only be set.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//!
//! use pulsekit::latch::Latch;
//! use pulsekit::runtime::Runtime;
//!
//! let mut runtime = Runtime::new();
//! let scheduler = runtime.scheduler();
//! let ready = Rc::new(Latch::new(false));
//!
//! let waiter = scheduler.spawn(ready.wait_true());
//! runtime.run_until_stalled();
//! assert!(!waiter.is_finished());
//!
//! ready.set();
//! runtime.run_until_stalled();
//! assert!(waiter.is_finished());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::util::wait_queue::{WaitQueue, Waiting};

type Queue = Rc<RefCell<WaitQueue<()>>>;

/// A boolean cell with two independently awaitable conditions.
///
/// Exactly one of the "is set" and "is clear" conditions holds at any time.
/// All waiters pending on a condition are released together when the latch
/// transitions into it; a released waiter completes even if the latch
/// transitions back before the waiter is polled.
pub struct Latch {
    state: Cell<bool>,
    became_true: Queue,
    became_false: Queue,
}

impl Latch {
    /// Creates a latch with the specified initial state.
    pub fn new(state: bool) -> Self {
        Self {
            state: Cell::new(state),
            became_true: Rc::new(RefCell::new(WaitQueue::new())),
            became_false: Rc::new(RefCell::new(WaitQueue::new())),
        }
    }

    /// Sets the latch, releasing all tasks waiting for it to be set.
    ///
    /// This is a no-op if the latch is already set.
    pub fn set(&self) {
        self.transition(true);
    }

    /// Clears the latch, releasing all tasks waiting for it to be clear.
    ///
    /// This is a no-op if the latch is already clear.
    pub fn clear(&self) {
        self.transition(false);
    }

    /// Sets or clears the latch.
    pub fn set_state(&self, state: bool) {
        self.transition(state);
    }

    /// Returns `true` if the latch is set.
    pub fn is_set(&self) -> bool {
        self.state.get()
    }

    /// Returns `true` if the latch is clear.
    pub fn is_clear(&self) -> bool {
        !self.state.get()
    }

    /// Returns a future that completes once the latch is set.
    ///
    /// The future is ready straight away if the latch is already set.
    pub fn wait_true(&self) -> LatchWait {
        self.wait_state(true)
    }

    /// Returns a future that completes once the latch is clear.
    ///
    /// The future is ready straight away if the latch is already clear.
    pub fn wait_false(&self) -> LatchWait {
        self.wait_state(false)
    }

    /// Returns a future that completes once the latch is in the specified
    /// state.
    pub fn wait_state(&self, state: bool) -> LatchWait {
        if self.state.get() == state {
            return LatchWait::ready();
        }

        LatchWait::pending(self.queue(state))
    }

    /// Returns a future that completes when the latch leaves its current
    /// state.
    pub fn wait_toggle(&self) -> LatchWait {
        self.wait_toggle_to(!self.state.get())
    }

    /// Returns a future that completes on the next transition into the
    /// specified state.
    ///
    /// If the latch is already in that state, the future first waits for the
    /// opposite state. It never completes immediately.
    pub fn wait_toggle_to(&self, state: bool) -> LatchWait {
        // Transitions alternate, so the next transition into `state` is
        // necessarily preceded by a transition out of it whenever the latch
        // is in `state` now.
        LatchWait::pending(self.queue(state))
    }

    /// Returns a future that completes on the next transition from clear to
    /// set.
    pub fn wait_toggled_on(&self) -> LatchWait {
        self.wait_toggle_to(true)
    }

    /// Returns a future that completes on the next transition from set to
    /// clear.
    pub fn wait_toggled_off(&self) -> LatchWait {
        self.wait_toggle_to(false)
    }

    fn queue(&self, state: bool) -> &Queue {
        if state {
            &self.became_true
        } else {
            &self.became_false
        }
    }

    fn transition(&self, state: bool) {
        if self.state.replace(state) == state {
            return;
        }
        let released = self.queue(state).borrow_mut().release_all(());
        released.wake();
    }
}

impl Default for Latch {
    /// Creates a clear latch.
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latch")
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

/// A future returned by the waiting methods of [`Latch`] and [`Fuse`].
///
/// The waiter is registered when the future is created. Dropping the future
/// unregisters it.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct LatchWait {
    waiting: Option<Waiting<()>>,
}

impl LatchWait {
    fn ready() -> Self {
        Self { waiting: None }
    }

    fn pending(queue: &Queue) -> Self {
        Self {
            waiting: Some(Waiting::new(queue)),
        }
    }
}

impl Future for LatchWait {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(waiting) = self.waiting.as_mut() else {
            return Poll::Ready(());
        };
        match Pin::new(waiting).poll(cx) {
            Poll::Ready(_) => {
                self.waiting = None;

                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for LatchWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatchWait")
            .field("is_pending", &self.waiting.is_some())
            .finish()
    }
}

/// A latch that can be set once and never cleared.
#[derive(Default)]
pub struct Fuse {
    latch: Latch,
}

impl Fuse {
    /// Creates an unset fuse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fuse, releasing all waiting tasks.
    ///
    /// This is a no-op if the fuse is already set.
    pub fn set(&self) {
        self.latch.set();
    }

    /// Returns `true` if the fuse is set.
    pub fn is_set(&self) -> bool {
        self.latch.is_set()
    }

    /// Returns a future that completes once the fuse is set.
    pub fn wait(&self) -> LatchWait {
        self.latch.wait_true()
    }
}

impl fmt::Debug for Fuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fuse")
            .field("is_set", &self.is_set())
            .finish()
    }
}
