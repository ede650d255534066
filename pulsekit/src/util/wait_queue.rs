//! Ordered collection of suspended waiters.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use slab::Slab;

/// A collection of waiters that are all released at once.
///
/// Each waiter occupies a slab slot from registration until its future either
/// observes the outcome or is dropped. Releasing the queue stores the outcome
/// in every pending slot, so a waiter that is released but not yet polled
/// still observes the value it was released with, whatever happens to the
/// queue in the meantime.
pub(crate) struct WaitQueue<T> {
    waiters: Slab<Waiter<T>>,
    next_seq: u64,
    closed: bool,
}

impl<T: Clone> WaitQueue<T> {
    /// Creates an empty, open queue.
    pub(crate) fn new() -> Self {
        Self {
            waiters: Slab::new(),
            next_seq: 0,
            closed: false,
        }
    }

    /// Registers a new waiter and returns its key.
    ///
    /// A waiter registered on a closed queue is closed straight away.
    pub(crate) fn register(&mut self) -> usize {
        if self.closed {
            return self.waiters.insert(Waiter::Closed);
        }
        let seq = self.next_seq;
        self.next_seq += 1;

        self.waiters.insert(Waiter::Pending { seq, waker: None })
    }

    /// Polls the waiter with the specified key.
    ///
    /// The slot is freed once the outcome is delivered: `Some(value)` if the
    /// waiter was released and `None` if the queue was closed.
    ///
    /// # Panics
    ///
    /// This will panic if the key does not refer to a registered waiter.
    pub(crate) fn poll_waiter(&mut self, key: usize, waker: &Waker) -> Poll<Option<T>> {
        if let Waiter::Pending { waker: slot, .. } = &mut self.waiters[key] {
            match slot {
                Some(registered) if registered.will_wake(waker) => {}
                _ => *slot = Some(waker.clone()),
            }

            return Poll::Pending;
        }

        match self.waiters.remove(key) {
            Waiter::Released(value) => Poll::Ready(Some(value)),
            _ => Poll::Ready(None),
        }
    }

    /// Forgets the waiter with the specified key, if it is still registered.
    pub(crate) fn remove(&mut self, key: usize) {
        self.waiters.try_remove(key);
    }

    /// Releases all pending waiters with the provided value.
    ///
    /// The wakers must be woken by the caller, preferably after the queue is
    /// no longer borrowed.
    pub(crate) fn release_all(&mut self, value: T) -> Released {
        self.settle(|| Waiter::Released(value.clone()))
    }

    /// Closes the queue, releasing all pending waiters with no value.
    pub(crate) fn close(&mut self) -> Released {
        self.closed = true;

        self.settle(|| Waiter::Closed)
    }

    /// Returns `true` if the queue was closed.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the number of waiters that were not released yet.
    pub(crate) fn pending_count(&self) -> usize {
        self.waiters
            .iter()
            .filter(|(_, waiter)| matches!(waiter, Waiter::Pending { .. }))
            .count()
    }

    fn settle(&mut self, mut outcome: impl FnMut() -> Waiter<T>) -> Released {
        let mut released = Vec::new();
        for (_, waiter) in self.waiters.iter_mut() {
            if let Waiter::Pending { seq, waker } = waiter {
                released.push((*seq, waker.take()));
                *waiter = outcome();
            }
        }
        released.sort_unstable_by_key(|(seq, _)| *seq);

        Released {
            count: released.len(),
            wakers: released.into_iter().filter_map(|(_, w)| w).collect(),
        }
    }
}

impl<T: Clone> Default for WaitQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The waiters released in one step, in registration order.
#[must_use = "released waiters must be woken"]
pub(crate) struct Released {
    count: usize,
    wakers: Vec<Waker>,
}

impl Released {
    /// Wakes all released waiters that were polled at least once and returns
    /// the total number of released waiters.
    pub(crate) fn wake(self) -> usize {
        for waker in self.wakers {
            waker.wake();
        }

        self.count
    }
}

enum Waiter<T> {
    Pending { seq: u64, waker: Option<Waker> },
    Released(T),
    Closed,
}

/// A future registered in a shared [`WaitQueue`].
///
/// Registration happens when the future is created, not when it is first
/// polled. Dropping the future unregisters it.
pub(crate) struct Waiting<T: Clone> {
    queue: Rc<RefCell<WaitQueue<T>>>,
    key: Option<usize>,
}

impl<T: Clone> Waiting<T> {
    /// Registers a new waiter in the queue.
    pub(crate) fn new(queue: &Rc<RefCell<WaitQueue<T>>>) -> Self {
        let key = queue.borrow_mut().register();

        Self {
            queue: queue.clone(),
            key: Some(key),
        }
    }
}

impl<T: Clone> Future for Waiting<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let key = self
            .key
            .expect("`Waiting` future polled after completion");
        let outcome = self.queue.borrow_mut().poll_waiter(key, cx.waker());
        if outcome.is_ready() {
            self.key = None;
        }

        outcome
    }
}

impl<T: Clone> Drop for Waiting<T> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            // Don't use `borrow_mut()`: a destructor should not panic. In the
            // worst case the slot leaks until the queue itself is dropped.
            if let Ok(mut queue) = self.queue.try_borrow_mut() {
                queue.remove(key);
            }
        }
    }
}
