//! Edge-triggered broadcast wake-ups.
//!
//! Firing a [`Signal`] wakes every task currently waiting on it and hands
//! each of them the runtime time of the firing. A task that starts waiting
//! after a firing will not observe it: signals do not keep a backlog, and a
//! firing with no waiter is simply lost.
//!
//! A [`PeriodicSignal`] fires automatically at regular intervals.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use pulsekit::runtime::Runtime;
//! use pulsekit::signal::Signal;
//! use pulsekit::time::MonotonicTime;
//!
//! let mut runtime = Runtime::new();
//! let scheduler = runtime.scheduler();
//! let signal = Rc::new(Signal::new(&scheduler));
//!
//! let s = signal.clone();
//! let waiter = scheduler.spawn(async move { s.wait().await.unwrap() });
//! runtime.run_until_stalled();
//!
//! runtime.step_by(Duration::from_secs(1));
//! assert_eq!(signal.fire(), 1);
//!
//! let fired_at = runtime.block_on(waiter).unwrap().unwrap();
//! assert_eq!(fired_at, MonotonicTime::EPOCH + Duration::from_secs(1));
//! ```

mod periodic;

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_util::Stream;
use slab::Slab;

use crate::runtime::Scheduler;
use crate::time::MonotonicTime;
use crate::util::wait_queue::{WaitQueue, Waiting};

pub use periodic::PeriodicSignal;

type Queue = Rc<RefCell<WaitQueue<MonotonicTime>>>;
type Callback = Rc<dyn Fn(MonotonicTime)>;

/// A broadcast, edge-triggered wake-up carrying the time of the firing.
pub struct Signal {
    scheduler: Scheduler,
    waiters: Queue,
    last_fired: Cell<Option<MonotonicTime>>,
    callbacks: RefCell<Slab<Callback>>,
}

impl Signal {
    /// Creates a signal timestamped by the runtime of the provided scheduler.
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            scheduler: scheduler.clone(),
            waiters: Rc::new(RefCell::new(WaitQueue::new())),
            last_fired: Cell::new(None),
            callbacks: RefCell::new(Slab::new()),
        }
    }

    /// Fires the signal.
    ///
    /// Every pending waiter is released with the current runtime time, in the
    /// order in which the waiters were registered, and the registered
    /// callbacks are then called with the same time. The number of released
    /// waiters is returned.
    ///
    /// This is a no-op if the signal is closed.
    pub fn fire(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        let now = self.scheduler.time();
        self.last_fired.set(Some(now));

        let released = self.waiters.borrow_mut().release_all(now);
        let count = released.wake();

        // Callbacks may add or remove callbacks.
        let callbacks: Vec<Callback> = self
            .callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(now);
        }

        count
    }

    /// Returns a future that resolves to the time of the next firing.
    ///
    /// The waiter is registered when this method is called, so a firing that
    /// occurs before the future is first polled is still observed. The future
    /// resolves to an error if the signal is closed first.
    pub fn wait(&self) -> SignalWait {
        SignalWait {
            waiting: Waiting::new(&self.waiters),
        }
    }

    /// Returns a stream of firing times.
    ///
    /// The stream registers a waiter each time it is polled for a new item,
    /// so firings that occur between two polls are missed. It ends when the
    /// signal is closed.
    pub fn stream(&self) -> SignalStream {
        SignalStream {
            queue: self.waiters.clone(),
            waiting: None,
            terminated: false,
        }
    }

    /// Returns the time of the last firing, if any.
    pub fn last_fired(&self) -> Option<MonotonicTime> {
        self.last_fired.get()
    }

    /// Returns the number of pending waiters.
    pub fn waiter_count(&self) -> usize {
        self.waiters.borrow().pending_count()
    }

    /// Registers a callback called with the firing time on each firing, after
    /// the waiters have been released.
    pub fn add_callback<F>(&self, callback: F) -> CallbackKey
    where
        F: Fn(MonotonicTime) + 'static,
    {
        CallbackKey(self.callbacks.borrow_mut().insert(Rc::new(callback)))
    }

    /// Unregisters a callback.
    ///
    /// Returns `false` if no callback was registered with this key.
    pub fn remove_callback(&self, key: CallbackKey) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        if !callbacks.contains(key.0) {
            return false;
        }
        callbacks.remove(key.0);

        true
    }

    /// Closes the signal.
    ///
    /// Pending and future waiters resolve to [`SignalClosed`], streams end
    /// and firing becomes a no-op.
    pub fn close(&self) {
        let released = self.waiters.borrow_mut().close();
        released.wake();
    }

    /// Returns `true` if the signal was closed.
    pub fn is_closed(&self) -> bool {
        self.waiters.borrow().is_closed()
    }
}

impl<'a> IntoFuture for &'a Signal {
    type Output = Result<MonotonicTime, SignalClosed>;
    type IntoFuture = SignalWait;

    fn into_future(self) -> Self::IntoFuture {
        self.wait()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("waiter_count", &self.waiter_count())
            .field("last_fired", &self.last_fired())
            .field("is_closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// A key identifying a callback registered on a signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallbackKey(usize);

/// A future resolving to the time of the next firing of a signal.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct SignalWait {
    waiting: Waiting<MonotonicTime>,
}

impl Future for SignalWait {
    type Output = Result<MonotonicTime, SignalClosed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.waiting)
            .poll(cx)
            .map(|time| time.ok_or(SignalClosed {}))
    }
}

impl fmt::Debug for SignalWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalWait").finish_non_exhaustive()
    }
}

/// A stream of the firing times of a signal.
#[must_use = "streams do nothing unless polled"]
pub struct SignalStream {
    queue: Queue,
    waiting: Option<Waiting<MonotonicTime>>,
    terminated: bool,
}

impl Stream for SignalStream {
    type Item = MonotonicTime;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }
        let this = &mut *self;
        let waiting = this
            .waiting
            .get_or_insert_with(|| Waiting::new(&this.queue));

        match Pin::new(waiting).poll(cx) {
            Poll::Ready(outcome) => {
                this.waiting = None;
                this.terminated = outcome.is_none();

                Poll::Ready(outcome)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for SignalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalStream")
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

/// An error returned when waiting on a closed signal.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct SignalClosed {}

impl fmt::Display for SignalClosed {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "the signal was closed")
    }
}

impl Error for SignalClosed {}
