use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::IntoFuture;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::runtime::{ActionKey, Scheduler};
use crate::time::{nth_deadline, MonotonicTime};

use super::{CallbackKey, Signal, SignalClosed, SignalStream, SignalWait};

/// A signal fired automatically at a fixed period.
///
/// The signal starts ticking upon construction: the `n`-th firing is
/// scheduled at exactly `start_time + n·period`, where `start_time` is the
/// runtime time at construction. Deadlines are computed from the start time
/// rather than from the previous firing, so a firing that runs late does not
/// delay the ones that follow.
///
/// The signal ticks until it is stopped or dropped.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use pulsekit::runtime::Runtime;
/// use pulsekit::signal::PeriodicSignal;
/// use pulsekit::time::MonotonicTime;
///
/// let mut runtime = Runtime::new();
/// let signal = PeriodicSignal::new(&runtime.scheduler(), Duration::from_millis(250));
///
/// runtime.step_by(Duration::from_secs(1));
///
/// assert_eq!(signal.tick_count(), 4);
/// assert_eq!(
///     signal.next_deadline(),
///     Some(MonotonicTime::EPOCH + Duration::from_millis(1250))
/// );
/// ```
pub struct PeriodicSignal {
    inner: Rc<Inner>,
}

struct Inner {
    scheduler: Scheduler,
    signal: Signal,
    period: Duration,
    start_time: MonotonicTime,
    tick_count: Cell<u64>,
    next: RefCell<Option<(MonotonicTime, ActionKey)>>,
    stopped: Cell<bool>,
}

impl PeriodicSignal {
    /// Creates a periodic signal and schedules its first firing one period
    /// from now.
    ///
    /// # Panics
    ///
    /// This will panic if the period is zero.
    pub fn new(scheduler: &Scheduler, period: Duration) -> Self {
        assert!(!period.is_zero(), "the period of a periodic signal cannot be zero");

        let start_time = scheduler.time();
        let inner = Rc::new(Inner {
            scheduler: scheduler.clone(),
            signal: Signal::new(scheduler),
            period,
            start_time,
            tick_count: Cell::new(0),
            next: RefCell::new(None),
            stopped: Cell::new(false),
        });
        Inner::schedule(&inner, nth_deadline(start_time, period, 1));

        Self { inner }
    }

    /// Returns the period.
    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Returns the runtime time at construction.
    pub fn start_time(&self) -> MonotonicTime {
        self.inner.start_time
    }

    /// Returns the number of firings so far.
    pub fn tick_count(&self) -> u64 {
        self.inner.tick_count.get()
    }

    /// Returns the deadline of the next firing, or `None` once stopped.
    pub fn next_deadline(&self) -> Option<MonotonicTime> {
        self.inner
            .next
            .borrow()
            .as_ref()
            .map(|(deadline, _)| *deadline)
    }

    /// Returns a future that resolves to the time of the next firing.
    ///
    /// See [`Signal::wait()`].
    pub fn wait(&self) -> SignalWait {
        self.inner.signal.wait()
    }

    /// Returns a stream of firing times that ends when the signal is stopped.
    ///
    /// See [`Signal::stream()`].
    pub fn stream(&self) -> SignalStream {
        self.inner.signal.stream()
    }

    /// Returns the time of the last firing, if any.
    pub fn last_fired(&self) -> Option<MonotonicTime> {
        self.inner.signal.last_fired()
    }

    /// Returns the number of pending waiters.
    pub fn waiter_count(&self) -> usize {
        self.inner.signal.waiter_count()
    }

    /// Registers a callback called on each firing.
    ///
    /// See [`Signal::add_callback()`].
    pub fn add_callback<F>(&self, callback: F) -> CallbackKey
    where
        F: Fn(MonotonicTime) + 'static,
    {
        self.inner.signal.add_callback(callback)
    }

    /// Unregisters a callback.
    pub fn remove_callback(&self, key: CallbackKey) -> bool {
        self.inner.signal.remove_callback(key)
    }

    /// Stops the signal.
    ///
    /// The pending firing is cancelled and the signal is closed, so pending
    /// waiters resolve to [`SignalClosed`] and streams end. Calling this
    /// method again has no effect.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Returns `true` if the signal was stopped.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }
}

impl Drop for PeriodicSignal {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl<'a> IntoFuture for &'a PeriodicSignal {
    type Output = Result<MonotonicTime, SignalClosed>;
    type IntoFuture = SignalWait;

    fn into_future(self) -> Self::IntoFuture {
        self.wait()
    }
}

impl fmt::Debug for PeriodicSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicSignal")
            .field("period", &self.period())
            .field("start_time", &self.start_time())
            .field("tick_count", &self.tick_count())
            .field("is_stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn schedule(this: &Rc<Self>, deadline: MonotonicTime) {
        let inner = Rc::downgrade(this);
        let key = this.scheduler.schedule_at(deadline, move || {
            if let Some(inner) = inner.upgrade() {
                Inner::tick(&inner);
            }
        });
        *this.next.borrow_mut() = Some((deadline, key));
    }

    fn tick(this: &Rc<Self>) {
        if this.stopped.get() {
            return;
        }
        // The action being run owns the key.
        this.next.borrow_mut().take();

        this.signal.fire();
        let tick_count = this.tick_count.get() + 1;
        this.tick_count.set(tick_count);
        trace!(tick_count, "periodic signal fired");

        // A callback may have stopped the signal.
        if this.stopped.get() {
            return;
        }
        Inner::schedule(
            this,
            nth_deadline(this.start_time, this.period, tick_count + 1),
        );
    }

    fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        let next = self.next.borrow_mut().take();
        if let Some((_, key)) = next {
            key.cancel();
        }
        self.signal.close();
        debug!(tick_count = self.tick_count.get(), "periodic signal stopped");
    }
}
