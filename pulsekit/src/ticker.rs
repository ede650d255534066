//! Drift-free periodic ticking with completion tracking.
//!
//! A [`Ticker`] fires a readiness signal once per period, counts its
//! iterations, optionally stops after a fixed number of ticks and can drive
//! repeating jobs, either on the runtime thread or on worker threads.
//!
//! The lifecycle of a ticker is *unstarted → running → done*, where *done* is
//! terminal. Once started at time `t0`, the `n`-th tick is scheduled at
//! exactly `t0 + n·period`.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use futures_util::StreamExt;
//!
//! use pulsekit::runtime::Runtime;
//! use pulsekit::ticker::TickerBuilder;
//! use pulsekit::time::MonotonicTime;
//!
//! let mut runtime = Runtime::new();
//! let ticker = TickerBuilder::new(Duration::from_millis(100))
//!     .count(3)
//!     .build(&runtime.scheduler());
//!
//! let ticks = runtime.block_on(ticker.stream().collect::<Vec<_>>()).unwrap();
//!
//! let t0 = MonotonicTime::EPOCH;
//! assert_eq!(
//!     ticks,
//!     vec![
//!         t0 + Duration::from_millis(100),
//!         t0 + Duration::from_millis(200),
//!         t0 + Duration::from_millis(300),
//!     ]
//! );
//! assert!(ticker.is_done());
//! ```

mod builder;
mod job;
mod stream;

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::future::IntoFuture;
use std::rc::Rc;
use std::time::Duration;

use futures_util::StreamExt;
use tracing::{debug, trace, warn};

use crate::latch::{Latch, LatchWait};
use crate::runtime::{ActionKey, Scheduler, TaskHandle, TaskMonitor};
use crate::signal::{Signal, SignalClosed, SignalWait};
use crate::time::{nth_deadline, saturating_duration_since, MonotonicTime};

pub use builder::TickerBuilder;
pub use job::Job;
pub use stream::TickerStream;

/// A periodic ticker.
///
/// See the [module-level documentation](crate::ticker) for an overview.
pub struct Ticker {
    inner: Rc<Inner>,
}

struct Inner {
    scheduler: Scheduler,
    period: Duration,
    max_count: Option<u64>,
    state: RefCell<State>,
    ready: Signal,
    done: Latch,
    tasks: RefCell<Vec<TaskMonitor>>,
}

#[derive(Default)]
struct State {
    start_time: Option<MonotonicTime>,
    iteration_count: u64,
    next_tick: Option<(MonotonicTime, ActionKey)>,
}

impl Ticker {
    /// Creates and starts a ticker that ticks until stopped.
    ///
    /// Use [`TickerBuilder`] to limit the number of ticks or to defer the
    /// start.
    ///
    /// # Panics
    ///
    /// This will panic if the period is zero.
    pub fn new(scheduler: &Scheduler, period: Duration) -> Self {
        TickerBuilder::new(period).build(scheduler)
    }

    fn from_parts(scheduler: &Scheduler, period: Duration, max_count: Option<u64>) -> Self {
        assert!(!period.is_zero(), "the period of a ticker cannot be zero");

        Self {
            inner: Rc::new(Inner {
                scheduler: scheduler.clone(),
                period,
                max_count,
                state: RefCell::new(State::default()),
                ready: Signal::new(scheduler),
                done: Latch::new(false),
                tasks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Starts the ticker; the first tick occurs one period from now.
    ///
    /// An error is returned if the ticker was already started, or if it was
    /// stopped before being started.
    pub fn start(&self) -> Result<(), TickerError> {
        if self.inner.state.borrow().start_time.is_some() {
            return Err(TickerError::AlreadyStarted);
        }
        if self.inner.done.is_set() {
            return Err(TickerError::Finished);
        }
        let start_time = self.inner.scheduler.time();
        self.inner.state.borrow_mut().start_time = Some(start_time);
        debug!(?start_time, period = ?self.inner.period, max_count = ?self.inner.max_count, "ticker started");

        Inner::schedule(&self.inner, nth_deadline(start_time, self.inner.period, 1));

        Ok(())
    }

    /// Stops the ticker.
    ///
    /// The pending tick is cancelled and the ticker is done. Calling this
    /// method again has no effect.
    pub fn stop(&self) {
        if !self.inner.done.is_set() {
            debug!(
                iteration_count = self.iteration_count(),
                "ticker stopped"
            );
        }
        self.inner.finish();
    }

    /// Returns the period.
    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Returns the maximum number of ticks, if any.
    pub fn max_count(&self) -> Option<u64> {
        self.inner.max_count
    }

    /// Returns the number of ticks so far.
    pub fn iteration_count(&self) -> u64 {
        self.inner.state.borrow().iteration_count
    }

    /// Returns `true` if the ticker was started.
    pub fn is_started(&self) -> bool {
        self.inner.state.borrow().start_time.is_some()
    }

    /// Returns `true` if the ticker is done.
    pub fn is_done(&self) -> bool {
        self.inner.done.is_set()
    }

    /// Returns the start time, if started.
    pub fn start_time(&self) -> Option<MonotonicTime> {
        self.inner.state.borrow().start_time
    }

    /// Returns the deadline of the next tick, if one is scheduled.
    pub fn next_deadline(&self) -> Option<MonotonicTime> {
        self.inner
            .state
            .borrow()
            .next_tick
            .as_ref()
            .map(|(deadline, _)| *deadline)
    }

    /// Returns the time remaining until the next tick.
    ///
    /// An error is returned if the ticker was not started or is done.
    pub fn until_next(&self) -> Result<Duration, TickerError> {
        let state = self.inner.state.borrow();
        if state.start_time.is_none() {
            return Err(TickerError::NotStarted);
        }
        match &state.next_tick {
            Some((deadline, _)) if !self.inner.done.is_set() => Ok(saturating_duration_since(
                *deadline,
                self.inner.scheduler.time(),
            )),
            _ => Err(TickerError::Finished),
        }
    }

    /// Returns a future that completes once the ticker is done.
    pub fn wait_done(&self) -> LatchWait {
        self.inner.done.wait_true()
    }

    /// Returns a future that resolves to the time of the next tick.
    ///
    /// The future resolves to an error if the ticker is done before the next
    /// tick.
    pub fn wait(&self) -> SignalWait {
        self.inner.ready.wait()
    }

    /// Returns a stream of tick times that ends once the ticker is done.
    pub fn stream(&self) -> TickerStream {
        TickerStream::new(self.inner.clone())
    }

    /// Spawns a task that runs the job once per tick on the runtime thread.
    ///
    /// Ticks occurring while the job is still running are skipped. The task
    /// ends once the ticker is done.
    pub fn run_periodically(&self, job: Job) -> TaskHandle<()> {
        let mut ticks = self.stream();
        let handle = self.inner.scheduler.spawn(async move {
            match job {
                Job::Async(mut func) => {
                    while ticks.next().await.is_some() {
                        func().await;
                    }
                }
                Job::Blocking(mut func) => {
                    while ticks.next().await.is_some() {
                        func();
                    }
                }
            }
        });
        self.inner.track(&handle);

        handle
    }

    /// Spawns a task that runs the job once per tick on a worker thread.
    ///
    /// Ticks occurring while the job is still running are skipped. The task
    /// ends once the ticker is done, or if the job panics.
    ///
    /// An error is returned if the job is asynchronous.
    pub fn run_periodically_on_worker(&self, job: Job) -> Result<TaskHandle<()>, TickerError> {
        let Job::Blocking(mut func) = job else {
            return Err(TickerError::AsyncOnWorker);
        };
        let mut ticks = self.stream();
        let scheduler = self.inner.scheduler.clone();
        let handle = self.inner.scheduler.spawn(async move {
            while ticks.next().await.is_some() {
                let worker = scheduler.spawn_blocking(move || {
                    func();
                    func
                });
                match worker.await {
                    Ok(returned) => func = returned,
                    Err(err) => {
                        warn!(%err, "periodic job failed on a worker thread");

                        return;
                    }
                }
            }
        });
        self.inner.track(&handle);

        Ok(handle)
    }

    /// Returns the number of spawned periodic tasks that are still running.
    pub fn active_tasks(&self) -> usize {
        let mut tasks = self.inner.tasks.borrow_mut();
        tasks.retain(|task| !task.is_finished());

        tasks.len()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<'a> IntoFuture for &'a Ticker {
    type Output = Result<MonotonicTime, SignalClosed>;
    type IntoFuture = SignalWait;

    fn into_future(self) -> Self::IntoFuture {
        self.wait()
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("period", &self.period())
            .field("max_count", &self.max_count())
            .field("iteration_count", &self.iteration_count())
            .field("is_started", &self.is_started())
            .field("is_done", &self.is_done())
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
        this.state.borrow_mut().next_tick = Some((deadline, key));
    }

    fn tick(this: &Rc<Self>) {
        if this.done.is_set() {
            return;
        }
        let iteration_count = {
            let mut state = this.state.borrow_mut();
            // The action being run owns the key.
            state.next_tick = None;

            state.iteration_count
        };
        if this.max_count.is_some_and(|max| iteration_count >= max) {
            this.finish();
            return;
        }

        this.ready.fire();

        let (start_time, iteration_count) = {
            let mut state = this.state.borrow_mut();
            state.iteration_count += 1;

            (state.start_time, state.iteration_count)
        };
        trace!(iteration_count, "ticker ticked");

        // Waking the released waiters may have stopped the ticker.
        if this.done.is_set() {
            return;
        }
        match (start_time, this.max_count) {
            (_, Some(max)) if iteration_count >= max => {
                debug!(iteration_count, "ticker finished");
                this.finish();
            }
            (Some(start_time), _) => Inner::schedule(
                this,
                nth_deadline(start_time, this.period, iteration_count + 1),
            ),
            (None, _) => {}
        }
    }

    /// Moves to the terminal state.
    fn finish(&self) {
        if self.done.is_set() {
            return;
        }
        let next_tick = self.state.borrow_mut().next_tick.take();
        if let Some((_, key)) = next_tick {
            key.cancel();
        }
        self.done.set();
        self.ready.close();
    }

    fn track(&self, handle: &TaskHandle<()>) {
        let mut tasks = self.tasks.borrow_mut();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle.monitor());
    }
}

/// An error returned when a ticker operation is not valid in its current
/// state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TickerError {
    /// The ticker was already started.
    AlreadyStarted,
    /// The ticker was not started.
    NotStarted,
    /// The ticker is done.
    Finished,
    /// An asynchronous job cannot run on a worker thread.
    AsyncOnWorker,
}

impl fmt::Display for TickerError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted => write!(fmt, "the ticker has already been started"),
            Self::NotStarted => write!(fmt, "the ticker has not been started"),
            Self::Finished => write!(fmt, "the ticker has finished running"),
            Self::AsyncOnWorker => write!(fmt, "an asynchronous job cannot run on a worker thread"),
        }
    }
}

impl Error for TickerError {}
