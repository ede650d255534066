//! Single-threaded runtime hosting the coordination primitives.
//!
//! # Overview
//!
//! A [`Runtime`] owns three things:
//!
//! * a single-threaded executor on which tasks are spawned with
//!   [`Scheduler::spawn()`],
//! * a queue of timed actions registered with
//!   [`Scheduler::schedule_at()`] and friends,
//! * a [`Clock`](crate::time::Clock) that paces the progression of time.
//!
//! Time only moves forward when the runtime is stepped. A call to
//! [`step()`](Runtime::step) will:
//!
//! 1. poll all tasks that are ready to make progress,
//! 2. move the runtime time to the deadline of the earliest timed action and
//!    call [`Clock::synchronize()`](crate::time::Clock::synchronize) which,
//!    unless the runtime is configured to run as fast as possible, blocks until
//!    the matching wall clock time,
//! 3. run every action due at that deadline, and finally
//! 4. poll all tasks woken by these actions.
//!
//! The [`step_by()`](Runtime::step_by), [`step_until()`](Runtime::step_until),
//! [`run()`](Runtime::run) and [`block_on()`](Runtime::block_on) methods
//! iterate over steps until their respective goal is reached.
//!
//! The primitives of this crate never reach for a global runtime: anything
//! that needs to read the time or schedule work takes a [`Scheduler`] handle
//! at construction.
//!
//! # Lagging clocks
//!
//! When a real-time clock reports that a deadline has already elapsed
//! ([`SyncStatus::OutOfSync`](crate::time::SyncStatus::OutOfSync)), the
//! runtime time is set to the deadline plus the reported lag. Timestamps
//! captured by the actions due at that deadline therefore reflect the actual
//! time at which they ran, while the deadlines themselves are unaffected.
//!
//! # Worker threads
//!
//! [`Scheduler::spawn_blocking()`] runs a plain function on a dedicated
//! thread. While such workers are in flight, the runtime waits for them
//! rather than reporting that it has stalled. With a real-time clock the wait
//! is bounded by the wall clock time of the next deadline. With a clock that
//! is not tied to the wall clock, such as [`NoClock`](crate::time::NoClock),
//! time does not advance until all workers have completed: their work takes
//! no runtime time.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use pulsekit::runtime::Runtime;
//! use pulsekit::signal::Signal;
//! use pulsekit::time::MonotonicTime;
//!
//! let mut runtime = Runtime::new();
//! let scheduler = runtime.scheduler();
//! let signal = std::rc::Rc::new(Signal::new(&scheduler));
//!
//! // Fire the signal in 2s.
//! let s = signal.clone();
//! scheduler.schedule_in(Duration::from_secs(2), move || {
//!     s.fire();
//! });
//!
//! let fired_at = runtime.block_on(signal.wait()).unwrap().unwrap();
//! assert_eq!(fired_at, MonotonicTime::EPOCH + Duration::from_secs(2));
//! ```

mod context;
mod init;
mod scheduler;
mod task;

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_utils::sync::{Parker, Unparker};
use futures_executor::{LocalPool, LocalSpawner};
use tracing::trace;

use crate::time::{Clock, MonotonicTime, SyncStatus};
use crate::util::timer_queue::TimerQueue;

pub use init::RuntimeInit;
pub use scheduler::{ActionKey, Scheduler};
pub use task::{BlockingTask, TaskError, TaskHandle};
#[cfg(feature = "tracing")]
pub(crate) use context::current_time;
pub(crate) use task::TaskMonitor;

/// A timed action.
pub(crate) type Action = Box<dyn FnOnce()>;

/// A single-threaded runtime with a pluggable clock.
///
/// See the [module-level documentation](crate::runtime) for an overview.
pub struct Runtime {
    pool: LocalPool,
    shared: Rc<RuntimeShared>,
    clock: Box<dyn Clock>,
    parker: Parker,
}

impl Runtime {
    /// Creates a runtime starting at [`MonotonicTime::EPOCH`] and running as
    /// fast as possible.
    ///
    /// Use [`RuntimeInit`] to select another clock or start time.
    pub fn new() -> Self {
        RuntimeInit::new().init(MonotonicTime::EPOCH)
    }

    /// Creates a runtime with the specified clock and start time.
    pub(crate) fn with_clock(clock: Box<dyn Clock>, start_time: MonotonicTime) -> Self {
        let pool = LocalPool::new();
        let parker = Parker::new();
        let shared = Rc::new(RuntimeShared {
            time: Cell::new(start_time),
            timers: RefCell::new(TimerQueue::new()),
            spawner: pool.spawner(),
            workers: Arc::new(WorkerTracker {
                in_flight: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                unparker: parker.unparker().clone(),
            }),
        });

        Self {
            pool,
            shared,
            clock,
            parker,
        }
    }

    /// Returns a handle to this runtime.
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.shared.clone())
    }

    /// Returns the current runtime time.
    pub fn time(&self) -> MonotonicTime {
        self.shared.time.get()
    }

    /// Polls all tasks that can make progress without advancing time.
    pub fn run_until_stalled(&mut self) {
        let _context = context::enter(&self.shared);

        self.pool.run_until_stalled();
    }

    /// Advances time to the next deadline, running all actions due at that
    /// deadline and all tasks they wake.
    ///
    /// The new runtime time is returned, or `None` if nothing was scheduled.
    /// This method blocks according to the configured clock.
    pub fn step(&mut self) -> Option<MonotonicTime> {
        self.step_bounded(MonotonicTime::MAX)
    }

    /// Iteratively advances time by the specified duration, as if by calling
    /// [`Runtime::step()`] repeatedly.
    ///
    /// The runtime time upon completion is the initial time incremented by the
    /// specified duration, whether or not an action was due at that time.
    pub fn step_by(&mut self, duration: Duration) {
        let target_time = self.time() + duration;

        self.step_until_unchecked(target_time);
    }

    /// Iteratively advances time until the specified target time, as if by
    /// calling [`Runtime::step()`] repeatedly.
    ///
    /// An error is returned if the target time does not lie in the future of
    /// the current runtime time.
    pub fn step_until(&mut self, target_time: MonotonicTime) -> Result<(), RuntimeError> {
        if self.time() >= target_time {
            return Err(RuntimeError::InvalidTargetTime);
        }
        self.step_until_unchecked(target_time);

        Ok(())
    }

    /// Steps until no timed action, ready task or worker thread remains.
    ///
    /// This never returns while a periodic timer is alive.
    pub fn run(&mut self) {
        while self.step().is_some() {}
    }

    /// Spawns the future and drives the runtime until it completes, returning
    /// its output.
    ///
    /// An error is returned if the runtime stalls before the future completes,
    /// i.e. if nothing scheduled could ever wake it up again.
    pub fn block_on<F>(&mut self, future: F) -> Result<F::Output, RuntimeError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let _context = context::enter(&self.shared);
        let mut handle = self.scheduler().spawn(future);

        loop {
            let completed_workers = self.poll_tasks();
            if let Some(output) = handle.try_take() {
                return Ok(output);
            }
            if let Progress::Stalled = self.advance(MonotonicTime::MAX, completed_workers) {
                handle.abort();

                return Err(RuntimeError::Deadlock);
            }
        }
    }

    /// Polls ready tasks and returns the number of completed workers as
    /// observed before polling.
    fn poll_tasks(&mut self) -> usize {
        let completed_workers = self.shared.workers.completed();
        self.pool.run_until_stalled();

        completed_workers
    }

    fn step_bounded(&mut self, upper_time_bound: MonotonicTime) -> Option<MonotonicTime> {
        let _context = context::enter(&self.shared);

        loop {
            let completed_workers = self.poll_tasks();
            match self.advance(upper_time_bound, completed_workers) {
                Progress::Fired(time) => {
                    self.pool.run_until_stalled();

                    return Some(time);
                }
                Progress::Waited => {}
                Progress::Stalled => return None,
            }
        }
    }

    fn step_until_unchecked(&mut self, target_time: MonotonicTime) {
        while self.step_bounded(target_time).is_some() {}

        if self.shared.time.get() < target_time {
            self.shared.time.set(target_time);
        }
    }

    /// Makes progress on timed actions or worker threads, assuming all ready
    /// tasks were just polled.
    fn advance(&mut self, upper_time_bound: MonotonicTime, completed_workers: usize) -> Progress {
        // `in_flight` must be loaded before `completed`.
        let workers_busy = self.shared.workers.in_flight() != 0;
        if self.shared.workers.completed() != completed_workers {
            // A worker completed while tasks were being polled: poll once more
            // to deliver its output before time moves.
            return Progress::Waited;
        }
        let next_deadline = self.shared.timers.borrow_mut().next_deadline();

        match next_deadline {
            Some(deadline) if deadline <= upper_time_bound => {
                if workers_busy {
                    match self.clock.wall_clock_delay(deadline) {
                        None => {
                            self.parker.park();

                            return Progress::Waited;
                        }
                        Some(delay) if !delay.is_zero() => {
                            self.parker.park_timeout(delay);

                            return Progress::Waited;
                        }
                        Some(_) => {}
                    }
                }

                Progress::Fired(self.fire_due(deadline))
            }
            _ => {
                if workers_busy {
                    trace!("waiting for worker threads");
                    self.parker.park();

                    Progress::Waited
                } else {
                    Progress::Stalled
                }
            }
        }
    }

    /// Synchronizes the clock with the deadline and runs all actions due.
    fn fire_due(&mut self, deadline: MonotonicTime) -> MonotonicTime {
        let time = match self.clock.synchronize(deadline) {
            SyncStatus::Synchronized => deadline,
            SyncStatus::OutOfSync(lag) => {
                trace!(?deadline, ?lag, "clock lagging behind deadline");

                deadline + lag
            }
        };
        let time = time.max(self.shared.time.get());
        self.shared.time.set(time);

        let mut action_count = 0usize;
        loop {
            // The queue must not be borrowed while an action runs since the
            // action may schedule or cancel other actions.
            let due = self.shared.timers.borrow_mut().pull_due(deadline);
            match due {
                Some((_, action)) => {
                    action();
                    action_count += 1;
                }
                None => break,
            }
        }
        trace!(?deadline, ?time, action_count, "timed actions processed");

        time
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Timed actions may hold scheduler handles; dropping them breaks the
        // resulting reference cycles. The queue is released before the actions
        // are dropped since their destructors may try to cancel timers.
        let actions = self.shared.timers.borrow_mut().drain();
        drop(actions);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("time", &self.time())
            .finish_non_exhaustive()
    }
}

/// State shared between a runtime and its schedulers.
pub(crate) struct RuntimeShared {
    pub(crate) time: Cell<MonotonicTime>,
    pub(crate) timers: RefCell<TimerQueue<Action>>,
    pub(crate) spawner: LocalSpawner,
    pub(crate) workers: Arc<WorkerTracker>,
}

/// Book-keeping of worker threads.
pub(crate) struct WorkerTracker {
    in_flight: AtomicUsize,
    completed: AtomicUsize,
    unparker: Unparker,
}

impl WorkerTracker {
    /// Returns the number of worker threads that have not completed.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the number of worker threads that have completed so far,
    /// wrapping on overflow.
    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Registers a new worker; the returned guard deregisters it when dropped.
    pub(crate) fn enter(self: &Arc<Self>) -> WorkerGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        WorkerGuard {
            tracker: self.clone(),
        }
    }
}

/// Deregisters a worker thread and wakes up the runtime when dropped.
pub(crate) struct WorkerGuard {
    tracker: Arc<WorkerTracker>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.tracker.completed.fetch_add(1, Ordering::SeqCst);
        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.tracker.unparker.unpark();
    }
}

/// Outcome of an attempt to move the runtime forward.
enum Progress {
    /// Timed actions were run and the runtime time was updated.
    Fired(MonotonicTime),
    /// The runtime waited for worker threads and should poll its tasks.
    Waited,
    /// Nothing is left to do within the time bound.
    Stalled,
}

/// An error returned when the runtime could not proceed as requested.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RuntimeError {
    /// The target time does not lie in the future of the current runtime time.
    InvalidTargetTime,
    /// The runtime stalled before the future passed to
    /// [`Runtime::block_on()`] could complete.
    Deadlock,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTargetTime => write!(
                fmt,
                "the target time should be in the future of the current runtime time"
            ),
            Self::Deadlock => write!(
                fmt,
                "the runtime stalled before the future could complete"
            ),
        }
    }
}

impl Error for RuntimeError {}
