//! Runtime handle for time queries, timed actions and task spawning.

use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::thread;
use std::time::Duration;

use futures_channel::oneshot;
use futures_util::future::{AbortHandle, Abortable};
use futures_util::task::LocalSpawnExt;
use tracing::warn;

use crate::time::MonotonicTime;
use crate::util::timer_queue::TimerKey;

use super::task::{BlockingTask, FinishGuard, TaskHandle, WorkerReport};
use super::RuntimeShared;

/// Name given to worker threads.
const WORKER_THREAD_NAME: &str = "pulsekit-worker";

/// A cheaply cloneable handle to a [`Runtime`](crate::runtime::Runtime).
///
/// A scheduler gives access to the runtime time, and lets callers schedule
/// actions at future times, spawn tasks on the runtime and offload blocking
/// work to worker threads.
#[derive(Clone)]
pub struct Scheduler {
    shared: Rc<RuntimeShared>,
}

impl Scheduler {
    pub(super) fn new(shared: Rc<RuntimeShared>) -> Self {
        Self { shared }
    }

    /// Returns the current runtime time.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulsekit::runtime::Runtime;
    /// use pulsekit::time::MonotonicTime;
    ///
    /// let runtime = Runtime::new();
    ///
    /// assert_eq!(runtime.scheduler().time(), MonotonicTime::EPOCH);
    /// ```
    pub fn time(&self) -> MonotonicTime {
        self.shared.time.get()
    }

    /// Schedules an action at an absolute time.
    ///
    /// Actions sharing a deadline run in scheduling order. A deadline that
    /// already lies in the past is due immediately: the action runs on the
    /// next step without moving time backwards.
    pub fn schedule_at<F>(&self, deadline: MonotonicTime, action: F) -> ActionKey
    where
        F: FnOnce() + 'static,
    {
        let key = self
            .shared
            .timers
            .borrow_mut()
            .insert(deadline, Box::new(action));

        ActionKey {
            key,
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Schedules an action after a delay relative to the current runtime time.
    pub fn schedule_in<F>(&self, delay: Duration, action: F) -> ActionKey
    where
        F: FnOnce() + 'static,
    {
        self.schedule_at(self.time() + delay, action)
    }

    /// Spawns a task on the runtime.
    ///
    /// The task starts running the next time the runtime polls its tasks.
    /// Dropping the returned handle detaches the task.
    pub fn spawn<F>(&self, future: F) -> TaskHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let guard = FinishGuard::new();
        let finished = guard.flag();

        let task = Abortable::new(
            async move {
                let _guard = guard;
                let output = future.await;
                let _ = sender.send(output);
            },
            abort_registration,
        );
        if let Err(err) = self.shared.spawner.spawn_local(async move {
            let _ = task.await;
        }) {
            warn!(%err, "failed to spawn task");
        }

        TaskHandle::new(receiver, abort_handle, finished)
    }

    /// Runs a blocking function on a dedicated worker thread.
    ///
    /// The returned future resolves to the function's output, or to
    /// [`TaskError::WorkerFailed`](crate::runtime::TaskError::WorkerFailed)
    /// if the function panicked or the thread could not be started. The
    /// runtime does not report itself as stalled while the worker runs.
    pub fn spawn_blocking<F, T>(&self, func: F) -> BlockingTask<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let report = WorkerReport::new(sender, self.shared.workers.enter());

        let spawn_result = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let report = report;
                report.send(func());
            });
        if let Err(err) = spawn_result {
            // The closure and its report were dropped, which already
            // cancelled the output channel.
            warn!(%err, "failed to start worker thread");
        }

        BlockingTask::new(receiver)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("time", &self.time())
            .finish_non_exhaustive()
    }
}

/// Handle to a scheduled action.
///
/// An `ActionKey` can be used to cancel a scheduled action. Dropping the key
/// does not cancel the action.
pub struct ActionKey {
    key: TimerKey,
    shared: Weak<RuntimeShared>,
}

impl ActionKey {
    /// Cancels the associated action.
    ///
    /// Returns `true` if the action was still pending, `false` if it has
    /// already run, was already cancelled, or its runtime is gone.
    pub fn cancel(self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        // The borrow can only fail while the runtime itself is being torn
        // down, in which case the action will never run anyway.
        let Ok(mut timers) = shared.timers.try_borrow_mut() else {
            return false;
        };

        timers.cancel(self.key)
    }
}

impl fmt::Debug for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionKey").finish_non_exhaustive()
    }
}
