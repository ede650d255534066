//! Handles to spawned tasks and worker threads.

use std::cell::Cell;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_channel::oneshot;
use futures_util::future::AbortHandle;

use super::WorkerGuard;

/// An error returned when awaiting a task that did not run to completion.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TaskError {
    /// The task was aborted before it could complete.
    Aborted,
    /// The worker thread panicked or could not be started.
    WorkerFailed,
}

impl fmt::Display for TaskError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => write!(fmt, "the task was aborted"),
            Self::WorkerFailed => write!(fmt, "the worker thread did not complete"),
        }
    }
}

impl Error for TaskError {}

/// A handle to a task spawned with
/// [`Scheduler::spawn()`](crate::runtime::Scheduler::spawn).
///
/// The handle is a future resolving to the task's output. Dropping it
/// detaches the task, which keeps running.
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
    abort_handle: AbortHandle,
    finished: Rc<Cell<bool>>,
}

impl<T> TaskHandle<T> {
    pub(super) fn new(
        receiver: oneshot::Receiver<T>,
        abort_handle: AbortHandle,
        finished: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            receiver,
            abort_handle,
            finished,
        }
    }

    /// Aborts the task.
    ///
    /// The task is dropped the next time the runtime polls it. Awaiting the
    /// handle then resolves to [`TaskError::Aborted`], unless the task had
    /// already completed.
    pub fn abort(&self) {
        self.abort_handle.abort();
    }

    /// Checks whether the task has completed or was dropped after an abort.
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Returns a monitor that can observe the task without owning its output.
    pub(crate) fn monitor(&self) -> TaskMonitor {
        TaskMonitor {
            finished: self.finished.clone(),
        }
    }

    /// Takes the output if the task has completed.
    pub(super) fn try_take(&mut self) -> Option<T> {
        self.receiver.try_recv().ok().flatten()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|output| output.map_err(|_| TaskError::Aborted))
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("is_finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

/// A non-owning view of a spawned task.
#[derive(Clone)]
pub(crate) struct TaskMonitor {
    finished: Rc<Cell<bool>>,
}

impl TaskMonitor {
    pub(crate) fn is_finished(&self) -> bool {
        self.finished.get()
    }
}

/// Marks a task as finished when the task's future is dropped.
pub(super) struct FinishGuard {
    finished: Rc<Cell<bool>>,
}

impl FinishGuard {
    pub(super) fn new() -> Self {
        Self {
            finished: Rc::new(Cell::new(false)),
        }
    }

    pub(super) fn flag(&self) -> Rc<Cell<bool>> {
        self.finished.clone()
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.finished.set(true);
    }
}

/// A future resolving to the output of a function run with
/// [`Scheduler::spawn_blocking()`](crate::runtime::Scheduler::spawn_blocking).
pub struct BlockingTask<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> BlockingTask<T> {
    pub(super) fn new(receiver: oneshot::Receiver<T>) -> Self {
        Self { receiver }
    }
}

impl<T> Future for BlockingTask<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|output| output.map_err(|_| TaskError::WorkerFailed))
    }
}

impl<T> fmt::Debug for BlockingTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingTask").finish_non_exhaustive()
    }
}

/// The reporting end of a worker thread.
///
/// The output channel is released before the worker is deregistered, so the
/// runtime is never woken up before the output can be observed.
pub(super) struct WorkerReport<T> {
    // Field order matters: fields are dropped in declaration order.
    sender: Option<oneshot::Sender<T>>,
    _guard: WorkerGuard,
}

impl<T> WorkerReport<T> {
    pub(super) fn new(sender: oneshot::Sender<T>, guard: WorkerGuard) -> Self {
        Self {
            sender: Some(sender),
            _guard: guard,
        }
    }

    pub(super) fn send(mut self, output: T) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(output);
        }
    }
}
