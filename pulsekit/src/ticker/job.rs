use std::fmt;
use std::future::Future;

use futures_util::future::LocalBoxFuture;

/// A job run once per tick by a [`Ticker`](super::Ticker).
pub enum Job {
    /// A function returning a future, run on the runtime thread.
    Async(Box<dyn FnMut() -> LocalBoxFuture<'static, ()>>),
    /// A plain function, run either on the runtime thread or on a worker
    /// thread.
    Blocking(Box<dyn FnMut() + Send>),
}

impl Job {
    /// Creates a job from a function returning a future.
    pub fn from_async<F, Fut>(mut func: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::Async(Box::new(move || -> LocalBoxFuture<'static, ()> {
            Box::pin(func())
        }))
    }

    /// Creates a job from a plain function.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::Blocking(Box::new(func))
    }

    /// Returns `true` if the job is asynchronous.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async(_) => f.write_str("Job::Async(..)"),
            Self::Blocking(_) => f.write_str("Job::Blocking(..)"),
        }
    }
}
