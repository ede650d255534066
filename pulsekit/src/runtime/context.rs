//! Thread-local access to the runtime being driven.

use std::cell::RefCell;
use std::rc::Rc;

#[cfg(feature = "tracing")]
use crate::time::MonotonicTime;

use super::RuntimeShared;

thread_local! {
    static CURRENT: RefCell<Option<Rc<RuntimeShared>>> = const { RefCell::new(None) };
}

/// Makes the runtime current on this thread until the guard is dropped.
pub(super) fn enter(shared: &Rc<RuntimeShared>) -> ContextGuard {
    let previous = CURRENT.with(|current| current.replace(Some(shared.clone())));

    ContextGuard { previous }
}

/// Returns the time of the runtime currently driven on this thread, if any.
#[cfg(feature = "tracing")]
pub(crate) fn current_time() -> Option<MonotonicTime> {
    CURRENT
        .try_with(|current| {
            current
                .try_borrow()
                .ok()
                .and_then(|shared| shared.as_ref().map(|shared| shared.time.get()))
        })
        .ok()
        .flatten()
}

/// Restores the previously current runtime when dropped.
pub(super) struct ContextGuard {
    previous: Option<Rc<RuntimeShared>>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = CURRENT.try_with(|current| current.replace(previous));
    }
}
