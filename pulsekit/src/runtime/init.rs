use crate::time::{Clock, MonotonicTime, NoClock};

use super::Runtime;

/// Builder for a [`Runtime`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use pulsekit::runtime::RuntimeInit;
/// use pulsekit::time::{MonotonicTime, SystemClock};
///
/// let t0 = MonotonicTime::new(1_000, 0).unwrap();
/// let clock = SystemClock::from_instant(t0, std::time::Instant::now());
/// let runtime = RuntimeInit::new().set_clock(clock).init(t0);
///
/// assert_eq!(runtime.time(), t0);
/// ```
pub struct RuntimeInit {
    clock: Box<dyn Clock + 'static>,
}

impl RuntimeInit {
    /// Creates a builder for a runtime that runs as fast as possible.
    pub fn new() -> Self {
        Self {
            clock: Box::new(NoClock::new()),
        }
    }

    /// Synchronizes the runtime with the provided [`Clock`].
    ///
    /// If the clock isn't explicitly set then the default [`NoClock`] is used,
    /// resulting in the runtime running as fast as possible.
    pub fn set_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);

        self
    }

    /// Builds a runtime initialized at the specified time.
    pub fn init(self, start_time: MonotonicTime) -> Runtime {
        Runtime::with_clock(self.clock, start_time)
    }
}

impl Default for RuntimeInit {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeInit").finish_non_exhaustive()
    }
}
