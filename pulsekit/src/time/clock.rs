use std::time::{Duration, Instant, SystemTime};

use tai_time::MonotonicClock;

use crate::time::{saturating_duration_since, MonotonicTime};

/// The pacing source of a runtime.
///
/// Each time the runtime reaches a deadline it asks its clock to
/// [`synchronize()`](Clock::synchronize). Whatever the clock reports becomes
/// the runtime time: the deadline itself, or the deadline plus the reported
/// lag.
///
/// See [`RuntimeInit::set_clock()`](crate::runtime::RuntimeInit::set_clock).
pub trait Clock {
    /// Waits for the deadline, if needed, and reports how late it was reached.
    fn synchronize(&mut self, deadline: MonotonicTime) -> SyncStatus;

    /// Returns how much wall clock time is left before the deadline.
    ///
    /// While worker threads are running, the runtime waits at most this long
    /// before firing the deadline. `None` means that the clock has no wall
    /// clock reference: the runtime then waits for all workers to complete
    /// before advancing time.
    fn wall_clock_delay(&self, _deadline: MonotonicTime) -> Option<Duration> {
        None
    }
}

/// Outcome of [`Clock::synchronize()`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// The deadline was reached on time.
    Synchronized,
    /// The deadline was reached late, by the duration in the payload.
    OutOfSync(Duration),
}

/// A [`Clock`] that never waits.
///
/// The runtime jumps straight from one deadline to the next, which keeps
/// time-dependent code deterministic. This is the default clock.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoClock {}

impl NoClock {
    /// Creates the clock.
    pub fn new() -> Self {
        Self {}
    }
}

impl Clock for NoClock {
    fn synchronize(&mut self, _: MonotonicTime) -> SyncStatus {
        SyncStatus::Synchronized
    }
}

/// A [`Clock`] that paces the runtime against the wall clock.
///
/// The clock maps runtime time onto the system's monotonic clock through one
/// reference pair given at construction.
#[derive(Copy, Clone, Debug)]
pub struct SystemClock(MonotonicClock);

impl SystemClock {
    /// Creates a clock on which `runtime_ref` corresponds to the instant
    /// `wall_clock_ref`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    ///
    /// use pulsekit::runtime::RuntimeInit;
    /// use pulsekit::time::{MonotonicTime, SystemClock};
    ///
    /// let t0 = MonotonicTime::new(1_234_567_890, 0).unwrap();
    ///
    /// // The first timers fire one second late in wall clock time.
    /// let clock = SystemClock::from_instant(t0, Instant::now() + Duration::from_secs(1));
    ///
    /// let runtime = RuntimeInit::new().set_clock(clock).init(t0);
    /// ```
    pub fn from_instant(runtime_ref: MonotonicTime, wall_clock_ref: Instant) -> Self {
        Self(MonotonicClock::init_from_instant(runtime_ref, wall_clock_ref))
    }

    /// Creates a clock on which `runtime_ref` corresponds to the system time
    /// `wall_clock_ref`.
    ///
    /// Only the reference is taken from the system time; pacing still follows
    /// the monotonic clock.
    pub fn from_system_time(runtime_ref: MonotonicTime, wall_clock_ref: SystemTime) -> Self {
        Self(MonotonicClock::init_from_system_time(
            runtime_ref,
            wall_clock_ref,
        ))
    }
}

impl Clock for SystemClock {
    fn synchronize(&mut self, deadline: MonotonicTime) -> SyncStatus {
        let now = self.0.now();
        if now > deadline {
            return SyncStatus::OutOfSync(now.duration_since(deadline));
        }
        spin_sleep::sleep(deadline.duration_since(now));

        SyncStatus::Synchronized
    }

    fn wall_clock_delay(&self, deadline: MonotonicTime) -> Option<Duration> {
        Some(saturating_duration_since(deadline, self.0.now()))
    }
}

/// A [`SystemClock`] whose reference is the first deadline it sees.
///
/// The first synchronization returns at once and anchors the deadline to the
/// current instant, so pacing starts when the runtime first reaches a timer.
#[derive(Copy, Clone, Debug, Default)]
pub struct AutoSystemClock {
    inner: Option<SystemClock>,
}

impl AutoSystemClock {
    /// Creates an unanchored clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for AutoSystemClock {
    fn synchronize(&mut self, deadline: MonotonicTime) -> SyncStatus {
        if let Some(clock) = &mut self.inner {
            return clock.synchronize(deadline);
        }
        self.inner = Some(SystemClock::from_instant(deadline, Instant::now()));

        SyncStatus::Synchronized
    }

    fn wall_clock_delay(&self, deadline: MonotonicTime) -> Option<Duration> {
        self.inner
            .as_ref()
            .and_then(|clock| clock.wall_clock_delay(deadline))
    }
}
