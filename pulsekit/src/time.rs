//! Runtime time and clocks.
//!
//! This module provides most notably:
//!
//! * [`MonotonicTime`]: a monotonic timestamp based on the [TAI] time standard,
//!   used for every deadline and every timestamp delivered by a
//!   [`Signal`](crate::signal::Signal),
//! * [`Clock`]: a trait for types that synchronize a
//!   [`Runtime`](crate::runtime::Runtime) with an external time reference,
//!   implemented for instance by [`NoClock`] and [`SystemClock`].
//!
//! [TAI]: https://en.wikipedia.org/wiki/International_Atomic_Time
//!
//! The default [`NoClock`] makes the runtime jump from one deadline to the
//! next without waiting, which turns any timer-driven program into a
//! deterministic, as-fast-as-possible simulation of itself. This is the clock
//! of choice for tests.
//!
//! # Examples
//!
//! A runtime paced by the system clock, starting at an arbitrary timestamp.
//!
//! ```
//! use std::time::Instant;
//!
//! use pulsekit::runtime::RuntimeInit;
//! use pulsekit::time::{MonotonicTime, SystemClock};
//!
//! let t0 = MonotonicTime::new(1_234_567_890, 0).unwrap();
//! let clock = SystemClock::from_instant(t0, Instant::now());
//!
//! let runtime = RuntimeInit::new().set_clock(clock).init(t0);
//! assert_eq!(runtime.time(), t0);
//! ```

mod clock;

use std::time::Duration;

pub use tai_time::MonotonicTime;

pub use clock::{AutoSystemClock, Clock, NoClock, SyncStatus, SystemClock};

/// Returns the duration elapsed from `earlier` to `later`, or zero if
/// `earlier` is the later of the two.
pub(crate) fn saturating_duration_since(
    later: MonotonicTime,
    earlier: MonotonicTime,
) -> Duration {
    if later > earlier {
        later.duration_since(earlier)
    } else {
        Duration::ZERO
    }
}

/// Returns `start + n·period`, saturating at `MonotonicTime::MAX`.
///
/// The deadline is computed from the start time rather than accumulated from
/// the previous deadline so that rounding and scheduling latency never add up.
pub(crate) fn nth_deadline(start: MonotonicTime, period: Duration, n: u64) -> MonotonicTime {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let nanos = period.as_nanos().saturating_mul(u128::from(n));
    let secs = match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => secs,
        Err(_) => return MonotonicTime::MAX,
    };
    // The remainder is always below one billion and fits in a `u32`.
    let subsec_nanos = (nanos % NANOS_PER_SEC) as u32;
    let offset = Duration::new(secs, subsec_nanos);

    if saturating_duration_since(MonotonicTime::MAX, start) < offset {
        return MonotonicTime::MAX;
    }

    start + offset
}
