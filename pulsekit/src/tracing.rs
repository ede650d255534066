//! Support for structured logging.
//!
//! # Overview
//!
//! The crate emits [`tracing`] events with the `pulsekit` target when timers
//! fire, tickers start or stop, and background workers fail. These events are
//! timestamped by the subscriber, which by default uses the wall clock time.
//! When the `tracing` feature is activated, this module provides a
//! [`RuntimeTime`] timer compatible with
//! [`tracing_subscriber::fmt`][mod@tracing_subscriber::fmt] that stamps events
//! with the time of the runtime instead.
//!
//! # Configuration
//!
//! ```
//! use pulsekit::tracing::RuntimeTime;
//!
//! tracing_subscriber::fmt()
//!     .with_timer(RuntimeTime::with_system_timer())
//!     .init();
//! ```
//!
//! Events emitted while a runtime is being driven on the current thread are
//! stamped with the runtime time. Other events, including those emitted from
//! background workers, fall back to the system timer:
//!
//! ```text
//! [1970-01-01 00:00:03.000000000] DEBUG pulsekit::ticker: ticker stopped
//! 2024-09-10T14:39:24.670921Z  INFO my_app: shutting down
//! ```
//!
//! Alternatively, `RuntimeTime::with_system_timer_always()` prepends the system
//! time to all events.

use std::fmt;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};

use crate::runtime::current_time;

/// A timer for the [`tracing-subscriber`][tracing_subscriber] crate that logs
/// events using the runtime time instead of (or on top of) the wall clock
/// time.
///
/// See the [module-level documentation][crate::tracing] for more details.
#[derive(Default, Debug)]
pub struct RuntimeTime<const VERBOSE: bool, T> {
    sys_timer: T,
}

impl RuntimeTime<false, SystemTime> {
    /// Constructs a timer which falls back to the [`SystemTime`] timer for
    /// events generated outside a runtime.
    pub fn with_system_timer() -> Self {
        Self::default()
    }
}

impl RuntimeTime<true, SystemTime> {
    /// Constructs a timer which prepends a [`SystemTime`] timestamp to all
    /// events, as well as a runtime timestamp for events generated within a
    /// runtime.
    pub fn with_system_timer_always() -> Self {
        Self::default()
    }
}

impl<T: FormatTime> RuntimeTime<false, T> {
    /// Constructs a timer which falls back to the provided timer for events
    /// generated outside a runtime.
    pub fn with_custom_timer(sys_timer: T) -> Self {
        Self { sys_timer }
    }
}

impl<T: FormatTime> RuntimeTime<true, T> {
    /// Constructs a timer which prepends a timestamp generated with the
    /// provided timer to all events, as well as a runtime timestamp for events
    /// generated within a runtime.
    pub fn with_custom_timer_always(sys_timer: T) -> Self {
        Self { sys_timer }
    }
}

impl<const VERBOSE: bool, T: FormatTime> FormatTime for RuntimeTime<VERBOSE, T> {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match current_time() {
            Some(time) => {
                if VERBOSE {
                    self.sys_timer.format_time(w)?;
                    w.write_char(' ')?;
                }
                write!(w, "[{:.9}]", time)
            }
            None => self.sys_timer.format_time(w),
        }
    }
}
