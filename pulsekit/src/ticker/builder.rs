use std::time::Duration;

use crate::runtime::Scheduler;

use super::Ticker;

/// Builder for a [`Ticker`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use pulsekit::runtime::Runtime;
/// use pulsekit::ticker::TickerBuilder;
///
/// let runtime = Runtime::new();
/// let ticker = TickerBuilder::new(Duration::from_secs(1))
///     .count(10)
///     .autostart(false)
///     .build(&runtime.scheduler());
///
/// assert!(!ticker.is_started());
/// assert_eq!(ticker.max_count(), Some(10));
/// ```
#[derive(Clone, Debug)]
pub struct TickerBuilder {
    period: Duration,
    count: Option<u64>,
    autostart: bool,
}

impl TickerBuilder {
    /// Creates a builder for an unbounded, auto-started ticker.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            count: None,
            autostart: true,
        }
    }

    /// Sets the number of ticks after which the ticker is done.
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);

        self
    }

    /// Selects whether the ticker is started upon construction.
    ///
    /// Defaults to `true`.
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;

        self
    }

    /// Builds the ticker.
    ///
    /// # Panics
    ///
    /// This will panic if the period is zero.
    pub fn build(self, scheduler: &Scheduler) -> Ticker {
        let ticker = Ticker::from_parts(scheduler, self.period, self.count);
        if self.autostart {
            // A fresh ticker can always be started.
            let _ = ticker.start();
        }

        ticker
    }
}
