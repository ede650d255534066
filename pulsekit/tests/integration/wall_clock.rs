//! Pacing against the wall clock.

use std::rc::Rc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;

use pulsekit::runtime::RuntimeInit;
use pulsekit::ticker::TickerBuilder;
use pulsekit::time::{AutoSystemClock, MonotonicTime, SystemClock};

const PERIOD_MS: u64 = 20;
const TOLERANCE_MS: u64 = 15;

#[test]
fn ticker_follows_system_clock() {
    let t0 = MonotonicTime::EPOCH;
    let now = Instant::now();
    let mut runtime = RuntimeInit::new()
        .set_clock(SystemClock::from_instant(t0, now))
        .init(t0);
    let ticker = TickerBuilder::new(Duration::from_millis(PERIOD_MS))
        .count(5)
        .build(&runtime.scheduler());

    let ticks = runtime.block_on(ticker.stream().collect::<Vec<_>>()).unwrap();
    let elapsed = now.elapsed();

    assert_eq!(ticks.len(), 5);
    assert!(elapsed >= Duration::from_millis(5 * PERIOD_MS));
    assert!(elapsed < Duration::from_millis(5 * PERIOD_MS + TOLERANCE_MS * 5));
}

#[test]
fn worker_wait_is_bounded_by_next_deadline() {
    let t0 = MonotonicTime::EPOCH;
    let mut runtime = RuntimeInit::new()
        .set_clock(AutoSystemClock::new())
        .init(t0);
    let scheduler = runtime.scheduler();

    // Start the clock.
    let _ = scheduler.schedule_at(t0, || {});
    runtime.step();

    let fired = Rc::new(std::cell::Cell::new(None));
    let f = fired.clone();
    let start = Instant::now();
    let _ = scheduler.schedule_in(Duration::from_millis(PERIOD_MS), move || {
        f.set(Some(start.elapsed()));
    });
    let worker = scheduler.spawn_blocking(|| std::thread::sleep(Duration::from_millis(200)));
    let worker_handle = scheduler.spawn(worker);

    runtime.step();
    let fired_after = fired.get().unwrap();
    assert!(fired_after < Duration::from_millis(150));
    assert!(!worker_handle.is_finished());

    runtime.run();
    assert!(worker_handle.is_finished());
}
