//! Periodic signals driven by the runtime.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures_util::StreamExt;

use pulsekit::runtime::{Runtime, RuntimeInit};
use pulsekit::signal::PeriodicSignal;
use pulsekit::time::MonotonicTime;

#[test]
fn firings_start_one_period_after_construction() {
    let t0 = MonotonicTime::new(100, 0).unwrap();
    let mut runtime = RuntimeInit::new().init(t0);
    let signal = PeriodicSignal::new(&runtime.scheduler(), Duration::from_secs(2));

    assert_eq!(signal.start_time(), t0);
    assert_eq!(signal.tick_count(), 0);

    runtime.step_by(Duration::from_secs(7));

    assert_eq!(signal.tick_count(), 3);
    assert_eq!(signal.last_fired(), Some(t0 + Duration::from_secs(6)));
    assert_eq!(signal.next_deadline(), Some(t0 + Duration::from_secs(8)));
}

#[test]
fn waiters_see_consecutive_firings() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let signal = Rc::new(PeriodicSignal::new(&scheduler, Duration::from_millis(300)));

    let s = signal.clone();
    let times = runtime
        .block_on(async move { s.stream().take(4).collect::<Vec<_>>().await })
        .unwrap();

    let expected: Vec<_> = (1..=4)
        .map(|n| MonotonicTime::EPOCH + Duration::from_millis(300 * n))
        .collect();
    assert_eq!(times, expected);
}

#[test]
fn callback_can_stop_the_signal() {
    let mut runtime = Runtime::new();
    let signal = Rc::new(PeriodicSignal::new(
        &runtime.scheduler(),
        Duration::from_secs(1),
    ));
    let fired = Rc::new(Cell::new(0));

    let weak = Rc::downgrade(&signal);
    let f = fired.clone();
    signal.add_callback(move |_| {
        f.set(f.get() + 1);
        if f.get() == 2 {
            if let Some(signal) = weak.upgrade() {
                signal.stop();
            }
        }
    });

    runtime.run();

    assert_eq!(fired.get(), 2);
    assert_eq!(signal.tick_count(), 2);
    assert!(signal.is_stopped());
    assert_eq!(runtime.time(), MonotonicTime::EPOCH + Duration::from_secs(2));
}

#[test]
fn dropping_the_signal_cancels_its_timer() {
    let mut runtime = Runtime::new();
    let signal = PeriodicSignal::new(&runtime.scheduler(), Duration::from_secs(1));
    runtime.step();

    drop(signal);

    assert_eq!(runtime.step(), None);
}
