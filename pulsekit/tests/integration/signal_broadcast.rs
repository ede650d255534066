//! Broadcast semantics of signals.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures_util::StreamExt;

use pulsekit::runtime::Runtime;
use pulsekit::signal::{Signal, SignalClosed};
use pulsekit::time::MonotonicTime;

#[test]
fn all_waiters_observe_the_same_firing() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let signal = Rc::new(Signal::new(&scheduler));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let s = signal.clone();
            scheduler.spawn(async move { (&*s).await })
        })
        .collect();
    runtime.run_until_stalled();
    assert_eq!(signal.waiter_count(), 3);

    let s = signal.clone();
    let _ = scheduler.schedule_in(Duration::from_millis(1500), move || {
        assert_eq!(s.fire(), 3);
    });

    let expected = MonotonicTime::EPOCH + Duration::from_millis(1500);
    for handle in handles {
        assert_eq!(runtime.block_on(handle), Ok(Ok(Ok(expected))));
    }
    assert_eq!(signal.waiter_count(), 0);
}

#[test]
fn subscriber_after_firing_waits_for_the_next_one() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let signal = Rc::new(Signal::new(&scheduler));

    for secs in [1, 2] {
        let s = signal.clone();
        let _ = scheduler.schedule_in(Duration::from_secs(secs), move || {
            s.fire();
        });
    }
    runtime.step();

    let s = signal.clone();
    let fired_at = runtime.block_on(async move { s.wait().await }).unwrap();

    assert_eq!(fired_at, Ok(MonotonicTime::EPOCH + Duration::from_secs(2)));
}

#[test]
fn stream_collects_firings_until_closed() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let signal = Rc::new(Signal::new(&scheduler));

    for secs in 1..=3 {
        let s = signal.clone();
        let _ = scheduler.schedule_in(Duration::from_secs(secs), move || {
            s.fire();
        });
    }
    let s = signal.clone();
    let _ = scheduler.schedule_in(Duration::from_secs(4), move || s.close());

    let times = runtime.block_on(signal.stream().collect::<Vec<_>>()).unwrap();

    let t0 = MonotonicTime::EPOCH;
    assert_eq!(
        times,
        vec![
            t0 + Duration::from_secs(1),
            t0 + Duration::from_secs(2),
            t0 + Duration::from_secs(3),
        ]
    );
    assert!(signal.is_closed());
}

#[test]
fn callbacks_run_after_waiters_are_released() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let signal = Rc::new(Signal::new(&scheduler));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let s = signal.clone();
    let log = seen.clone();
    signal.add_callback(move |time| {
        // The waiter was already released when the callback runs.
        log.borrow_mut().push((time, s.waiter_count()));
    });

    let waiter = signal.wait();
    let s = signal.clone();
    let _ = scheduler.schedule_in(Duration::from_secs(1), move || {
        s.fire();
    });

    let fired_at = runtime.block_on(waiter).unwrap().unwrap();

    assert_eq!(*seen.borrow(), vec![(fired_at, 0)]);
}

#[test]
fn closing_wakes_pending_waiters_with_an_error() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let signal = Rc::new(Signal::new(&scheduler));

    let waiter = signal.wait();
    let s = signal.clone();
    let _ = scheduler.schedule_in(Duration::from_secs(1), move || s.close());

    assert_eq!(runtime.block_on(waiter), Ok(Err(SignalClosed {})));
    assert_eq!(signal.fire(), 0);
}
