//! Bounded counters used as backpressure gates between tasks.

use std::rc::Rc;
use std::time::Duration;

use pulsekit::counter::{BoundedCounter, BoundsError, CounterBuilder};
use pulsekit::runtime::Runtime;
use pulsekit::ticker::{Job, TickerBuilder};

#[test]
fn hysteresis_round_trip_wakes_waiters() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let counter = Rc::new(
        CounterBuilder::new()
            .min_value(0.0)
            .max_value(10.0)
            .initial_value(5.0)
            .build()
            .unwrap(),
    );

    let c = counter.clone();
    let at_max = scheduler.spawn(async move { c.wait_max().await });
    let c = counter.clone();
    let below_max = scheduler.spawn(async move {
        c.wait_max().await;
        c.wait_max_clear().await;
    });
    runtime.run_until_stalled();

    counter.set(10.0);
    runtime.run_until_stalled();
    assert!(at_max.is_finished());
    assert!(!below_max.is_finished());

    counter.set(11.0);
    runtime.run_until_stalled();
    assert!(counter.is_at_max());
    assert!(!below_max.is_finished());

    counter.set(9.0);
    runtime.run_until_stalled();
    assert!(!counter.is_at_max());
    assert!(below_max.is_finished());

    counter.set(0.0);
    assert!(counter.is_at_min());
}

#[test]
fn clamped_counter_never_leaves_its_bounds() {
    let counter = CounterBuilder::new()
        .min_value(0.0)
        .max_value(10.0)
        .clamp_to_bounds(true)
        .build()
        .unwrap();

    counter.set(15.0);
    assert_eq!(counter.value(), 10.0);
    assert!(counter.is_at_max());

    counter.increment(3.0);
    assert_eq!(counter.value(), 10.0);

    counter.decrement(12.5);
    assert_eq!(counter.value(), 0.0);
    assert!(counter.is_at_min());
    assert!(!counter.is_at_max());
}

#[test]
fn inverted_bounds_are_rejected_without_side_effects() {
    let counter = CounterBuilder::new()
        .min_value(2.0)
        .max_value(4.0)
        .initial_value(4.0)
        .build()
        .unwrap();
    assert!(counter.is_at_max());

    assert_eq!(counter.set_min_value(Some(5.0)), Err(BoundsError::MinAboveMax));
    assert_eq!(counter.set_max_value(Some(1.0)), Err(BoundsError::MaxBelowMin));
    assert_eq!(counter.set_min_value(Some(f64::NAN)), Err(BoundsError::NotANumber));

    assert_eq!(counter.min_value(), Some(2.0));
    assert_eq!(counter.max_value(), Some(4.0));
    assert!(counter.is_at_max());
    assert!(!counter.is_at_min());
}

#[test]
fn removing_a_bound_releases_clear_waiters() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let counter = Rc::new(
        CounterBuilder::new()
            .max_value(1.0)
            .initial_value(1.0)
            .build()
            .unwrap(),
    );

    let c = counter.clone();
    let waiter = scheduler.spawn(async move { c.wait_max_clear().await });
    runtime.run_until_stalled();
    assert!(!waiter.is_finished());

    counter.set_max_value(None).unwrap();

    assert_eq!(runtime.block_on(waiter), Ok(Ok(())));
}

#[test]
fn producer_throttled_by_consumer_ticks() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let queued = Rc::new(CounterBuilder::new().max_value(2.0).build().unwrap());

    let consumer = TickerBuilder::new(Duration::from_secs(1))
        .count(4)
        .build(&scheduler);
    let q = queued.clone();
    consumer.run_periodically(Job::from_async(move || {
        let q = q.clone();
        async move {
            if q.value() > 0.0 {
                q.decrement(1.0);
            }
        }
    }));

    let q = queued.clone();
    let s = scheduler.clone();
    let producer = scheduler.spawn(async move {
        let mut produced_at = Vec::new();
        for _ in 0..5 {
            q.wait_max_clear().await;
            q.increment(1.0);
            produced_at.push(s.time().as_secs());
        }
        produced_at
    });

    let produced_at = runtime.block_on(producer).unwrap().unwrap();

    assert_eq!(produced_at, vec![0, 0, 1, 2, 3]);
    assert_eq!(queued.value(), 2.0);
}

#[test]
fn counter_compares_with_floats() {
    let mut counter = BoundedCounter::new(1.0);
    counter += 1.5;
    counter -= 0.5;

    assert!(counter == 2.0);
    assert!(counter >= 2.0);
    assert_eq!(f64::from(&counter), 2.0);
    assert_eq!(counter.to_string(), "<BoundedCounter: 2.0 (min: None, max: None)>");
}
