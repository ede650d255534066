//! Example: producer/consumer pair throttled by a bounded queue.
//!
//! This example demonstrates in particular:
//!
//! * backpressure with a bounded counter,
//! * a counted ticker driving a periodic job,
//! * deterministic stepping with the default clock.
//!
//! ```text
//!                  ┌────────────┐  items  ┌────────────┐
//!  wait_max_clear ►│  Producer  ├────────►│  Consumer  │◄ ticker (250ms × 12)
//!                  └────────────┘         └────────────┘
//!                          queue length: 0..=4
//! ```
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pulsekit::counter::CounterBuilder;
use pulsekit::runtime::{Runtime, RuntimeError};
use pulsekit::ticker::{Job, TickerBuilder};
use pulsekit::time::MonotonicTime;

/// Maximum number of queued items.
const CAPACITY: f64 = 4.0;
/// Consumer period.
const CONSUMER_PERIOD: Duration = Duration::from_millis(250);
/// Number of items consumed before the consumer stops.
const CONSUMED_ITEMS: u64 = 12;

fn main() -> Result<(), RuntimeError> {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();

    let queue = Rc::new(
        CounterBuilder::new()
            .min_value(0.0)
            .max_value(CAPACITY)
            .clamp_to_bounds(true)
            .build()
            .expect("valid bounds"),
    );

    // Consumer: takes one item per tick.
    let consumer = TickerBuilder::new(CONSUMER_PERIOD)
        .count(CONSUMED_ITEMS)
        .build(&scheduler);
    let q = queue.clone();
    let consumer_task = consumer.run_periodically(Job::from_async(move || {
        let q = q.clone();
        async move {
            q.wait_min_clear().await;
            q.decrement(1.0);
        }
    }));

    // Producer: fills the queue whenever there is room, and records when.
    let production_log = Rc::new(RefCell::new(Vec::new()));
    let q = queue.clone();
    let log = production_log.clone();
    let s = scheduler.clone();
    scheduler.spawn(async move {
        loop {
            q.wait_max_clear().await;
            q.increment(1.0);
            log.borrow_mut().push(s.time());
        }
    });

    runtime.block_on(consumer_task)?.expect("consumer task aborted");

    let t0 = MonotonicTime::EPOCH;
    let log = production_log.borrow();
    println!("{} items produced, queue: {}", log.len(), queue);

    // The queue is filled at once, then refilled after each consumed item.
    assert_eq!(log.len() as u64, CAPACITY as u64 + CONSUMED_ITEMS);
    assert_eq!(log[..CAPACITY as usize], [t0; CAPACITY as usize]);
    assert_eq!(
        log.last().copied(),
        Some(t0 + CONSUMER_PERIOD * CONSUMED_ITEMS as u32)
    );
    assert!(queue.is_at_max());

    Ok(())
}
