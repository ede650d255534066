//! Coordination primitives for single-threaded cooperative programs.
//!
//! Pulsekit provides a small set of building blocks to compose readiness and
//! backpressure logic between many tasks sharing one thread of execution:
//!
//! * [`Latch`](latch::Latch): a level-triggered boolean condition,
//! * [`Signal`](signal::Signal): an edge-triggered broadcast wake-up carrying
//!   the time of the firing, and its self-firing variant
//!   [`PeriodicSignal`](signal::PeriodicSignal),
//! * [`Ticker`](ticker::Ticker): a drift-free periodic timer that counts its
//!   ticks, can stop after a fixed number of them and can drive repeating
//!   jobs,
//! * [`BoundedCounter`](counter::BoundedCounter): a numeric cell whose bound
//!   crossings are exposed as latches.
//!
//! All primitives share one hard problem: coordinating suspended waiters
//! against mutable, time-varying state without missed or double wake-ups,
//! and without timing drift.
//!
//! # The runtime
//!
//! The primitives run on a [`Runtime`](runtime::Runtime), a single-threaded
//! executor coupled with a timer queue and a pluggable
//! [`Clock`](time::Clock). Nothing relies on an ambient, global event loop:
//! primitives that read the time or schedule timers take a
//! [`Scheduler`](runtime::Scheduler) handle at construction.
//!
//! Time is driven explicitly by stepping the runtime. With the default
//! [`NoClock`](time::NoClock) the runtime jumps from one deadline to the next
//! as fast as possible, which makes time-dependent code fully deterministic
//! under test. A [`SystemClock`](time::SystemClock) or
//! [`AutoSystemClock`](time::AutoSystemClock) paces the runtime against the
//! wall clock instead.
//!
//! # Waiting
//!
//! Every waiting operation returns a future that registers its waiter when
//! it is *created*, not when it is first polled. A wake-up that happens
//! between the creation of the future and its first poll is therefore never
//! lost. Dropping a waiter future unregisters it without affecting other
//! waiters.
//!
//! Mutations such as [`Latch::set()`](latch::Latch::set),
//! [`Signal::fire()`](signal::Signal::fire) or
//! [`BoundedCounter::set()`](counter::BoundedCounter::set) are synchronous
//! and run to completion; the tasks they release resume the next time the
//! runtime polls its tasks.
//!
//! # Feature flags
//!
//! * `tracing`: provides `tracing::RuntimeTime`, a timer for the
//!   `tracing-subscriber` crate that stamps log events with the runtime time.
//!   Events are emitted with the [`tracing`](::tracing) crate whether or not
//!   this feature is enabled.
//!
//! # Example
//!
//! A producer that pauses whenever a bounded queue is full:
//!
//! ```
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use pulsekit::counter::CounterBuilder;
//! use pulsekit::runtime::Runtime;
//! use pulsekit::ticker::{Job, TickerBuilder};
//!
//! let mut runtime = Runtime::new();
//! let scheduler = runtime.scheduler();
//!
//! // Number of queued items; the producer stops at 3.
//! let queued = Rc::new(CounterBuilder::new().max_value(3.0).build().unwrap());
//!
//! // The consumer drains one item every second, 10 times.
//! let consumer = TickerBuilder::new(Duration::from_secs(1))
//!     .count(10)
//!     .build(&scheduler);
//! let q = queued.clone();
//! consumer.run_periodically(Job::from_async(move || {
//!     let q = q.clone();
//!     async move {
//!         if q.value() > 0.0 {
//!             q.decrement(1.0);
//!         }
//!     }
//! }));
//!
//! // The producer fills the queue as fast as backpressure allows.
//! let q = queued.clone();
//! let producer = scheduler.spawn(async move {
//!     let mut produced = 0;
//!     while produced < 8 {
//!         q.wait_max_clear().await;
//!         q.increment(1.0);
//!         produced += 1;
//!     }
//! });
//!
//! runtime.block_on(producer).unwrap().unwrap();
//!
//! // 3 items were produced at once, then one per consumed item.
//! assert_eq!(runtime.time().as_secs(), 5);
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod counter;
pub mod latch;
pub mod runtime;
pub mod signal;
pub mod ticker;
pub mod time;
#[cfg(feature = "tracing")]
pub mod tracing;
pub(crate) mod util;
