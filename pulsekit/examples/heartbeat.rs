//! Example: real-time heartbeat with a worker-offloaded job.
//!
//! This example demonstrates in particular:
//!
//! * pacing a runtime against the wall clock,
//! * a periodic signal observed through callbacks and a stream,
//! * a blocking job offloaded to worker threads,
//! * runtime diagnostics through `tracing`.
//!
//! Run with `RUST_LOG=pulsekit=trace` to see the runtime diagnostics.
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

use pulsekit::runtime::{RuntimeError, RuntimeInit};
use pulsekit::signal::PeriodicSignal;
use pulsekit::ticker::{Job, TickerBuilder};
use pulsekit::time::{AutoSystemClock, MonotonicTime};

const HEARTBEAT_PERIOD: Duration = Duration::from_millis(100);
const JOB_PERIOD: Duration = Duration::from_millis(250);
const JOB_RUNS: u64 = 3;

fn main() -> Result<(), RuntimeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let t0 = MonotonicTime::EPOCH;
    let mut runtime = RuntimeInit::new()
        .set_clock(AutoSystemClock::new())
        .init(t0);
    let scheduler = runtime.scheduler();

    // Heartbeat, printed by a callback.
    let heartbeat = Rc::new(PeriodicSignal::new(&scheduler, HEARTBEAT_PERIOD));
    heartbeat.add_callback(|time| println!("heartbeat at {:?}", time));

    // A job that blocks for a while, run on worker threads.
    let job_runs = Arc::new(AtomicUsize::new(0));
    let runs = job_runs.clone();
    let ticker = TickerBuilder::new(JOB_PERIOD)
        .count(JOB_RUNS)
        .build(&scheduler);
    ticker
        .run_periodically_on_worker(Job::from_fn(move || {
            thread::sleep(Duration::from_millis(50));
            runs.fetch_add(1, Ordering::SeqCst);
        }))
        .expect("the job is blocking");

    // Stop the heartbeat once the ticker is done.
    let h = heartbeat.clone();
    let done = ticker.wait_done();
    scheduler.spawn(async move {
        done.await;
        h.stop();
    });

    let beats = runtime.block_on(heartbeat.stream().count())?;

    println!(
        "{} heartbeats, {} job runs, stopped at {:?}",
        beats,
        job_runs.load(Ordering::SeqCst),
        runtime.time()
    );
    assert_eq!(ticker.iteration_count(), JOB_RUNS);

    Ok(())
}
