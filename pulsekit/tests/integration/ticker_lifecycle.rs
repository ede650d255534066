//! Ticker lifecycle, streams and periodic jobs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use pulsekit::latch::Fuse;
use pulsekit::runtime::Runtime;
use pulsekit::ticker::{Job, Ticker, TickerBuilder, TickerError};
use pulsekit::time::MonotonicTime;

fn ms(millis: u64) -> MonotonicTime {
    MonotonicTime::EPOCH + Duration::from_millis(millis)
}

#[test]
fn three_ticks_at_a_tenth_of_a_second() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let ticker = Rc::new(
        TickerBuilder::new(Duration::from_millis(100))
            .count(3)
            .build(&scheduler),
    );
    let observed = Rc::new(RefCell::new(Vec::new()));

    let t = ticker.clone();
    let log = observed.clone();
    let watcher = scheduler.spawn(async move {
        while let Ok(time) = (&*t).await {
            log.borrow_mut().push((time, t.iteration_count(), t.is_done()));
        }
    });

    runtime.block_on(ticker.wait_done()).unwrap();
    runtime.block_on(watcher).unwrap().unwrap();

    assert_eq!(
        *observed.borrow(),
        vec![(ms(100), 1, false), (ms(200), 2, false), (ms(300), 3, true)]
    );
    assert_eq!(runtime.time(), ms(300));
}

#[test]
fn stream_yields_exactly_count_ticks() {
    let mut runtime = Runtime::new();
    let ticker = TickerBuilder::new(Duration::from_secs(1))
        .count(5)
        .build(&runtime.scheduler());

    let ticks = runtime.block_on(ticker.stream().collect::<Vec<_>>()).unwrap();

    assert_eq!(ticks.len(), 5);
    assert_eq!(ticks.last(), Some(&ms(5000)));
    assert!(ticker.is_done());

    // A stream created after completion is empty.
    let late = runtime.block_on(ticker.stream().collect::<Vec<_>>()).unwrap();
    assert!(late.is_empty());
}

#[test]
fn deferred_start_ticks_from_start_time() {
    let mut runtime = Runtime::new();
    let ticker = TickerBuilder::new(Duration::from_secs(1))
        .autostart(false)
        .build(&runtime.scheduler());

    runtime.step_by(Duration::from_millis(2500));
    assert_eq!(ticker.iteration_count(), 0);
    assert_eq!(ticker.until_next(), Err(TickerError::NotStarted));

    ticker.start().unwrap();
    assert_eq!(ticker.start_time(), Some(ms(2500)));
    assert_eq!(ticker.until_next(), Ok(Duration::from_secs(1)));

    assert_eq!(runtime.step(), Some(ms(3500)));
    assert_eq!(ticker.iteration_count(), 1);
}

#[test]
fn stop_ends_streams_and_jobs() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let ticker = Rc::new(Ticker::new(&scheduler, Duration::from_secs(1)));
    let runs = Rc::new(Cell::new(0));

    let r = runs.clone();
    let job = ticker.run_periodically(Job::from_async(move || {
        let r = r.clone();
        async move { r.set(r.get() + 1) }
    }));
    let t = ticker.clone();
    let _ = scheduler.schedule_in(Duration::from_millis(3500), move || t.stop());

    assert_eq!(runtime.block_on(job), Ok(Ok(())));
    assert_eq!(runs.get(), 3);
    assert!(ticker.is_done());
    assert_eq!(ticker.until_next(), Err(TickerError::Finished));
    assert_eq!(ticker.active_tasks(), 0);
    assert_eq!(runtime.step(), None);
}

#[test]
fn ticks_during_a_slow_job_are_skipped() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let ticker = TickerBuilder::new(Duration::from_secs(1))
        .count(6)
        .build(&scheduler);
    let starts = Rc::new(RefCell::new(Vec::new()));

    let s = starts.clone();
    let sleeper = scheduler.clone();
    let job = ticker.run_periodically(Job::from_async(move || {
        let s = s.clone();
        let sleeper = sleeper.clone();
        async move {
            s.borrow_mut().push(sleeper.time());
            // Busy for 1.5 periods.
            let busy = Rc::new(Fuse::new());
            let b = busy.clone();
            let _ = sleeper.schedule_in(Duration::from_millis(1500), move || b.set());
            busy.wait().await;
        }
    }));

    runtime.block_on(job).unwrap().unwrap();

    assert_eq!(*starts.borrow(), vec![ms(1000), ms(3000), ms(5000)]);
}

#[test]
fn blocking_job_runs_on_worker_threads() {
    let mut runtime = Runtime::new();
    let ticker = TickerBuilder::new(Duration::from_secs(1))
        .count(4)
        .build(&runtime.scheduler());
    let runs = Arc::new(AtomicUsize::new(0));

    let r = runs.clone();
    let job = ticker
        .run_periodically_on_worker(Job::from_fn(move || {
            assert_eq!(std::thread::current().name(), Some("pulsekit-worker"));
            r.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    assert_eq!(runtime.block_on(job), Ok(Ok(())));
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

#[test]
fn panicking_worker_job_ends_its_task() {
    let mut runtime = Runtime::new();
    let ticker = Ticker::new(&runtime.scheduler(), Duration::from_secs(1));

    let job = ticker
        .run_periodically_on_worker(Job::from_fn(|| panic!("job panic")))
        .unwrap();

    assert_eq!(runtime.block_on(job), Ok(Ok(())));
    assert_eq!(ticker.iteration_count(), 1);
    assert!(!ticker.is_done());
}

#[test]
fn wait_done_is_ready_after_stop() {
    let mut runtime = Runtime::new();
    let ticker = Ticker::new(&runtime.scheduler(), Duration::from_secs(1));
    ticker.stop();

    assert_eq!(runtime.block_on(ticker.wait_done()), Ok(()));
    assert_eq!(ticker.start(), Err(TickerError::AlreadyStarted));
}
