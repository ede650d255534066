//! Runtime stepping, deadlock detection and worker offloading.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use pulsekit::runtime::{Runtime, RuntimeError, TaskError};
use pulsekit::signal::Signal;
use pulsekit::time::MonotonicTime;

#[test]
fn waiting_on_a_signal_nobody_fires_is_a_deadlock() {
    let mut runtime = Runtime::new();
    let signal = Signal::new(&runtime.scheduler());

    let waiter = signal.wait();

    assert_eq!(runtime.block_on(waiter), Err(RuntimeError::Deadlock));
}

#[test]
fn worker_output_is_delivered_without_advancing_time() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();

    let worker = scheduler.spawn_blocking(|| {
        thread::sleep(Duration::from_millis(20));
        "done"
    });
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    let _ = scheduler.schedule_in(Duration::from_secs(1), move || r.set(true));

    assert_eq!(runtime.block_on(worker), Ok(Ok("done")));
    assert_eq!(runtime.time(), MonotonicTime::EPOCH);
    assert!(!ran.get());
}

#[test]
fn timers_wait_for_workers_under_no_clock() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let finished_at = Rc::new(Cell::new(None));

    let s = scheduler.clone();
    let f = finished_at.clone();
    let task = scheduler.spawn(async move {
        s.spawn_blocking(|| thread::sleep(Duration::from_millis(20)))
            .await
            .unwrap();
        f.set(Some(s.time()));
    });
    let _ = scheduler.schedule_in(Duration::from_secs(1), || {});

    assert_eq!(runtime.step(), Some(MonotonicTime::EPOCH + Duration::from_secs(1)));
    assert_eq!(finished_at.get(), Some(MonotonicTime::EPOCH));
    assert!(task.is_finished());
}

#[test]
fn run_waits_for_detached_workers() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let delivered = Rc::new(Cell::new(0));

    for value in 1..=3 {
        let s = scheduler.clone();
        let d = delivered.clone();
        scheduler.spawn(async move {
            let v = s.spawn_blocking(move || value * 10).await.unwrap();
            d.set(d.get() + v);
        });
    }
    runtime.run();

    assert_eq!(delivered.get(), 60);
}

#[test]
fn aborted_task_is_dropped_on_next_poll() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let signal = Rc::new(Signal::new(&scheduler));

    let s = signal.clone();
    let handle = scheduler.spawn(async move { s.wait().await });
    runtime.run_until_stalled();
    assert_eq!(signal.waiter_count(), 1);

    handle.abort();
    runtime.run_until_stalled();

    assert!(handle.is_finished());
    assert_eq!(signal.waiter_count(), 0);
    assert_eq!(runtime.block_on(handle), Ok(Err(TaskError::Aborted)));
}

#[test]
fn cancelled_action_key_reports_state() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();

    let first = scheduler.schedule_in(Duration::from_secs(1), || {});
    let second = scheduler.schedule_in(Duration::from_secs(2), || {});
    runtime.step();

    assert!(!first.cancel());
    assert!(second.cancel());
    assert_eq!(runtime.step(), None);
}
