//! Example: workers released together by a start gate and paused by a switch.
//!
//! This example demonstrates in particular:
//!
//! * a fuse used as a one-time start gate,
//! * a latch used as a pause switch,
//! * edge-triggered waits with `wait_toggled_on`.
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pulsekit::latch::{Fuse, Latch};
use pulsekit::runtime::{Runtime, RuntimeError};
use pulsekit::ticker::Ticker;

const WORKERS: usize = 3;

fn main() -> Result<(), RuntimeError> {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();

    let start = Rc::new(Fuse::new());
    let running = Rc::new(Latch::new(true));
    let ticker = Rc::new(Ticker::new(&scheduler, Duration::from_secs(1)));
    let work_log = Rc::new(RefCell::new(Vec::new()));

    let mut handles = Vec::new();
    for id in 0..WORKERS {
        let start = start.clone();
        let running = running.clone();
        let ticker = ticker.clone();
        let log = work_log.clone();
        handles.push(scheduler.spawn(async move {
            start.wait().await;
            while let Ok(time) = (&*ticker).await {
                running.wait_true().await;
                log.borrow_mut().push((id, time));
            }
        }));
    }

    // Open the gate at 0.5s, pause during [2.5s, 4.5s), stop at 6.5s.
    let s = start.clone();
    let _ = scheduler.schedule_in(Duration::from_millis(500), move || s.set());
    let r = running.clone();
    let _ = scheduler.schedule_in(Duration::from_millis(2500), move || r.clear());
    let r = running.clone();
    let _ = scheduler.schedule_in(Duration::from_millis(4500), move || r.set());
    let t = ticker.clone();
    let _ = scheduler.schedule_in(Duration::from_millis(6500), move || t.stop());

    // Log the moment the switch turns back on.
    let r = running.clone();
    let s = scheduler.clone();
    let resumed_at = scheduler.spawn(async move {
        r.wait_toggled_on().await;
        s.time()
    });

    for handle in handles {
        runtime.block_on(handle)?.expect("worker aborted");
    }
    let resumed_at = runtime.block_on(resumed_at)?.expect("monitor aborted");

    println!("resumed at {:?}", resumed_at);
    for (id, time) in work_log.borrow().iter() {
        println!("worker {} ran for tick {:?}", id, time);
    }

    // The tick at 3s is held back by the switch until 4.5s, so the tick at 4s
    // goes unobserved.
    assert_eq!(work_log.borrow().len(), WORKERS * 5);
    assert_eq!(resumed_at.as_secs(), 4);

    Ok(())
}
