//! Latch waiters driven by runtime tasks.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pulsekit::latch::{Fuse, Latch};
use pulsekit::runtime::Runtime;

#[test]
fn latch_releases_all_waiters_in_registration_order() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let latch = Rc::new(Latch::new(false));
    let order = Rc::new(RefCell::new(Vec::new()));

    let mut handles = Vec::new();
    for id in 0..4 {
        let latch = latch.clone();
        let order = order.clone();
        handles.push(scheduler.spawn(async move {
            latch.wait_true().await;
            order.borrow_mut().push(id);
        }));
    }
    runtime.run_until_stalled();
    assert!(order.borrow().is_empty());

    latch.set();
    runtime.run_until_stalled();

    assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    assert!(handles.iter().all(|h| h.is_finished()));
}

#[test]
fn waiter_released_by_a_transition_survives_the_reverse_transition() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let latch = Rc::new(Latch::new(false));

    let l = latch.clone();
    let waiter = scheduler.spawn(async move { l.wait_true().await });
    runtime.run_until_stalled();

    // Both transitions happen before the waiter is polled again.
    latch.set();
    latch.clear();

    assert_eq!(runtime.block_on(waiter), Ok(Ok(())));
    assert!(latch.is_clear());
}

#[test]
fn wait_toggle_to_waits_for_a_full_cycle() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let latch = Rc::new(Latch::new(true));

    let l = latch.clone();
    let waiter = scheduler.spawn(async move { l.wait_toggled_on().await });

    for (secs, state) in [(1, true), (2, false), (3, true)] {
        let l = latch.clone();
        let _ = scheduler.schedule_in(Duration::from_secs(secs), move || l.set_state(state));
    }

    runtime.step();
    runtime.step();
    assert!(!waiter.is_finished());
    runtime.step();
    assert!(waiter.is_finished());
    assert_eq!(runtime.time().as_secs(), 3);
}

#[test]
fn fuse_wakes_late_and_early_waiters() {
    let mut runtime = Runtime::new();
    let scheduler = runtime.scheduler();
    let fuse = Rc::new(Fuse::new());

    let f = fuse.clone();
    let early = scheduler.spawn(async move { f.wait().await });
    let f = fuse.clone();
    let _ = scheduler.schedule_in(Duration::from_secs(1), move || f.set());

    assert_eq!(runtime.block_on(early), Ok(Ok(())));

    let f = fuse.clone();
    assert_eq!(runtime.block_on(async move { f.wait().await }), Ok(()));
}
