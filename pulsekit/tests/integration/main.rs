// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod counter_backpressure;
mod latch_waiters;
mod periodic_signal;
mod runtime_workers;
mod signal_broadcast;
mod ticker_lifecycle;
#[cfg(not(miri))]
mod wall_clock;
