#[cfg(test)]
pub(crate) mod rng;
pub(crate) mod timer_queue;
pub(crate) mod wait_queue;
