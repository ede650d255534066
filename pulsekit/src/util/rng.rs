//! Seeded pseudo-random numbers for randomized tests.

use std::cell::Cell;

/// A Wyrand generator.
///
/// See: https://github.com/wangyi-fudan/wyhash
#[derive(Clone, Debug)]
pub(crate) struct Rng {
    state: Cell<u64>,
}

impl Rng {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: Cell::new(seed),
        }
    }

    /// Returns a number in `0..2⁶⁴`.
    pub(crate) fn next_u64(&self) -> u64 {
        let state = self.state.get().wrapping_add(0xA0761D6478BD642F);
        self.state.set(state);
        let t = state as u128 * (state ^ 0xE7037ED1A0B428DB) as u128;

        (t as u64) ^ (t >> 64) as u64
    }

    /// Returns a number in `0..upper_bound` (multiply-shift, slightly biased).
    pub(crate) fn below(&self, upper_bound: u64) -> u64 {
        ((self.next_u64() as u128 * upper_bound as u128) >> 64) as u64
    }

    /// Returns a multiple of 0.5 in `-limit..=limit`.
    ///
    /// Half steps keep arithmetic exact, so values regularly land exactly on
    /// a bound.
    pub(crate) fn half_step(&self, limit: u64) -> f64 {
        (self.below(4 * limit + 1) as f64 - (2 * limit) as f64) / 2.0
    }

    pub(crate) fn coin(&self) -> bool {
        self.next_u64() & 1 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_steps_cover_the_range() {
        let rng = Rng::new(7);
        let mut seen = [false; 9];
        for _ in 0..1000 {
            let x = rng.half_step(2);
            assert!((-2.0..=2.0).contains(&x));
            assert_eq!((x * 2.0).fract(), 0.0);
            seen[(x * 2.0 + 4.0) as usize] = true;
        }

        assert!(seen.iter().all(|&s| s));
    }
}
