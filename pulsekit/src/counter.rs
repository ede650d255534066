//! Numeric counter with bound-crossing conditions.
//!
//! A [`BoundedCounter`] holds an `f64` value with an optional minimum and an
//! optional maximum. Two [`Latch`]es track whether the value is at or beyond
//! each bound, so tasks can wait for the counter to reach a bound or to move
//! back inside it. This is typically used to implement backpressure.
//!
//! Entering a bound uses an inclusive comparison while leaving it uses a
//! strict one: with a maximum of 10, the counter is at its maximum from 10
//! upwards, and stops being so only once strictly below 10.
//!
//! # Examples
//!
//! ```
//! use pulsekit::counter::CounterBuilder;
//!
//! let counter = CounterBuilder::new()
//!     .min_value(0.0)
//!     .max_value(10.0)
//!     .build()
//!     .unwrap();
//!
//! counter.set(10.0);
//! assert!(counter.is_at_max());
//!
//! counter.set(11.0);
//! assert!(counter.is_at_max());
//! assert_eq!(counter.value(), 11.0);
//!
//! counter.set(9.0);
//! assert!(!counter.is_at_max());
//! ```

use std::cell::Cell;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::ops::{AddAssign, SubAssign};

use crate::latch::{Latch, LatchWait};

/// A counter with optional bounds.
///
/// See the [module-level documentation](crate::counter) for an overview.
pub struct BoundedCounter {
    value: Cell<f64>,
    min_value: Cell<Option<f64>>,
    max_value: Cell<Option<f64>>,
    clamp_to_bounds: bool,
    at_min: Latch,
    at_max: Latch,
}

impl BoundedCounter {
    /// Creates an unbounded counter with the specified initial value.
    pub fn new(initial_value: f64) -> Self {
        Self::from_parts(initial_value, None, None, false)
    }

    fn from_parts(
        initial_value: f64,
        min_value: Option<f64>,
        max_value: Option<f64>,
        clamp_to_bounds: bool,
    ) -> Self {
        let counter = Self {
            value: Cell::new(initial_value),
            min_value: Cell::new(min_value),
            max_value: Cell::new(max_value),
            clamp_to_bounds,
            at_min: Latch::new(false),
            at_max: Latch::new(false),
        };
        counter.set(initial_value);

        counter
    }

    /// Sets the value, updating the bound conditions.
    ///
    /// If the counter clamps to its bounds, a value beyond a bound is replaced
    /// by that bound.
    pub fn set(&self, value: f64) {
        let min_value = self.min_value.get();
        let max_value = self.max_value.get();

        // The order of these steps is observable when a single call crosses
        // both bounds, and must be kept.
        self.value.set(value);

        if let Some(max) = max_value {
            if self.value.get() >= max {
                self.at_max.set();
                if self.clamp_to_bounds {
                    self.value.set(max);
                }
            }
        }
        if let Some(min) = min_value {
            if self.at_min.is_set() && self.value.get() > min {
                self.at_min.clear();
            }
            if self.value.get() <= min {
                self.at_min.set();
                if self.clamp_to_bounds {
                    self.value.set(min);
                }
            }
        }
        if let Some(max) = max_value {
            if self.at_max.is_set() && self.value.get() < max {
                self.at_max.clear();
            }
        }
    }

    /// Adds to the value.
    pub fn increment(&self, by: f64) {
        self.set(self.value.get() + by);
    }

    /// Subtracts from the value.
    pub fn decrement(&self, by: f64) {
        self.set(self.value.get() - by);
    }

    /// Returns the current value.
    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Returns the minimum value, if any.
    pub fn min_value(&self) -> Option<f64> {
        self.min_value.get()
    }

    /// Returns the maximum value, if any.
    pub fn max_value(&self) -> Option<f64> {
        self.max_value.get()
    }

    /// Sets or removes the minimum value.
    ///
    /// Removing the minimum clears the minimum condition; setting it
    /// re-evaluates the current value against the new bound. An error is
    /// returned, and the counter left unchanged, if the minimum would exceed
    /// the maximum or is NaN.
    pub fn set_min_value(&self, min_value: Option<f64>) -> Result<(), BoundsError> {
        let Some(min) = min_value else {
            self.min_value.set(None);
            self.at_min.clear();

            return Ok(());
        };
        check_bounds(Some(min), self.max_value.get()).map_err(|err| match err {
            BoundsError::NotANumber => err,
            _ => BoundsError::MinAboveMax,
        })?;
        self.min_value.set(Some(min));
        self.set(self.value.get());

        Ok(())
    }

    /// Sets or removes the maximum value.
    ///
    /// Removing the maximum clears the maximum condition; setting it
    /// re-evaluates the current value against the new bound. An error is
    /// returned, and the counter left unchanged, if the maximum would be
    /// lower than the minimum or is NaN.
    pub fn set_max_value(&self, max_value: Option<f64>) -> Result<(), BoundsError> {
        let Some(max) = max_value else {
            self.max_value.set(None);
            self.at_max.clear();

            return Ok(());
        };
        check_bounds(self.min_value.get(), Some(max)).map_err(|err| match err {
            BoundsError::NotANumber => err,
            _ => BoundsError::MaxBelowMin,
        })?;
        self.max_value.set(Some(max));
        self.set(self.value.get());

        Ok(())
    }

    /// Returns `true` if values beyond the bounds are clamped.
    pub fn clamps_to_bounds(&self) -> bool {
        self.clamp_to_bounds
    }

    /// Returns `true` if the value is at or below the minimum.
    pub fn is_at_min(&self) -> bool {
        self.at_min.is_set()
    }

    /// Returns `true` if the value is at or above the maximum.
    pub fn is_at_max(&self) -> bool {
        self.at_max.is_set()
    }

    /// Returns `true` if the value is non-zero.
    pub fn is_nonzero(&self) -> bool {
        self.value.get() != 0.0
    }

    /// Returns a future that completes once the value is at or below the
    /// minimum.
    pub fn wait_min(&self) -> LatchWait {
        self.at_min.wait_true()
    }

    /// Returns a future that completes once the value is at or above the
    /// maximum.
    pub fn wait_max(&self) -> LatchWait {
        self.at_max.wait_true()
    }

    /// Returns a future that completes once the value is strictly above the
    /// minimum.
    pub fn wait_min_clear(&self) -> LatchWait {
        self.at_min.wait_false()
    }

    /// Returns a future that completes once the value is strictly below the
    /// maximum.
    pub fn wait_max_clear(&self) -> LatchWait {
        self.at_max.wait_false()
    }
}

impl Default for BoundedCounter {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AddAssign<f64> for BoundedCounter {
    fn add_assign(&mut self, by: f64) {
        self.increment(by);
    }
}

impl SubAssign<f64> for BoundedCounter {
    fn sub_assign(&mut self, by: f64) {
        self.decrement(by);
    }
}

impl From<&BoundedCounter> for f64 {
    fn from(counter: &BoundedCounter) -> Self {
        counter.value()
    }
}

impl PartialEq<f64> for BoundedCounter {
    fn eq(&self, other: &f64) -> bool {
        self.value() == *other
    }
}

impl PartialOrd<f64> for BoundedCounter {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.value().partial_cmp(other)
    }
}

impl fmt::Display for BoundedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<BoundedCounter: {:?} (min: {}, max: {})>",
            self.value(),
            DisplayBound(self.min_value()),
            DisplayBound(self.max_value())
        )
    }
}

impl fmt::Debug for BoundedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCounter")
            .field("value", &self.value())
            .field("min_value", &self.min_value())
            .field("max_value", &self.max_value())
            .field("clamp_to_bounds", &self.clamp_to_bounds)
            .field("is_at_min", &self.is_at_min())
            .field("is_at_max", &self.is_at_max())
            .finish()
    }
}

struct DisplayBound(Option<f64>);

impl fmt::Display for DisplayBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(bound) => write!(f, "{bound:?}"),
            None => f.write_str("None"),
        }
    }
}

/// Builder for a [`BoundedCounter`].
#[derive(Clone, Debug, Default)]
pub struct CounterBuilder {
    initial_value: f64,
    min_value: Option<f64>,
    max_value: Option<f64>,
    clamp_to_bounds: bool,
}

impl CounterBuilder {
    /// Creates a builder for an unbounded, non-clamping counter starting at
    /// zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial value.
    pub fn initial_value(mut self, value: f64) -> Self {
        self.initial_value = value;

        self
    }

    /// Sets the minimum value.
    pub fn min_value(mut self, min_value: f64) -> Self {
        self.min_value = Some(min_value);

        self
    }

    /// Sets the maximum value.
    pub fn max_value(mut self, max_value: f64) -> Self {
        self.max_value = Some(max_value);

        self
    }

    /// Selects whether values beyond the bounds are clamped.
    ///
    /// Defaults to `false`.
    pub fn clamp_to_bounds(mut self, clamp: bool) -> Self {
        self.clamp_to_bounds = clamp;

        self
    }

    /// Builds the counter.
    ///
    /// An error is returned if the minimum exceeds the maximum or if a bound
    /// is NaN.
    pub fn build(self) -> Result<BoundedCounter, BoundsError> {
        check_bounds(self.min_value, self.max_value)?;

        Ok(BoundedCounter::from_parts(
            self.initial_value,
            self.min_value,
            self.max_value,
            self.clamp_to_bounds,
        ))
    }
}

fn check_bounds(min_value: Option<f64>, max_value: Option<f64>) -> Result<(), BoundsError> {
    if min_value.is_some_and(f64::is_nan) || max_value.is_some_and(f64::is_nan) {
        return Err(BoundsError::NotANumber);
    }
    match (min_value, max_value) {
        (Some(min), Some(max)) if min > max => Err(BoundsError::MinAboveMax),
        _ => Ok(()),
    }
}

/// An error returned when counter bounds are inconsistent.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoundsError {
    /// The minimum would exceed the maximum.
    MinAboveMax,
    /// The maximum would be lower than the minimum.
    MaxBelowMin,
    /// A bound is NaN.
    NotANumber,
}

impl fmt::Display for BoundsError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinAboveMax => write!(fmt, "the minimum value cannot be greater than the maximum value"),
            Self::MaxBelowMin => write!(fmt, "the maximum value cannot be less than the minimum value"),
            Self::NotANumber => write!(fmt, "a counter bound cannot be NaN"),
        }
    }
}

impl Error for BoundsError {}
