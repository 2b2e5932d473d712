//! Seeded train / validation / test splitting
//!
//! The split happens in two stages. First the held-out share
//! (`test + validation`) is carved off the shuffled corpus; then the test
//! partition is carved off the held-out part using the ratio
//! `test / (test + validation)`. Each stage shuffles with its own RNG seeded
//! from the same seed, so a given seed always reproduces the same partitions.
//!
//! Held-out counts are rounded up (`ceil(fraction * n)`).

use crate::error::{DatasetError, DatasetResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Absorbs float noise such as `0.1 * 30 = 3.0000000000000004`
const ROUNDING_SLACK: f64 = 1e-9;

/// Requested shares of the corpus held out for evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitFractions {
    test: f64,
    validation: f64,
}

impl SplitFractions {
    /// Both fractions must lie in `(0, 1)` and leave something for training.
    pub fn new(test: f64, validation: f64) -> DatasetResult<Self> {
        for (name, value) in [("test", test), ("validation", validation)] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(DatasetError::InvalidSplit(format!(
                    "{} fraction must be between 0 and 1 (exclusive), got {}",
                    name, value
                )));
            }
        }
        if test + validation >= 1.0 {
            return Err(DatasetError::InvalidSplit(format!(
                "test + validation must be below 1, got {} + {} = {}",
                test,
                validation,
                test + validation
            )));
        }
        Ok(Self { test, validation })
    }

    pub fn test(&self) -> f64 {
        self.test
    }

    pub fn validation(&self) -> f64 {
        self.validation
    }

    /// Share of the whole corpus carved off in the first stage
    pub fn held_out(&self) -> f64 {
        self.test + self.validation
    }

    /// Share of the held-out part that becomes the test partition
    pub fn test_share_of_held_out(&self) -> f64 {
        if self.test == self.validation {
            0.5
        } else {
            self.test / self.held_out()
        }
    }
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self {
            test: 0.1,
            validation: 0.1,
        }
    }
}

/// Result of a three-way split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splits<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
    pub test: Vec<T>,
}

/// Number of items to hold out of `total`.
///
/// Rounds up, then clamps so that at least `min_held` items are held out and
/// at least one item is kept whenever `total` allows it.
fn held_out_count(total: usize, fraction: f64, min_held: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let raw = (fraction * total as f64 - ROUNDING_SLACK).ceil().max(0.0) as usize;
    let floor = min_held.min(total);
    let ceiling = total.saturating_sub(1).max(floor);
    raw.clamp(floor, ceiling)
}

/// Shuffle `items` with `seed` and split off `fraction` of them.
///
/// Returns `(kept, held_out)`.
pub fn train_test_split<T>(items: Vec<T>, fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    split_with_minimum(items, fraction, seed, 0)
}

fn split_with_minimum<T>(
    mut items: Vec<T>,
    fraction: f64,
    seed: u64,
    min_held: usize,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let held = held_out_count(items.len(), fraction, min_held);
    let kept = items.split_off(held);
    (kept, items)
}

/// Two-stage split into train, validation and test partitions.
///
/// With three or more items every partition receives at least one item.
pub fn three_way_split<T>(items: Vec<T>, fractions: &SplitFractions, seed: u64) -> Splits<T> {
    let total = items.len();
    let (train, held_out) = split_with_minimum(items, fractions.held_out(), seed, 2);
    let (validation, test) =
        split_with_minimum(held_out, fractions.test_share_of_held_out(), seed, 1);

    tracing::debug!(
        "Split {} records into {} train, {} validation, {} test",
        total,
        train.len(),
        validation.len(),
        test.len()
    );

    Splits {
        train,
        validation,
        test,
    }
}
