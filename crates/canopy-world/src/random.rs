//! Injectable randomness.
//!
//! Yield, potency, flowering time, market draws and weather rolls all go
//! through [`RandomSource`] so tests can pin every outcome. Production code
//! uses [`SeededRandom`]; tests use [`FixedRandom`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform random numbers.
///
/// Implementors provide a single primitive, a draw in `[0, 1)`. The ranged
/// helpers are derived from it so that a fixed draw produces predictable
/// values everywhere.
pub trait RandomSource: Send {
    /// Next draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform draw in `[low, high]`. Returns `low` when the range is empty
    /// or inverted.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        let unit = self.next_unit().clamp(0.0, 1.0);
        (high - low).mul_add(unit, low).min(high)
    }

    /// Uniform integer draw in `[low, high]`. Returns `low` when the range
    /// is empty or inverted.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn int_inclusive(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        let span = high.saturating_sub(low).saturating_add(1) as f64;
        let unit = self.next_unit().clamp(0.0, 1.0);
        let offset = (span * unit).floor() as i64;
        low.saturating_add(offset).min(high)
    }

    /// Bernoulli trial: `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }
}

/// Pick one element of a slice uniformly. `None` for an empty slice.
pub fn pick<'a, T, R: RandomSource + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    let last = i64::try_from(items.len()).ok()?.checked_sub(1)?;
    let index = usize::try_from(rng.int_inclusive(0, last)).ok()?;
    items.get(index)
}

// ---------------------------------------------------------------------------
// Production source
// ---------------------------------------------------------------------------

/// [`RandomSource`] backed by a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Create a reproducible source from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a source seeded from the operating system.
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

// ---------------------------------------------------------------------------
// Test source
// ---------------------------------------------------------------------------

/// [`RandomSource`] that returns the same draw forever.
///
/// With the default draw of `0.5`, `uniform(a, b)` is the midpoint of the
/// range, so quality multipliers come out at exactly `1.0`.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    unit: f64,
}

impl FixedRandom {
    /// A source that always draws `unit` (clamped into `[0, 1)`).
    pub fn new(unit: f64) -> Self {
        Self {
            unit: unit.clamp(0.0, 0.999_999),
        }
    }

    /// A source that always draws the midpoint.
    pub fn midpoint() -> Self {
        Self::new(0.5)
    }
}

impl Default for FixedRandom {
    fn default() -> Self {
        Self::midpoint()
    }
}

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f64 {
        self.unit
    }
}
