//! Injectable pseudo-random source for simulated telemetry.

use core::ops::RangeInclusive;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Source of bounded pseudo-random integers.
pub trait RandomSource {
    /// Returns a value inside `range` (both ends inclusive).
    fn next_in_range(&mut self, range: RangeInclusive<u32>) -> u32;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_in_range(&mut self, range: RangeInclusive<u32>) -> u32 {
        (**self).next_in_range(range)
    }
}

/// Default seed used when the platform has no entropy to offer.
pub const DEFAULT_SEED: u64 = 0x2545_F491_4F6C_DD1D;

/// [`RandomSource`] backed by a seeded [`SmallRng`].
#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl RandomSource for SeededRandom {
    fn next_in_range(&mut self, range: RangeInclusive<u32>) -> u32 {
        if range.is_empty() {
            return *range.start();
        }
        self.rng.random_range(range)
    }
}
