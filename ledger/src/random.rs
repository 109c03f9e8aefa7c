use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

/// WrestleBucks handed to a bettor who finishes a settlement broke.
pub const RELIEF_RANGE: RangeInclusive<i64> = 10..=1000;

/// Source of the bankruptcy relief amounts. Swapped for a seeded or stubbed
/// source wherever draws have to be reproducible.
pub trait RandomSource {
    /// Uniform draw from `range`, both ends included.
    fn gen_range(&mut self, range: RangeInclusive<i64>) -> i64;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn gen_range(&mut self, range: RangeInclusive<i64>) -> i64 {
        (**self).gen_range(range)
    }
}

/// Draws from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn gen_range(&mut self, range: RangeInclusive<i64>) -> i64 {
        rand::thread_rng().gen_range(range)
    }
}

#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn gen_range(&mut self, range: RangeInclusive<i64>) -> i64 {
        self.rng.gen_range(range)
    }
}
