//! Random Replacement Policy.
//!
//! This policy evicts a uniformly random way of the set. The generator is a
//! seeded `StdRng` owned by the policy, so victims are reproducible for a
//! given seed and access sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ReplacementPolicy, UpdateContext, VictimContext};

/// Random Policy state.
#[derive(Clone, Debug)]
pub struct RandomPolicy {
    ways: usize,
    seed: u64,
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a new Random policy instance.
    ///
    /// # Arguments
    ///
    /// * `ways` - The associativity (number of ways) of the cache.
    /// * `seed` - Seed of the victim generator.
    pub fn new(ways: usize, seed: u64) -> Self {
        Self { ways, seed, rng: StdRng::seed_from_u64(seed) }
    }
}

impl ReplacementPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn initialize(&mut self, _sets: usize, ways: usize) {
        self.ways = ways;
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    fn find_victim(&mut self, _ctx: &VictimContext<'_>) -> usize {
        self.rng.gen_range(0..self.ways)
    }

    fn update_replacement_state(&mut self, _ctx: &UpdateContext) {}
}
