//! Probabilistic instruction-biased replacement policy.
//!
//! Each way records the cycle it was last used and whether that use came from
//! the instruction side. A victim is normally the least recently used way. With
//! probability `instr_eviction_prob` percent the policy instead evicts the
//! instruction line with the latest last-used cycle, if the set holds one.
//! Write hits leave the metadata untouched.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ReplacementPolicy, UpdateContext, VictimContext};
use crate::common::Cycle;

#[derive(Clone, Copy, Debug, Default)]
struct WayState {
    last_used_cycle: Cycle,
    is_instr: bool,
}

/// Probabilistic instruction-biased policy state.
#[derive(Clone, Debug)]
pub struct ProbiPolicy {
    ways: usize,
    state: Vec<WayState>,
    instr_eviction_prob: u32,
    seed: u64,
    rng: StdRng,
    biased_evictions: u64,
}

impl ProbiPolicy {
    /// Creates the policy for a cache of `sets` x `ways`.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity of the cache.
    /// * `instr_eviction_prob` - Percent chance of preferring an instruction line.
    /// * `seed` - Seed of the generator deciding each eviction.
    pub fn new(sets: usize, ways: usize, instr_eviction_prob: u32, seed: u64) -> Self {
        Self {
            ways,
            state: vec![WayState::default(); sets * ways],
            instr_eviction_prob: instr_eviction_prob.min(100),
            seed,
            rng: StdRng::seed_from_u64(seed),
            biased_evictions: 0,
        }
    }
}

impl ReplacementPolicy for ProbiPolicy {
    fn name(&self) -> &'static str {
        "probi"
    }

    fn initialize(&mut self, sets: usize, ways: usize) {
        self.ways = ways;
        self.state = vec![WayState::default(); sets * ways];
        self.rng = StdRng::seed_from_u64(self.seed);
        self.biased_evictions = 0;
    }

    fn find_victim(&mut self, ctx: &VictimContext<'_>) -> usize {
        let ways = &self.state[ctx.set * self.ways..(ctx.set + 1) * self.ways];

        // First minimum, as a stable LRU choice.
        let mut victim = 0;
        for (way, state) in ways.iter().enumerate() {
            if state.last_used_cycle < ways[victim].last_used_cycle {
                victim = way;
            }
        }

        if self.rng.gen_range(0..100) < self.instr_eviction_prob {
            let mut newest: Option<(usize, Cycle)> = None;
            for (way, state) in ways.iter().enumerate() {
                if state.is_instr && newest.is_none_or(|(_, cycle)| cycle <= state.last_used_cycle) {
                    newest = Some((way, state.last_used_cycle));
                }
            }
            if let Some((way, _)) = newest {
                victim = way;
                self.biased_evictions += 1;
            }
        }
        victim
    }

    fn update_replacement_state(&mut self, ctx: &UpdateContext) {
        if ctx.is_write_hit() {
            return;
        }
        let slot = &mut self.state[ctx.set * self.ways + ctx.way];
        slot.last_used_cycle = ctx.cycle;
        slot.is_instr = ctx.is_instr;
    }

    fn final_stats(&self) -> Vec<(&'static str, u64)> {
        vec![("probi_instr_biased_evictions", self.biased_evictions)]
    }
}
