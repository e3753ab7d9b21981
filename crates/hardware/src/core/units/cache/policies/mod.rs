//! Cache Replacement Policies.
//!
//! Implements the algorithms that pick a victim way when a fill lands in a
//! full set. A policy owns all of its per-way metadata; the cache engine only
//! talks to it through [`ReplacementPolicy`].
//!
//! # Policies
//!
//! - `Fifo`: First-In, First-Out.
//! - `Lru`: Least Recently Used.
//! - `Random`: Seeded random selection.
//! - `Probi`: LRU with a probabilistic bias toward evicting instruction lines.
//!
//! Randomized policies draw from their own seeded generator, so a fixed seed
//! and a fixed access sequence always produce the same victims.

/// First-In, First-Out replacement policy.
pub mod fifo;

/// Least Recently Used replacement policy.
pub mod lru;

/// Probabilistic instruction-biased replacement policy.
pub mod probi;

/// Random replacement policy.
pub mod random;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use probi::ProbiPolicy;
pub use random::RandomPolicy;

use crate::common::{AccessType, Cycle};
use crate::core::units::cache::block::Block;

/// Request context handed to [`ReplacementPolicy::find_victim`].
#[derive(Clone, Copy, Debug)]
pub struct VictimContext<'a> {
    /// Requesting cpu.
    pub cpu: usize,
    /// Instruction that caused the fill.
    pub instr_id: u64,
    /// Set being filled.
    pub set: usize,
    /// Current contents of the set, way 0 first.
    pub current_set: &'a [Block],
    /// Instruction pointer of the request.
    pub ip: u64,
    /// Full address being installed.
    pub full_addr: u64,
    /// Type of the fill.
    pub access_type: AccessType,
    /// The fill is a translation; false unless the cache is translation aware.
    pub is_pte: bool,
    /// The cache's level on the translation path; 0 unless the cache is translation aware.
    pub translation_level: u8,
}

/// Access context handed to [`ReplacementPolicy::update_replacement_state`].
#[derive(Clone, Copy, Debug)]
pub struct UpdateContext {
    /// Requesting cpu.
    pub cpu: usize,
    /// Set accessed.
    pub set: usize,
    /// Way accessed or filled.
    pub way: usize,
    /// Full address of the access.
    pub full_addr: u64,
    /// Instruction pointer of the request.
    pub ip: u64,
    /// Address of the evicted line on a fill (0 when nothing was evicted).
    pub victim_addr: u64,
    /// Type of the access.
    pub access_type: AccessType,
    /// The access hit.
    pub hit: bool,
    /// The access comes from the instruction side.
    pub is_instr: bool,
    /// The access is a translation; false unless the cache is translation aware.
    pub is_pte: bool,
    /// The cache's level on the translation path; 0 unless the cache is translation aware.
    pub translation_level: u8,
    /// Current cycle.
    pub cycle: Cycle,
}

impl UpdateContext {
    /// Write hits refresh no recency state in the policies below.
    pub fn is_write_hit(&self) -> bool {
        self.hit && self.access_type == AccessType::Write
    }
}

/// Trait for cache replacement policies.
///
/// Defines the interface for tracking usage and selecting victim lines.
pub trait ReplacementPolicy: Send + Sync {
    /// Short policy name used in reports.
    fn name(&self) -> &'static str;

    /// Resets all metadata for a cache of `sets` x `ways`.
    fn initialize(&mut self, sets: usize, ways: usize);

    /// Selects the way to evict from a full set.
    ///
    /// # Returns
    ///
    /// A way index; anything outside `[0, ways)` is reported by the engine as
    /// an invariant violation.
    fn find_victim(&mut self, ctx: &VictimContext<'_>) -> usize;

    /// Refreshes metadata after a hit.
    fn update_replacement_state(&mut self, ctx: &UpdateContext);

    /// Refreshes metadata after a fill. Defaults to [`ReplacementPolicy::update_replacement_state`].
    fn on_fill(&mut self, ctx: &UpdateContext) {
        self.update_replacement_state(ctx);
    }

    /// Policy-specific counters reported at the end of the run.
    fn final_stats(&self) -> Vec<(&'static str, u64)> {
        Vec::new()
    }
}
