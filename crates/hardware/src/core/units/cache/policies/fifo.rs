//! First-In, First-Out (FIFO) Replacement Policy.
//!
//! This policy evicts the oldest cache line in a set, regardless of how recently
//! it was accessed. It operates as a circular buffer (Round-Robin) for each set:
//! the pointer only moves when a fill lands on the way it points to.
//!
//! # Performance
//!
//! - **Time Complexity:** O(1) for both operations
//! - **Space Complexity:** O(S) where S is the number of sets
//! - **Best Case:** Streaming accesses where all lines have equal importance
//! - **Worst Case:** Workloads with strong temporal locality

use super::{ReplacementPolicy, UpdateContext, VictimContext};

/// FIFO Policy state.
#[derive(Clone, Debug)]
pub struct FifoPolicy {
    /// Tracks the next way to be evicted for each set.
    next_way: Vec<usize>,
    /// Number of ways in the cache.
    ways: usize,
}

impl FifoPolicy {
    /// Creates a new FIFO policy instance.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self { next_way: vec![0; sets], ways }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn initialize(&mut self, sets: usize, ways: usize) {
        self.next_way = vec![0; sets];
        self.ways = ways;
    }

    fn find_victim(&mut self, ctx: &VictimContext<'_>) -> usize {
        self.next_way[ctx.set]
    }

    /// Hits do not reorder a FIFO.
    fn update_replacement_state(&mut self, _ctx: &UpdateContext) {}

    /// Advances the pointer when the fill landed on the way it points to.
    fn on_fill(&mut self, ctx: &UpdateContext) {
        if self.next_way[ctx.set] == ctx.way {
            self.next_way[ctx.set] = (ctx.way + 1) % self.ways;
        }
    }
}
