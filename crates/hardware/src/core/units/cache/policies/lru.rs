//! Least Recently Used (LRU) Replacement Policy.
//!
//! This policy evicts the cache line that has not been accessed for the longest time.
//! It maintains a usage stack for each set. When a line is accessed, it is moved
//! to the top (Most Recently Used position). The bottom of the stack represents
//! the Least Recently Used line. Write hits leave the stack untouched.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `update_replacement_state()`: O(W) where W is the number of ways (associativity)
//!   - `find_victim()`: O(1)
//! - **Space Complexity:** O(S × W) where S is the number of sets
//! - **Best Case:** Accesses with good temporal locality
//! - **Worst Case:** Scanning patterns larger than cache capacity (thrashing)

use super::{ReplacementPolicy, UpdateContext, VictimContext};

/// LRU Policy state.
#[derive(Clone, Debug)]
pub struct LruPolicy {
    /// A vector of usage stacks (one per set).
    /// Index 0 is MRU, last index is LRU.
    usage: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates a new LRU policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity (number of ways) of the cache.
    pub fn new(sets: usize, ways: usize) -> Self {
        let mut policy = Self { usage: Vec::new() };
        policy.initialize(sets, ways);
        policy
    }

    fn touch(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        if let Some(pos) = stack.iter().position(|&x| x == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }
}

impl ReplacementPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn initialize(&mut self, sets: usize, ways: usize) {
        self.usage = (0..sets).map(|_| (0..ways).collect()).collect();
    }

    /// Returns the way at the bottom of the usage stack (LRU position).
    fn find_victim(&mut self, ctx: &VictimContext<'_>) -> usize {
        self.usage[ctx.set].last().copied().unwrap_or(0)
    }

    /// Moves the accessed way to the MRU position unless the access is a write hit.
    fn update_replacement_state(&mut self, ctx: &UpdateContext) {
        if !ctx.is_write_hit() {
            self.touch(ctx.set, ctx.way);
        }
    }
}
