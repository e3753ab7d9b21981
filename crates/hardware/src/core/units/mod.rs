//! Memory hierarchy functional units.
//!
//! This module contains the building blocks of each hierarchy level:
//! 1. **Cache:** The set-associative cache engine with its queues, MSHR and policies.
//! 2. **MMU:** The page table and the page walker behind the TLB levels.
//! 3. **Prefetch:** Hardware prefetchers hosted by a cache.

/// Set-associative cache engine.
pub mod cache;

/// Address translation.
pub mod mmu;

/// Hardware prefetchers.
pub mod prefetch;
