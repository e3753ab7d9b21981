//! Global Simulation Constants.
//!
//! This module defines constants shared across the memory hierarchy. It includes:
//! 1. **Geometry Constants:** Cache block and page sizes with their shift amounts.
//! 2. **Timing Constants:** The cycle type, the "never ready" sentinel, and the deadlock threshold.
//! 3. **Identity Constants:** Instruction id reserved for packets that carry no instruction.

/// A simulated clock cycle count.
pub type Cycle = u64;

/// Cache block size in bytes.
pub const BLOCK_SIZE: u64 = 64;

/// Number of address bits covered by one cache block.
pub const LOG2_BLOCK_SIZE: u32 = 6;

/// Page size in bytes (4KB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of address bits covered by one page.
pub const LOG2_PAGE_SIZE: u32 = 12;

/// Mask for extracting the page offset from an address.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// Event cycle of an entry that is waiting on an external completion.
///
/// MSHR entries carry this value until their downstream data arrives, and
/// untranslated queue entries carry it until translation completes.
pub const CYCLE_NEVER: Cycle = Cycle::MAX;

/// Default number of cycles a head-of-line entry may wait before the run is
/// declared deadlocked.
pub const DEFAULT_DEADLOCK_CYCLE: Cycle = 1_000_000;

/// Instruction id carried by packets that were not produced by an instruction
/// (prefetches, writebacks, translation requests).
pub const NO_INSTR: u64 = 0;
