//! Cycle-level cache hierarchy simulator library.
//!
//! This crate models a memory hierarchy driven by a trace core, with the following:
//! 1. **Core:** A trace-driven core with a reorder buffer and buses to its first-level caches.
//! 2. **Caches:** Set-associative caches with request queues, MSHRs, pluggable replacement and prefetching.
//! 3. **Translation:** TLB levels built from the same cache engine over a demand-allocated page table.
//! 4. **SoC:** The component contract, the split-borrow interconnect, DRAM, and the hierarchy builder.
//! 5. **Simulation:** Warmup and region-of-interest phases, configuration, and statistics collection.

/// Common types and constants (addresses, packets, access types, errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Core side of the hierarchy (trace core, ROB, buses, caches, MMU, prefetchers).
pub mod core;
/// Run phases and the top-level simulator.
pub mod sim;
/// System-on-chip (builder, interconnect, memory, traits).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or load it from JSON.
pub use crate::config::Config;
/// Error type returned by every fallible operation.
pub use crate::common::SimError;
/// Built hierarchy; construct with `MemoryHierarchy::from_config`.
pub use crate::soc::MemoryHierarchy;
/// Top-level run driver.
pub use crate::sim::Simulator;
/// Final run report.
pub use crate::stats::SimStats;
