//! Simulation driver.
//!
//! Runs a built hierarchy through its warmup and region-of-interest phases
//! and collects the final statistics.

/// Top-level run driver.
pub mod simulator;

pub use simulator::Simulator;
