//! System-level Components of the hierarchy.
//!
//! This module organizes the pieces that connect the levels together: the
//! component contract, the interconnect, main memory, and the builder that
//! assembles a complete hierarchy.

/// Hierarchy builder and tick loop.
pub mod builder;

/// Node ids and the split-borrow fabric.
pub mod interconnect;

/// Main memory and memory controllers.
pub mod memory;

/// Component trait definitions.
pub mod traits;

pub use builder::MemoryHierarchy;
