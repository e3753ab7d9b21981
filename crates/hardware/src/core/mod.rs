//! Core-side components of the hierarchy.
//!
//! This module contains the trace-driven core that generates memory traffic,
//! its reorder buffer and instruction sources, the bus adapters to the
//! first-level caches, and the hierarchy's functional units.

/// Pipeline-side cache bus adapter.
pub mod bus;

/// Trace-driven core.
pub mod cpu;

/// Reorder buffer.
pub mod rob;

/// Instruction sources.
pub mod stream;

/// Caches, address translation and prefetchers.
pub mod units;

pub use self::cpu::TraceCore;
