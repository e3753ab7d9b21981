//! Component traits for the memory hierarchy.
//!
//! This module defines the contract every simulated component implements. It provides:
//! 1. **Consumption:** `add_rq`/`add_wq`/`add_pq`/`add_ptwq` admit requests from an upper level.
//! 2. **Production:** `return_data` delivers completed requests back up the hierarchy.
//! 3. **Operation:** Per-cycle `operate`, phase changes, and the deadlock dump hook.
//! 4. **Downcasting:** Optional casts to `Cache`, `TraceCore`, `Dram`, or `PageWalker` for inspection.
//!
//! All implementors must be `Send + Sync` so a built hierarchy can be moved across threads.

use crate::common::{Cycle, Packet, ReturnPort, SimError};
use crate::core::cpu::TraceCore;
use crate::core::units::cache::Cache;
use crate::core::units::mmu::PageWalker;
use crate::soc::interconnect::Fabric;
use crate::soc::memory::Dram;

/// The queues a consumer exposes to its upper levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Read queue.
    Read,
    /// Write queue.
    Write,
    /// Prefetch queue.
    Prefetch,
    /// Page-table-walk queue.
    Translation,
}

impl QueueKind {
    /// Short label used in diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "RQ",
            Self::Write => "WQ",
            Self::Prefetch => "PQ",
            Self::Translation => "PTWQ",
        }
    }
}

/// Statistics phase of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Caches and predictors are warmed; latencies are zero and statistics are discarded.
    Warmup,
    /// Region of interest; statistics are reported.
    Roi,
}

/// Accepts requests from upper levels.
///
/// Every `add_*` returns `false` when the request was rejected for capacity;
/// the caller keeps the request and retries in a later cycle. Components that
/// accept no requests keep the default implementations.
pub trait MemoryRequestConsumer {
    /// Offers a read (or demand-promoted prefetch) request.
    fn add_rq(&mut self, _packet: &Packet) -> bool {
        false
    }
    /// Offers a write or writeback.
    fn add_wq(&mut self, _packet: &Packet) -> bool {
        false
    }
    /// Offers a prefetch.
    fn add_pq(&mut self, _packet: &Packet) -> bool {
        false
    }
    /// Offers a page-table-walk request.
    fn add_ptwq(&mut self, _packet: &Packet) -> bool {
        false
    }
    /// Current number of entries in `queue`.
    fn occupancy(&self, _queue: QueueKind) -> usize {
        0
    }
    /// Capacity of `queue`.
    fn size(&self, _queue: QueueKind) -> usize {
        0
    }
}

/// Receives completed requests from lower levels.
pub trait MemoryRequestProducer {
    /// Delivers a completed `packet` to the entry point `port`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvariantViolation`] when the completion matches
    /// nothing this component is waiting for.
    fn return_data(&mut self, port: ReturnPort, packet: &Packet) -> Result<(), SimError>;
}

/// A clocked component.
pub trait Operable {
    /// Advances the component's notion of the current cycle.
    fn set_cycle(&mut self, cycle: Cycle);

    /// The cycle most recently set with [`Operable::set_cycle`].
    fn current_cycle(&self) -> Cycle;

    /// Performs one cycle of work.
    ///
    /// # Arguments
    ///
    /// * `fabric` - Mutable access to every other component in the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Deadlock`] when a structure stalled past the
    /// threshold, or [`SimError::InvariantViolation`] on a broken contract.
    fn operate(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError>;

    /// Enters `phase`; statistics collected so far are kept for the previous phase.
    fn begin_phase(&mut self, _phase: Phase) {}

    /// Leaves the current phase.
    fn end_phase(&mut self) {}

    /// Dumps queue and in-flight state for a deadlock report.
    fn print_deadlock(&self) -> String {
        String::new()
    }
}

/// A node of the memory hierarchy.
pub trait Component: Operable + MemoryRequestConsumer + MemoryRequestProducer + Send + Sync {
    /// Returns a short name for this component (e.g., `"cpu0_L1D"`, `"DRAM"`).
    fn name(&self) -> &str;

    /// Returns a reference as `Cache` if this component is a cache; otherwise `None`.
    fn as_cache(&self) -> Option<&Cache> {
        None
    }
    /// Returns a mutable reference as `Cache` if this component is a cache; otherwise `None`.
    fn as_cache_mut(&mut self) -> Option<&mut Cache> {
        None
    }
    /// Returns a reference as `TraceCore` if this component is a core; otherwise `None`.
    fn as_core(&self) -> Option<&TraceCore> {
        None
    }
    /// Returns a reference as `Dram` if this component is main memory; otherwise `None`.
    fn as_dram(&self) -> Option<&Dram> {
        None
    }
    /// Returns a reference as `PageWalker` if this component translates addresses; otherwise `None`.
    fn as_page_walker(&self) -> Option<&PageWalker> {
        None
    }
}
