//! Trace-Driven Core.
//!
//! This module defines [`TraceCore`], the collaborator that drives the cache
//! hierarchy. It coordinates the following:
//! 1. **Dispatch:** Instructions from an [`InstructionSource`] enter the ROB in program order.
//! 2. **Issue:** Fetches, loads and stores are offered to the L1I and L1D buses, with retry.
//! 3. **Completion:** Returned packets mark every dependent instruction's operations done.
//! 4. **Retire:** Finished instructions leave the ROB head, up to `width` per cycle.

/// Dispatch, retire and deadlock checking.
pub mod execution;

/// Issue to the cache buses and completion handling.
pub mod memory;

use crate::common::{Cycle, Packet, ReturnPort, SimError};
use crate::common::constants::DEFAULT_DEADLOCK_CYCLE;
use crate::config::CoreConfig;
use crate::core::bus::CacheBus;
use crate::core::rob::Rob;
use crate::core::stream::InstructionSource;
use crate::soc::interconnect::{Fabric, NodeId};
use crate::soc::traits::{Component, MemoryRequestConsumer, MemoryRequestProducer, Operable, Phase};
use crate::stats::{CoreStats, PhaseStats};

/// Where a core sits in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreLinks {
    /// The core itself.
    pub id: NodeId,
    /// First-level instruction cache.
    pub l1i: NodeId,
    /// First-level data cache.
    pub l1d: NodeId,
}

/// A trace-driven core.
pub struct TraceCore {
    name: String,
    cpu: usize,
    width: usize,
    model_ifetch: bool,
    deadlock_cycle: Cycle,
    current_cycle: Cycle,
    next_instr_id: u64,
    source: Box<dyn InstructionSource>,
    exhausted: bool,
    rob: Rob,
    l1i_bus: CacheBus,
    l1d_bus: CacheBus,
    stats: PhaseStats<CoreStats>,
}

impl TraceCore {
    /// Creates core `cpu` reading instructions from `source`.
    ///
    /// # Arguments
    ///
    /// * `cpu` - Index of the core; used as the packets' requester id.
    /// * `config` - ROB size, width and fetch modeling.
    /// * `links` - The core's id and its first-level caches.
    /// * `source` - Instruction trace.
    pub fn new(cpu: usize, config: &CoreConfig, links: CoreLinks, source: Box<dyn InstructionSource>) -> Self {
        Self {
            name: format!("cpu{cpu}"),
            cpu,
            width: config.width.max(1),
            model_ifetch: config.model_ifetch,
            deadlock_cycle: DEFAULT_DEADLOCK_CYCLE,
            current_cycle: 0,
            next_instr_id: 1,
            source,
            exhausted: false,
            rob: Rob::new(config.rob_size),
            l1i_bus: CacheBus::new(cpu, links.id, links.l1i),
            l1d_bus: CacheBus::new(cpu, links.id, links.l1d),
            stats: PhaseStats::default(),
        }
    }

    /// Sets the number of cycles the ROB head may wait before the run aborts.
    #[must_use]
    pub fn with_deadlock_cycle(mut self, cycles: Cycle) -> Self {
        self.deadlock_cycle = cycles;
        self
    }

    /// Index of the core.
    pub const fn cpu(&self) -> usize {
        self.cpu
    }

    /// The trace is exhausted and every instruction has retired.
    pub fn is_done(&self) -> bool {
        self.exhausted && self.rob.is_empty()
    }

    /// The reorder buffer.
    pub const fn rob(&self) -> &Rob {
        &self.rob
    }

    /// Core counters split by phase.
    pub const fn stats(&self) -> &PhaseStats<CoreStats> {
        &self.stats
    }
}

impl Operable for TraceCore {
    fn set_cycle(&mut self, cycle: Cycle) {
        self.current_cycle = cycle;
    }

    fn current_cycle(&self) -> Cycle {
        self.current_cycle
    }

    fn operate(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        self.stats.current_mut().cycles += 1;
        self.drain_completions();
        self.retire();
        self.check_deadlock()?;
        self.dispatch();
        self.issue(fabric)
    }

    fn begin_phase(&mut self, phase: Phase) {
        self.stats.begin(phase);
    }

    fn end_phase(&mut self) {
        self.stats.end();
    }

    fn print_deadlock(&self) -> String {
        match self.rob.peek_head() {
            Some(head) => format!(
                "{} ROB ({}/{}) head instr_id: {} ip: {:#x} dispatched: {} ops: {:?}\n",
                self.name,
                self.rob.len(),
                self.rob.capacity(),
                head.instr_id,
                head.ip,
                head.dispatch_cycle,
                head.ops
            ),
            None => format!("{} ROB empty\n", self.name),
        }
    }
}

/// Cores accept no requests from other components.
impl MemoryRequestConsumer for TraceCore {}

impl MemoryRequestProducer for TraceCore {
    fn return_data(&mut self, port: ReturnPort, packet: &Packet) -> Result<(), SimError> {
        if port != ReturnPort::Data {
            return Err(SimError::invariant(&self.name, format!("translation delivered to a core: {packet}")));
        }
        if packet.is_instr {
            self.l1i_bus.return_data(packet);
        } else {
            self.l1d_bus.return_data(packet);
        }
        Ok(())
    }
}

impl Component for TraceCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_core(&self) -> Option<&TraceCore> {
        Some(self)
    }
}
