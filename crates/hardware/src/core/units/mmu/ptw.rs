//! Hardware Page Table Walker (PTW).
//!
//! The walker sits below the last TLB level. It accepts translation misses
//! through its read queue, merges requests for the same virtual page, and
//! after `walk_latency` cycles answers each one with the physical page base in
//! the packet's `data` field.

use std::collections::VecDeque;
use std::fmt::Write as _;

use tracing::{error, trace};

use super::PageTable;
use crate::common::constants::{DEFAULT_DEADLOCK_CYCLE, LOG2_PAGE_SIZE, PAGE_OFFSET_MASK};
use crate::common::{Cycle, Packet, ReturnPort, SimError, VirtAddr};
use crate::config::MemoryConfig;
use crate::soc::interconnect::Fabric;
use crate::soc::traits::{
    Component, MemoryRequestConsumer, MemoryRequestProducer, Operable, Phase, QueueKind,
};
use crate::stats::{PhaseStats, WalkerStats};

/// Translation producer at the bottom of the TLB hierarchy.
pub struct PageWalker {
    name: String,
    table: PageTable,
    queue: VecDeque<Packet>,
    queue_size: usize,
    walk_latency: Cycle,
    deadlock_cycle: Cycle,
    current_cycle: Cycle,
    stats: PhaseStats<WalkerStats>,
}

impl PageWalker {
    /// Creates a walker over an empty page table.
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            name: "PTW".to_string(),
            table: PageTable::new(),
            queue: VecDeque::with_capacity(config.walker_queue_size),
            queue_size: config.walker_queue_size,
            walk_latency: config.walk_latency,
            deadlock_cycle: DEFAULT_DEADLOCK_CYCLE,
            current_cycle: 0,
            stats: PhaseStats::default(),
        }
    }

    /// Sets the number of cycles a walk may wait before the run aborts.
    #[must_use]
    pub fn with_deadlock_cycle(mut self, cycles: Cycle) -> Self {
        self.deadlock_cycle = cycles;
        self
    }

    /// The page table behind the walker.
    pub const fn page_table(&self) -> &PageTable {
        &self.table
    }

    /// Walker counters split by phase.
    pub const fn stats(&self) -> &PhaseStats<WalkerStats> {
        &self.stats
    }

    fn same_page(a: &Packet, b: &Packet) -> bool {
        a.cpu == b.cpu && a.v_address >> LOG2_PAGE_SIZE == b.v_address >> LOG2_PAGE_SIZE
    }
}

impl Operable for PageWalker {
    fn set_cycle(&mut self, cycle: Cycle) {
        self.current_cycle = cycle;
    }

    fn current_cycle(&self) -> Cycle {
        self.current_cycle
    }

    fn operate(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        let now = self.current_cycle;
        if let Some(head) = self.queue.front() {
            if head.cycle_enqueued.saturating_add(self.deadlock_cycle) <= now {
                error!(cycle = now, "page walk stalled: {}", head);
                return Err(SimError::Deadlock {
                    component: self.name.clone(),
                    cycle: now,
                    report: self.print_deadlock(),
                });
            }
        }

        while self.queue.front().is_some_and(|p| p.event_cycle <= now) {
            let Some(mut walk) = self.queue.pop_front() else {
                break;
            };
            let (paddr, mapped) = self.table.translate(walk.cpu, VirtAddr::new(walk.v_address));
            walk.data = paddr.val() & !PAGE_OFFSET_MASK;
            let stats = self.stats.current_mut();
            stats.walks += 1;
            if mapped {
                stats.pages_mapped += 1;
            }
            trace!("walk {:#x} -> {:#x}", walk.v_address, walk.data);
            fabric.deliver(&walk)?;
        }
        Ok(())
    }

    fn begin_phase(&mut self, phase: Phase) {
        self.stats.begin(phase);
    }

    fn end_phase(&mut self) {
        self.stats.end();
    }

    fn print_deadlock(&self) -> String {
        let mut out = format!("{} at cycle {} ({}/{})\n", self.name, self.current_cycle, self.queue.len(), self.queue_size);
        for (i, walk) in self.queue.iter().enumerate() {
            let _ = writeln!(out, "[{i}] {walk}");
        }
        out
    }
}

impl MemoryRequestConsumer for PageWalker {
    fn add_rq(&mut self, packet: &Packet) -> bool {
        if let Some(queued) = self.queue.iter_mut().find(|q| Self::same_page(q, packet)) {
            queued.merge_dependents(packet);
            self.stats.current_mut().merged += 1;
            return true;
        }
        if self.queue.len() >= self.queue_size {
            self.stats.current_mut().full += 1;
            return false;
        }
        let now = self.current_cycle;
        let latency = if self.stats.is_warmup() { 0 } else { self.walk_latency };
        let mut walk = packet.clone();
        walk.cycle_enqueued = now;
        walk.event_cycle = now + latency;
        self.queue.push_back(walk);
        true
    }

    fn add_ptwq(&mut self, packet: &Packet) -> bool {
        self.add_rq(packet)
    }

    fn occupancy(&self, queue: QueueKind) -> usize {
        match queue {
            QueueKind::Read | QueueKind::Translation => self.queue.len(),
            _ => 0,
        }
    }

    fn size(&self, queue: QueueKind) -> usize {
        match queue {
            QueueKind::Read | QueueKind::Translation => self.queue_size,
            _ => 0,
        }
    }
}

impl MemoryRequestProducer for PageWalker {
    fn return_data(&mut self, _port: ReturnPort, packet: &Packet) -> Result<(), SimError> {
        Err(SimError::invariant(&self.name, format!("page walker received a completion {packet}")))
    }
}

impl Component for PageWalker {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_page_walker(&self) -> Option<&PageWalker> {
        Some(self)
    }
}
