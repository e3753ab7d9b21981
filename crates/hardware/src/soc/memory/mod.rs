//! Main Memory (DRAM).
//!
//! This module implements the last consumer of the hierarchy. It provides:
//! 1. **Queues:** Bounded read and write queues that merge requests to the same block.
//! 2. **Controller:** A fixed service time stamped on admission.
//! 3. **Completion:** At most `bandwidth` requests finish per cycle; reads return to their requesters.
//!
//! Data values are not modeled; a read that matches a queued write takes the
//! write's payload.

/// Fixed-latency memory controller.
pub mod controller;

use std::collections::VecDeque;
use std::fmt::Write as _;

use tracing::{error, trace};

use self::controller::MemoryController;
use crate::common::addr::block_number;
use crate::common::constants::{DEFAULT_DEADLOCK_CYCLE, LOG2_BLOCK_SIZE};
use crate::common::{Cycle, Packet, ReturnPort, SimError};
use crate::config::MemoryConfig;
use crate::soc::interconnect::Fabric;
use crate::soc::traits::{
    Component, MemoryRequestConsumer, MemoryRequestProducer, Operable, Phase, QueueKind,
};
use crate::stats::{DramStats, PhaseStats};

/// Main memory component.
pub struct Dram {
    name: String,
    controller: Box<dyn MemoryController>,
    rq: VecDeque<Packet>,
    wq: VecDeque<Packet>,
    queue_size: usize,
    bandwidth: usize,
    deadlock_cycle: Cycle,
    current_cycle: Cycle,
    stats: PhaseStats<DramStats>,
}

impl Dram {
    /// Creates main memory.
    ///
    /// # Arguments
    ///
    /// * `config` - Queue size and bandwidth.
    /// * `controller` - Latency model.
    pub fn new(config: &MemoryConfig, controller: Box<dyn MemoryController>) -> Self {
        Self {
            name: "DRAM".to_string(),
            controller,
            rq: VecDeque::with_capacity(config.dram_queue_size),
            wq: VecDeque::with_capacity(config.dram_queue_size),
            queue_size: config.dram_queue_size,
            bandwidth: config.dram_bandwidth.max(1),
            deadlock_cycle: DEFAULT_DEADLOCK_CYCLE,
            current_cycle: 0,
            stats: PhaseStats::default(),
        }
    }

    /// Sets the number of cycles a queued request may wait before the run aborts.
    #[must_use]
    pub fn with_deadlock_cycle(mut self, cycles: Cycle) -> Self {
        self.deadlock_cycle = cycles;
        self
    }

    /// Memory counters split by phase.
    pub const fn stats(&self) -> &PhaseStats<DramStats> {
        &self.stats
    }

    fn latency(&mut self, address: u64) -> Cycle {
        let latency = self.controller.access_latency(address);
        if self.stats.is_warmup() { 0 } else { latency }
    }

    fn same_block(a: &Packet, b: &Packet) -> bool {
        block_number(a.address, LOG2_BLOCK_SIZE) == block_number(b.address, LOG2_BLOCK_SIZE)
    }

    fn enqueue_read(&mut self, packet: &Packet) -> bool {
        if let Some(queued) = self.rq.iter_mut().find(|q| Self::same_block(q, packet)) {
            queued.merge_dependents(packet);
            return true;
        }
        if self.rq.len() >= self.queue_size {
            self.stats.current_mut().rq_full += 1;
            return false;
        }

        let now = self.current_cycle;
        let mut read = packet.clone();
        read.cycle_enqueued = now;
        let forwarded = self.wq.iter().find(|w| Self::same_block(w, packet)).map(|w| w.data);
        match forwarded {
            Some(data) => {
                read.data = data;
                read.event_cycle = now;
                self.stats.current_mut().forwarded += 1;
            }
            None => read.event_cycle = now + self.latency(packet.address),
        }
        trace!("DRAM read {}", read);
        self.rq.push_back(read);
        true
    }

    fn check_deadlock(&self) -> Result<(), SimError> {
        let now = self.current_cycle;
        let stuck = self
            .rq
            .front()
            .into_iter()
            .chain(self.wq.front())
            .find(|p| p.cycle_enqueued.saturating_add(self.deadlock_cycle) <= now);
        match stuck {
            Some(packet) => {
                error!(cycle = now, "DRAM deadlock: {}", packet);
                Err(SimError::Deadlock {
                    component: self.name.clone(),
                    cycle: now,
                    report: self.print_deadlock(),
                })
            }
            None => Ok(()),
        }
    }
}

impl Operable for Dram {
    fn set_cycle(&mut self, cycle: Cycle) {
        self.current_cycle = cycle;
    }

    fn current_cycle(&self) -> Cycle {
        self.current_cycle
    }

    fn operate(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        self.check_deadlock()?;
        let now = self.current_cycle;
        let mut budget = self.bandwidth;

        while budget > 0 {
            let ready = |p: &Packet| p.event_cycle <= now;
            if self.rq.front().is_some_and(ready) {
                if let Some(read) = self.rq.pop_front() {
                    fabric.deliver(&read)?;
                    self.stats.current_mut().reads += 1;
                }
            } else if self.wq.front().is_some_and(ready) {
                let _ = self.wq.pop_front();
                self.stats.current_mut().writes += 1;
            } else {
                break;
            }
            budget -= 1;
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
        let mut out = format!("{} at cycle {}\n", self.name, self.current_cycle);
        for (label, queue) in [("RQ", &self.rq), ("WQ", &self.wq)] {
            match queue.front() {
                Some(head) => {
                    let _ = writeln!(out, "{label} ({}/{}) head {head}", queue.len(), self.queue_size);
                }
                None => {
                    let _ = writeln!(out, "{label} empty");
                }
            }
        }
        out
    }
}

impl MemoryRequestConsumer for Dram {
    fn add_rq(&mut self, packet: &Packet) -> bool {
        self.enqueue_read(packet)
    }

    fn add_wq(&mut self, packet: &Packet) -> bool {
        if let Some(queued) = self.wq.iter_mut().find(|q| Self::same_block(q, packet)) {
            queued.data = packet.data;
            return true;
        }
        if self.wq.len() >= self.queue_size {
            self.stats.current_mut().wq_full += 1;
            return false;
        }
        let now = self.current_cycle;
        let mut write = packet.clone();
        write.cycle_enqueued = now;
        write.event_cycle = now + self.latency(packet.address);
        self.wq.push_back(write);
        true
    }

    /// Prefetches reaching memory are serviced as reads.
    fn add_pq(&mut self, packet: &Packet) -> bool {
        self.enqueue_read(packet)
    }

    fn occupancy(&self, queue: QueueKind) -> usize {
        match queue {
            QueueKind::Read | QueueKind::Prefetch => self.rq.len(),
            QueueKind::Write => self.wq.len(),
            QueueKind::Translation => 0,
        }
    }

    fn size(&self, queue: QueueKind) -> usize {
        match queue {
            QueueKind::Translation => 0,
            _ => self.queue_size,
        }
    }
}

impl MemoryRequestProducer for Dram {
    fn return_data(&mut self, _port: ReturnPort, packet: &Packet) -> Result<(), SimError> {
        Err(SimError::invariant(&self.name, format!("main memory received a completion {packet}")))
    }
}

impl Component for Dram {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_dram(&self) -> Option<&Dram> {
        Some(self)
    }
}
