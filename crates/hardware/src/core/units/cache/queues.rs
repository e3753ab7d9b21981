//! Request queues of a cache.
//!
//! A [`QueueSet`] owns the four bounded FIFOs in front of a cache's tag
//! array. It provides:
//! 1. **Admission:** `add_rq`/`add_wq`/`add_pq`/`add_ptwq` merge into a matching entry, or
//!    append, or reject when full. Rejection is a `false` return; the caller retries.
//! 2. **Readiness:** An entry is serviceable once its event cycle has passed and, in a
//!    translating set, once its physical address is known.
//! 3. **Write forwarding:** Reads that match a queued write complete from the write's data.
//! 4. **Translation:** Untranslated entries are sent to a translator; completions splice the
//!    physical page into every entry of the same virtual page.
//!
//! Merge keys are block numbers. The write queue compares full addresses when
//! `match_offset_bits` is set. Entries that await translation are keyed by
//! their virtual address.

use std::collections::VecDeque;
use std::fmt::Write as _;

use crate::common::addr::{block_number, splice_bits};
use crate::common::constants::LOG2_PAGE_SIZE;
use crate::common::{AccessType, CYCLE_NEVER, Cycle, Packet, ReturnAddr, SimError};
use crate::config::CacheConfig;
use crate::soc::interconnect::{Fabric, NodeId};
use crate::soc::traits::{Phase, QueueKind};
use crate::stats::{PhaseStats, QueueCounters, QueueStats};

#[derive(Clone, Debug)]
struct Entry {
    packet: Packet,
    translated: bool,
    translate_issued: bool,
}

/// How two packets are compared for merging.
#[derive(Clone, Copy, Debug)]
struct MatchRule {
    shamt: u32,
    virtual_key: bool,
}

impl MatchRule {
    fn same(self, queued: &Packet, incoming: &Packet) -> bool {
        if self.virtual_key {
            block_number(queued.v_address, self.shamt) == block_number(incoming.v_address, self.shamt)
        } else {
            block_number(queued.address, self.shamt) == block_number(incoming.address, self.shamt)
        }
    }
}

/// The read, write, prefetch and page-table-walk queues of one cache.
#[derive(Clone, Debug)]
pub struct QueueSet {
    rq: VecDeque<Entry>,
    wq: VecDeque<Entry>,
    pq: VecDeque<Entry>,
    ptwq: VecDeque<Entry>,
    rq_size: usize,
    wq_size: usize,
    pq_size: usize,
    ptwq_size: usize,
    hit_latency: Cycle,
    offset_bits: u32,
    match_offset_bits: bool,
    virtual_prefetch: bool,
    translator: Option<NodeId>,
    owner: NodeId,
    current_cycle: Cycle,
    stats: PhaseStats<QueueStats>,
}

impl QueueSet {
    /// Creates the queues described by `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Queue sizes, hit latency and matching rules.
    /// * `owner` - The cache that owns these queues (receives translation responses).
    /// * `translator` - Component that translates virtual addresses, if any.
    pub fn new(config: &CacheConfig, owner: NodeId, translator: Option<NodeId>) -> Self {
        Self {
            rq: VecDeque::with_capacity(config.rq_size),
            wq: VecDeque::with_capacity(config.wq_size),
            pq: VecDeque::with_capacity(config.pq_size),
            ptwq: VecDeque::with_capacity(config.ptwq_size),
            rq_size: config.rq_size,
            wq_size: config.wq_size,
            pq_size: config.pq_size,
            ptwq_size: config.ptwq_size,
            hit_latency: config.hit_latency,
            offset_bits: config.offset_bits,
            match_offset_bits: config.match_offset_bits,
            virtual_prefetch: config.virtual_prefetch,
            translator,
            owner,
            current_cycle: 0,
            stats: PhaseStats::default(),
        }
    }

    /// Advances the queues' clock.
    pub fn set_cycle(&mut self, cycle: Cycle) {
        self.current_cycle = cycle;
    }

    /// Starts a statistics phase.
    pub fn begin_phase(&mut self, phase: Phase) {
        self.stats.begin(phase);
    }

    /// Ends the current statistics phase.
    pub fn end_phase(&mut self) {
        self.stats.end();
    }

    /// Queue counters split by phase.
    pub const fn stats(&self) -> &PhaseStats<QueueStats> {
        &self.stats
    }

    /// Entries of `kind` start without a physical address.
    fn needs_translation(&self, kind: QueueKind) -> bool {
        self.translator.is_some()
            && match kind {
                QueueKind::Read | QueueKind::Write => true,
                QueueKind::Prefetch => self.virtual_prefetch,
                QueueKind::Translation => false,
            }
    }

    fn rule(&self, kind: QueueKind) -> MatchRule {
        let shamt = if kind == QueueKind::Write && self.match_offset_bits { 0 } else { self.offset_bits };
        MatchRule { shamt, virtual_key: self.needs_translation(kind) }
    }

    fn queue(&self, kind: QueueKind) -> &VecDeque<Entry> {
        match kind {
            QueueKind::Read => &self.rq,
            QueueKind::Write => &self.wq,
            QueueKind::Prefetch => &self.pq,
            QueueKind::Translation => &self.ptwq,
        }
    }

    fn queue_mut(&mut self, kind: QueueKind) -> &mut VecDeque<Entry> {
        match kind {
            QueueKind::Read => &mut self.rq,
            QueueKind::Write => &mut self.wq,
            QueueKind::Prefetch => &mut self.pq,
            QueueKind::Translation => &mut self.ptwq,
        }
    }

    fn counters(&mut self, kind: QueueKind) -> &mut QueueCounters {
        let stats = self.stats.current_mut();
        match kind {
            QueueKind::Read => &mut stats.rq,
            QueueKind::Write => &mut stats.wq,
            QueueKind::Prefetch => &mut stats.pq,
            QueueKind::Translation => &mut stats.ptwq,
        }
    }

    /// Capacity of `kind`.
    pub const fn capacity(&self, kind: QueueKind) -> usize {
        match kind {
            QueueKind::Read => self.rq_size,
            QueueKind::Write => self.wq_size,
            QueueKind::Prefetch => self.pq_size,
            QueueKind::Translation => self.ptwq_size,
        }
    }

    /// Number of entries in `kind`.
    pub fn len(&self, kind: QueueKind) -> usize {
        self.queue(kind).len()
    }

    /// Every queue is empty.
    pub fn is_empty(&self) -> bool {
        self.rq.is_empty() && self.wq.is_empty() && self.pq.is_empty() && self.ptwq.is_empty()
    }

    /// Packets queued in `kind`, head first.
    pub fn iter(&self, kind: QueueKind) -> impl Iterator<Item = &Packet> {
        self.queue(kind).iter().map(|e| &e.packet)
    }

    /// Appends `packet` to `kind` as a new entry, stamping its timing.
    fn push(&mut self, kind: QueueKind, packet: &Packet) {
        let latency = if self.stats.is_warmup() { 0 } else { self.hit_latency };
        let translated = !self.needs_translation(kind);
        let mut packet = packet.clone();
        packet.cycle_enqueued = self.current_cycle;
        packet.event_cycle = self.current_cycle + latency;
        if !translated {
            packet.address = packet.v_address;
        }
        self.queue_mut(kind).push_back(Entry { packet, translated, translate_issued: false });
        self.counters(kind).to_cache += 1;
    }

    /// Merges `packet` into the first entry of `kind` accepted by `matches`.
    fn merge_where(&mut self, kind: QueueKind, matches: impl Fn(&Entry) -> bool, packet: &Packet) -> bool {
        match self.queue_mut(kind).iter_mut().find(|e| matches(e)) {
            Some(found) => {
                found.packet.merge_dependents(packet);
                true
            }
            None => false,
        }
    }

    /// Merges `packet` into a matching entry of `kind`.
    fn merge_into(&mut self, kind: QueueKind, rule: MatchRule, packet: &Packet) -> bool {
        self.merge_where(kind, |e| rule.same(&e.packet, packet), packet)
    }

    /// Lets a queued read absorb a prefetch for the same block.
    ///
    /// A physical prefetch in a translating set can only match reads whose
    /// physical address is already known.
    fn absorb_into_read(&mut self, packet: &Packet) -> bool {
        if self.translator.is_none() || self.virtual_prefetch {
            return self.merge_into(QueueKind::Read, self.rule(QueueKind::Read), packet);
        }
        let block = packet.block(self.offset_bits);
        let shamt = self.offset_bits;
        self.merge_where(QueueKind::Read, |e| e.translated && e.packet.block(shamt) == block, packet)
    }

    /// Offers a read request.
    ///
    /// # Returns
    ///
    /// `true` if the request merged into a queued read or was appended;
    /// `false` if the queue is full.
    pub fn add_rq(&mut self, packet: &Packet) -> bool {
        self.counters(QueueKind::Read).access += 1;
        if self.merge_into(QueueKind::Read, self.rule(QueueKind::Read), packet) {
            self.counters(QueueKind::Read).merged += 1;
            return true;
        }
        if self.rq.len() >= self.rq_size {
            self.counters(QueueKind::Read).full += 1;
            return false;
        }
        self.push(QueueKind::Read, packet);
        true
    }

    /// Offers a write request.
    ///
    /// A write that matches a queued write overwrites that entry's data in place.
    pub fn add_wq(&mut self, packet: &Packet) -> bool {
        self.counters(QueueKind::Write).access += 1;
        let rule = self.rule(QueueKind::Write);
        if let Some(found) = self.wq.iter_mut().find(|e| rule.same(&e.packet, packet)) {
            found.packet.data = packet.data;
            self.counters(QueueKind::Write).merged += 1;
            return true;
        }
        if self.wq.len() >= self.wq_size {
            self.counters(QueueKind::Write).full += 1;
            return false;
        }
        self.push(QueueKind::Write, packet);
        true
    }

    /// Offers a prefetch request.
    ///
    /// A prefetch matching a queued read is absorbed by it; one matching a
    /// queued prefetch merges into it.
    pub fn add_pq(&mut self, packet: &Packet) -> bool {
        self.counters(QueueKind::Prefetch).access += 1;
        let merged = self.absorb_into_read(packet)
            || self.merge_into(QueueKind::Prefetch, self.rule(QueueKind::Prefetch), packet);
        if merged {
            self.counters(QueueKind::Prefetch).merged += 1;
            return true;
        }
        if self.pq.len() >= self.pq_size {
            self.counters(QueueKind::Prefetch).full += 1;
            return false;
        }
        self.push(QueueKind::Prefetch, packet);
        true
    }

    /// Offers a page-table-walk request.
    pub fn add_ptwq(&mut self, packet: &Packet) -> bool {
        self.counters(QueueKind::Translation).access += 1;
        if self.merge_into(QueueKind::Translation, self.rule(QueueKind::Translation), packet) {
            self.counters(QueueKind::Translation).merged += 1;
            return true;
        }
        if self.ptwq.len() >= self.ptwq_size {
            self.counters(QueueKind::Translation).full += 1;
            return false;
        }
        self.push(QueueKind::Translation, packet);
        true
    }

    fn is_ready(&self, entry: &Entry) -> bool {
        entry.translated && entry.packet.event_cycle <= self.current_cycle
    }

    /// Head of `kind` if it is ready for service this cycle.
    pub fn front_ready(&self, kind: QueueKind) -> Option<&Packet> {
        self.queue(kind).front().filter(|e| self.is_ready(e)).map(|e| &e.packet)
    }

    /// Removes the head of `kind`.
    pub fn pop(&mut self, kind: QueueKind) -> Option<Packet> {
        self.queue_mut(kind).pop_front().map(|e| e.packet)
    }

    /// First head-of-line entry that has waited at least `threshold` cycles.
    pub fn head_stall(&self, threshold: Cycle) -> Option<(QueueKind, &Packet)> {
        [QueueKind::Read, QueueKind::Write, QueueKind::Prefetch, QueueKind::Translation]
            .into_iter()
            .find_map(|kind| {
                self.queue(kind)
                    .front()
                    .filter(|e| e.packet.cycle_enqueued.saturating_add(threshold) <= self.current_cycle)
                    .map(|e| (kind, &e.packet))
            })
    }

    /// Per-cycle maintenance: write forwarding and translation traffic.
    ///
    /// # Errors
    ///
    /// Propagates failures from delivering forwarded reads or reaching the translator.
    pub fn operate(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        self.check_collision(QueueKind::Read, fabric)?;
        self.check_collision(QueueKind::Prefetch, fabric)?;
        if self.translator.is_some() {
            self.issue_translation(fabric)?;
            self.detect_misses();
        }
        Ok(())
    }

    /// Completes ready entries of `kind` that match a queued write from that write's data.
    fn check_collision(&mut self, kind: QueueKind, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        let rule = self.rule(QueueKind::Write);
        let mut i = 0;
        while i < self.queue(kind).len() {
            let entry = &self.queue(kind)[i];
            let forwarded = if self.is_ready(entry) {
                self.wq.iter().find(|w| rule.same(&w.packet, &entry.packet)).map(|w| w.packet.data)
            } else {
                None
            };
            match forwarded {
                Some(data) => {
                    if let Some(mut removed) = self.queue_mut(kind).remove(i) {
                        removed.packet.data = data;
                        fabric.deliver(&removed.packet)?;
                        self.counters(kind).forward += 1;
                    }
                }
                None => i += 1,
            }
        }
        Ok(())
    }

    /// Sends every untranslated, not yet issued entry to the translator.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownNode`] or [`SimError::SelfAccess`] if the
    /// translator link is miswired.
    pub fn issue_translation(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        let Some(translator) = self.translator else {
            return Ok(());
        };
        let owner = self.owner;
        for kind in [QueueKind::Read, QueueKind::Write, QueueKind::Prefetch] {
            if !self.needs_translation(kind) {
                continue;
            }
            for entry in self.queue_mut(kind).iter_mut() {
                if entry.translated || entry.translate_issued {
                    continue;
                }
                let request = Packet {
                    access_type: AccessType::Load,
                    is_pte: true,
                    dependents: Vec::new(),
                    to_return: vec![ReturnAddr::translation(owner)],
                    ..entry.packet.clone()
                };
                if !fabric.node_mut(translator)?.add_rq(&request) {
                    break;
                }
                entry.translate_issued = true;
            }
        }
        Ok(())
    }

    /// Applies a translation response to every entry on the same virtual page.
    pub fn return_translation(&mut self, response: &Packet) {
        let page = response.v_address >> LOG2_PAGE_SIZE;
        let now = self.current_cycle;
        for kind in [QueueKind::Read, QueueKind::Write, QueueKind::Prefetch] {
            for entry in self.queue_mut(kind).iter_mut() {
                if entry.translated || entry.packet.v_address >> LOG2_PAGE_SIZE != page {
                    continue;
                }
                entry.packet.address = splice_bits(response.data, entry.packet.v_address, LOG2_PAGE_SIZE);
                entry.translated = true;
                entry.packet.event_cycle =
                    if entry.packet.is_waiting() { now } else { entry.packet.event_cycle.max(now) };
            }
        }
    }

    /// Moves a past-due untranslated head to the back so later entries can proceed.
    pub fn detect_misses(&mut self) {
        let now = self.current_cycle;
        for kind in [QueueKind::Read, QueueKind::Write, QueueKind::Prefetch] {
            let queue = self.queue_mut(kind);
            if queue.len() < 2 {
                continue;
            }
            let stalled = queue
                .front()
                .is_some_and(|e| !e.translated && !e.packet.is_waiting() && e.packet.event_cycle <= now);
            if stalled {
                if let Some(mut head) = queue.pop_front() {
                    head.packet.event_cycle = CYCLE_NEVER;
                    queue.push_back(head);
                }
            }
        }
    }

    /// Dumps the head of every non-empty queue.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for kind in [QueueKind::Read, QueueKind::Write, QueueKind::Prefetch, QueueKind::Translation] {
            let queue = self.queue(kind);
            match queue.front() {
                Some(head) => {
                    let _ = writeln!(
                        out,
                        "{} ({}/{}) head translated: {} {}",
                        kind.label(),
                        queue.len(),
                        self.capacity(kind),
                        head.translated,
                        head.packet
                    );
                }
                None => {
                    let _ = writeln!(out, "{} empty", kind.label());
                }
            }
        }
        out
    }
}
