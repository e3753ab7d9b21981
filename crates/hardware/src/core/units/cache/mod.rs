//! Set-Associative Cache Engine.
//!
//! This module implements one level of the memory hierarchy. A [`Cache`] owns
//! its request queues, tag/data array, MSHR, replacement policy and
//! prefetcher, and advances them once per cycle:
//! 1. **Maintenance:** Write forwarding and translation traffic in the queue set.
//! 2. **Deadlock check:** Any head-of-line entry older than the threshold aborts the run.
//! 3. **Fills:** Returned misses and pending write allocations are installed (`max_fill` per cycle).
//! 4. **Tag lookups:** WQ, PTWQ, RQ and PQ heads are looked up (`max_tag` per cycle).
//! 5. **Prefetch:** The prefetcher's periodic hook runs last.
//!
//! Requests that cannot be serviced stay at the head of their queue and are
//! retried in a later cycle.

/// Tag/data storage.
pub mod block;

/// Miss Status Holding Registers.
pub mod mshr;

/// Cache replacement policy implementations (LRU, FIFO, Random, Probi).
pub mod policies;

/// Read, write, prefetch and translation queues.
pub mod queues;

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

use tracing::{debug, error, trace, warn};

use self::block::{Block, BlockArray};
use self::mshr::Mshr;
use self::policies::{
    FifoPolicy, LruPolicy, ProbiPolicy, RandomPolicy, ReplacementPolicy, UpdateContext,
    VictimContext,
};
use self::queues::QueueSet;
use crate::common::addr::{block_align, block_number};
use crate::common::constants::{DEFAULT_DEADLOCK_CYCLE, LOG2_PAGE_SIZE};
use crate::common::{AccessType, Cycle, Packet, ReturnAddr, ReturnPort, SimError};
use crate::config::{
    CacheConfig, ForceHit, Prefetcher as PrefetcherType, ReplacementPolicy as PolicyType,
};
use crate::core::units::prefetch::{
    AccessInfo, FillInfo, IpStridePrefetcher, NextLinePrefetcher, NoPrefetcher, PrefetchIssuer,
    PrefetchStatus, Prefetcher,
};
use crate::soc::interconnect::{Fabric, NodeId};
use crate::soc::traits::{
    Component, MemoryRequestConsumer, MemoryRequestProducer, Operable, Phase, QueueKind,
};
use crate::stats::{CacheReport, CacheStats, ClassCounters, PhaseStats, RequestClass};

/// Neighbours of a cache in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLinks {
    /// The cache itself.
    pub id: NodeId,
    /// Next level towards memory.
    pub lower: NodeId,
    /// Translation producer, for caches that receive virtual addresses.
    pub translator: Option<NodeId>,
}

/// One cache level.
pub struct Cache {
    name: String,
    links: CacheLinks,
    config: CacheConfig,
    prefetch_mask: u8,
    deadlock_cycle: Cycle,
    current_cycle: Cycle,
    blocks: BlockArray,
    mshr: Mshr,
    queues: QueueSet,
    inflight_writes: VecDeque<Packet>,
    /// Force-hit side store, keyed by block number.
    forced: HashMap<u64, Block>,
    replacement: Box<dyn ReplacementPolicy>,
    prefetcher: Box<dyn Prefetcher>,
    stats: PhaseStats<CacheStats>,
}

/// Builds the replacement policy selected by `config`.
fn build_replacement(config: &CacheConfig, seed: u64) -> Box<dyn ReplacementPolicy> {
    let (sets, ways) = (config.sets, config.ways);
    match config.replacement {
        PolicyType::Lru => Box::new(LruPolicy::new(sets, ways)),
        PolicyType::Fifo => Box::new(FifoPolicy::new(sets, ways)),
        PolicyType::Random => Box::new(RandomPolicy::new(ways, seed)),
        PolicyType::Probi => Box::new(ProbiPolicy::new(sets, ways, config.instr_eviction_prob, seed)),
    }
}

/// Builds the prefetcher selected by `config`.
fn build_prefetcher(config: &CacheConfig) -> Box<dyn Prefetcher> {
    match config.prefetcher {
        PrefetcherType::None => Box::new(NoPrefetcher),
        PrefetcherType::NextLine => {
            Box::new(NextLinePrefetcher::new(1 << config.offset_bits, config.prefetch_degree))
        }
        PrefetcherType::IpStride => {
            Box::new(IpStridePrefetcher::new(config.prefetch_table_size, config.prefetch_degree))
        }
    }
}

/// Prefetch injection point handed to the prefetcher.
///
/// Borrows only the queues and counters, so the prefetcher can be called
/// while the rest of the cache is in use.
struct PrefetchPort<'a> {
    queues: &'a mut QueueSet,
    stats: &'a mut PhaseStats<CacheStats>,
    cpu: usize,
    virtual_prefetch: bool,
    /// Address of the access that triggered the prefetcher, if any.
    base_addr: Option<u64>,
}

impl PrefetchIssuer for PrefetchPort<'_> {
    fn prefetch_line(&mut self, pf_addr: u64, fill_this_level: bool, metadata: u32) -> PrefetchStatus {
        let stats = self.stats.current_mut();
        stats.pf_requested += 1;
        if self.base_addr.is_some_and(|base| base >> LOG2_PAGE_SIZE != pf_addr >> LOG2_PAGE_SIZE) {
            stats.pf_crossed += 1;
        }
        let packet = Packet {
            address: pf_addr,
            v_address: if self.virtual_prefetch { pf_addr } else { 0 },
            cpu: self.cpu,
            access_type: AccessType::Prefetch,
            fill_this_level,
            prefetch_from_this: true,
            pf_metadata: metadata,
            ..Packet::default()
        };
        if self.queues.add_pq(&packet) {
            self.stats.current_mut().pf_issued += 1;
            PrefetchStatus::Issued
        } else {
            PrefetchStatus::QueueFull
        }
    }
}

impl Cache {
    /// Creates a cache level.
    ///
    /// # Arguments
    ///
    /// * `name` - Component name used in reports and diagnostics.
    /// * `config` - Geometry, capacities, latencies and policy selection.
    /// * `links` - This cache's id and its neighbours.
    /// * `seed` - Seed of randomized replacement decisions.
    pub fn new(name: impl Into<String>, config: &CacheConfig, links: CacheLinks, seed: u64) -> Self {
        let mut replacement = build_replacement(config, seed);
        replacement.initialize(config.sets, config.ways);
        let mut prefetcher = build_prefetcher(config);
        prefetcher.initialize(config.offset_bits);

        Self {
            name: name.into(),
            links,
            prefetch_mask: AccessType::mask_of(&config.prefetch_activate),
            deadlock_cycle: DEFAULT_DEADLOCK_CYCLE,
            current_cycle: 0,
            blocks: BlockArray::new(config.sets, config.ways, config.offset_bits),
            mshr: Mshr::new(config.mshr_size, config.offset_bits),
            queues: QueueSet::new(config, links.id, links.translator),
            inflight_writes: VecDeque::new(),
            forced: HashMap::new(),
            replacement,
            prefetcher,
            stats: PhaseStats::default(),
            config: config.clone(),
        }
    }

    /// Sets the number of cycles a head-of-line entry may wait before the run aborts.
    #[must_use]
    pub fn with_deadlock_cycle(mut self, cycles: Cycle) -> Self {
        self.deadlock_cycle = cycles;
        self
    }

    /// Replaces the replacement policy, initializing it for this cache's geometry.
    #[must_use]
    pub fn with_replacement(mut self, mut policy: Box<dyn ReplacementPolicy>) -> Self {
        policy.initialize(self.config.sets, self.config.ways);
        self.replacement = policy;
        self
    }

    /// The cache's configuration.
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The cache's neighbours.
    pub const fn links(&self) -> CacheLinks {
        self.links
    }

    /// Tag/data storage.
    pub const fn blocks(&self) -> &BlockArray {
        &self.blocks
    }

    /// Outstanding misses.
    pub const fn mshr(&self) -> &Mshr {
        &self.mshr
    }

    /// Request queues.
    pub const fn queues(&self) -> &QueueSet {
        &self.queues
    }

    /// Cache counters split by phase.
    pub const fn stats(&self) -> &PhaseStats<CacheStats> {
        &self.stats
    }

    /// Set that `address` maps to.
    pub fn get_set_index(&self, address: u64) -> usize {
        self.blocks.set_index(address)
    }

    /// Clears the valid flag of the line holding `address`.
    ///
    /// # Returns
    ///
    /// The way that held the line, or `None` if it was not present.
    pub fn invalidate_entry(&mut self, address: u64) -> Option<usize> {
        let _ = self.forced.remove(&block_number(address, self.blocks.offset_bits()));
        self.blocks.invalidate(address)
    }

    /// Number of blocks held in the force-hit side store.
    pub fn forced_len(&self) -> usize {
        self.forced.len()
    }

    /// Builds the region-of-interest report for this cache.
    pub fn report(&self) -> CacheReport {
        CacheReport {
            name: self.name.clone(),
            cache: self.stats.report().clone(),
            queues: self.queues.stats().report().clone(),
            replacement: self
                .replacement
                .final_stats()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            prefetcher: self
                .prefetcher
                .final_stats()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    fn warmup(&self) -> bool {
        self.stats.is_warmup()
    }

    fn fill_latency(&self) -> Cycle {
        if self.warmup() { 0 } else { self.config.fill_latency }
    }

    /// `packet` bypasses the sets in favour of the force-hit side store.
    fn force_hit_eligible(&self, packet: &Packet) -> bool {
        match self.config.force_hit {
            ForceHit::Off => false,
            ForceHit::Instructions => packet.is_instr,
            ForceHit::Translations => packet.is_pte,
        }
    }

    /// Updates the per-class counters of `packet` when `extra_stats` is on.
    fn record_class(&mut self, packet: &Packet, update: impl FnOnce(&mut ClassCounters)) {
        if self.config.extra_stats {
            update(self.stats.current_mut().classes.get_mut(RequestClass::of(packet.is_instr, packet.is_pte)));
        }
    }

    fn record_miss(&mut self, packet: &Packet) {
        self.stats.current_mut().record_miss(packet.cpu, packet.access_type);
        self.record_class(packet, |c| c.misses += 1);
    }

    /// Counts a completed fill: prefetch fills and the miss latency.
    fn record_fill(&mut self, packet: &Packet) {
        let latency = self.current_cycle.saturating_sub(packet.cycle_enqueued);
        let stats = self.stats.current_mut();
        if packet.access_type == AccessType::Prefetch {
            stats.pf_fill += 1;
        }
        stats.total_miss_latency += latency;
        self.record_class(packet, |c| c.total_miss_latency += latency);
    }

    fn update_context(&self, packet: &Packet, set: usize, way: usize, victim_addr: u64, hit: bool) -> UpdateContext {
        let (is_pte, translation_level) = self.translation_flags(packet);
        UpdateContext {
            cpu: packet.cpu,
            set,
            way,
            full_addr: packet.address,
            ip: packet.ip,
            victim_addr,
            access_type: packet.access_type,
            hit,
            is_instr: packet.is_instr,
            is_pte,
            translation_level,
            cycle: self.current_cycle,
        }
    }

    /// Translation flags visible to the replacement policy.
    fn translation_flags(&self, packet: &Packet) -> (bool, u8) {
        if self.config.translation_aware_replacement {
            (packet.is_pte, self.config.translation_level)
        } else {
            (false, 0)
        }
    }

    /// The access may train this cache's prefetcher.
    pub fn should_activate_prefetcher(&self, packet: &Packet) -> bool {
        (self.prefetch_mask & packet.access_type.bit()) != 0 && !packet.prefetch_from_this
    }

    /// Requests the line at `pf_addr` through this cache's prefetch queue.
    ///
    /// # Arguments
    ///
    /// * `pf_addr` - Address to prefetch.
    /// * `fill_this_level` - Install the line here rather than only in lower levels.
    /// * `metadata` - Opaque payload returned to the prefetcher on fill.
    pub fn prefetch_line(&mut self, pf_addr: u64, fill_this_level: bool, metadata: u32) -> PrefetchStatus {
        PrefetchPort {
            queues: &mut self.queues,
            stats: &mut self.stats,
            cpu: 0,
            virtual_prefetch: self.config.virtual_prefetch,
            base_addr: None,
        }
        .prefetch_line(pf_addr, fill_this_level, metadata)
    }

    /// Looks `packet` up in the tag array and, on a hit, completes it.
    ///
    /// Requests eligible for force-hit that miss in the sets are looked up in
    /// the side store. Trains the prefetcher whether or not the access hits.
    ///
    /// # Returns
    ///
    /// `true` on a hit.
    ///
    /// # Errors
    ///
    /// Propagates failures from delivering the response.
    pub fn try_hit(&mut self, packet: &Packet, fabric: &mut Fabric<'_>) -> Result<bool, SimError> {
        let set = self.blocks.set_index(packet.address);
        let way = self.blocks.find_way(set, packet.address);
        let forced = if way.is_none() && self.force_hit_eligible(packet) {
            self.forced.get(&packet.block(self.blocks.offset_bits())).map(|block| block.data)
        } else {
            None
        };
        let hit = way.is_some() || forced.is_some();

        let mut metadata = packet.pf_metadata;
        if self.should_activate_prefetcher(packet) {
            let addr = if self.config.virtual_prefetch { packet.v_address } else { packet.address };
            let info = AccessInfo {
                addr,
                ip: packet.ip,
                cpu: packet.cpu,
                hit,
                access_type: packet.access_type,
                metadata_in: metadata,
            };
            let mut port = PrefetchPort {
                queues: &mut self.queues,
                stats: &mut self.stats,
                cpu: packet.cpu,
                virtual_prefetch: self.config.virtual_prefetch,
                base_addr: Some(addr),
            };
            metadata = self.prefetcher.on_access(&info, &mut port);
        }

        if let Some(data) = forced {
            let stats = self.stats.current_mut();
            stats.record_hit(packet.cpu, packet.access_type);
            stats.forced_hits += 1;
            self.record_class(packet, |c| c.hits += 1);
            let response = Packet { data, pf_metadata: metadata, ..packet.clone() };
            trace!(cache = %self.name, "forced hit {}", packet);
            fabric.deliver(&response)?;
            return Ok(true);
        }

        let Some(way) = way else {
            return Ok(false);
        };

        self.stats.current_mut().record_hit(packet.cpu, packet.access_type);
        self.record_class(packet, |c| c.hits += 1);
        let ctx = self.update_context(packet, set, way, 0, true);
        self.replacement.update_replacement_state(&ctx);

        let block = self.blocks.block_mut(set, way);
        if packet.access_type == AccessType::Write {
            block.dirty = true;
        }
        let mut useful = false;
        if block.prefetch && !packet.prefetch_from_this {
            block.prefetch = false;
            useful = true;
        }
        let mut response = packet.clone();
        response.data = block.data;
        response.pf_metadata = metadata;
        if useful {
            self.stats.current_mut().pf_useful += 1;
        }

        trace!(cache = %self.name, set, way, "hit {}", packet);
        fabric.deliver(&response)?;
        Ok(true)
    }

    /// Handles a read or prefetch that missed.
    ///
    /// # Returns
    ///
    /// `false` when the request must stay queued: the MSHR is full or the
    /// lower level rejected it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvariantViolation`] if the MSHR refuses an entry it
    /// reported room for, and propagates fabric errors.
    pub fn handle_miss(&mut self, packet: &Packet, fabric: &mut Fabric<'_>) -> Result<bool, SimError> {
        let now = self.current_cycle;

        if let Some(entry) = self.mshr.find_mut(packet.address) {
            entry.merge_dependents(packet);
            if entry.access_type == AccessType::Prefetch && packet.access_type != AccessType::Prefetch {
                let from_here = entry.prefetch_from_this;
                let kept = (entry.event_cycle, entry.cycle_enqueued, entry.data, entry.pf_metadata);
                let dependents = std::mem::take(&mut entry.dependents);
                let to_return = std::mem::take(&mut entry.to_return);
                *entry = Packet { dependents, to_return, ..packet.clone() };
                (entry.event_cycle, entry.cycle_enqueued, entry.data, entry.pf_metadata) = kept;
                if from_here {
                    self.stats.current_mut().pf_useful += 1;
                }
                debug!(cache = %self.name, "demand promoted in-flight prefetch {:#x}", packet.address);
            }
            self.record_miss(packet);
            trace!(cache = %self.name, "mshr merge {}", packet);
            return Ok(true);
        }

        if self.mshr.is_full() {
            return Ok(false);
        }

        let forward = Packet {
            prefetch_from_this: false,
            fill_this_level: true,
            dependents: Vec::new(),
            to_return: if packet.fill_this_level { vec![ReturnAddr::data(self.links.id)] } else { Vec::new() },
            ..packet.clone()
        };
        let lower = fabric.node_mut(self.links.lower)?;
        let accepted = if self.config.prefetch_as_load || packet.access_type != AccessType::Prefetch {
            lower.add_rq(&forward)
        } else {
            lower.add_pq(&forward)
        };
        if !accepted {
            return Ok(false);
        }

        if packet.fill_this_level {
            if let Err(rejected) = self.mshr.allocate(packet.clone(), now) {
                error!(cache = %self.name, "MSHR refused {}", rejected);
                return Err(SimError::invariant(
                    &self.name,
                    format!("MSHR refused a miss it had room for: {rejected}"),
                ));
            }
        }

        self.record_miss(packet);
        trace!(cache = %self.name, "miss {}", packet);
        Ok(true)
    }

    /// Allocates a line for a write that missed, without fetching it.
    ///
    /// The line is installed dirty once `fill_latency` has elapsed.
    ///
    /// # Returns
    ///
    /// Always `true`; pending write allocations are not capacity bounded.
    pub fn handle_write(&mut self, packet: &Packet) -> bool {
        let now = self.current_cycle;
        let mut pending = packet.clone();
        pending.cycle_enqueued = now;
        pending.event_cycle = now + self.fill_latency();
        self.inflight_writes.push_back(pending);
        self.record_miss(packet);
        true
    }

    /// Installs `packet` in its set, evicting a victim if needed.
    ///
    /// A block already resident (a write allocated while a read of the same
    /// block was outstanding) is updated in place instead of installed twice.
    /// Force-hit eligible fills go to the side store.
    ///
    /// # Returns
    ///
    /// `false` when a dirty victim's writeback was rejected; the fill is
    /// retried in a later cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvariantViolation`] when the replacement policy
    /// picks a way outside the set, and propagates fabric errors.
    pub fn handle_fill(&mut self, packet: &Packet, fabric: &mut Fabric<'_>) -> Result<bool, SimError> {
        let bits = self.blocks.offset_bits();
        let dirty = packet.access_type == AccessType::Write
            || (packet.access_type == AccessType::Rfo && packet.to_return.is_empty());

        if self.force_hit_eligible(packet) {
            let _ = self.forced.insert(packet.block(bits), Block {
                valid: true,
                prefetch: false,
                dirty,
                address: packet.address,
                v_address: packet.v_address,
                data: packet.data,
                pf_metadata: packet.pf_metadata,
            });
            self.record_fill(packet);
            trace!(cache = %self.name, "forced fill {}", packet);
            fabric.deliver(packet)?;
            return Ok(true);
        }

        let set = self.blocks.set_index(packet.address);
        if let Some(way) = self.blocks.find_way(set, packet.address) {
            return self.merge_fill(packet, set, way, dirty, fabric).map(|()| true);
        }

        let way = match self.blocks.first_invalid(set) {
            Some(way) => way,
            None => {
                let (is_pte, translation_level) = self.translation_flags(packet);
                self.replacement.find_victim(&VictimContext {
                    cpu: packet.cpu,
                    instr_id: packet.instr_id,
                    set,
                    current_set: self.blocks.set(set),
                    ip: packet.ip,
                    full_addr: packet.address,
                    access_type: packet.access_type,
                    is_pte,
                    translation_level,
                })
            }
        };
        if way >= self.blocks.num_way() {
            error!(cache = %self.name, set, way, "victim out of range");
            return Err(SimError::invariant(
                &self.name,
                format!(
                    "{} returned way {way} for a {}-way set",
                    self.replacement.name(),
                    self.blocks.num_way()
                ),
            ));
        }

        let victim = self.blocks.block(set, way).clone();
        if victim.valid && victim.dirty {
            let writeback = Packet {
                address: victim.address,
                v_address: victim.v_address,
                data: victim.data,
                cpu: packet.cpu,
                access_type: AccessType::Write,
                pf_metadata: victim.pf_metadata,
                ..Packet::default()
            };
            if !fabric.node_mut(self.links.lower)?.add_wq(&writeback) {
                warn!(cache = %self.name, "writeback of {:#x} stalled", victim.address);
                return Ok(false);
            }
            self.stats.current_mut().writebacks += 1;
        }

        if victim.valid && victim.prefetch {
            self.stats.current_mut().pf_useless += 1;
        }

        let evicted_addr = if victim.valid { block_align(victim.address, bits) } else { 0 };
        *self.blocks.block_mut(set, way) = Block {
            valid: true,
            prefetch: packet.access_type == AccessType::Prefetch && packet.prefetch_from_this,
            dirty,
            address: packet.address,
            v_address: packet.v_address,
            data: packet.data,
            pf_metadata: packet.pf_metadata,
        };

        let fill = FillInfo {
            addr: block_align(packet.address, bits),
            set,
            way,
            prefetch: packet.access_type == AccessType::Prefetch,
            evicted_addr,
            metadata_in: packet.pf_metadata,
        };
        let mut port = PrefetchPort {
            queues: &mut self.queues,
            stats: &mut self.stats,
            cpu: packet.cpu,
            virtual_prefetch: self.config.virtual_prefetch,
            base_addr: None,
        };
        let metadata = self.prefetcher.on_fill(&fill, &mut port);
        self.blocks.block_mut(set, way).pf_metadata = metadata;

        let ctx = self.update_context(packet, set, way, evicted_addr, false);
        self.replacement.on_fill(&ctx);
        self.record_fill(packet);

        let mut response = packet.clone();
        response.pf_metadata = metadata;
        trace!(cache = %self.name, set, way, "fill {}", packet);
        fabric.deliver(&response)?;
        Ok(true)
    }

    /// Folds a fill into the copy of its block already resident at `way`.
    ///
    /// Dirty state is kept; a clean incoming fill does not overwrite data a
    /// write left behind.
    fn merge_fill(
        &mut self,
        packet: &Packet,
        set: usize,
        way: usize,
        dirty: bool,
        fabric: &mut Fabric<'_>,
    ) -> Result<(), SimError> {
        let block = self.blocks.block_mut(set, way);
        if dirty || !block.dirty {
            block.data = packet.data;
        }
        block.dirty |= dirty;
        block.prefetch &= packet.access_type == AccessType::Prefetch && packet.prefetch_from_this;
        block.v_address = packet.v_address;
        block.pf_metadata = packet.pf_metadata;
        let data = block.data;

        let ctx = self.update_context(packet, set, way, 0, true);
        self.replacement.update_replacement_state(&ctx);
        self.record_fill(packet);

        debug!(cache = %self.name, set, way, "fill merged into resident {:#x}", packet.address);
        fabric.deliver(&Packet { data, ..packet.clone() })
    }

    /// Aborts with a deadlock report when a head-of-line entry is too old.
    fn check_deadlock(&self) -> Result<(), SimError> {
        let now = self.current_cycle;
        let threshold = self.deadlock_cycle;
        let stuck = |p: &Packet| p.cycle_enqueued.saturating_add(threshold) <= now;

        let culprit = if let Some((kind, packet)) = self.queues.head_stall(threshold) {
            Some(format!("{} head {}", kind.label(), packet))
        } else if let Some(packet) = self.mshr.front().filter(|p| stuck(p)) {
            Some(format!("MSHR head {packet}"))
        } else {
            self.inflight_writes
                .front()
                .filter(|p| stuck(p))
                .map(|packet| format!("pending write {packet}"))
        };

        match culprit {
            Some(culprit) => {
                error!(cache = %self.name, cycle = now, "deadlock: {}", culprit);
                Err(SimError::Deadlock {
                    component: self.name.clone(),
                    cycle: now,
                    report: format!("{culprit}\n{}", self.print_deadlock()),
                })
            }
            None => Ok(()),
        }
    }

    /// Installs returned misses, then pending write allocations, within `max_fill`.
    fn service_fills(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        let now = self.current_cycle;
        let mut budget = self.config.max_fill;

        while budget > 0 {
            let Some(head) = self.mshr.front().filter(|p| !p.is_waiting() && p.event_cycle <= now) else {
                break;
            };
            let head = head.clone();
            if !self.handle_fill(&head, fabric)? {
                break;
            }
            let _ = self.mshr.pop_front();
            budget -= 1;
        }

        while budget > 0 {
            let Some(head) = self.inflight_writes.front().filter(|p| p.event_cycle <= now) else {
                break;
            };
            let head = head.clone();
            if !self.handle_fill(&head, fabric)? {
                break;
            }
            let _ = self.inflight_writes.pop_front();
            budget -= 1;
        }
        Ok(())
    }

    /// Looks up queue heads in WQ, PTWQ, RQ, PQ order within `max_tag`.
    fn service_tags(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        let mut budget = self.config.max_tag;
        for kind in [QueueKind::Write, QueueKind::Translation, QueueKind::Read, QueueKind::Prefetch] {
            while budget > 0 {
                let Some(head) = self.queues.front_ready(kind) else {
                    break;
                };
                let head = head.clone();
                let done = if self.try_hit(&head, fabric)? {
                    true
                } else if kind == QueueKind::Write {
                    self.handle_write(&head)
                } else {
                    self.handle_miss(&head, fabric)?
                };
                if !done {
                    break;
                }
                let _ = self.queues.pop(kind);
                budget -= 1;
            }
        }
        Ok(())
    }
}

impl Operable for Cache {
    fn set_cycle(&mut self, cycle: Cycle) {
        self.current_cycle = cycle;
        self.queues.set_cycle(cycle);
    }

    fn current_cycle(&self) -> Cycle {
        self.current_cycle
    }

    fn operate(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        self.queues.operate(fabric)?;
        self.check_deadlock()?;
        self.service_fills(fabric)?;
        self.service_tags(fabric)?;

        let mut port = PrefetchPort {
            queues: &mut self.queues,
            stats: &mut self.stats,
            cpu: 0,
            virtual_prefetch: self.config.virtual_prefetch,
            base_addr: None,
        };
        self.prefetcher.on_cycle(&mut port);
        Ok(())
    }

    fn begin_phase(&mut self, phase: Phase) {
        debug!(cache = %self.name, ?phase, "begin phase");
        self.stats.begin(phase);
        self.queues.begin_phase(phase);
    }

    fn end_phase(&mut self) {
        self.stats.end();
        self.queues.end_phase();
    }

    fn print_deadlock(&self) -> String {
        let mut out = format!("{} at cycle {}\n", self.name, self.current_cycle);
        out.push_str(&self.queues.describe());
        if self.mshr.is_empty() {
            out.push_str("MSHR empty\n");
        } else {
            let _ = writeln!(out, "MSHR ({}/{})", self.mshr.len(), self.mshr.capacity());
            for (i, entry) in self.mshr.iter().enumerate() {
                let _ = writeln!(out, "[{i}] {entry}");
            }
        }
        if !self.inflight_writes.is_empty() {
            let _ = writeln!(out, "pending writes {}", self.inflight_writes.len());
            for (i, entry) in self.inflight_writes.iter().enumerate() {
                let _ = writeln!(out, "[{i}] {entry}");
            }
        }
        out
    }
}

impl MemoryRequestConsumer for Cache {
    fn add_rq(&mut self, packet: &Packet) -> bool {
        self.queues.add_rq(packet)
    }

    fn add_wq(&mut self, packet: &Packet) -> bool {
        self.queues.add_wq(packet)
    }

    fn add_pq(&mut self, packet: &Packet) -> bool {
        self.queues.add_pq(packet)
    }

    fn add_ptwq(&mut self, packet: &Packet) -> bool {
        self.queues.add_ptwq(packet)
    }

    fn occupancy(&self, queue: QueueKind) -> usize {
        self.queues.len(queue)
    }

    fn size(&self, queue: QueueKind) -> usize {
        self.queues.capacity(queue)
    }
}

impl MemoryRequestProducer for Cache {
    fn return_data(&mut self, port: ReturnPort, packet: &Packet) -> Result<(), SimError> {
        match port {
            ReturnPort::Data => {
                let ready_at = self.current_cycle + self.fill_latency();
                if self.mshr.complete(packet.address, packet.data, packet.pf_metadata, ready_at) {
                    Ok(())
                } else {
                    error!(cache = %self.name, "unexpected fill {}", packet);
                    Err(SimError::invariant(
                        &self.name,
                        format!("no MSHR entry for returned {packet}"),
                    ))
                }
            }
            ReturnPort::Translation => {
                self.queues.return_translation(packet);
                Ok(())
            }
        }
    }
}

impl Component for Cache {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_cache(&self) -> Option<&Cache> {
        Some(self)
    }

    fn as_cache_mut(&mut self) -> Option<&mut Cache> {
        Some(self)
    }
}
