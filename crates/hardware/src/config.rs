//! Configuration system for the memory hierarchy simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline geometry, latency, and workload constants.
//! 2. **Structures:** Hierarchical config for general, core, workload, cache, and memory settings.
//! 3. **Enums:** Replacement policy, prefetcher, and synthetic access pattern selection.
//! 4. **Validation:** Structural checks run once before a hierarchy is built.
//!
//! Configuration is supplied as JSON (`Config::from_json_file`) or use `Config::default()`.
//! It is read once at startup and is immutable for the run.

use std::path::Path;

use serde::Deserialize;

use crate::common::constants::{DEFAULT_DEADLOCK_CYCLE, LOG2_BLOCK_SIZE, LOG2_PAGE_SIZE};
use crate::common::{AccessType, SimError};

/// Default configuration constants for the simulator.
mod defaults {
    /// Cycles simulated before statistics are collected.
    pub const WARMUP_CYCLES: u64 = 10_000;

    /// Cycles simulated in the region of interest.
    pub const SIM_CYCLES: u64 = 200_000;

    /// Seed mixed into every randomized component.
    pub const SEED: u64 = 0x5EED_CAFE;

    /// Reorder buffer capacity.
    pub const ROB_SIZE: usize = 352;

    /// Instructions dispatched and retired per cycle.
    pub const CORE_WIDTH: usize = 4;

    /// Base virtual address of the synthetic data footprint.
    pub const DATA_BASE: u64 = 0x1000_0000;

    /// Base virtual address of the synthetic code footprint.
    pub const CODE_BASE: u64 = 0x0040_0000;

    /// Bytes of data touched by the synthetic workload (1 MiB).
    pub const DATA_FOOTPRINT: u64 = 1024 * 1024;

    /// Bytes of code executed by the synthetic workload (16 KiB).
    pub const CODE_FOOTPRINT: u64 = 16 * 1024;

    /// Stride in bytes for the strided pattern.
    pub const STRIDE: u64 = 64;

    /// Percentage of instructions that access data memory.
    pub const MEMORY_PERCENT: u32 = 35;

    /// Percentage of data accesses that are stores.
    pub const STORE_PERCENT: u32 = 25;

    /// Fixed DRAM access latency in cycles.
    pub const DRAM_LATENCY: u64 = 120;

    /// DRAM read and write queue capacity.
    pub const DRAM_QUEUE_SIZE: usize = 64;

    /// DRAM requests completed per cycle.
    pub const DRAM_BANDWIDTH: usize = 1;

    /// Page walk latency in cycles.
    pub const WALK_LATENCY: u64 = 40;

    /// Outstanding page walks.
    pub const WALKER_QUEUE_SIZE: usize = 16;

    /// Prefetcher pattern table size (64 entries).
    pub const PREFETCH_TABLE_SIZE: usize = 64;

    /// Prefetch degree (1 line per trigger).
    pub const PREFETCH_DEGREE: usize = 1;

    /// Probability (percent) that the instruction-biased policy evicts an instruction line.
    pub const INSTR_EVICTION_PROB: u32 = 50;
}

/// Requests a cache answers from an unbounded side store.
///
/// Eligible requests bypass the sets: the first access of a block misses and
/// its fill lands in the side store, every later access hits there. Nothing
/// eligible is ever evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ForceHit {
    /// Every request goes through the sets.
    #[default]
    Off,
    /// Instruction-side requests, for a perfect instruction STLB.
    Instructions,
    /// Translation-path requests, for an unlimited page-table-entry store.
    Translations,
}

/// Cache replacement policy algorithms.
///
/// Specifies the algorithm used to select which cache line to evict
/// when a new line must be installed in a full cache set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Least Recently Used replacement policy.
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// First In First Out replacement policy.
    ///
    /// Evicts the oldest line in the set (round-robin on fills).
    #[serde(alias = "Fifo")]
    Fifo,
    /// Random replacement policy.
    #[serde(alias = "Random")]
    Random,
    /// Probabilistic instruction-biased policy.
    ///
    /// With `instr_eviction_prob` percent probability evicts an instruction-sourced
    /// line; otherwise behaves as LRU.
    #[serde(alias = "Probi")]
    Probi,
}

/// Hardware prefetcher types for cache prefetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Prefetcher {
    /// No prefetching enabled.
    #[default]
    None,
    /// Next-line prefetcher.
    ///
    /// Prefetches the following `prefetch_degree` lines after each access.
    NextLine,
    /// Instruction-pointer indexed stride prefetcher.
    ///
    /// Learns a per-IP stride and prefetches ahead once it repeats.
    #[serde(alias = "Stride")]
    IpStride,
}

/// Address pattern produced by the synthetic workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AccessPattern {
    /// Consecutive blocks, wrapping at the footprint.
    #[default]
    Sequential,
    /// Fixed stride, wrapping at the footprint.
    Strided,
    /// Uniformly random blocks inside the footprint.
    Random,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use hiersim_core::config::{Config, ReplacementPolicy};
///
/// let json = r#"{
///     "general": { "warmup_cycles": 0, "sim_cycles": 5000 },
///     "caches": { "llc": { "sets": 2048, "ways": 16, "replacement": "PROBI" } }
/// }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.general.sim_cycles, 5000);
/// assert_eq!(config.caches.llc.replacement, ReplacementPolicy::Probi);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Run length, deadlock threshold, and seed.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Trace-driven core parameters.
    #[serde(default)]
    pub core: CoreConfig,
    /// Synthetic instruction stream parameters.
    #[serde(default)]
    pub workload: WorkloadConfig,
    /// Per-level cache and TLB geometry.
    #[serde(default)]
    pub caches: CacheHierarchyConfig,
    /// DRAM and page walker parameters.
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Loads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConfigIo`] if the file cannot be read,
    /// [`SimError::ConfigParse`] if it is not valid for the schema, or
    /// [`SimError::InvalidConfig`] if validation fails.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| SimError::ConfigIo { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks structural constraints on every section.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.general.deadlock_cycle == 0 {
            return Err(SimError::InvalidConfig("general.deadlock_cycle must be non-zero".into()));
        }
        if self.core.rob_size == 0 || self.core.width == 0 {
            return Err(SimError::InvalidConfig("core.rob_size and core.width must be non-zero".into()));
        }
        if self.workload.memory_percent > 100 || self.workload.store_percent > 100 {
            return Err(SimError::InvalidConfig("workload percentages must be at most 100".into()));
        }
        if self.workload.footprint == 0 || self.workload.code_footprint == 0 {
            return Err(SimError::InvalidConfig("workload footprints must be non-zero".into()));
        }
        if self.memory.dram_queue_size == 0
            || self.memory.dram_bandwidth == 0
            || self.memory.walker_queue_size == 0
        {
            return Err(SimError::InvalidConfig(
                "memory queue sizes and bandwidth must be non-zero".into(),
            ));
        }
        for (name, cache) in self.caches.levels() {
            cache.validate(name)?;
        }
        Ok(())
    }
}

/// General simulation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Cycles simulated before statistics are collected.
    #[serde(default = "GeneralConfig::default_warmup_cycles")]
    pub warmup_cycles: u64,

    /// Cycles simulated in the region of interest.
    #[serde(default = "GeneralConfig::default_sim_cycles")]
    pub sim_cycles: u64,

    /// Cycles a head-of-line entry may wait before the run is declared deadlocked.
    #[serde(default = "GeneralConfig::default_deadlock_cycle")]
    pub deadlock_cycle: u64,

    /// Run-level seed; per-cache seeds are derived from it unless set explicitly.
    #[serde(default = "GeneralConfig::default_seed")]
    pub seed: u64,
}

impl GeneralConfig {
    fn default_warmup_cycles() -> u64 {
        defaults::WARMUP_CYCLES
    }

    fn default_sim_cycles() -> u64 {
        defaults::SIM_CYCLES
    }

    fn default_deadlock_cycle() -> u64 {
        DEFAULT_DEADLOCK_CYCLE
    }

    fn default_seed() -> u64 {
        defaults::SEED
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            warmup_cycles: defaults::WARMUP_CYCLES,
            sim_cycles: defaults::SIM_CYCLES,
            deadlock_cycle: DEFAULT_DEADLOCK_CYCLE,
            seed: defaults::SEED,
        }
    }
}

/// Trace-driven core configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Reorder buffer capacity.
    #[serde(default = "CoreConfig::default_rob_size")]
    pub rob_size: usize,

    /// Instructions dispatched and retired per cycle.
    #[serde(default = "CoreConfig::default_width")]
    pub width: usize,

    /// Issue instruction fetches through the L1I.
    #[serde(default = "CoreConfig::default_model_ifetch")]
    pub model_ifetch: bool,
}

impl CoreConfig {
    fn default_rob_size() -> usize {
        defaults::ROB_SIZE
    }

    fn default_width() -> usize {
        defaults::CORE_WIDTH
    }

    fn default_model_ifetch() -> bool {
        true
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self { rob_size: defaults::ROB_SIZE, width: defaults::CORE_WIDTH, model_ifetch: true }
    }
}

/// Synthetic workload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Data address pattern.
    #[serde(default)]
    pub pattern: AccessPattern,

    /// Base virtual address of the data footprint.
    #[serde(default = "WorkloadConfig::default_data_base")]
    pub data_base: u64,

    /// Bytes of data touched before the pattern wraps.
    #[serde(default = "WorkloadConfig::default_footprint")]
    pub footprint: u64,

    /// Stride in bytes for [`AccessPattern::Strided`].
    #[serde(default = "WorkloadConfig::default_stride")]
    pub stride: u64,

    /// Base virtual address of the code footprint.
    #[serde(default = "WorkloadConfig::default_code_base")]
    pub code_base: u64,

    /// Bytes of code executed before the instruction pointer wraps.
    #[serde(default = "WorkloadConfig::default_code_footprint")]
    pub code_footprint: u64,

    /// Percentage of instructions that access data memory.
    #[serde(default = "WorkloadConfig::default_memory_percent")]
    pub memory_percent: u32,

    /// Percentage of data accesses that are stores.
    #[serde(default = "WorkloadConfig::default_store_percent")]
    pub store_percent: u32,

    /// Stop after this many instructions (unbounded when absent).
    #[serde(default)]
    pub instructions: Option<u64>,

    /// Seed for the workload generator (derived from `general.seed` when absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl WorkloadConfig {
    fn default_data_base() -> u64 {
        defaults::DATA_BASE
    }

    fn default_footprint() -> u64 {
        defaults::DATA_FOOTPRINT
    }

    fn default_stride() -> u64 {
        defaults::STRIDE
    }

    fn default_code_base() -> u64 {
        defaults::CODE_BASE
    }

    fn default_code_footprint() -> u64 {
        defaults::CODE_FOOTPRINT
    }

    fn default_memory_percent() -> u32 {
        defaults::MEMORY_PERCENT
    }

    fn default_store_percent() -> u32 {
        defaults::STORE_PERCENT
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            pattern: AccessPattern::default(),
            data_base: defaults::DATA_BASE,
            footprint: defaults::DATA_FOOTPRINT,
            stride: defaults::STRIDE,
            code_base: defaults::CODE_BASE,
            code_footprint: defaults::CODE_FOOTPRINT,
            memory_percent: defaults::MEMORY_PERCENT,
            store_percent: defaults::STORE_PERCENT,
            instructions: None,
            seed: None,
        }
    }
}

/// DRAM and page walker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Fixed DRAM access latency in cycles.
    #[serde(default = "MemoryConfig::default_dram_latency")]
    pub dram_latency: u64,

    /// DRAM read and write queue capacity.
    #[serde(default = "MemoryConfig::default_dram_queue_size")]
    pub dram_queue_size: usize,

    /// DRAM requests completed per cycle.
    #[serde(default = "MemoryConfig::default_dram_bandwidth")]
    pub dram_bandwidth: usize,

    /// Page walk latency in cycles.
    #[serde(default = "MemoryConfig::default_walk_latency")]
    pub walk_latency: u64,

    /// Outstanding page walks.
    #[serde(default = "MemoryConfig::default_walker_queue_size")]
    pub walker_queue_size: usize,
}

impl MemoryConfig {
    fn default_dram_latency() -> u64 {
        defaults::DRAM_LATENCY
    }

    fn default_dram_queue_size() -> usize {
        defaults::DRAM_QUEUE_SIZE
    }

    fn default_dram_bandwidth() -> usize {
        defaults::DRAM_BANDWIDTH
    }

    fn default_walk_latency() -> u64 {
        defaults::WALK_LATENCY
    }

    fn default_walker_queue_size() -> usize {
        defaults::WALKER_QUEUE_SIZE
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dram_latency: defaults::DRAM_LATENCY,
            dram_queue_size: defaults::DRAM_QUEUE_SIZE,
            dram_bandwidth: defaults::DRAM_BANDWIDTH,
            walk_latency: defaults::WALK_LATENCY,
            walker_queue_size: defaults::WALKER_QUEUE_SIZE,
        }
    }
}

/// Cache hierarchy configuration.
///
/// Each level falls back to its own preset when omitted. Fields omitted inside
/// a level take the generic [`CacheConfig`] field defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheHierarchyConfig {
    /// Instruction TLB
    #[serde(default = "CacheConfig::itlb")]
    pub itlb: CacheConfig,
    /// Data TLB
    #[serde(default = "CacheConfig::dtlb")]
    pub dtlb: CacheConfig,
    /// Unified second-level TLB
    #[serde(default = "CacheConfig::stlb")]
    pub stlb: CacheConfig,
    /// L1 instruction cache
    #[serde(default = "CacheConfig::l1i")]
    pub l1i: CacheConfig,
    /// L1 data cache
    #[serde(default = "CacheConfig::l1d")]
    pub l1d: CacheConfig,
    /// Unified L2 cache
    #[serde(default = "CacheConfig::l2c")]
    pub l2c: CacheConfig,
    /// Last-level cache
    #[serde(default = "CacheConfig::llc")]
    pub llc: CacheConfig,
}

impl CacheHierarchyConfig {
    /// Every level with its short name, ordered from the core outwards.
    pub fn levels(&self) -> [(&'static str, &CacheConfig); 7] {
        [
            ("ITLB", &self.itlb),
            ("DTLB", &self.dtlb),
            ("STLB", &self.stlb),
            ("L1I", &self.l1i),
            ("L1D", &self.l1d),
            ("L2C", &self.l2c),
            ("LLC", &self.llc),
        ]
    }
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            itlb: CacheConfig::itlb(),
            dtlb: CacheConfig::dtlb(),
            stlb: CacheConfig::stlb(),
            l1i: CacheConfig::l1i(),
            l1d: CacheConfig::l1d(),
            l2c: CacheConfig::l2c(),
            llc: CacheConfig::llc(),
        }
    }
}

/// Individual cache level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Number of sets (power of two)
    #[serde(default = "CacheConfig::default_sets")]
    pub sets: usize,

    /// Associativity (number of ways)
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,

    /// Outstanding misses
    #[serde(default = "CacheConfig::default_mshr_size")]
    pub mshr_size: usize,

    /// Read queue capacity
    #[serde(default = "CacheConfig::default_queue_size")]
    pub rq_size: usize,

    /// Write queue capacity
    #[serde(default = "CacheConfig::default_queue_size")]
    pub wq_size: usize,

    /// Prefetch queue capacity (zero disables prefetch admission)
    #[serde(default = "CacheConfig::default_pq_size")]
    pub pq_size: usize,

    /// Page-table-walk queue capacity
    #[serde(default = "CacheConfig::default_queue_size")]
    pub ptwq_size: usize,

    /// Cycles between admission and the tag check
    #[serde(default = "CacheConfig::default_hit_latency")]
    pub hit_latency: u64,

    /// Cycles between downstream data arrival and installation
    #[serde(default = "CacheConfig::default_fill_latency")]
    pub fill_latency: u64,

    /// Tag checks per cycle across all queues
    #[serde(default = "CacheConfig::default_bandwidth")]
    pub max_tag: usize,

    /// Fills per cycle
    #[serde(default = "CacheConfig::default_bandwidth")]
    pub max_fill: usize,

    /// log2 of the block size
    #[serde(default = "CacheConfig::default_offset_bits")]
    pub offset_bits: u32,

    /// Forward prefetch misses to the lower read queue instead of its prefetch queue
    #[serde(default)]
    pub prefetch_as_load: bool,

    /// Write-queue merges compare full addresses instead of blocks
    #[serde(default)]
    pub match_offset_bits: bool,

    /// Prefetcher observes and issues virtual addresses
    #[serde(default)]
    pub virtual_prefetch: bool,

    /// Access types that trigger the prefetcher
    #[serde(default = "CacheConfig::default_prefetch_activate")]
    pub prefetch_activate: Vec<AccessType>,

    /// Replacement policy
    #[serde(default)]
    pub replacement: ReplacementPolicy,

    /// Hardware prefetcher type
    #[serde(default)]
    pub prefetcher: Prefetcher,

    /// Prefetcher table size (for the stride prefetcher)
    #[serde(default = "CacheConfig::default_prefetch_table")]
    pub prefetch_table_size: usize,

    /// Prefetch degree (lines to prefetch per trigger)
    #[serde(default = "CacheConfig::default_prefetch_degree")]
    pub prefetch_degree: usize,

    /// Instruction eviction probability in percent (for `PROBI`)
    #[serde(default = "CacheConfig::default_instr_eviction_prob")]
    pub instr_eviction_prob: u32,

    /// Seed for randomized policies; derived from the run seed and cache name when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Split hits, misses and miss latency into instruction, data and translation classes
    #[serde(default)]
    pub extra_stats: bool,

    /// Requests served from an unbounded side store instead of the sets
    #[serde(default)]
    pub force_hit: ForceHit,

    /// Hand `is_pte` and `translation_level` to the replacement policy
    #[serde(default)]
    pub translation_aware_replacement: bool,

    /// Position on the translation path: 0 for data caches, 1 for first-level TLBs, 2 for the STLB
    #[serde(default)]
    pub translation_level: u8,
}

impl CacheConfig {
    fn default_sets() -> usize {
        64
    }

    fn default_ways() -> usize {
        8
    }

    fn default_mshr_size() -> usize {
        16
    }

    fn default_queue_size() -> usize {
        32
    }

    fn default_pq_size() -> usize {
        16
    }

    fn default_hit_latency() -> u64 {
        4
    }

    fn default_fill_latency() -> u64 {
        1
    }

    fn default_bandwidth() -> usize {
        2
    }

    fn default_offset_bits() -> u32 {
        LOG2_BLOCK_SIZE
    }

    fn default_prefetch_activate() -> Vec<AccessType> {
        vec![AccessType::Load, AccessType::Prefetch]
    }

    fn default_prefetch_table() -> usize {
        defaults::PREFETCH_TABLE_SIZE
    }

    fn default_prefetch_degree() -> usize {
        defaults::PREFETCH_DEGREE
    }

    fn default_instr_eviction_prob() -> u32 {
        defaults::INSTR_EVICTION_PROB
    }

    /// Builds a cache of `sets` x `ways` with queue sizes, MSHR size and latencies.
    fn preset(
        sets: usize,
        ways: usize,
        mshr_size: usize,
        queues: (usize, usize, usize),
        hit_latency: u64,
        bandwidth: usize,
    ) -> Self {
        let (rq_size, wq_size, pq_size) = queues;
        Self {
            sets,
            ways,
            mshr_size,
            rq_size,
            wq_size,
            pq_size,
            hit_latency,
            max_tag: bandwidth,
            max_fill: bandwidth,
            ..Self::default()
        }
    }

    /// Instruction TLB: 16 sets x 4 ways of 4 KiB pages.
    pub fn itlb() -> Self {
        Self {
            offset_bits: LOG2_PAGE_SIZE,
            translation_level: 1,
            ..Self::preset(16, 4, 8, (16, 16, 0), 1, 2)
        }
    }

    /// Data TLB: 16 sets x 4 ways of 4 KiB pages.
    pub fn dtlb() -> Self {
        Self {
            offset_bits: LOG2_PAGE_SIZE,
            translation_level: 1,
            ..Self::preset(16, 4, 8, (16, 16, 0), 1, 2)
        }
    }

    /// Second-level TLB: 128 sets x 12 ways of 4 KiB pages.
    pub fn stlb() -> Self {
        Self {
            offset_bits: LOG2_PAGE_SIZE,
            translation_level: 2,
            ..Self::preset(128, 12, 16, (32, 32, 0), 7, 1)
        }
    }

    /// L1 instruction cache: 32 KiB, 8 ways, virtually prefetched.
    pub fn l1i() -> Self {
        Self { virtual_prefetch: true, ..Self::preset(64, 8, 8, (64, 64, 32), 3, 2) }
    }

    /// L1 data cache: 48 KiB, 12 ways.
    pub fn l1d() -> Self {
        Self::preset(64, 12, 16, (64, 64, 8), 4, 2)
    }

    /// L2 cache: 512 KiB, 8 ways.
    pub fn l2c() -> Self {
        Self::preset(1024, 8, 32, (32, 32, 16), 9, 1)
    }

    /// Last-level cache: 2 MiB, 16 ways.
    pub fn llc() -> Self {
        Self::preset(2048, 16, 64, (32, 32, 32), 19, 1)
    }

    /// Checks geometry, capacities, bandwidth and policy parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] naming `name` and the offending field.
    pub fn validate(&self, name: &str) -> Result<(), SimError> {
        let fail = |what: &str| Err(SimError::InvalidConfig(format!("{name}: {what}")));
        if self.sets == 0 || !self.sets.is_power_of_two() {
            return fail("sets must be a non-zero power of two");
        }
        if self.ways == 0 {
            return fail("ways must be non-zero");
        }
        if self.mshr_size == 0 {
            return fail("mshr_size must be non-zero");
        }
        if self.rq_size == 0 || self.wq_size == 0 {
            return fail("rq_size and wq_size must be non-zero");
        }
        if self.max_tag == 0 || self.max_fill == 0 {
            return fail("max_tag and max_fill must be non-zero");
        }
        if self.offset_bits >= u64::BITS {
            return fail("offset_bits must be below 64");
        }
        if self.instr_eviction_prob > 100 {
            return fail("instr_eviction_prob must be at most 100");
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    /// Creates a generic 32 KiB, 8-way, LRU cache without a prefetcher.
    fn default() -> Self {
        Self {
            sets: Self::default_sets(),
            ways: Self::default_ways(),
            mshr_size: Self::default_mshr_size(),
            rq_size: Self::default_queue_size(),
            wq_size: Self::default_queue_size(),
            pq_size: Self::default_pq_size(),
            ptwq_size: Self::default_queue_size(),
            hit_latency: Self::default_hit_latency(),
            fill_latency: Self::default_fill_latency(),
            max_tag: Self::default_bandwidth(),
            max_fill: Self::default_bandwidth(),
            offset_bits: LOG2_BLOCK_SIZE,
            prefetch_as_load: false,
            match_offset_bits: false,
            virtual_prefetch: false,
            prefetch_activate: Self::default_prefetch_activate(),
            replacement: ReplacementPolicy::default(),
            prefetcher: Prefetcher::default(),
            prefetch_table_size: defaults::PREFETCH_TABLE_SIZE,
            prefetch_degree: defaults::PREFETCH_DEGREE,
            instr_eviction_prob: defaults::INSTR_EVICTION_PROB,
            seed: None,
            extra_stats: false,
            force_hit: ForceHit::Off,
            translation_aware_replacement: false,
            translation_level: 0,
        }
    }
}
