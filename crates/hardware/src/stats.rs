//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for the memory hierarchy. It provides:
//! 1. **Cache counters:** Per-cpu, per-access-type hits and misses, prefetch accounting, miss latency.
//! 2. **Queue counters:** Admissions, merges, rejections and forwards for each request queue.
//! 3. **Core and DRAM counters:** Retired instructions, IPC, and memory traffic.
//! 4. **Phases:** Warmup counters are kept apart from the region of interest.
//! 5. **Reporting:** A serializable `SimStats` snapshot with a plain-text printer.
//!
//! Components only ever increment these counters; they are read by the
//! reporting code at phase boundaries.

use serde::Serialize;

use crate::common::data::{AccessType, NUM_ACCESS_TYPES};
use crate::soc::traits::Phase;

/// Counters split by access type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounters {
    counts: [u64; NUM_ACCESS_TYPES],
}

impl TypeCounters {
    /// Increments the counter for `ty`.
    #[inline]
    pub fn bump(&mut self, ty: AccessType) {
        self.counts[ty.index()] += 1;
    }

    /// Counter value for `ty`.
    pub const fn get(&self, ty: AccessType) -> u64 {
        self.counts[ty.index()]
    }

    /// Sum over all access types.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Request class of the optional per-class cache breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RequestClass {
    /// Instruction fetch.
    Instr,
    /// Data load or store.
    Data,
    /// Translation for an instruction fetch.
    InstrTranslation,
    /// Translation for a data access.
    DataTranslation,
}

impl RequestClass {
    /// All classes in report order.
    pub const ALL: [Self; 4] = [Self::Instr, Self::Data, Self::InstrTranslation, Self::DataTranslation];

    /// Classifies a request by its instruction and translation flags.
    pub const fn of(is_instr: bool, is_pte: bool) -> Self {
        match (is_instr, is_pte) {
            (true, false) => Self::Instr,
            (false, false) => Self::Data,
            (true, true) => Self::InstrTranslation,
            (false, true) => Self::DataTranslation,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }

    /// Short label used in reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Instr => "instr",
            Self::Data => "data",
            Self::InstrTranslation => "instr_xlat",
            Self::DataTranslation => "data_xlat",
        }
    }
}

/// Hits, misses and miss latency of one request class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounters {
    /// Hits.
    pub hits: u64,
    /// Misses.
    pub misses: u64,
    /// Sum of fill latencies.
    pub total_miss_latency: u64,
}

/// Per-class counters, filled only when a cache enables `extra_stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassBreakdown {
    counters: [ClassCounters; 4],
}

impl ClassBreakdown {
    /// Counters of `class`.
    pub const fn get(&self, class: RequestClass) -> &ClassCounters {
        &self.counters[class.index()]
    }

    /// Mutable counters of `class`.
    pub fn get_mut(&mut self, class: RequestClass) -> &mut ClassCounters {
        &mut self.counters[class.index()]
    }

    /// Nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.counters.iter().all(|c| c.hits == 0 && c.misses == 0)
    }
}

/// Counters for one cache level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Hits per cpu, split by access type.
    pub hits: Vec<TypeCounters>,
    /// Misses per cpu, split by access type.
    pub misses: Vec<TypeCounters>,
    /// Prefetches requested by the prefetcher.
    pub pf_requested: u64,
    /// Prefetches admitted to the prefetch queue.
    pub pf_issued: u64,
    /// Prefetched lines later hit or merged by a demand request.
    pub pf_useful: u64,
    /// Prefetched lines evicted without a demand use.
    pub pf_useless: u64,
    /// Prefetch fills installed in this level.
    pub pf_fill: u64,
    /// Sum over fills of cycles between MSHR allocation and installation.
    pub total_miss_latency: u64,
    /// Dirty victims written back to the lower level.
    pub writebacks: u64,
    /// Prefetches requested outside the page of the access that triggered them.
    pub pf_crossed: u64,
    /// Requests answered from the force-hit side store.
    pub forced_hits: u64,
    /// Instruction, data and translation split.
    pub classes: ClassBreakdown,
}

impl CacheStats {
    fn slot(list: &mut Vec<TypeCounters>, cpu: usize) -> &mut TypeCounters {
        if list.len() <= cpu {
            list.resize(cpu + 1, TypeCounters::default());
        }
        &mut list[cpu]
    }

    /// Records a hit by `cpu` of type `ty`.
    pub fn record_hit(&mut self, cpu: usize, ty: AccessType) {
        Self::slot(&mut self.hits, cpu).bump(ty);
    }

    /// Records a miss by `cpu` of type `ty`.
    pub fn record_miss(&mut self, cpu: usize, ty: AccessType) {
        Self::slot(&mut self.misses, cpu).bump(ty);
    }

    /// Hits of type `ty` summed over all cpus.
    pub fn hits_of(&self, ty: AccessType) -> u64 {
        self.hits.iter().map(|c| c.get(ty)).sum()
    }

    /// Misses of type `ty` summed over all cpus.
    pub fn misses_of(&self, ty: AccessType) -> u64 {
        self.misses.iter().map(|c| c.get(ty)).sum()
    }

    /// All hits.
    pub fn total_hits(&self) -> u64 {
        self.hits.iter().map(TypeCounters::total).sum()
    }

    /// All misses.
    pub fn total_misses(&self) -> u64 {
        self.misses.iter().map(TypeCounters::total).sum()
    }

    /// Miss rate over all accesses, 0.0 when idle.
    pub fn miss_rate(&self) -> f64 {
        let accesses = self.total_hits() + self.total_misses();
        if accesses == 0 { 0.0 } else { self.total_misses() as f64 / accesses as f64 }
    }

    /// Average cycles from MSHR allocation to fill, 0.0 without misses.
    pub fn average_miss_latency(&self) -> f64 {
        let misses = self.total_misses();
        if misses == 0 { 0.0 } else { self.total_miss_latency as f64 / misses as f64 }
    }
}

/// Counters for a single request queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounters {
    /// Requests offered to the queue.
    pub access: u64,
    /// Requests merged into an existing entry.
    pub merged: u64,
    /// Requests rejected because the queue was full.
    pub full: u64,
    /// Requests admitted as new entries.
    pub to_cache: u64,
    /// Entries completed from write-queue data or written in place.
    pub forward: u64,
}

/// Counters for a cache's queue set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Read queue.
    pub rq: QueueCounters,
    /// Write queue.
    pub wq: QueueCounters,
    /// Prefetch queue.
    pub pq: QueueCounters,
    /// Page-table-walk queue.
    pub ptwq: QueueCounters,
}

/// Counters for one trace-driven core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoreStats {
    /// Cycles simulated.
    pub cycles: u64,
    /// Instructions retired.
    pub instructions_retired: u64,
    /// Loads issued to the L1D.
    pub loads: u64,
    /// Stores issued to the L1D.
    pub stores: u64,
    /// Instruction blocks fetched through the L1I.
    pub fetches: u64,
    /// Issue attempts rejected by a full queue.
    pub issue_stalls: u64,
}

impl CoreStats {
    /// Instructions per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 { 0.0 } else { self.instructions_retired as f64 / self.cycles as f64 }
    }
}

/// Counters for main memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DramStats {
    /// Reads completed.
    pub reads: u64,
    /// Writes completed.
    pub writes: u64,
    /// Reads rejected because the read queue was full.
    pub rq_full: u64,
    /// Writes rejected because the write queue was full.
    pub wq_full: u64,
    /// Reads served from a queued write.
    pub forwarded: u64,
}

/// Counters for the page walker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WalkerStats {
    /// Walks completed.
    pub walks: u64,
    /// Requests merged into an outstanding walk of the same page.
    pub merged: u64,
    /// Requests rejected because the walk queue was full.
    pub full: u64,
    /// Distinct pages mapped so far.
    pub pages_mapped: u64,
}

/// Counters of one component split into the current phase and the region of interest.
#[derive(Clone, Debug, Default)]
pub struct PhaseStats<T> {
    current: T,
    roi: Option<T>,
    warmup: bool,
}

impl<T: Default + Clone> PhaseStats<T> {
    /// Starts a new phase with zeroed counters.
    pub fn begin(&mut self, phase: Phase) {
        self.current = T::default();
        self.warmup = phase == Phase::Warmup;
    }

    /// Ends the current phase, keeping its counters when it was the region of interest.
    pub fn end(&mut self) {
        if !self.warmup {
            self.roi = Some(self.current.clone());
        }
    }

    /// The current phase is warmup.
    pub const fn is_warmup(&self) -> bool {
        self.warmup
    }

    /// Counters of the phase in progress.
    pub const fn current(&self) -> &T {
        &self.current
    }

    /// Mutable counters of the phase in progress.
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    /// Region-of-interest counters, or the current ones if no ROI has ended yet.
    pub fn report(&self) -> &T {
        self.roi.as_ref().unwrap_or(&self.current)
    }
}

/// Report for one cache level.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CacheReport {
    /// Component name.
    pub name: String,
    /// Hit, miss and prefetch counters.
    pub cache: CacheStats,
    /// Queue counters.
    pub queues: QueueStats,
    /// Final statistics of the replacement policy.
    pub replacement: Vec<(String, u64)>,
    /// Final statistics of the prefetcher.
    pub prefetcher: Vec<(String, u64)>,
}

/// Snapshot of a finished (or aborted) run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SimStats {
    /// Cycles simulated in the region of interest.
    pub cycles: u64,
    /// One entry per core.
    pub cores: Vec<CoreStats>,
    /// One entry per cache, ordered from the core outwards.
    pub caches: Vec<CacheReport>,
    /// Main memory counters.
    pub dram: DramStats,
    /// Page walker counters.
    pub walker: WalkerStats,
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"caches"`, `"queues"`, `"memory"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "caches", "queues", "memory"];

impl SimStats {
    /// Looks up the report for the cache called `name`.
    pub fn cache(&self, name: &str) -> Option<&CacheReport> {
        self.caches.iter().find(|c| c.name == name)
    }

    /// Renders the requested statistics sections as text.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to render, or empty for all.
    pub fn render_sections(&self, sections: &[String]) -> String {
        use std::fmt::Write as _;

        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let mut out = String::new();
        let rule = "==========================================================";

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "MEMORY HIERARCHY SIMULATION STATISTICS");
        let _ = writeln!(out, "{rule}");
        if want("summary") {
            let _ = writeln!(out, "sim_cycles               {}", self.cycles);
            for (cpu, core) in self.cores.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "cpu{cpu}  insts: {:<10} ipc: {:.4}  loads: {} stores: {} fetches: {} issue_stalls: {}",
                    core.instructions_retired,
                    core.ipc(),
                    core.loads,
                    core.stores,
                    core.fetches,
                    core.issue_stalls
                );
            }
            let _ = writeln!(out, "----------------------------------------------------------");
        }
        if want("caches") {
            for report in &self.caches {
                let c = &report.cache;
                let _ = writeln!(
                    out,
                    "{:<10} accesses: {:<10} hits: {:<10} misses: {:<10} miss_rate: {:.2}%",
                    report.name,
                    c.total_hits() + c.total_misses(),
                    c.total_hits(),
                    c.total_misses(),
                    c.miss_rate() * 100.0
                );
                for ty in AccessType::ALL {
                    let (hits, misses) = (c.hits_of(ty), c.misses_of(ty));
                    if hits + misses > 0 {
                        let _ = writeln!(
                            out,
                            "  {:<12} hits: {:<10} misses: {:<10}",
                            ty.label(),
                            hits,
                            misses
                        );
                    }
                }
                let _ = writeln!(
                    out,
                    "  prefetch requested: {} issued: {} useful: {} useless: {} fills: {} crossed: {}",
                    c.pf_requested, c.pf_issued, c.pf_useful, c.pf_useless, c.pf_fill, c.pf_crossed
                );
                if c.forced_hits > 0 {
                    let _ = writeln!(out, "  forced hits: {}", c.forced_hits);
                }
                if !c.classes.is_empty() {
                    for class in RequestClass::ALL {
                        let k = c.classes.get(class);
                        let avg = if k.misses == 0 { 0.0 } else { k.total_miss_latency as f64 / k.misses as f64 };
                        let _ = writeln!(
                            out,
                            "  {:<12} hits: {:<10} misses: {:<10} avg miss latency: {:.2}",
                            class.label(),
                            k.hits,
                            k.misses,
                            avg
                        );
                    }
                }
                let _ = writeln!(
                    out,
                    "  avg miss latency: {:.2} cycles  writebacks: {}",
                    c.average_miss_latency(),
                    c.writebacks
                );
                for (key, value) in report.replacement.iter().chain(&report.prefetcher) {
                    let _ = writeln!(out, "  {key}: {value}");
                }
            }
            let _ = writeln!(out, "----------------------------------------------------------");
        }
        if want("queues") {
            for report in &self.caches {
                let q = &report.queues;
                for (label, counters) in [("RQ", q.rq), ("WQ", q.wq), ("PQ", q.pq), ("PTWQ", q.ptwq)] {
                    if counters.access == 0 {
                        continue;
                    }
                    let _ = writeln!(
                        out,
                        "{:<10} {:<4} access: {:<8} merged: {:<8} full: {:<8} to_cache: {:<8} forward: {}",
                        report.name,
                        label,
                        counters.access,
                        counters.merged,
                        counters.full,
                        counters.to_cache,
                        counters.forward
                    );
                }
            }
            let _ = writeln!(out, "----------------------------------------------------------");
        }
        if want("memory") {
            let d = &self.dram;
            let _ = writeln!(
                out,
                "DRAM  reads: {} writes: {} forwarded: {} rq_full: {} wq_full: {}",
                d.reads, d.writes, d.forwarded, d.rq_full, d.wq_full
            );
            let w = &self.walker;
            let _ = writeln!(
                out,
                "PTW   walks: {} merged: {} full: {} pages_mapped: {}",
                w.walks, w.merged, w.full, w.pages_mapped
            );
        }
        let _ = writeln!(out, "{rule}");
        out
    }

    /// Prints only the requested statistics sections to stdout.
    pub fn print_sections(&self, sections: &[String]) {
        print!("{}", self.render_sections(sections));
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
