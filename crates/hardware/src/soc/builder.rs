//! Memory hierarchy construction and the top-level `MemoryHierarchy` type.
//!
//! This module builds the component graph from configuration. It performs:
//! 1. **Arena setup:** Every component is boxed into one arena at a fixed [`NodeId`].
//! 2. **Wiring:** Caches learn their lower level and translator; the core learns its L1s.
//! 3. **Seeding:** Randomized policies get a per-cache seed derived from the run seed.
//! 4. **Main memory:** DRAM answers every request after the configured fixed latency.
//!
//! The tick order is the arena order: core, ITLB, DTLB, STLB, L1I, L1D, L2C,
//! LLC, page walker, DRAM.

use tracing::debug;

use crate::common::{Cycle, SimError};
use crate::config::{CacheConfig, Config};
use crate::core::cpu::{CoreLinks, TraceCore};
use crate::core::stream::{InstructionSource, SyntheticStream};
use crate::core::units::cache::{Cache, CacheLinks};
use crate::core::units::mmu::PageWalker;
use crate::soc::interconnect::{Fabric, NodeId};
use crate::soc::memory::Dram;
use crate::soc::memory::controller::SimpleController;
use crate::soc::traits::{Component, Phase};

/// Fixed positions of the components in the arena.
pub mod ids {
    use crate::soc::interconnect::NodeId;

    /// The trace-driven core.
    pub const CORE: NodeId = NodeId(0);
    /// Instruction TLB.
    pub const ITLB: NodeId = NodeId(1);
    /// Data TLB.
    pub const DTLB: NodeId = NodeId(2);
    /// Second-level TLB.
    pub const STLB: NodeId = NodeId(3);
    /// L1 instruction cache.
    pub const L1I: NodeId = NodeId(4);
    /// L1 data cache.
    pub const L1D: NodeId = NodeId(5);
    /// L2 cache.
    pub const L2C: NodeId = NodeId(6);
    /// Last-level cache.
    pub const LLC: NodeId = NodeId(7);
    /// Page walker.
    pub const PTW: NodeId = NodeId(8);
    /// Main memory.
    pub const DRAM: NodeId = NodeId(9);
}

/// Mixes the run seed with a component name (FNV-1a over the name).
pub fn component_seed(run_seed: u64, name: &str) -> u64 {
    let hash = name
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
    run_seed ^ hash
}

/// The simulated memory hierarchy: a component arena advanced one cycle at a time.
pub struct MemoryHierarchy {
    nodes: Vec<Box<dyn Component>>,
    cycle: Cycle,
}

impl MemoryHierarchy {
    /// Wraps an already wired arena; `operate` runs in arena order.
    pub fn new(nodes: Vec<Box<dyn Component>>) -> Self {
        Self { nodes, cycle: 0 }
    }

    /// Builds the hierarchy described by `config` driven by its synthetic workload.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `config` fails validation.
    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        let seed = config.workload.seed.unwrap_or(config.general.seed);
        let source = Box::new(SyntheticStream::new(&config.workload, seed));
        Self::with_source(config, source)
    }

    /// Builds the hierarchy described by `config` driven by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `config` fails validation.
    pub fn with_source(config: &Config, source: Box<dyn InstructionSource>) -> Result<Self, SimError> {
        config.validate()?;
        let deadlock = config.general.deadlock_cycle;
        let caches = &config.caches;

        let cache = |name: &str, level: &CacheConfig, id: NodeId, lower: NodeId, translator: Option<NodeId>| {
            let full_name = if id == ids::LLC { name.to_string() } else { format!("cpu0_{name}") };
            let seed = level.seed.unwrap_or_else(|| component_seed(config.general.seed, &full_name));
            let links = CacheLinks { id, lower, translator };
            Cache::new(full_name, level, links, seed).with_deadlock_cycle(deadlock)
        };

        let controller = Box::new(SimpleController::new(config.memory.dram_latency));

        let core_links = CoreLinks { id: ids::CORE, l1i: ids::L1I, l1d: ids::L1D };
        let mut nodes: Vec<Box<dyn Component>> = Vec::with_capacity(10);
        nodes.push(Box::new(TraceCore::new(0, &config.core, core_links, source).with_deadlock_cycle(deadlock)));
        nodes.push(Box::new(cache("ITLB", &caches.itlb, ids::ITLB, ids::STLB, None)));
        nodes.push(Box::new(cache("DTLB", &caches.dtlb, ids::DTLB, ids::STLB, None)));
        nodes.push(Box::new(cache("STLB", &caches.stlb, ids::STLB, ids::PTW, None)));
        nodes.push(Box::new(cache("L1I", &caches.l1i, ids::L1I, ids::L2C, Some(ids::ITLB))));
        nodes.push(Box::new(cache("L1D", &caches.l1d, ids::L1D, ids::L2C, Some(ids::DTLB))));
        nodes.push(Box::new(cache("L2C", &caches.l2c, ids::L2C, ids::LLC, None)));
        nodes.push(Box::new(cache("LLC", &caches.llc, ids::LLC, ids::DRAM, None)));
        nodes.push(Box::new(PageWalker::new(&config.memory).with_deadlock_cycle(deadlock)));
        nodes.push(Box::new(Dram::new(&config.memory, controller).with_deadlock_cycle(deadlock)));
        debug!(components = nodes.len(), "built memory hierarchy");
        Ok(Self::new(nodes))
    }

    /// The cycle the next [`MemoryHierarchy::tick`] will simulate.
    pub const fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The arena holds no component.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Simulates one cycle: sets every clock, then operates every component in order.
    ///
    /// # Errors
    ///
    /// Propagates the first component failure (deadlock or invariant violation).
    pub fn tick(&mut self) -> Result<(), SimError> {
        let cycle = self.cycle;
        for node in &mut self.nodes {
            node.set_cycle(cycle);
        }
        for i in 0..self.nodes.len() {
            let (node, mut fabric) = Fabric::split(&mut self.nodes, NodeId(i))?;
            node.operate(&mut fabric)?;
        }
        self.cycle += 1;
        Ok(())
    }

    /// Starts a statistics phase on every component.
    pub fn begin_phase(&mut self, phase: Phase) {
        debug!(?phase, cycle = self.cycle, "begin phase");
        for node in &mut self.nodes {
            node.begin_phase(phase);
        }
    }

    /// Ends the current statistics phase on every component.
    pub fn end_phase(&mut self) {
        for node in &mut self.nodes {
            node.end_phase();
        }
    }

    /// Component `id`.
    pub fn node(&self, id: NodeId) -> Option<&dyn Component> {
        self.nodes.get(id.0).map(|n| &**n)
    }

    /// Mutable component `id`.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut dyn Component> {
        match self.nodes.get_mut(id.0) {
            Some(node) => Some(node.as_mut()),
            None => None,
        }
    }

    /// Every component, in tick order.
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.nodes.iter().map(|n| &**n)
    }

    /// Every cache, in tick order.
    pub fn caches(&self) -> impl Iterator<Item = &Cache> {
        self.nodes.iter().filter_map(|n| n.as_cache())
    }

    /// The cache called `name`.
    pub fn cache(&self, name: &str) -> Option<&Cache> {
        self.caches().find(|c| c.name() == name)
    }

    /// Every core, in tick order.
    pub fn cores(&self) -> impl Iterator<Item = &TraceCore> {
        self.nodes.iter().filter_map(|n| n.as_core())
    }

    /// Main memory, if present.
    pub fn dram(&self) -> Option<&Dram> {
        self.nodes.iter().find_map(|n| n.as_dram())
    }

    /// The page walker, if present.
    pub fn page_walker(&self) -> Option<&PageWalker> {
        self.nodes.iter().find_map(|n| n.as_page_walker())
    }

    /// Deadlock dump of every component.
    pub fn print_deadlock(&self) -> String {
        self.nodes.iter().map(|n| n.print_deadlock()).collect()
    }
}
