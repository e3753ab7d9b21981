//! Simulator: owns the hierarchy and drives it through the run phases.
//!
//! A run has two phases. During warmup, latencies are zero and statistics
//! are discarded; the region of interest (ROI) follows and is reported. Either
//! phase ends early once every core has retired its whole trace.

use tracing::{error, info};

use crate::common::SimError;
use crate::config::{Config, GeneralConfig};
use crate::soc::builder::MemoryHierarchy;
use crate::soc::traits::Phase;
use crate::stats::SimStats;

/// Top-level simulator.
pub struct Simulator {
    /// The simulated hierarchy.
    pub hierarchy: MemoryHierarchy,
    warmup_cycles: u64,
    sim_cycles: u64,
}

impl Simulator {
    /// Creates a simulator over an already built hierarchy.
    pub fn new(hierarchy: MemoryHierarchy, general: &GeneralConfig) -> Self {
        Self { hierarchy, warmup_cycles: general.warmup_cycles, sim_cycles: general.sim_cycles }
    }

    /// Builds the hierarchy described by `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `config` fails validation.
    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        Ok(Self::new(MemoryHierarchy::from_config(config)?, &config.general))
    }

    fn all_cores_done(&self) -> bool {
        self.hierarchy.cores().all(|core| core.is_done())
    }

    fn retired(&self) -> u64 {
        self.hierarchy.cores().map(|core| core.stats().current().instructions_retired).sum()
    }

    /// Advances the hierarchy by one clock cycle.
    ///
    /// # Errors
    ///
    /// Propagates the failing component's error after logging it with the
    /// current cycle and retired instruction count.
    pub fn tick(&mut self) -> Result<(), SimError> {
        let cycle = self.hierarchy.cycle();
        self.hierarchy.tick().inspect_err(|e| {
            error!(cycle, retired = self.retired(), "simulation aborted: {e}");
        })
    }

    /// Runs up to `cycles` cycles in `phase`.
    ///
    /// # Returns
    ///
    /// The number of cycles simulated.
    fn run_phase(&mut self, phase: Phase, cycles: u64) -> Result<u64, SimError> {
        self.hierarchy.begin_phase(phase);
        let mut elapsed = 0;
        while elapsed < cycles && !self.all_cores_done() {
            self.tick()?;
            elapsed += 1;
        }
        self.hierarchy.end_phase();
        info!(?phase, cycles = elapsed, retired = self.retired(), "phase finished");
        Ok(elapsed)
    }

    /// Runs warmup then the region of interest.
    ///
    /// # Returns
    ///
    /// Region-of-interest statistics.
    ///
    /// # Errors
    ///
    /// Returns the first deadlock or invariant violation raised by any component.
    pub fn run(&mut self) -> Result<SimStats, SimError> {
        let _ = self.run_phase(Phase::Warmup, self.warmup_cycles)?;
        let roi = self.run_phase(Phase::Roi, self.sim_cycles)?;
        Ok(self.collect(roi))
    }

    /// Gathers the reported statistics of every component.
    pub fn collect(&self, cycles: u64) -> SimStats {
        SimStats {
            cycles,
            cores: self.hierarchy.cores().map(|c| c.stats().report().clone()).collect(),
            caches: self.hierarchy.caches().map(|c| c.report()).collect(),
            dram: self.hierarchy.dram().map(|d| d.stats().report().clone()).unwrap_or_default(),
            walker: self
                .hierarchy
                .page_walker()
                .map(|w| w.stats().report().clone())
                .unwrap_or_default(),
        }
    }
}
