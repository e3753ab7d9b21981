//! Hardware Prefetcher implementations.
//!
//! This module contains the interface and implementations for the prefetchers
//! that a cache can host. A prefetcher observes the cache's accesses and fills
//! and asks for extra lines through a [`PrefetchIssuer`], which admits them into
//! the owning cache's prefetch queue under the normal admission rules.
//!
//! Any history a prefetcher learns lives inside the prefetcher instance.

/// Instruction-pointer indexed stride prefetcher.
pub mod stride;

/// Next-line prefetcher (prefetches sequential cache lines).
pub mod next_line;

pub use self::next_line::NextLinePrefetcher;
pub use self::stride::IpStridePrefetcher;

use crate::common::AccessType;

/// Outcome of a prefetch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefetchStatus {
    /// The prefetch entered the prefetch queue (new entry or merged).
    Issued,
    /// The prefetch queue was full; the candidate was dropped.
    QueueFull,
}

/// Injects prefetch candidates into the owning cache.
pub trait PrefetchIssuer {
    /// Requests the line at `pf_addr`.
    ///
    /// # Arguments
    ///
    /// * `pf_addr` - Address to prefetch.
    /// * `fill_this_level` - Install the line in the owning cache rather than only the level below.
    /// * `metadata` - Opaque payload returned to the prefetcher when the line fills.
    fn prefetch_line(&mut self, pf_addr: u64, fill_this_level: bool, metadata: u32) -> PrefetchStatus;
}

/// An access observed by the owning cache.
#[derive(Clone, Copy, Debug)]
pub struct AccessInfo {
    /// Accessed address (virtual when the cache prefetches virtually).
    pub addr: u64,
    /// Instruction pointer of the request.
    pub ip: u64,
    /// Requesting cpu.
    pub cpu: usize,
    /// The access hit.
    pub hit: bool,
    /// Type of the access.
    pub access_type: AccessType,
    /// Metadata carried by the request.
    pub metadata_in: u32,
}

/// A fill observed by the owning cache.
#[derive(Clone, Copy, Debug)]
pub struct FillInfo {
    /// Block-aligned address of the installed line.
    pub addr: u64,
    /// Set filled.
    pub set: usize,
    /// Way filled.
    pub way: usize,
    /// The fill answers a prefetch.
    pub prefetch: bool,
    /// Block-aligned address of the evicted line (0 when nothing was evicted).
    pub evicted_addr: u64,
    /// Metadata carried by the fill.
    pub metadata_in: u32,
}

/// Trait for cache prefetcher implementations.
///
/// Prefetchers observe memory access patterns and generate prefetch
/// requests to reduce cache miss penalties.
pub trait Prefetcher: Send + Sync {
    /// Short prefetcher name used in reports.
    fn name(&self) -> &'static str;

    /// Prepares the prefetcher for blocks of `2^block_bits` bytes.
    fn initialize(&mut self, _block_bits: u32) {}

    /// Observes an access and may issue prefetches.
    ///
    /// # Returns
    ///
    /// The metadata stored with the line or propagated with the miss.
    fn on_access(&mut self, access: &AccessInfo, issuer: &mut dyn PrefetchIssuer) -> u32;

    /// Observes a fill and may issue prefetches.
    ///
    /// # Returns
    ///
    /// The metadata stored with the installed line.
    fn on_fill(&mut self, fill: &FillInfo, _issuer: &mut dyn PrefetchIssuer) -> u32 {
        fill.metadata_in
    }

    /// Called once per cycle after the cache has drained its queues.
    fn on_cycle(&mut self, _issuer: &mut dyn PrefetchIssuer) {}

    /// Prefetcher-specific counters reported at the end of the run.
    fn final_stats(&self) -> Vec<(&'static str, u64)> {
        Vec::new()
    }
}

/// A prefetcher that never prefetches.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPrefetcher;

impl Prefetcher for NoPrefetcher {
    fn name(&self) -> &'static str {
        "none"
    }

    fn on_access(&mut self, access: &AccessInfo, _issuer: &mut dyn PrefetchIssuer) -> u32 {
        access.metadata_in
    }
}
