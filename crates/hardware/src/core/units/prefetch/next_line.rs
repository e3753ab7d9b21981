//! Next-Line Prefetcher.
//!
//! A simple spatial prefetcher that fetches the next sequential cache line(s)
//! whenever a cache access occurs. This exploits the spatial locality common
//! in instruction streams and sequential data arrays.

use super::{AccessInfo, PrefetchIssuer, PrefetchStatus, Prefetcher};

/// Next-Line Prefetcher state.
#[derive(Clone, Debug)]
pub struct NextLinePrefetcher {
    /// Size of a cache line in bytes.
    line_bytes: u64,
    /// Number of subsequent lines to prefetch (prefetch degree).
    degree: usize,
    issued: u64,
    dropped: u64,
}

impl NextLinePrefetcher {
    /// Creates a new Next-Line prefetcher.
    ///
    /// # Arguments
    ///
    /// * `line_bytes` - The size of a cache line in bytes.
    /// * `degree` - The number of lines to prefetch ahead.
    pub fn new(line_bytes: u64, degree: usize) -> Self {
        Self { line_bytes: line_bytes.max(1), degree: degree.max(1), issued: 0, dropped: 0 }
    }
}

impl Prefetcher for NextLinePrefetcher {
    fn name(&self) -> &'static str {
        "next_line"
    }

    fn initialize(&mut self, block_bits: u32) {
        self.line_bytes = 1 << block_bits;
    }

    /// Requests the `degree` lines following the accessed one.
    ///
    /// Stops at the top of the address space.
    fn on_access(&mut self, access: &AccessInfo, issuer: &mut dyn PrefetchIssuer) -> u32 {
        let base = access.addr & !(self.line_bytes - 1);
        for k in 1..=self.degree as u64 {
            let Some(pf_addr) = self.line_bytes.checked_mul(k).and_then(|off| base.checked_add(off)) else {
                break;
            };
            match issuer.prefetch_line(pf_addr, true, access.metadata_in) {
                PrefetchStatus::Issued => self.issued += 1,
                PrefetchStatus::QueueFull => self.dropped += 1,
            }
        }
        access.metadata_in
    }

    fn final_stats(&self) -> Vec<(&'static str, u64)> {
        vec![("next_line_issued", self.issued), ("next_line_dropped", self.dropped)]
    }
}
