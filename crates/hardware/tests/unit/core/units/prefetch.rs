//! Prefetcher Tests.
//!
//! Prefetchers are driven directly with a recording issuer standing in for
//! the owning cache.

use pretty_assertions::assert_eq;
use rstest::rstest;

use hiersim_core::common::AccessType;
use hiersim_core::core::units::prefetch::{
    AccessInfo, FillInfo, IpStridePrefetcher, NextLinePrefetcher, NoPrefetcher, PrefetchIssuer,
    PrefetchStatus, Prefetcher,
};

/// Issuer that records every candidate and accepts up to `capacity` of them.
#[derive(Debug, Default)]
struct RecordingIssuer {
    requested: Vec<(u64, bool, u32)>,
    capacity: Option<usize>,
}

impl RecordingIssuer {
    fn bounded(capacity: usize) -> Self {
        Self { capacity: Some(capacity), ..Self::default() }
    }

    fn addresses(&self) -> Vec<u64> {
        self.requested.iter().map(|&(addr, _, _)| addr).collect()
    }
}

impl PrefetchIssuer for RecordingIssuer {
    fn prefetch_line(&mut self, pf_addr: u64, fill_this_level: bool, metadata: u32) -> PrefetchStatus {
        self.requested.push((pf_addr, fill_this_level, metadata));
        match self.capacity {
            Some(cap) if self.requested.len() > cap => PrefetchStatus::QueueFull,
            _ => PrefetchStatus::Issued,
        }
    }
}

fn access(ip: u64, addr: u64) -> AccessInfo {
    AccessInfo { addr, ip, cpu: 0, hit: false, access_type: AccessType::Load, metadata_in: 0 }
}

// ══════════════════════════════════════════════════════════
// 1. Next line
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::degree_one(1, vec![0x1040])]
#[case::degree_three(3, vec![0x1040, 0x1080, 0x10C0])]
fn next_line_requests_following_blocks(#[case] degree: usize, #[case] expected: Vec<u64>) {
    let mut pf = NextLinePrefetcher::new(64, degree);
    let mut issuer = RecordingIssuer::default();
    let _ = pf.on_access(&access(0x400, 0x1010), &mut issuer);
    assert_eq!(issuer.addresses(), expected);
    assert!(issuer.requested.iter().all(|&(_, fill, _)| fill));
}

#[test]
fn next_line_passes_metadata_through() {
    let mut pf = NextLinePrefetcher::new(64, 1);
    let mut issuer = RecordingIssuer::default();
    let info = AccessInfo { metadata_in: 7, ..access(0x400, 0x2000) };
    assert_eq!(pf.on_access(&info, &mut issuer), 7);
    assert_eq!(issuer.requested, vec![(0x2040, true, 7)]);
}

#[test]
fn next_line_follows_the_owner_block_size() {
    let mut pf = NextLinePrefetcher::new(64, 1);
    pf.initialize(12);
    let mut issuer = RecordingIssuer::default();
    let _ = pf.on_access(&access(0x400, 0x7000_1234), &mut issuer);
    assert_eq!(issuer.addresses(), vec![0x7000_2000]);
}

#[test]
fn next_line_counts_dropped_candidates() {
    let mut pf = NextLinePrefetcher::new(64, 2);
    let mut issuer = RecordingIssuer::bounded(1);
    let _ = pf.on_access(&access(0x400, 0x0), &mut issuer);
    assert_eq!(pf.final_stats(), vec![("next_line_issued", 1), ("next_line_dropped", 1)]);
}

#[test]
fn next_line_stops_at_the_top_of_the_address_space() {
    let mut pf = NextLinePrefetcher::new(64, 4);
    let mut issuer = RecordingIssuer::default();
    let _ = pf.on_access(&access(0x400, u64::MAX - 0x80), &mut issuer);
    assert_eq!(issuer.addresses(), vec![u64::MAX - 0x7F]);
    assert_eq!(pf.final_stats(), vec![("next_line_issued", 1), ("next_line_dropped", 0)]);
}

// ══════════════════════════════════════════════════════════
// 2. IP stride
// ══════════════════════════════════════════════════════════

/// Feeds `count` accesses from one instruction, `stride` bytes apart.
fn train(pf: &mut IpStridePrefetcher, issuer: &mut RecordingIssuer, ip: u64, base: u64, stride: u64, count: u64) {
    for i in 0..count {
        let _ = pf.on_access(&access(ip, base + i * stride), issuer);
    }
}

#[test]
fn stride_waits_for_confidence() {
    let mut pf = IpStridePrefetcher::new(64, 1);
    let mut issuer = RecordingIssuer::default();

    // First access allocates, second learns the stride, third confirms it once.
    train(&mut pf, &mut issuer, 0x400, 0x10_0000, 0x80, 3);
    assert!(issuer.requested.is_empty());

    let _ = pf.on_access(&access(0x400, 0x10_0180), &mut issuer);
    assert_eq!(issuer.addresses(), vec![0x10_0200]);
}

#[test]
fn stride_prefetches_degree_steps_ahead() {
    let mut pf = IpStridePrefetcher::new(64, 3);
    let mut issuer = RecordingIssuer::default();
    train(&mut pf, &mut issuer, 0x400, 0x20_0000, 0x40, 4);
    assert_eq!(issuer.addresses(), vec![0x20_0100, 0x20_0140, 0x20_0180]);
}

#[test]
fn stride_never_crosses_the_page() {
    let mut pf = IpStridePrefetcher::new(64, 4);
    let mut issuer = RecordingIssuer::default();
    train(&mut pf, &mut issuer, 0x400, 0x30_0E00, 0x80, 4);
    // The last access is 0x30_0F80; only 0x30_1000 and beyond are left, all on the next page.
    assert!(issuer.requested.is_empty(), "{:?}", issuer.addresses());
}

#[test]
fn stride_handles_descending_streams() {
    let mut pf = IpStridePrefetcher::new(64, 1);
    let mut issuer = RecordingIssuer::default();
    for addr in [0x40_0800, 0x40_0780, 0x40_0700, 0x40_0680] {
        let _ = pf.on_access(&access(0x400, addr), &mut issuer);
    }
    assert_eq!(issuer.addresses(), vec![0x40_0600]);
}

#[test]
fn stride_tracks_instructions_separately() {
    let mut pf = IpStridePrefetcher::new(64, 1);
    let mut issuer = RecordingIssuer::default();
    for i in 0..4 {
        let _ = pf.on_access(&access(0x400, 0x50_0000 + i * 0x40), &mut issuer);
        let _ = pf.on_access(&access(0x404, 0x60_0000 + i * 0x100), &mut issuer);
    }
    assert_eq!(issuer.addresses(), vec![0x50_0100, 0x60_0400]);
}

#[test]
fn stride_counts_dropped_candidates() {
    let mut pf = IpStridePrefetcher::new(64, 2);
    let mut issuer = RecordingIssuer::bounded(1);
    train(&mut pf, &mut issuer, 0x400, 0x70_0000, 0x40, 4);
    assert_eq!(pf.final_stats(), vec![("ip_stride_issued", 1), ("ip_stride_dropped", 1)]);
}

// ══════════════════════════════════════════════════════════
// 3. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn no_prefetcher_is_silent() {
    let mut pf = NoPrefetcher;
    let mut issuer = RecordingIssuer::default();
    let info = AccessInfo { metadata_in: 3, ..access(0x400, 0x1000) };
    assert_eq!(pf.on_access(&info, &mut issuer), 3);

    let fill = FillInfo { addr: 0x1000, set: 0, way: 0, prefetch: false, evicted_addr: 0, metadata_in: 9 };
    assert_eq!(pf.on_fill(&fill, &mut issuer), 9);
    pf.on_cycle(&mut issuer);
    assert!(issuer.requested.is_empty());
    assert_eq!(pf.name(), "none");
}
