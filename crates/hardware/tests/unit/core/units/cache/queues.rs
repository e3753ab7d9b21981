//! Request Queue Tests.
//!
//! Verifies admission, merging, rejection and the counters kept for each of
//! the four queues in front of a cache.

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use hiersim_core::common::{AccessType, Packet, ReturnAddr};
use hiersim_core::config::CacheConfig;
use hiersim_core::core::units::cache::queues::QueueSet;
use hiersim_core::soc::interconnect::NodeId;
use hiersim_core::soc::traits::{Phase, QueueKind};

fn queues(rq: usize, wq: usize, pq: usize) -> QueueSet {
    let config = CacheConfig { rq_size: rq, wq_size: wq, pq_size: pq, ptwq_size: 2, ..CacheConfig::default() };
    let mut set = QueueSet::new(&config, NodeId(0), None);
    set.begin_phase(Phase::Roi);
    set
}

fn read(instr_id: u64, address: u64) -> Packet {
    Packet::new(AccessType::Load, address)
        .with_instr(instr_id, 0x400)
        .with_return(ReturnAddr::data(NodeId(9)))
}

// ══════════════════════════════════════════════════════════
// 1. Read queue
// ══════════════════════════════════════════════════════════

#[test]
fn full_read_queue_rejects_new_blocks_but_merges_known_ones() {
    let mut q = queues(2, 2, 2);
    assert!(q.add_rq(&read(1, 0x000)));
    assert!(q.add_rq(&read(2, 0x040)));
    assert!(!q.add_rq(&read(3, 0x080)));
    assert!(q.add_rq(&read(4, 0x048)));

    assert_eq!(q.len(QueueKind::Read), 2);
    let merged: Vec<_> = q.iter(QueueKind::Read).map(|p| p.dependents.clone()).collect();
    assert_eq!(merged, vec![vec![1], vec![2, 4]]);

    let counters = q.stats().current().rq;
    assert_eq!((counters.access, counters.merged, counters.full, counters.to_cache), (4, 1, 1, 2));
}

#[test]
fn pop_returns_entries_in_arrival_order() {
    let mut q = queues(4, 2, 2);
    for (id, addr) in [(1, 0x100), (2, 0x200), (3, 0x300)] {
        assert!(q.add_rq(&read(id, addr)));
    }
    let order: Vec<u64> = std::iter::from_fn(|| q.pop(QueueKind::Read)).map(|p| p.address).collect();
    assert_eq!(order, vec![0x100, 0x200, 0x300]);
    assert!(q.is_empty());
}

// ══════════════════════════════════════════════════════════
// 2. Write queue
// ══════════════════════════════════════════════════════════

#[test]
fn matching_write_overwrites_data_in_place() {
    let mut q = queues(2, 2, 2);
    let first = Packet { data: 1, ..Packet::new(AccessType::Write, 0x80) };
    let second = Packet { data: 2, ..Packet::new(AccessType::Write, 0x88) };
    assert!(q.add_wq(&first));
    assert!(q.add_wq(&second));

    assert_eq!(q.len(QueueKind::Write), 1);
    assert_eq!(q.iter(QueueKind::Write).next().map(|p| p.data), Some(2));
    let wq = q.stats().current().wq;
    assert_eq!((wq.access, wq.merged, wq.forward), (2, 1, 0));
}

#[test]
fn full_address_matching_keeps_sub_block_writes_apart() {
    let config = CacheConfig { wq_size: 4, match_offset_bits: true, ..CacheConfig::default() };
    let mut q = QueueSet::new(&config, NodeId(0), None);
    assert!(q.add_wq(&Packet::new(AccessType::Write, 0x80)));
    assert!(q.add_wq(&Packet::new(AccessType::Write, 0x88)));
    assert!(q.add_wq(&Packet::new(AccessType::Write, 0x88)));
    assert_eq!(q.len(QueueKind::Write), 2);
}

// ══════════════════════════════════════════════════════════
// 3. Prefetch and translation queues
// ══════════════════════════════════════════════════════════

#[test]
fn prefetch_merges_with_queued_prefetch() {
    let mut q = queues(2, 2, 1);
    assert!(q.add_pq(&Packet::new(AccessType::Prefetch, 0x1000)));
    assert!(q.add_pq(&Packet::new(AccessType::Prefetch, 0x1010)));
    assert!(!q.add_pq(&Packet::new(AccessType::Prefetch, 0x2000)));

    let pq = q.stats().current().pq;
    assert_eq!((pq.merged, pq.full), (1, 1));
}

/// A translating set whose prefetcher works on physical addresses.
fn translating_queues() -> QueueSet {
    let config = CacheConfig { rq_size: 4, pq_size: 4, virtual_prefetch: false, ..CacheConfig::default() };
    let mut set = QueueSet::new(&config, NodeId(0), Some(NodeId(1)));
    set.begin_phase(Phase::Roi);
    set
}

fn physical_prefetch(address: u64) -> Packet {
    Packet { v_address: 0, ..Packet::new(AccessType::Prefetch, address) }
}

#[test]
fn physical_prefetch_is_absorbed_by_translated_read_of_same_block() {
    let mut q = translating_queues();
    let mut load = read(1, 0x7000);
    load.address = 0;
    assert!(q.add_rq(&load));
    let page = Packet { data: 0x1000, ..Packet::new(AccessType::Load, 0x7000) };
    q.return_translation(&page);
    assert_eq!(q.iter(QueueKind::Read).next().map(|p| p.address), Some(0x1000));

    assert!(q.add_pq(&physical_prefetch(0x1008)));
    assert_eq!(q.len(QueueKind::Prefetch), 0);
    assert_eq!(q.stats().current().pq.merged, 1);
}

#[test]
fn physical_prefetch_ignores_virtual_block_of_queued_reads() {
    let mut q = translating_queues();
    let mut load = read(1, 0x0000_0010);
    load.address = 0;
    assert!(q.add_rq(&load));

    // Same block as the read's virtual address, but that read is untranslated.
    assert!(q.add_pq(&physical_prefetch(0x0000_0040)));
    assert!(q.add_pq(&physical_prefetch(0x0000_0000)));
    assert_eq!(q.len(QueueKind::Prefetch), 2);
    assert_eq!(q.iter(QueueKind::Read).next().map(|p| p.dependents.clone()), Some(vec![1]));
}

#[test]
fn zero_sized_prefetch_queue_admits_nothing() {
    let mut q = queues(2, 2, 0);
    assert!(!q.add_pq(&Packet::new(AccessType::Prefetch, 0x1000)));
    assert_eq!(q.capacity(QueueKind::Prefetch), 0);
}

#[test]
fn ptwq_is_bounded() {
    let mut q = queues(2, 2, 2);
    assert!(q.add_ptwq(&Packet::new(AccessType::Translation, 0x1000)));
    assert!(q.add_ptwq(&Packet::new(AccessType::Translation, 0x2000)));
    assert!(!q.add_ptwq(&Packet::new(AccessType::Translation, 0x3000)));
    assert_eq!(q.len(QueueKind::Translation), 2);
}

#[test]
fn head_stall_names_the_oldest_stuck_queue() {
    let mut q = queues(2, 2, 2);
    q.set_cycle(5);
    assert!(q.add_wq(&Packet::new(AccessType::Write, 0x40)));
    q.set_cycle(104);
    assert!(q.head_stall(100).is_none());
    q.set_cycle(105);
    assert_eq!(q.head_stall(100).map(|(kind, _)| kind), Some(QueueKind::Write));
    let dump = q.describe();
    assert!(dump.contains("WQ (1/2)"));
    assert!(dump.contains("RQ empty\n"));
}

// ══════════════════════════════════════════════════════════
// 4. Properties
// ══════════════════════════════════════════════════════════

proptest! {
    /// Occupancy never passes capacity, and a rejection only happens when the
    /// queue is full and nothing matched.
    #[test]
    fn read_queue_respects_capacity(
        capacity in 1usize..8,
        addrs in prop::collection::vec(0u64..0x800, 1..64),
    ) {
        let mut q = queues(capacity, 2, 2);
        for (i, addr) in addrs.into_iter().enumerate() {
            let before = q.len(QueueKind::Read);
            let known = q.iter(QueueKind::Read).any(|p| p.address >> 6 == addr >> 6);
            let accepted = q.add_rq(&read(i as u64 + 1, addr));
            prop_assert!(q.len(QueueKind::Read) <= capacity);
            prop_assert_eq!(accepted, known || before < capacity);
        }
    }

    /// Every accepted request is represented by exactly one dependent entry.
    #[test]
    fn merging_loses_no_requester(addrs in prop::collection::vec(0u64..0x400, 1..48)) {
        let mut q = queues(64, 2, 2);
        let mut accepted = HashSet::new();
        for (i, addr) in addrs.into_iter().enumerate() {
            let id = i as u64 + 1;
            if q.add_rq(&read(id, addr)) {
                let _ = accepted.insert(id);
            }
        }
        let mut seen = Vec::new();
        for packet in q.iter(QueueKind::Read) {
            seen.extend(packet.dependents.iter().copied());
        }
        let unique: HashSet<u64> = seen.iter().copied().collect();
        prop_assert_eq!(unique.len(), seen.len());
        prop_assert_eq!(unique, accepted);
    }
}
