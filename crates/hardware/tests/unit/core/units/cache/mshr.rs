//! MSHR Unit Tests.
//!
//! Verifies block-granular lookup, capacity, and the completion ordering that
//! lets the engine drain fills from the head of the table.

use std::collections::HashSet;

use proptest::prelude::*;

use hiersim_core::common::{AccessType, CYCLE_NEVER, Packet};
use hiersim_core::core::units::cache::mshr::Mshr;

fn miss(address: u64) -> Packet {
    Packet::new(AccessType::Load, address)
}

#[test]
fn allocation_stamps_waiting_entry() {
    let mut mshr = Mshr::new(4, 6);
    assert!(mshr.allocate(miss(0x1040), 17).is_ok());

    let entry = mshr.find(0x107F).expect("same block");
    assert_eq!(entry.cycle_enqueued, 17);
    assert_eq!(entry.event_cycle, CYCLE_NEVER);
    assert!(entry.is_waiting());
    assert!(mshr.find(0x1080).is_none());
}

#[test]
fn full_table_rejects_and_returns_the_packet() {
    let mut mshr = Mshr::new(1, 6);
    assert!(mshr.allocate(miss(0x000), 0).is_ok());
    assert!(mshr.is_full());

    let rejected = mshr.allocate(miss(0x040), 0).unwrap_err();
    assert_eq!(rejected.address, 0x040);
    assert_eq!(mshr.len(), 1);
}

#[test]
fn completed_entries_drain_in_arrival_order_of_data() {
    let mut mshr = Mshr::new(4, 6);
    for addr in [0x000, 0x040, 0x080, 0x0C0] {
        assert!(mshr.allocate(miss(addr), 0).is_ok());
    }
    assert!(mshr.complete(0x0C0, 0xC, 0, 5));
    assert!(mshr.complete(0x040, 0x4, 3, 6));

    let head = mshr.pop_front().expect("completed head");
    assert_eq!((head.address, head.data, head.event_cycle), (0x0C0, 0xC, 5));
    let next = mshr.pop_front().expect("second completion");
    assert_eq!((next.address, next.pf_metadata), (0x040, 3));
    assert!(mshr.front().is_some_and(Packet::is_waiting));
}

#[test]
fn tlb_granularity_keys_on_pages() {
    let mut mshr = Mshr::new(2, 12);
    assert!(mshr.allocate(miss(0x7000_1000), 0).is_ok());
    assert!(mshr.find(0x7000_1FFF).is_some());
    assert!(mshr.allocate(miss(0x7000_1800), 0).is_err());
}

proptest! {
    #[test]
    fn never_exceeds_capacity_or_duplicates_blocks(
        capacity in 1usize..8,
        addrs in prop::collection::vec(0u64..0x1000, 1..64),
    ) {
        let mut mshr = Mshr::new(capacity, 6);
        for addr in addrs {
            let _ = mshr.allocate(miss(addr), 0);
            prop_assert!(mshr.len() <= capacity);
        }
        let blocks: HashSet<u64> = mshr.iter().map(|p| p.address >> 6).collect();
        prop_assert_eq!(blocks.len(), mshr.len());
    }
}
