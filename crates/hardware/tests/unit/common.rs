//! Shared Type Tests.
//!
//! Packets, address helpers, access types and error rendering.

use pretty_assertions::assert_eq;

use hiersim_core::common::addr::{block_align, block_number, splice_bits};
use hiersim_core::common::{AccessType, CYCLE_NEVER, Packet, PhysAddr, ReturnAddr, SimError, VirtAddr};
use hiersim_core::soc::interconnect::NodeId;

// ══════════════════════════════════════════════════════════
// 1. Packets
// ══════════════════════════════════════════════════════════

#[test]
fn new_packet_defaults() {
    let packet = Packet::new(AccessType::Prefetch, 0x1234);
    assert_eq!((packet.address, packet.v_address), (0x1234, 0x1234));
    assert_eq!(packet.instr_id, 0);
    assert!(packet.fill_this_level);
    assert!(!packet.prefetch_from_this);
    assert!(packet.dependents.is_empty() && packet.to_return.is_empty());
}

#[test]
fn merging_keeps_first_arrival_order() {
    let upper = NodeId(4);
    let mut queued = Packet::new(AccessType::Load, 0x80).with_instr(3, 0x400).with_return(ReturnAddr::data(upper));
    let late = Packet::new(AccessType::Load, 0x88).with_instr(1, 0x404).with_return(ReturnAddr::data(upper));
    let prefetch = Packet::new(AccessType::Prefetch, 0x90).with_return(ReturnAddr::translation(NodeId(2)));

    queued.merge_dependents(&late);
    queued.merge_dependents(&prefetch);

    assert_eq!(queued.dependents, vec![3, 1]);
    assert_eq!(queued.to_return, vec![ReturnAddr::data(upper), ReturnAddr::translation(NodeId(2))]);
    assert_eq!(queued.address, 0x80, "merging never changes identity");
}

#[test]
fn waiting_packets_render_as_waiting() {
    let mut packet = Packet::new(AccessType::Write, 0x40).with_instr(9, 0x400);
    packet.event_cycle = CYCLE_NEVER;
    assert!(packet.is_waiting());
    let text = packet.to_string();
    assert!(text.contains("type: WRITE"), "{text}");
    assert!(text.contains("event: waiting"), "{text}");

    packet.event_cycle = 12;
    assert!(packet.to_string().contains("event: 12"));
}

#[test]
fn block_numbers_follow_granularity() {
    let packet = Packet { address: 0x1_2345, v_address: 0x7_2345, ..Packet::default() };
    assert_eq!(packet.block(6), 0x1_2345 >> 6);
    assert_eq!(packet.v_block(12), 0x72);
}

// ══════════════════════════════════════════════════════════
// 2. Addresses
// ══════════════════════════════════════════════════════════

#[test]
fn address_helpers() {
    assert_eq!(block_number(0x1FFF, 12), 1);
    assert_eq!(block_number(u64::MAX, 64), 0);
    assert_eq!(block_align(0x1FFF, 12), 0x1000);
    assert_eq!(splice_bits(0x5000, 0x7000_0ABC, 12), 0x5ABC);

    let vaddr = VirtAddr::new(0x7000_1ABC);
    assert_eq!((vaddr.page_number(), vaddr.page_offset()), (0x7_0001, 0xABC));
    assert_eq!(PhysAddr::from_frame(3, 0x1ABC).val(), 0x3ABC);
}

// ══════════════════════════════════════════════════════════
// 3. Access types and errors
// ══════════════════════════════════════════════════════════

#[test]
fn access_type_masks_and_labels() {
    let mask = AccessType::mask_of(&[AccessType::Load, AccessType::Write]);
    assert_eq!(mask & AccessType::Load.bit(), AccessType::Load.bit());
    assert_eq!(mask & AccessType::Prefetch.bit(), 0);
    let labels: Vec<&str> = AccessType::ALL.iter().map(|t| t.label()).collect();
    assert_eq!(labels, vec!["LOAD", "RFO", "PREFETCH", "WRITE", "TRANSLATION"]);
}

#[test]
fn errors_render_their_context() {
    let deadlock = SimError::Deadlock { component: "cpu0_L1D".into(), cycle: 42, report: "RQ empty".into() };
    assert_eq!(deadlock.to_string(), "deadlock detected in cpu0_L1D at cycle 42\nRQ empty");

    let violation = SimError::invariant("LLC", "victim way 9 out of range");
    assert_eq!(violation.to_string(), "invariant violation in LLC: victim way 9 out of range");

    assert_eq!(
        SimError::SelfAccess(NodeId(5)).to_string(),
        "component node#5 addressed itself through the fabric"
    );
    assert_eq!(SimError::InvalidConfig("bad".into()).to_string(), "invalid configuration: bad");
}
