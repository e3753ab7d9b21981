//! Request packets.
//!
//! A [`Packet`] is the unit of work flowing through the hierarchy. It carries
//! the request identity (addresses, instruction id, requester cpu, type), its
//! timing stamps, the opaque prefetch metadata, the instruction ids that depend
//! on it, and the ordered list of components the completed data goes back to.

use std::fmt;

use crate::common::addr::block_number;
use crate::common::constants::{CYCLE_NEVER, Cycle, NO_INSTR};
use crate::common::data::AccessType;
use crate::soc::interconnect::NodeId;

/// Which entry point of a component a completion is delivered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnPort {
    /// Data response for a read (fills an MSHR entry or completes a core request).
    Data,
    /// Translation response for a translating queue set.
    Translation,
}

/// A back-reference to the component that receives a completed packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReturnAddr {
    /// Receiving component.
    pub node: NodeId,
    /// Entry point on that component.
    pub port: ReturnPort,
}

impl ReturnAddr {
    /// Data response to `node`.
    pub const fn data(node: NodeId) -> Self {
        Self { node, port: ReturnPort::Data }
    }

    /// Translation response to `node`.
    pub const fn translation(node: NodeId) -> Self {
        Self { node, port: ReturnPort::Translation }
    }
}

/// One in-flight memory transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Physical address (equal to `v_address` until translated).
    pub address: u64,
    /// Virtual address.
    pub v_address: u64,
    /// Payload. Caches do not model real values; TLB levels carry page frames here.
    pub data: u64,
    /// Id of the instruction that produced the request.
    pub instr_id: u64,
    /// Instruction pointer of the producing instruction.
    pub ip: u64,
    /// Requesting cpu.
    pub cpu: usize,
    /// Request class.
    pub access_type: AccessType,
    /// Request originates from the instruction side (fetch or ITLB).
    pub is_instr: bool,
    /// Request belongs to a page-table walk or a TLB lookup on the translation path.
    pub is_pte: bool,
    /// Install the line in the cache that owns the request.
    pub fill_this_level: bool,
    /// Generated by the prefetcher of the cache currently holding the packet.
    pub prefetch_from_this: bool,
    /// Opaque prefetcher payload returned to the prefetcher on fill.
    pub pf_metadata: u32,
    /// Cycle the packet entered its current structure.
    pub cycle_enqueued: Cycle,
    /// Cycle at which the packet becomes serviceable.
    pub event_cycle: Cycle,
    /// Instruction ids to notify on completion, in arrival order.
    pub dependents: Vec<u64>,
    /// Components that receive the completed packet, in arrival order.
    pub to_return: Vec<ReturnAddr>,
}

impl Default for Packet {
    fn default() -> Self {
        Self {
            address: 0,
            v_address: 0,
            data: 0,
            instr_id: NO_INSTR,
            ip: 0,
            cpu: 0,
            access_type: AccessType::Load,
            is_instr: false,
            is_pte: false,
            fill_this_level: true,
            prefetch_from_this: false,
            pf_metadata: 0,
            cycle_enqueued: 0,
            event_cycle: 0,
            dependents: Vec::new(),
            to_return: Vec::new(),
        }
    }
}

impl Packet {
    /// Creates a packet of `access_type` for `address`, with matching virtual address.
    pub fn new(access_type: AccessType, address: u64) -> Self {
        Self { address, v_address: address, access_type, ..Self::default() }
    }

    /// Sets the producing instruction and records it as the first dependent.
    #[must_use]
    pub fn with_instr(mut self, instr_id: u64, ip: u64) -> Self {
        self.instr_id = instr_id;
        self.ip = ip;
        push_unique(&mut self.dependents, instr_id);
        self
    }

    /// Appends a completion target.
    #[must_use]
    pub fn with_return(mut self, target: ReturnAddr) -> Self {
        push_unique(&mut self.to_return, target);
        self
    }

    /// Block number of the physical address for a block of `2^offset_bits` bytes.
    #[inline(always)]
    pub const fn block(&self, offset_bits: u32) -> u64 {
        block_number(self.address, offset_bits)
    }

    /// Block number of the virtual address for a block of `2^offset_bits` bytes.
    #[inline(always)]
    pub const fn v_block(&self, offset_bits: u32) -> u64 {
        block_number(self.v_address, offset_bits)
    }

    /// The packet is waiting on an external completion.
    pub const fn is_waiting(&self) -> bool {
        self.event_cycle == CYCLE_NEVER
    }

    /// Folds `other`'s dependents and return targets into this packet.
    ///
    /// Order is preserved and nothing already present is duplicated, so a
    /// single completion of the merged packet reaches every requester once.
    pub fn merge_dependents(&mut self, other: &Self) {
        for &id in &other.dependents {
            push_unique(&mut self.dependents, id);
        }
        for &target in &other.to_return {
            push_unique(&mut self.to_return, target);
        }
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instr_id: {} address: {:#x} v_address: {:#x} type: {} enqueued: {} event: ",
            self.instr_id,
            self.address,
            self.v_address,
            self.access_type.label(),
            self.cycle_enqueued,
        )?;
        if self.is_waiting() {
            write!(f, "waiting")?;
        } else {
            write!(f, "{}", self.event_cycle)?;
        }
        write!(f, " dependents: {:?}", self.dependents)
    }
}
