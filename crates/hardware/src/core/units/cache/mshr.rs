//! Miss status holding registers.
//!
//! The MSHR tracks misses that have been forwarded to the lower level. It is
//! keyed by block number: a second miss to a block already in flight merges
//! into the existing entry instead of producing a second downstream request.
//!
//! Entries are kept in completion order. An entry whose data has not arrived
//! carries [`CYCLE_NEVER`] as its event cycle; when data arrives the entry is
//! moved ahead of every entry still waiting, so the head of the table is always
//! the oldest completed miss and fills can be drained from the front.

use std::collections::VecDeque;

use crate::common::addr::block_number;
use crate::common::{CYCLE_NEVER, Cycle, Packet};

/// Bounded table of in-flight misses.
#[derive(Clone, Debug)]
pub struct Mshr {
    entries: VecDeque<Packet>,
    capacity: usize,
    offset_bits: u32,
}

impl Mshr {
    /// Creates an empty table of `capacity` entries keyed at `2^offset_bits` granularity.
    pub fn new(capacity: usize, offset_bits: u32) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity, offset_bits }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No misses in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured number of entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// No room for another distinct block.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    fn position(&self, address: u64) -> Option<usize> {
        let block = block_number(address, self.offset_bits);
        self.entries.iter().position(|e| e.block(self.offset_bits) == block)
    }

    /// Entry tracking `address`'s block.
    pub fn find(&self, address: u64) -> Option<&Packet> {
        self.position(address).map(|i| &self.entries[i])
    }

    /// Mutable entry tracking `address`'s block.
    pub fn find_mut(&mut self, address: u64) -> Option<&mut Packet> {
        let i = self.position(address)?;
        self.entries.get_mut(i)
    }

    /// Adds a new miss.
    ///
    /// # Returns
    ///
    /// The packet back if the table is full or the block is already tracked.
    pub fn allocate(&mut self, mut packet: Packet, now: Cycle) -> Result<(), Packet> {
        if self.is_full() || self.position(packet.address).is_some() {
            return Err(packet);
        }
        packet.cycle_enqueued = now;
        packet.event_cycle = CYCLE_NEVER;
        self.entries.push_back(packet);
        Ok(())
    }

    /// Records the arrival of downstream data for `address`'s block.
    ///
    /// The entry takes the returned payload and metadata, becomes ready at
    /// `ready_at`, and is moved to just before the first entry still waiting.
    ///
    /// # Returns
    ///
    /// `false` if no entry tracks the block.
    pub fn complete(&mut self, address: u64, data: u64, pf_metadata: u32, ready_at: Cycle) -> bool {
        let Some(index) = self.position(address) else {
            return false;
        };
        let Some(mut entry) = self.entries.remove(index) else {
            return false;
        };
        entry.data = data;
        entry.pf_metadata = pf_metadata;
        entry.event_cycle = ready_at;
        let first_waiting = self.entries.iter().position(Packet::is_waiting).unwrap_or(self.entries.len());
        self.entries.insert(first_waiting, entry);
        true
    }

    /// Oldest entry.
    pub fn front(&self) -> Option<&Packet> {
        self.entries.front()
    }

    /// Removes the oldest entry.
    pub fn pop_front(&mut self) -> Option<Packet> {
        self.entries.pop_front()
    }

    /// Entries in completion order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.entries.iter()
    }
}
