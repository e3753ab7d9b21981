//! Pipeline-side link to a first-level cache.
//!
//! A [`CacheBus`] turns a core's memory operations into packets, offers them to
//! its cache, and buffers the completions that come back until the core drains
//! them.

use std::collections::VecDeque;

use tracing::trace;

use crate::common::{AccessType, Packet, ReturnAddr, SimError};
use crate::soc::interconnect::{Fabric, NodeId};

/// Link between a core and one first-level cache.
#[derive(Clone, Debug)]
pub struct CacheBus {
    cpu: usize,
    owner: NodeId,
    lower: NodeId,
    processed: VecDeque<Packet>,
}

impl CacheBus {
    /// Creates a bus from core `owner` (cpu index `cpu`) to cache `lower`.
    pub fn new(cpu: usize, owner: NodeId, lower: NodeId) -> Self {
        Self { cpu, owner, lower, processed: VecDeque::new() }
    }

    /// The cache this bus feeds.
    pub const fn lower(&self) -> NodeId {
        self.lower
    }

    /// Offers a read to the cache's read queue.
    ///
    /// The packet is issued as a `Load` on its virtual address and returns to
    /// the owning core.
    ///
    /// # Returns
    ///
    /// `false` if the cache rejected the request; the caller retries later.
    ///
    /// # Errors
    ///
    /// Returns a fabric error if the cache link is miswired.
    pub fn issue_read(&mut self, fabric: &mut Fabric<'_>, packet: Packet) -> Result<bool, SimError> {
        let packet = Packet {
            address: packet.v_address,
            access_type: AccessType::Load,
            cpu: self.cpu,
            ..packet
        }
        .with_return(ReturnAddr::data(self.owner));
        let accepted = fabric.node_mut(self.lower)?.add_rq(&packet);
        trace!(cpu = self.cpu, accepted, "issue read {}", packet);
        Ok(accepted)
    }

    /// Offers a write to the cache's write queue. Writes produce no completion.
    ///
    /// # Returns
    ///
    /// `false` if the cache rejected the request; the caller retries later.
    ///
    /// # Errors
    ///
    /// Returns a fabric error if the cache link is miswired.
    pub fn issue_write(&mut self, fabric: &mut Fabric<'_>, packet: Packet) -> Result<bool, SimError> {
        let packet = Packet {
            address: packet.v_address,
            access_type: AccessType::Write,
            cpu: self.cpu,
            to_return: Vec::new(),
            ..packet
        };
        let accepted = fabric.node_mut(self.lower)?.add_wq(&packet);
        trace!(cpu = self.cpu, accepted, "issue write {}", packet);
        Ok(accepted)
    }

    /// Buffers a completion delivered by the cache.
    pub fn return_data(&mut self, packet: &Packet) {
        self.processed.push_back(packet.clone());
    }

    /// Removes every buffered completion, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Packet> + '_ {
        self.processed.drain(..)
    }

    /// Completions waiting to be drained.
    pub fn pending(&self) -> usize {
        self.processed.len()
    }
}
