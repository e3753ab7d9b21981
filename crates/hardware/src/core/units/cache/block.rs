//! Set-associative block storage.
//!
//! The block array holds `sets x ways` slots in one flat vector, set-major.
//! Address-to-set mapping drops the block offset and takes the remaining bits
//! modulo the set count; tags are compared as whole block numbers, so two
//! addresses hit the same slot only when they fall in the same block.

use crate::common::addr::block_number;

/// One cache line slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    /// Slot holds a line.
    pub valid: bool,
    /// Line was brought in by this cache's prefetcher and not yet used by a demand access.
    pub prefetch: bool,
    /// Line differs from the lower level and must be written back on eviction.
    pub dirty: bool,
    /// Physical address of the line.
    pub address: u64,
    /// Virtual address of the line.
    pub v_address: u64,
    /// Payload (page frame in TLB levels).
    pub data: u64,
    /// Prefetcher metadata stored with the line.
    pub pf_metadata: u32,
}

/// The tag/data storage of one cache.
#[derive(Clone, Debug)]
pub struct BlockArray {
    blocks: Vec<Block>,
    num_set: usize,
    num_way: usize,
    offset_bits: u32,
}

impl BlockArray {
    /// Creates an array of `num_set x num_way` invalid blocks.
    ///
    /// # Arguments
    ///
    /// * `num_set` - Number of sets.
    /// * `num_way` - Ways per set.
    /// * `offset_bits` - log2 of the block size in bytes.
    pub fn new(num_set: usize, num_way: usize, offset_bits: u32) -> Self {
        Self { blocks: vec![Block::default(); num_set * num_way], num_set, num_way, offset_bits }
    }

    /// Number of sets.
    pub const fn num_set(&self) -> usize {
        self.num_set
    }

    /// Ways per set.
    pub const fn num_way(&self) -> usize {
        self.num_way
    }

    /// log2 of the block size.
    pub const fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Set that `address` maps to.
    #[inline]
    pub fn set_index(&self, address: u64) -> usize {
        (block_number(address, self.offset_bits) % self.num_set as u64) as usize
    }

    /// The blocks of `set`, way 0 first.
    pub fn set(&self, set: usize) -> &[Block] {
        let base = set * self.num_way;
        &self.blocks[base..base + self.num_way]
    }

    /// Way of `set` holding a valid line for `address`'s block.
    pub fn find_way(&self, set: usize, address: u64) -> Option<usize> {
        let block = block_number(address, self.offset_bits);
        self.set(set)
            .iter()
            .position(|b| b.valid && block_number(b.address, self.offset_bits) == block)
    }

    /// First invalid way of `set`.
    pub fn first_invalid(&self, set: usize) -> Option<usize> {
        self.set(set).iter().position(|b| !b.valid)
    }

    /// Block at `set`/`way`.
    pub fn block(&self, set: usize, way: usize) -> &Block {
        &self.blocks[set * self.num_way + way]
    }

    /// Mutable block at `set`/`way`.
    pub fn block_mut(&mut self, set: usize, way: usize) -> &mut Block {
        &mut self.blocks[set * self.num_way + way]
    }

    /// Looks `address` up without side effects.
    pub fn probe(&self, address: u64) -> Option<&Block> {
        let set = self.set_index(address);
        self.find_way(set, address).map(|way| self.block(set, way))
    }

    /// Clears the valid flag of the line holding `address`.
    ///
    /// # Returns
    ///
    /// The way that was invalidated, or `None` if the block was not present.
    pub fn invalidate(&mut self, address: u64) -> Option<usize> {
        let set = self.set_index(address);
        let way = self.find_way(set, address)?;
        self.block_mut(set, way).valid = false;
        Some(way)
    }

    /// Number of valid lines.
    pub fn occupancy(&self) -> usize {
        self.blocks.iter().filter(|b| b.valid).count()
    }
}
