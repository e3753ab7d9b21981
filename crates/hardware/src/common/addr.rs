//! Physical and Virtual Address types.
//!
//! This module defines strong types for the two address spaces seen by the
//! memory hierarchy, plus the bit helpers the cache engine uses on raw packet
//! addresses. It provides the following:
//! 1. **Type Safety:** `VirtAddr` and `PhysAddr` keep the page table's inputs and outputs apart.
//! 2. **Block Arithmetic:** Block numbers and block-aligned addresses for a given offset width.
//! 3. **Splicing:** Combining a translated page frame with an untranslated page offset.

use super::constants::{LOG2_PAGE_SIZE, PAGE_OFFSET_MASK};

/// A virtual address as issued by the trace-driven core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A physical address produced by address translation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Returns the virtual page number.
    pub const fn page_number(&self) -> u64 {
        self.0 >> LOG2_PAGE_SIZE
    }

    /// Extracts the page offset (the lower 12 bits).
    pub const fn page_offset(&self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Builds the physical address of page frame `ppn` at byte offset `offset`.
    ///
    /// # Arguments
    ///
    /// * `ppn` - Physical page number.
    /// * `offset` - Byte offset inside the page; bits above the page size are ignored.
    pub const fn from_frame(ppn: u64, offset: u64) -> Self {
        Self((ppn << LOG2_PAGE_SIZE) | (offset & PAGE_OFFSET_MASK))
    }
}

/// Returns a mask with the low `bits` bits set.
#[inline(always)]
pub const fn bitmask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Returns the block number of `addr` for a block of `2^offset_bits` bytes.
#[inline(always)]
pub const fn block_number(addr: u64, offset_bits: u32) -> u64 {
    if offset_bits >= u64::BITS {
        0
    } else {
        addr >> offset_bits
    }
}

/// Clears the low `offset_bits` bits of `addr`.
#[inline(always)]
pub const fn block_align(addr: u64, offset_bits: u32) -> u64 {
    addr & !bitmask(offset_bits)
}

/// Takes the bits of `upper` above `bits` and the bits of `lower` below it.
///
/// # Arguments
///
/// * `upper` - Source of the high bits (for example a translated page frame).
/// * `lower` - Source of the low bits (for example a virtual address).
/// * `bits` - Split point.
///
/// # Returns
///
/// `(upper & !mask) | (lower & mask)` where `mask = bitmask(bits)`.
#[inline(always)]
pub const fn splice_bits(upper: u64, lower: u64, bits: u32) -> u64 {
    let mask = bitmask(bits);
    (upper & !mask) | (lower & mask)
}
