//! Memory Management Unit (MMU).
//!
//! This module provides virtual-to-physical translation for the hierarchy.
//! TLBs are ordinary [`Cache`](crate::core::units::cache::Cache) levels with
//! page-sized blocks; the [`PageWalker`] below them answers their misses from
//! a [`PageTable`].

/// Page walker component answering translation misses.
pub mod ptw;

pub use self::ptw::PageWalker;

use std::collections::HashMap;

use crate::common::{PhysAddr, VirtAddr};

/// First physical frame handed out; frame 0 is never mapped.
const FIRST_FRAME: u64 = 1;

/// Demand-allocated page table.
///
/// A virtual page is mapped the first time it is translated. Frames are
/// handed out in first-touch order, so a given access sequence always
/// produces the same physical layout.
#[derive(Clone, Debug, Default)]
pub struct PageTable {
    frames: HashMap<(usize, u64), u64>,
    next_frame: u64,
}

impl PageTable {
    /// Creates an empty page table.
    pub fn new() -> Self {
        Self { frames: HashMap::new(), next_frame: FIRST_FRAME }
    }

    /// Translates `vaddr` for `cpu`, mapping its page on first touch.
    ///
    /// # Returns
    ///
    /// The physical address and whether a new page was mapped.
    pub fn translate(&mut self, cpu: usize, vaddr: VirtAddr) -> (PhysAddr, bool) {
        let vpn = vaddr.page_number();
        let mut mapped = false;
        let next = &mut self.next_frame;
        let frame = *self.frames.entry((cpu, vpn)).or_insert_with(|| {
            mapped = true;
            let frame = (*next).max(FIRST_FRAME);
            *next = frame + 1;
            frame
        });
        (PhysAddr::from_frame(frame, vaddr.page_offset()), mapped)
    }

    /// Physical frame of `vaddr`'s page, if mapped.
    pub fn lookup(&self, cpu: usize, vaddr: VirtAddr) -> Option<u64> {
        self.frames.get(&(cpu, vaddr.page_number())).copied()
    }

    /// Number of mapped pages.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// No page is mapped yet.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
