//! Memory Access Types.
//!
//! This module defines the classification of requests flowing through the hierarchy.
//! These types are used for the following:
//! 1. **Statistics Tracking:** Hits and misses are counted per access type.
//! 2. **Policy Decisions:** Replacement policies skip write hits; prefetchers are gated by type.
//! 3. **Routing:** Prefetches may be forwarded to a lower prefetch queue instead of its read queue.

use serde::{Deserialize, Serialize};

/// Number of distinct access types.
pub const NUM_ACCESS_TYPES: usize = 5;

/// Type of a memory request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Demand data or instruction read.
    #[default]
    Load,

    /// Read-for-ownership: a read that will be followed by a write to the line.
    Rfo,

    /// Speculative read generated by a prefetcher.
    Prefetch,

    /// Store or writeback of a dirty line.
    Write,

    /// Page-table access issued on behalf of address translation.
    Translation,
}

impl AccessType {
    /// All access types, in counter order.
    pub const ALL: [Self; NUM_ACCESS_TYPES] =
        [Self::Load, Self::Rfo, Self::Prefetch, Self::Write, Self::Translation];

    /// Position of this type in per-type counter arrays.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Single-bit mask used by prefetch activation sets.
    #[inline(always)]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Short upper-case label used in reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::Rfo => "RFO",
            Self::Prefetch => "PREFETCH",
            Self::Write => "WRITE",
            Self::Translation => "TRANSLATION",
        }
    }

    /// Builds an activation mask from a list of access types.
    pub fn mask_of(types: &[Self]) -> u8 {
        types.iter().fold(0, |mask, ty| mask | ty.bit())
    }
}
