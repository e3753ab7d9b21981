//! Common utilities and types used throughout the memory hierarchy simulator.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the simulator. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses, and block helpers.
//! 2. **Constants:** Block/page geometry, cycle sentinels, and the default deadlock threshold.
//! 3. **Access Types:** The request classification used for statistics and policy gating.
//! 4. **Packets:** The unit of work passed between components.
//! 5. **Error Handling:** The fatal error taxonomy of a run.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types for fatal simulation conditions.
pub mod error;

/// Request packets and their return routing.
pub mod packet;

pub use addr::{PhysAddr, VirtAddr};
pub use constants::{CYCLE_NEVER, Cycle};
pub use data::AccessType;
pub use error::SimError;
pub use packet::{Packet, ReturnAddr, ReturnPort};
