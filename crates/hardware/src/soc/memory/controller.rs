//! Main memory latency.
//!
//! Main memory is a bounded queue with a fixed service time; channels, banks
//! and row buffers are not modeled. [`Dram`](super::Dram) asks its controller
//! for the service time of each admitted request.

/// Service time of one main-memory request.
pub trait MemoryController: Send + Sync {
    /// Cycles between admission of a request for `addr` and its completion.
    fn access_latency(&mut self, addr: u64) -> u64;
}

/// Every request takes the same number of cycles.
#[derive(Clone, Copy, Debug)]
pub struct SimpleController {
    latency: u64,
}

impl SimpleController {
    /// Controller answering every request after `latency` cycles.
    pub const fn new(latency: u64) -> Self {
        Self { latency }
    }

    /// The fixed service time.
    pub const fn latency(&self) -> u64 {
        self.latency
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: u64) -> u64 {
        self.latency
    }
}
