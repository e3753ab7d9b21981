//! Reorder Buffer (ROB) for in-order retirement.
//!
//! The ROB is a circular buffer that tracks dispatched trace instructions
//! until every memory operation they carry has completed. It provides:
//! 1. **Allocation:** Assigns each dispatched instruction a slot in program order.
//! 2. **Issue tracking:** Records which operations still have to enter the cache buses.
//! 3. **Completion:** Marks read operations done when their data returns.
//! 4. **In-order Retire:** Removes finished instructions from the head.

use crate::common::Cycle;
use crate::common::addr::block_number;
use crate::common::constants::LOG2_BLOCK_SIZE;

/// Kind of memory operation carried by an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemOpKind {
    /// Instruction fetch through the instruction side.
    Fetch,
    /// Data read.
    Load,
    /// Data write.
    Store,
}

/// Lifecycle of one memory operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OpState {
    /// Not yet accepted by a cache.
    #[default]
    Pending,
    /// Accepted; waiting for the data to return.
    Issued,
    /// Finished.
    Done,
}

/// One memory operation of an in-flight instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemOp {
    /// Operation kind.
    pub kind: MemOpKind,
    /// Virtual address.
    pub v_address: u64,
    /// Current state.
    pub state: OpState,
}

impl MemOp {
    /// A pending operation of `kind` on `v_address`.
    pub const fn new(kind: MemOpKind, v_address: u64) -> Self {
        Self { kind, v_address, state: OpState::Pending }
    }
}

/// A single entry in the Reorder Buffer.
#[derive(Clone, Debug, Default)]
pub struct RobEntry {
    /// Id of the instruction (unique for the run, never 0).
    pub instr_id: u64,
    /// Instruction pointer.
    pub ip: u64,
    /// Memory operations, fetch first.
    pub ops: Vec<MemOp>,
    /// Cycle the instruction entered the ROB.
    pub dispatch_cycle: Cycle,
    /// Whether this entry is valid (occupied).
    pub valid: bool,
}

impl RobEntry {
    /// Every memory operation has finished.
    pub fn is_done(&self) -> bool {
        self.ops.iter().all(|op| op.state == OpState::Done)
    }
}

/// Reorder Buffer: circular buffer for in-order retirement.
#[derive(Clone, Debug)]
pub struct Rob {
    /// Fixed-size entry array.
    entries: Vec<RobEntry>,
    /// Index of the oldest entry (retire point).
    head: usize,
    /// Index where the next entry will be allocated.
    tail: usize,
    /// Number of valid entries.
    count: usize,
}

impl Rob {
    /// Creates a new ROB with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity.max(1));
        entries.resize_with(capacity.max(1), RobEntry::default);
        Self { entries, head: 0, tail: 0, count: 0 }
    }

    /// Returns the ROB capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the ROB is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the ROB is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Allocates an entry. Returns `false` if the ROB is full.
    pub fn allocate(&mut self, instr_id: u64, ip: u64, ops: Vec<MemOp>, cycle: Cycle) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries[self.tail] = RobEntry { instr_id, ip, ops, dispatch_cycle: cycle, valid: true };
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        true
    }

    /// Marks the issued reads of `instr_id` that target `v_address`'s block as done.
    ///
    /// # Arguments
    ///
    /// * `instr_id` - Instruction named in the completed packet's dependents.
    /// * `is_instr` - The completion came from the instruction side.
    /// * `v_address` - Virtual address of the completed packet.
    ///
    /// # Returns
    ///
    /// The number of operations completed.
    pub fn complete(&mut self, instr_id: u64, is_instr: bool, v_address: u64) -> usize {
        let block = block_number(v_address, LOG2_BLOCK_SIZE);
        let Some(entry) = self.find_entry_mut(instr_id) else {
            return 0;
        };
        let mut done = 0;
        for op in &mut entry.ops {
            let side_matches = (op.kind == MemOpKind::Fetch) == is_instr;
            if side_matches
                && op.kind != MemOpKind::Store
                && op.state == OpState::Issued
                && block_number(op.v_address, LOG2_BLOCK_SIZE) == block
            {
                op.state = OpState::Done;
                done += 1;
            }
        }
        done
    }

    /// Returns a reference to the head entry (oldest), if the ROB is non-empty.
    pub fn peek_head(&self) -> Option<&RobEntry> {
        if self.count == 0 { None } else { Some(&self.entries[self.head]) }
    }

    /// Retires the head entry if all of its operations are done.
    pub fn retire_head(&mut self) -> Option<RobEntry> {
        if !self.peek_head().is_some_and(RobEntry::is_done) {
            return None;
        }
        let retired = std::mem::take(&mut self.entries[self.head]);
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        Some(retired)
    }

    /// Finds a mutable reference to the entry of `instr_id`.
    fn find_entry_mut(&mut self, instr_id: u64) -> Option<&mut RobEntry> {
        let len = self.entries.len();
        let idx = (0..self.count)
            .map(|i| (self.head + i) % len)
            .find(|&i| self.entries[i].valid && self.entries[i].instr_id == instr_id)?;
        Some(&mut self.entries[idx])
    }

    /// Calls `f` on every valid entry from head to tail until it returns `false`.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut RobEntry) -> bool) {
        let len = self.entries.len();
        for i in 0..self.count {
            let idx = (self.head + i) % len;
            if self.entries[idx].valid && !f(&mut self.entries[idx]) {
                break;
            }
        }
    }
}
