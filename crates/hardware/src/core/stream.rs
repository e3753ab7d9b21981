//! Instruction sources for the trace-driven core.
//!
//! The core consumes [`TraceInstr`]s from an [`InstructionSource`]. Two
//! sources are provided:
//! 1. **Synthetic:** A seeded generator producing sequential, strided or random data accesses.
//! 2. **Scripted:** A fixed list of instructions, used to drive exact access sequences.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::constants::BLOCK_SIZE;
use crate::config::{AccessPattern, WorkloadConfig};

/// Bytes between consecutive instruction pointers.
const INSTR_BYTES: u64 = 4;

/// Number of distinct instruction pointers issuing memory operations.
const MEMORY_IPS: u64 = 16;

/// One instruction of the trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceInstr {
    /// Instruction pointer (fetched through the instruction side).
    pub ip: u64,
    /// Virtual addresses read by the instruction.
    pub loads: Vec<u64>,
    /// Virtual addresses written by the instruction.
    pub stores: Vec<u64>,
}

impl TraceInstr {
    /// An instruction without memory operands.
    pub fn compute(ip: u64) -> Self {
        Self { ip, ..Self::default() }
    }

    /// An instruction reading `addr`.
    pub fn load(ip: u64, addr: u64) -> Self {
        Self { ip, loads: vec![addr], ..Self::default() }
    }

    /// An instruction writing `addr`.
    pub fn store(ip: u64, addr: u64) -> Self {
        Self { ip, stores: vec![addr], ..Self::default() }
    }
}

/// Supplies instructions to a core in program order.
pub trait InstructionSource: Send + Sync {
    /// Next instruction, or `None` once the trace is exhausted.
    fn next_instr(&mut self) -> Option<TraceInstr>;
}

/// Seeded synthetic workload.
#[derive(Clone, Debug)]
pub struct SyntheticStream {
    pattern: AccessPattern,
    data_base: u64,
    footprint: u64,
    stride: u64,
    code_base: u64,
    code_footprint: u64,
    memory_percent: u32,
    store_percent: u32,
    remaining: Option<u64>,
    pc: u64,
    cursor: u64,
    rng: StdRng,
}

impl SyntheticStream {
    /// Creates the workload described by `config`, seeded with `seed`.
    pub fn new(config: &WorkloadConfig, seed: u64) -> Self {
        Self {
            pattern: config.pattern,
            data_base: config.data_base,
            footprint: config.footprint.max(BLOCK_SIZE),
            stride: config.stride.max(1),
            code_base: config.code_base,
            code_footprint: config.code_footprint.max(INSTR_BYTES),
            memory_percent: config.memory_percent.min(100),
            store_percent: config.store_percent.min(100),
            remaining: config.instructions,
            pc: 0,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next_data_address(&mut self) -> u64 {
        let offset = match self.pattern {
            AccessPattern::Sequential => (self.cursor * BLOCK_SIZE) % self.footprint,
            AccessPattern::Strided => (self.cursor * self.stride) % self.footprint,
            AccessPattern::Random => {
                self.rng.gen_range(0..self.footprint / BLOCK_SIZE) * BLOCK_SIZE
            }
        };
        self.cursor += 1;
        self.data_base + offset
    }
}

impl InstructionSource for SyntheticStream {
    fn next_instr(&mut self) -> Option<TraceInstr> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let ip = self.code_base + self.pc;
        self.pc = (self.pc + INSTR_BYTES) % self.code_footprint;

        if self.rng.gen_range(0..100) >= self.memory_percent {
            return Some(TraceInstr::compute(ip));
        }
        // Memory operations come from a small set of static instructions.
        let mem_ip = self.code_base + (self.cursor % MEMORY_IPS) * INSTR_BYTES;
        let addr = self.next_data_address();
        if self.rng.gen_range(0..100) < self.store_percent {
            Some(TraceInstr::store(mem_ip, addr))
        } else {
            Some(TraceInstr::load(mem_ip, addr))
        }
    }
}

/// A fixed list of instructions.
#[derive(Clone, Debug, Default)]
pub struct ScriptedStream {
    instrs: VecDeque<TraceInstr>,
}

impl ScriptedStream {
    /// Creates a source replaying `instrs` in order.
    pub fn new(instrs: impl IntoIterator<Item = TraceInstr>) -> Self {
        Self { instrs: instrs.into_iter().collect() }
    }

    /// Instructions not yet consumed.
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Every instruction has been consumed.
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

impl InstructionSource for ScriptedStream {
    fn next_instr(&mut self) -> Option<TraceInstr> {
        self.instrs.pop_front()
    }
}
