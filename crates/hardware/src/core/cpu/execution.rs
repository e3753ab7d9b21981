//! Dispatch, retire and deadlock checking for the trace-driven core.

use tracing::error;

use super::TraceCore;
use crate::common::SimError;
use crate::core::rob::{MemOp, MemOpKind};
use crate::soc::traits::Operable;

impl TraceCore {
    /// Retires finished instructions from the ROB head, up to `width`.
    pub(super) fn retire(&mut self) {
        for _ in 0..self.width {
            if self.rob.retire_head().is_none() {
                break;
            }
            self.stats.current_mut().instructions_retired += 1;
        }
    }

    /// Moves up to `width` instructions from the source into the ROB.
    pub(super) fn dispatch(&mut self) {
        for _ in 0..self.width {
            if self.exhausted || self.rob.is_full() {
                break;
            }
            let Some(instr) = self.source.next_instr() else {
                self.exhausted = true;
                break;
            };

            let mut ops = Vec::with_capacity(1 + instr.loads.len() + instr.stores.len());
            if self.model_ifetch {
                ops.push(MemOp::new(MemOpKind::Fetch, instr.ip));
            }
            ops.extend(instr.loads.iter().map(|&addr| MemOp::new(MemOpKind::Load, addr)));
            ops.extend(instr.stores.iter().map(|&addr| MemOp::new(MemOpKind::Store, addr)));

            let id = self.next_instr_id;
            self.next_instr_id += 1;
            let _ = self.rob.allocate(id, instr.ip, ops, self.current_cycle);
        }
    }

    /// Fails when the ROB head has waited past the deadlock threshold.
    pub(super) fn check_deadlock(&self) -> Result<(), SimError> {
        let now = self.current_cycle;
        match self.rob.peek_head() {
            Some(head) if head.dispatch_cycle.saturating_add(self.deadlock_cycle) <= now => {
                error!(cpu = self.cpu, cycle = now, instr_id = head.instr_id, "ROB head stalled");
                Err(SimError::Deadlock {
                    component: self.name.clone(),
                    cycle: now,
                    report: self.print_deadlock(),
                })
            }
            _ => Ok(()),
        }
    }
}
