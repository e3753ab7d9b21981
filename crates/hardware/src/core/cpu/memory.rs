//! Issue to the cache buses and completion handling for the trace-driven core.

use super::TraceCore;
use crate::common::{Packet, SimError};
use crate::core::rob::{MemOpKind, OpState};
use crate::soc::interconnect::Fabric;

impl TraceCore {
    /// Marks the operations named by every buffered completion as done.
    pub(super) fn drain_completions(&mut self) {
        let rob = &mut self.rob;
        for packet in self.l1i_bus.drain().chain(self.l1d_bus.drain()) {
            for &instr_id in &packet.dependents {
                let _ = rob.complete(instr_id, packet.is_instr, packet.v_address);
            }
        }
    }

    /// Offers pending operations to the buses in program order, up to `width` accepted requests.
    ///
    /// A rejected operation stays pending and stops issue for this cycle.
    ///
    /// # Errors
    ///
    /// Propagates fabric errors from a miswired bus.
    pub(super) fn issue(&mut self, fabric: &mut Fabric<'_>) -> Result<(), SimError> {
        let mut budget = self.width;
        let mut result = Ok(());
        let cpu = self.cpu;
        let (l1i, l1d, stats) = (&mut self.l1i_bus, &mut self.l1d_bus, &mut self.stats);

        self.rob.for_each_mut(|entry| {
            for op in entry.ops.iter_mut().filter(|op| op.state == OpState::Pending) {
                if budget == 0 {
                    return false;
                }
                let packet = Packet {
                    v_address: op.v_address,
                    is_instr: op.kind == MemOpKind::Fetch,
                    cpu,
                    ..Packet::default()
                }
                .with_instr(entry.instr_id, entry.ip);

                let accepted = match op.kind {
                    MemOpKind::Fetch => l1i.issue_read(fabric, packet),
                    MemOpKind::Load => l1d.issue_read(fabric, packet),
                    MemOpKind::Store => l1d.issue_write(fabric, packet),
                };
                match accepted {
                    Ok(true) => {
                        budget -= 1;
                        let counters = stats.current_mut();
                        match op.kind {
                            MemOpKind::Fetch => counters.fetches += 1,
                            MemOpKind::Load => counters.loads += 1,
                            MemOpKind::Store => counters.stores += 1,
                        }
                        op.state = if op.kind == MemOpKind::Store { OpState::Done } else { OpState::Issued };
                    }
                    Ok(false) => {
                        stats.current_mut().issue_stalls += 1;
                        return false;
                    }
                    Err(e) => {
                        result = Err(e);
                        return false;
                    }
                }
            }
            true
        });
        result
    }
}
