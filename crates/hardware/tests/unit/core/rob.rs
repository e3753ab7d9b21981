//! Reorder Buffer Tests.

use pretty_assertions::assert_eq;

use hiersim_core::core::rob::{MemOp, MemOpKind, OpState, Rob};

fn issue_all(rob: &mut Rob) {
    rob.for_each_mut(|entry| {
        for op in &mut entry.ops {
            if op.state == OpState::Pending {
                op.state = if op.kind == MemOpKind::Store { OpState::Done } else { OpState::Issued };
            }
        }
        true
    });
}

#[test]
fn full_rob_refuses_allocation() {
    let mut rob = Rob::new(3);
    for id in 1..=3 {
        assert!(rob.allocate(id, 0x400 + id * 4, Vec::new(), 0));
    }
    assert!(rob.is_full());
    assert!(!rob.allocate(4, 0x410, Vec::new(), 0));
    assert_eq!((rob.len(), rob.capacity()), (3, 3));
}

#[test]
fn retire_stops_at_the_first_unfinished_entry() {
    let mut rob = Rob::new(4);
    assert!(rob.allocate(1, 0x400, vec![MemOp::new(MemOpKind::Load, 0x1000)], 0));
    assert!(rob.allocate(2, 0x404, Vec::new(), 0));
    issue_all(&mut rob);

    assert!(rob.retire_head().is_none(), "head still waits on its load");
    assert_eq!(rob.complete(1, false, 0x1030), 1);

    let order: Vec<u64> = std::iter::from_fn(|| rob.retire_head()).map(|e| e.instr_id).collect();
    assert_eq!(order, vec![1, 2]);
    assert!(rob.is_empty());
}

#[test]
fn completion_matches_block_and_side() {
    let mut rob = Rob::new(2);
    let ops = vec![MemOp::new(MemOpKind::Fetch, 0x400), MemOp::new(MemOpKind::Load, 0x400)];
    assert!(rob.allocate(7, 0x400, ops, 0));
    issue_all(&mut rob);

    assert_eq!(rob.complete(7, false, 0x440), 0, "different block");
    assert_eq!(rob.complete(7, true, 0x43C), 1, "instruction side only");
    assert!(rob.peek_head().is_some_and(|e| !e.is_done()));
    assert_eq!(rob.complete(7, false, 0x400), 1);
    assert!(rob.peek_head().is_some_and(|e| e.is_done()));
}

#[test]
fn completion_ignores_pending_and_unknown_operations() {
    let mut rob = Rob::new(2);
    assert!(rob.allocate(1, 0x400, vec![MemOp::new(MemOpKind::Load, 0x2000)], 0));
    assert_eq!(rob.complete(1, false, 0x2000), 0, "not issued yet");
    assert_eq!(rob.complete(9, false, 0x2000), 0, "no such instruction");
}

#[test]
fn stores_finish_at_issue() {
    let mut rob = Rob::new(2);
    assert!(rob.allocate(1, 0x400, vec![MemOp::new(MemOpKind::Store, 0x3000)], 0));
    issue_all(&mut rob);
    assert_eq!(rob.complete(1, false, 0x3000), 0);
    assert_eq!(rob.retire_head().map(|e| e.instr_id), Some(1));
}

#[test]
fn ring_wraps_around() {
    let mut rob = Rob::new(2);
    for id in 1..=6 {
        assert!(rob.allocate(id, 0x400, Vec::new(), id));
        assert_eq!(rob.retire_head().map(|e| (e.instr_id, e.dispatch_cycle)), Some((id, id)));
    }
    assert!(rob.is_empty());
}
