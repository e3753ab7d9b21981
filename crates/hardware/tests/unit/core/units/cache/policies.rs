//! Replacement Policy Tests.
//!
//! Drives each policy directly through [`ReplacementPolicy`], without a cache
//! engine around it.

use proptest::prelude::*;
use rstest::rstest;

use hiersim_core::common::AccessType;
use hiersim_core::core::units::cache::block::Block;
use hiersim_core::core::units::cache::policies::{
    FifoPolicy, LruPolicy, ProbiPolicy, RandomPolicy, ReplacementPolicy, UpdateContext, VictimContext,
};

const WAYS: usize = 4;

fn full_set() -> Vec<Block> {
    (0..WAYS as u64)
        .map(|way| Block { valid: true, address: way << 6, v_address: way << 6, ..Block::default() })
        .collect()
}

fn victim(policy: &mut dyn ReplacementPolicy, set: usize) -> usize {
    let blocks = full_set();
    let ctx = VictimContext {
        cpu: 0,
        instr_id: 1,
        set,
        current_set: &blocks,
        ip: 0x400,
        full_addr: 0x1_0000,
        access_type: AccessType::Load,
        is_pte: false,
        translation_level: 0,
    };
    policy.find_victim(&ctx)
}

fn access(set: usize, way: usize, access_type: AccessType, hit: bool, is_instr: bool, cycle: u64) -> UpdateContext {
    UpdateContext {
        cpu: 0,
        set,
        way,
        full_addr: (way as u64) << 6,
        ip: 0x400,
        victim_addr: 0,
        access_type,
        hit,
        is_instr,
        is_pte: false,
        translation_level: 0,
        cycle,
    }
}

fn load_hit(set: usize, way: usize, cycle: u64) -> UpdateContext {
    access(set, way, AccessType::Load, true, false, cycle)
}

// ══════════════════════════════════════════════════════════
// 1. LRU
// ══════════════════════════════════════════════════════════

#[test]
fn lru_starts_by_evicting_the_last_way() {
    let mut lru = LruPolicy::new(2, WAYS);
    assert_eq!(victim(&mut lru, 0), WAYS - 1);
    assert_eq!(victim(&mut lru, 1), WAYS - 1);
}

#[test]
fn lru_evicts_least_recently_touched() {
    let mut lru = LruPolicy::new(1, WAYS);
    for (cycle, way) in [3, 1, 0, 2].into_iter().enumerate() {
        lru.update_replacement_state(&load_hit(0, way, cycle as u64));
    }
    assert_eq!(victim(&mut lru, 0), 3);

    lru.update_replacement_state(&load_hit(0, 3, 10));
    assert_eq!(victim(&mut lru, 0), 1);
}

#[test]
fn lru_ignores_write_hits() {
    let mut lru = LruPolicy::new(1, WAYS);
    lru.update_replacement_state(&access(0, 3, AccessType::Write, true, false, 1));
    assert_eq!(victim(&mut lru, 0), 3);

    // A write miss filling the way is a real use.
    lru.on_fill(&access(0, 3, AccessType::Write, false, false, 2));
    assert_eq!(victim(&mut lru, 0), 2);
}

#[test]
fn lru_sets_are_independent() {
    let mut lru = LruPolicy::new(2, WAYS);
    lru.update_replacement_state(&load_hit(0, 3, 1));
    assert_eq!(victim(&mut lru, 0), 2);
    assert_eq!(victim(&mut lru, 1), 3);
}

// ══════════════════════════════════════════════════════════
// 2. FIFO
// ══════════════════════════════════════════════════════════

#[test]
fn fifo_rotates_on_fills_and_ignores_hits() {
    let mut fifo = FifoPolicy::new(1, WAYS);
    assert_eq!(victim(&mut fifo, 0), 0);

    fifo.update_replacement_state(&load_hit(0, 0, 1));
    assert_eq!(victim(&mut fifo, 0), 0);

    for way in 0..WAYS {
        fifo.on_fill(&access(0, way, AccessType::Load, false, false, way as u64));
    }
    assert_eq!(victim(&mut fifo, 0), 0);
}

#[test]
fn fifo_pointer_moves_only_when_its_way_is_filled() {
    let mut fifo = FifoPolicy::new(1, WAYS);
    fifo.on_fill(&access(0, 2, AccessType::Load, false, false, 1));
    assert_eq!(victim(&mut fifo, 0), 0);
    fifo.on_fill(&access(0, 0, AccessType::Load, false, false, 2));
    assert_eq!(victim(&mut fifo, 0), 1);
}

// ══════════════════════════════════════════════════════════
// 3. Random
// ══════════════════════════════════════════════════════════

#[test]
fn random_victims_stay_in_range() {
    let mut random = RandomPolicy::new(WAYS, 99);
    for _ in 0..256 {
        assert!(victim(&mut random, 0) < WAYS);
    }
}

#[test]
fn random_initialize_replays_the_sequence() {
    let mut random = RandomPolicy::new(WAYS, 5);
    let first: Vec<usize> = (0..32).map(|_| victim(&mut random, 0)).collect();
    random.initialize(1, WAYS);
    let second: Vec<usize> = (0..32).map(|_| victim(&mut random, 0)).collect();
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn random_is_deterministic_per_seed(seed in any::<u64>()) {
        let mut a = RandomPolicy::new(WAYS, seed);
        let mut b = RandomPolicy::new(WAYS, seed);
        for _ in 0..16 {
            prop_assert_eq!(victim(&mut a, 0), victim(&mut b, 0));
        }
    }
}

// ══════════════════════════════════════════════════════════
// 4. Probi
// ══════════════════════════════════════════════════════════

/// Way 1 and way 2 hold instruction lines, way 2 the most recent one; way 0
/// is the least recently used line overall.
fn probi_with_history(prob: u32) -> ProbiPolicy {
    let mut probi = ProbiPolicy::new(1, WAYS, prob, 3);
    probi.update_replacement_state(&access(0, 0, AccessType::Load, true, false, 10));
    probi.update_replacement_state(&access(0, 1, AccessType::Load, true, true, 20));
    probi.update_replacement_state(&access(0, 2, AccessType::Load, true, true, 30));
    probi.update_replacement_state(&access(0, 3, AccessType::Load, true, false, 40));
    probi
}

#[rstest]
#[case::always_biased(100, 2)]
#[case::never_biased(0, 0)]
fn probi_victim_follows_probability(#[case] prob: u32, #[case] expected: usize) {
    let mut probi = probi_with_history(prob);
    for _ in 0..8 {
        assert_eq!(victim(&mut probi, 0), expected);
    }
}

#[test]
fn probi_counts_biased_evictions() {
    let mut probi = probi_with_history(100);
    let _ = victim(&mut probi, 0);
    let _ = victim(&mut probi, 0);
    assert_eq!(probi.final_stats(), vec![("probi_instr_biased_evictions", 2)]);
}

#[test]
fn probi_without_instruction_lines_falls_back_to_lru() {
    let mut probi = ProbiPolicy::new(1, WAYS, 100, 3);
    for (way, cycle) in [(0, 5), (1, 2), (2, 9), (3, 7)] {
        probi.update_replacement_state(&access(0, way, AccessType::Load, true, false, cycle));
    }
    assert_eq!(victim(&mut probi, 0), 1);
    assert_eq!(probi.final_stats(), vec![("probi_instr_biased_evictions", 0)]);
}

#[test]
fn probi_write_hits_leave_recency_alone() {
    let mut probi = probi_with_history(0);
    probi.update_replacement_state(&access(0, 0, AccessType::Write, true, false, 99));
    assert_eq!(victim(&mut probi, 0), 0);
}

#[rstest]
#[case::lru(Box::new(LruPolicy::new(1, WAYS)) as Box<dyn ReplacementPolicy>, "lru")]
#[case::fifo(Box::new(FifoPolicy::new(1, WAYS)) as Box<dyn ReplacementPolicy>, "fifo")]
#[case::random(Box::new(RandomPolicy::new(WAYS, 0)) as Box<dyn ReplacementPolicy>, "random")]
#[case::probi(Box::new(ProbiPolicy::new(1, WAYS, 50, 0)) as Box<dyn ReplacementPolicy>, "probi")]
fn policies_report_their_names(#[case] policy: Box<dyn ReplacementPolicy>, #[case] name: &str) {
    assert_eq!(policy.name(), name);
}
