//! Statistics Tests.
//!
//! Phase bookkeeping, derived metrics and the text report.

use pretty_assertions::assert_eq;

use hiersim_core::common::AccessType;
use hiersim_core::soc::traits::Phase;
use hiersim_core::stats::{
    CacheReport, CacheStats, CoreStats, DramStats, PhaseStats, QueueCounters, QueueStats,
    RequestClass, STATS_SECTIONS, SimStats,
};

// ══════════════════════════════════════════════════════════
// 1. Phases
// ══════════════════════════════════════════════════════════

#[test]
fn fresh_counters_behave_as_region_of_interest() {
    let mut stats = PhaseStats::<CoreStats>::default();
    assert!(!stats.is_warmup());
    stats.current_mut().loads = 3;
    assert_eq!(stats.report().loads, 3);
}

#[test]
fn warmup_counters_are_discarded() {
    let mut stats = PhaseStats::<CoreStats>::default();
    stats.begin(Phase::Warmup);
    stats.current_mut().loads = 100;
    stats.end();

    stats.begin(Phase::Roi);
    assert_eq!(stats.current().loads, 0);
    stats.current_mut().loads = 7;
    stats.end();
    assert_eq!(stats.report().loads, 7);
}

#[test]
fn report_is_frozen_at_the_end_of_the_roi() {
    let mut stats = PhaseStats::<CoreStats>::default();
    stats.begin(Phase::Roi);
    stats.current_mut().stores = 2;
    stats.end();
    stats.current_mut().stores = 50;
    assert_eq!(stats.report().stores, 2);
    assert_eq!(stats.current().stores, 50);
}

// ══════════════════════════════════════════════════════════
// 2. Derived metrics
// ══════════════════════════════════════════════════════════

#[test]
fn hit_and_miss_counters_split_by_cpu_and_type() {
    let mut cache = CacheStats::default();
    cache.record_hit(0, AccessType::Load);
    cache.record_hit(1, AccessType::Load);
    cache.record_miss(1, AccessType::Write);
    cache.record_miss(1, AccessType::Load);

    assert_eq!(cache.hits.len(), 2);
    assert_eq!(cache.hits_of(AccessType::Load), 2);
    assert_eq!(cache.misses_of(AccessType::Write), 1);
    assert_eq!((cache.total_hits(), cache.total_misses()), (2, 2));
    assert!((cache.miss_rate() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn idle_metrics_are_zero() {
    let cache = CacheStats::default();
    assert_eq!(cache.miss_rate(), 0.0);
    assert_eq!(cache.average_miss_latency(), 0.0);
    assert_eq!(CoreStats::default().ipc(), 0.0);
}

#[test]
fn averages_divide_by_the_right_counter() {
    let mut cache = CacheStats::default();
    for _ in 0..4 {
        cache.record_miss(0, AccessType::Load);
    }
    cache.total_miss_latency = 100;
    assert!((cache.average_miss_latency() - 25.0).abs() < f64::EPSILON);

    let core = CoreStats { cycles: 200, instructions_retired: 300, ..CoreStats::default() };
    assert!((core.ipc() - 1.5).abs() < f64::EPSILON);
}

// ══════════════════════════════════════════════════════════
// 3. Report
// ══════════════════════════════════════════════════════════

fn sample() -> SimStats {
    let mut l1d = CacheStats::default();
    l1d.record_hit(0, AccessType::Load);
    l1d.record_miss(0, AccessType::Load);
    l1d.pf_requested = 4;
    let queues = QueueStats {
        rq: QueueCounters { access: 5, merged: 1, full: 0, to_cache: 4, forward: 0 },
        ..QueueStats::default()
    };
    SimStats {
        cycles: 1000,
        cores: vec![CoreStats { cycles: 1000, instructions_retired: 800, loads: 2, ..CoreStats::default() }],
        caches: vec![CacheReport {
            name: "cpu0_L1D".into(),
            cache: l1d,
            queues,
            replacement: vec![("probi_instr_biased_evictions".into(), 3)],
            prefetcher: Vec::new(),
        }],
        dram: DramStats { reads: 9, ..DramStats::default() },
        ..SimStats::default()
    }
}

#[test]
fn full_report_has_every_section() {
    let text = sample().render_sections(&[]);
    assert!(text.contains("MEMORY HIERARCHY SIMULATION STATISTICS"));
    assert!(text.contains("sim_cycles               1000"));
    assert!(text.contains("ipc: 0.8000"));
    assert!(text.contains("miss_rate: 50.00%"));
    assert!(text.contains("probi_instr_biased_evictions: 3"));
    assert!(text.contains("cpu0_L1D   RQ   access: 5"));
    assert!(text.contains("DRAM  reads: 9"));
    assert!(text.contains("PTW   walks: 0"));
    assert!(!text.contains(" WQ "), "idle queues are skipped");
}

#[test]
fn sections_can_be_selected() {
    let text = sample().render_sections(&["memory".to_string()]);
    assert!(text.contains("DRAM  reads: 9"));
    assert!(!text.contains("sim_cycles"));
    assert!(!text.contains("miss_rate"));
    assert_eq!(STATS_SECTIONS, &["summary", "caches", "queues", "memory"]);
}

#[test]
fn cache_lookup_by_name() {
    let stats = sample();
    assert_eq!(stats.cache("cpu0_L1D").map(|c| c.cache.pf_requested), Some(4));
    assert!(stats.cache("LLC").is_none());
}

#[test]
fn request_class_follows_instruction_and_translation_flags() {
    assert_eq!(RequestClass::of(true, false), RequestClass::Instr);
    assert_eq!(RequestClass::of(false, false), RequestClass::Data);
    assert_eq!(RequestClass::of(true, true), RequestClass::InstrTranslation);
    assert_eq!(RequestClass::of(false, true), RequestClass::DataTranslation);
}

#[test]
fn optional_cache_lines_appear_only_when_recorded() {
    let text = sample().render_sections(&["caches".to_string()]);
    assert!(text.contains("crossed: 0"));
    assert!(!text.contains("forced hits"));
    assert!(!text.contains("data_xlat"));

    let mut stats = sample();
    let l1d = &mut stats.caches[0].cache;
    l1d.pf_crossed = 2;
    l1d.forced_hits = 6;
    let data = l1d.classes.get_mut(RequestClass::Data);
    data.misses = 4;
    data.total_miss_latency = 40;
    let text = stats.render_sections(&["caches".to_string()]);
    assert!(text.contains("crossed: 2"));
    assert!(text.contains("forced hits: 6"));
    assert!(text.contains("avg miss latency: 10.00"));
    assert!(text.contains("data_xlat"));
}

#[test]
fn report_serializes_with_field_names() {
    let json = serde_json::to_value(sample()).expect("serializes");
    assert_eq!(json["caches"][0]["queues"]["rq"]["merged"], 1);
    assert_eq!(json["caches"][0]["replacement"][0][0], "probi_instr_biased_evictions");
    assert_eq!(json["cores"][0]["instructions_retired"], 800);
}
