//! Simulator Run Tests.
//!
//! Whole runs through warmup and the region of interest, checked through the
//! returned [`SimStats`].

use pretty_assertions::assert_eq;

use hiersim_core::config::{AccessPattern, Config, Prefetcher, ReplacementPolicy};
use hiersim_core::core::stream::{ScriptedStream, TraceInstr};
use hiersim_core::soc::traits::Phase;
use hiersim_core::{MemoryHierarchy, SimError, SimStats, Simulator};

use crate::common::harness::init_tracing;

fn small_run(config: &mut Config) {
    config.general.warmup_cycles = 500;
    config.general.sim_cycles = 3_000;
}

fn run(config: &Config) -> SimStats {
    init_tracing();
    Simulator::from_config(config).expect("valid config").run().expect("run completes")
}

#[test]
fn scripted_run_ends_when_the_trace_is_done() {
    init_tracing();
    let mut config = Config::default();
    config.general.warmup_cycles = 0;
    config.general.sim_cycles = 50_000;
    let trace: Vec<TraceInstr> =
        (0..16u64).map(|i| TraceInstr::load(0x40_0000 + i * 4, 0x1000_0000 + i * 64)).collect();
    let hierarchy =
        MemoryHierarchy::with_source(&config, Box::new(ScriptedStream::new(trace))).expect("valid config");

    let stats = Simulator::new(hierarchy, &config.general).run().expect("run completes");
    assert_eq!(stats.cores.len(), 1);
    assert_eq!(stats.cores[0].instructions_retired, 16);
    assert!(stats.cycles < 50_000, "run should stop early, took {}", stats.cycles);
}

#[test]
fn synthetic_runs_are_deterministic() {
    let mut config = Config::default();
    small_run(&mut config);
    config.workload.pattern = AccessPattern::Random;
    config.caches.l2c.replacement = ReplacementPolicy::Random;
    config.caches.llc.replacement = ReplacementPolicy::Probi;

    let first = run(&config);
    let second = run(&config);
    assert_eq!(first, second);

    config.general.seed ^= 1;
    assert_ne!(run(&config), first);
}

#[test]
fn report_covers_every_level_in_order() {
    let mut config = Config::default();
    small_run(&mut config);
    let stats = run(&config);

    let names: Vec<&str> = stats.caches.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["cpu0_ITLB", "cpu0_DTLB", "cpu0_STLB", "cpu0_L1I", "cpu0_L1D", "cpu0_L2C", "LLC"]
    );
    assert_eq!(stats.cycles, 3_000);
    assert!(stats.cores[0].instructions_retired > 0);
    assert!(stats.cache("cpu0_L1D").is_some_and(|c| c.cache.total_hits() + c.cache.total_misses() > 0));
    assert!(stats.dram.reads > 0);
}

#[test]
fn warmup_counters_are_not_reported() {
    let mut config = Config::default();
    config.general.warmup_cycles = 2_000;
    config.general.sim_cycles = 1;
    let stats = run(&config);
    assert_eq!(stats.cycles, 1);
    assert!(stats.cores[0].instructions_retired <= config.core.width as u64);
}

#[test]
fn prefetching_runs_report_prefetcher_statistics() {
    let mut config = Config::default();
    small_run(&mut config);
    config.caches.l1d.prefetcher = Prefetcher::NextLine;
    config.caches.l2c.prefetcher = Prefetcher::IpStride;
    let stats = run(&config);

    let l1d = stats.cache("cpu0_L1D").expect("L1D report");
    assert!(l1d.cache.pf_requested > 0);
    assert!(l1d.prefetcher.iter().any(|(key, _)| key == "next_line_issued"));
    let l2c = stats.cache("cpu0_L2C").expect("L2C report");
    assert!(l2c.prefetcher.iter().any(|(key, _)| key == "ip_stride_issued"));
}

#[test]
fn stats_serialize_to_json() {
    let mut config = Config::default();
    small_run(&mut config);
    let stats = run(&config);

    let json = serde_json::to_value(&stats).expect("stats serialize");
    assert_eq!(json["cycles"], 3_000);
    assert_eq!(json["caches"][4]["name"], "cpu0_L1D");
    assert!(json["dram"]["reads"].as_u64().is_some_and(|r| r > 0));
}

#[test]
fn impossible_deadlock_threshold_aborts_the_run() {
    init_tracing();
    let mut config = Config::default();
    small_run(&mut config);
    config.general.deadlock_cycle = 3;

    let mut sim = Simulator::from_config(&config).expect("valid config");
    match sim.run() {
        Err(SimError::Deadlock { component, report, .. }) => {
            assert!(!component.is_empty());
            assert!(!report.is_empty());
        }
        other => panic!("expected a deadlock, got {other:?}"),
    }
}

#[test]
fn manual_phases_match_run() {
    let mut config = Config::default();
    small_run(&mut config);
    let expected = run(&config);

    let mut sim = Simulator::from_config(&config).expect("valid config");
    sim.hierarchy.begin_phase(Phase::Warmup);
    for _ in 0..config.general.warmup_cycles {
        sim.tick().expect("tick");
    }
    sim.hierarchy.end_phase();
    sim.hierarchy.begin_phase(Phase::Roi);
    for _ in 0..config.general.sim_cycles {
        sim.tick().expect("tick");
    }
    sim.hierarchy.end_phase();
    assert_eq!(sim.collect(config.general.sim_cycles), expected);
}
