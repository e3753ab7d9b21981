//! Cache hierarchy simulator CLI.
//!
//! This binary is the single entry point for a simulation run. It performs:
//! 1. **Configuration:** Loads a JSON configuration (or the built-in defaults) and applies overrides.
//! 2. **Logging:** Installs a `tracing` subscriber filtered by `--log-level` or `RUST_LOG`.
//! 3. **Run:** Builds the hierarchy, runs warmup and the region of interest.
//! 4. **Report:** Prints the statistics as text or JSON; a failed run exits with status 1.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hiersim_core::config::Config;
use hiersim_core::sim::Simulator;
use hiersim_core::stats::STATS_SECTIONS;
use hiersim_core::SimError;

#[derive(Parser, Debug)]
#[command(
    name = "hiersim",
    author,
    version,
    about = "Cycle-level cache hierarchy simulator",
    long_about = "Drive a core, TLBs, L1I/L1D, L2, LLC and DRAM with a synthetic trace and report per-level statistics.\n\nExamples:\n  hiersim\n  hiersim --config configs/probi.json --cycles 1000000\n  hiersim --instructions 50000 --json"
)]
struct Cli {
    /// JSON configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Warmup cycles (overrides `general.warmup_cycles`).
    #[arg(long)]
    warmup: Option<u64>,

    /// Region-of-interest cycles (overrides `general.sim_cycles`).
    #[arg(long)]
    cycles: Option<u64>,

    /// Instructions in the synthetic trace (overrides `workload.instructions`).
    #[arg(long)]
    instructions: Option<u64>,

    /// Run seed (overrides `general.seed`).
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter, e.g. `info` or `hiersim_core=trace` (falls back to `RUST_LOG`, then `warn`).
    #[arg(long)]
    log_level: Option<String>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Report sections to print (repeatable); all sections when omitted.
    #[arg(long = "section", value_parser = clap::builder::PossibleValuesParser::new(STATS_SECTIONS.iter().copied()))]
    sections: Vec<String>,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Loads the configuration and applies the command-line overrides.
fn load_config(cli: &Cli) -> Result<Config, SimError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(warmup) = cli.warmup {
        config.general.warmup_cycles = warmup;
    }
    if let Some(cycles) = cli.cycles {
        config.general.sim_cycles = cycles;
    }
    if let Some(instructions) = cli.instructions {
        config.workload.instructions = Some(instructions);
    }
    if let Some(seed) = cli.seed {
        config.general.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli)?;
    info!(
        warmup = config.general.warmup_cycles,
        cycles = config.general.sim_cycles,
        seed = config.general.seed,
        "starting run"
    );
    let mut sim = Simulator::from_config(&config)?;
    let stats = sim.run()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print_sections(&cli.sections);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    if let Err(e) = run(&cli) {
        eprintln!("\n[!] {e}");
        process::exit(1);
    }
}
