/// Warmup and region-of-interest runs of the full hierarchy.
pub mod simulator;
