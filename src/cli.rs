use std::path::PathBuf;

use bess_sim::config::{ConfigError, ScenarioConfig};
use clap::Parser;

/// Sweep battery sizes for a renewable plant trading on the spot market.
#[derive(Debug, Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    /// Built-in scenario: biogas, solar or community.
    #[clap(long, default_value = "biogas")]
    pub preset: String,

    /// Scenario TOML file; replaces the preset.
    #[clap(long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Decision policy: price_threshold, dynamic_discharge or day_ahead.
    #[clap(long)]
    pub strategy: Option<String>,

    /// Number of simulated days.
    #[clap(long)]
    pub days: Option<usize>,

    /// Seed for synthetic profiles and prices.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Sell at the fixed contract tariff instead of spot prices.
    #[clap(long)]
    pub fix_contract: bool,

    /// Write the per-step results of the largest battery to this CSV file.
    #[clap(long)]
    pub steps_csv: Option<PathBuf>,

    /// Write one summary row per candidate to this CSV file.
    #[clap(long)]
    pub summary_csv: Option<PathBuf>,

    /// Write the sweep report to this JSON file.
    #[clap(long)]
    pub summary_json: Option<PathBuf>,

    /// Print the full summary of every candidate.
    #[clap(long)]
    pub details: bool,

    /// Debug logging for the simulator (RUST_LOG takes precedence).
    #[clap(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Loads the scenario file, or the preset when no file is given, and
    /// applies the command-line overrides.
    pub fn scenario(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => ScenarioConfig::from_toml_file(path)?,
            None => ScenarioConfig::from_preset(&self.preset)?,
        };
        if let Some(kind) = &self.strategy {
            cfg.strategy.kind.clone_from(kind);
        }
        if let Some(days) = self.days {
            cfg.simulation.days = days;
        }
        if let Some(seed) = self.seed {
            cfg.simulation.seed = seed;
        }
        if self.fix_contract {
            cfg.prices.fix_contract = true;
        }
        if self.steps_csv.is_some() {
            cfg.output.steps_csv.clone_from(&self.steps_csv);
        }
        if self.summary_csv.is_some() {
            cfg.output.summary_csv.clone_from(&self.summary_csv);
        }
        if self.summary_json.is_some() {
            cfg.output.summary_json.clone_from(&self.summary_json);
        }
        Ok(cfg)
    }
}
