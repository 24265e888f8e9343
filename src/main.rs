//! Command-line entry point: loads a scenario, runs the capacity sweep and
//! writes the requested result files.

mod cli;

use anyhow::{Context, Result, bail};
use bess_sim::io::export::{
    SweepReport, export_steps_csv, export_summary_csv, export_summary_json,
};
use bess_sim::scenario::build_series;
use bess_sim::sim::kpi::ResultsTable;
use bess_sim::sim::sweep::{SweepPlan, SweepSettings, run_candidate, run_sweep};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "info,bess_sim=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = args.scenario()?;
    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        bail!("scenario has {} invalid field(s)", errors.len());
    }

    let series = build_series(&cfg).context("failed to prepare input series")?;
    let plan = SweepPlan::from_config(&cfg.sweep)?;
    let settings = SweepSettings {
        battery: cfg.battery.clone(),
        strategy: cfg.strategy.clone(),
        economics: cfg.prices.economics(),
    };
    let summaries = run_sweep(&series, &plan, &settings)?;

    if args.details {
        for s in &summaries {
            println!("{s}\n");
        }
    }
    println!(
        "{}",
        ResultsTable {
            strategy: &cfg.strategy.kind,
            summaries: &summaries,
        }
    );

    if let Some(path) = &cfg.output.steps_csv {
        // Plans always hold at least one candidate
        if let Some(candidate) = plan.largest() {
            let run = run_candidate(&series, candidate, &settings)?;
            export_steps_csv(&run.results, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), steps = run.results.len(), "step results written");
        }
    }
    if let Some(path) = &cfg.output.summary_csv {
        export_summary_csv(&summaries, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "summary CSV written");
    }
    if let Some(path) = &cfg.output.summary_json {
        let report = SweepReport::new(&cfg.strategy.kind, &cfg.source.kind, &summaries);
        export_summary_json(&report, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "summary JSON written");
    }

    Ok(())
}
