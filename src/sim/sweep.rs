//! Parallel sweep over battery capacity and power candidates.
//!
//! Each candidate runs in its own engine with a fresh battery and strategy.
//! Only the input series is shared, read-only, between worker threads.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{BatteryConfig, ConfigError, StrategyConfig, SweepConfig};
use crate::devices::Battery;
use crate::series::TimeSeries;

use super::engine::Engine;
use super::kpi::{Economics, RunSummary};
use super::strategy::{BmsStrategy, Strategy};
use super::types::StepResult;

/// One battery size to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub capacity_kwh: f64,
    pub power_kw: f64,
}

/// Ordered list of candidates, optionally led by a zero-capacity baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    candidates: Vec<Candidate>,
}

impl SweepPlan {
    /// Pairs capacities with powers in order.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the lists differ in length, contain
    /// negative values, or leave the plan empty.
    pub fn new(
        capacities_kwh: &[f64],
        powers_kw: &[f64],
        include_baseline: bool,
    ) -> Result<Self, ConfigError> {
        if capacities_kwh.len() != powers_kw.len() {
            return Err(ConfigError {
                field: "sweep.powers_kw".into(),
                message: format!(
                    "has {} entries but sweep.capacities_kwh has {}",
                    powers_kw.len(),
                    capacities_kwh.len()
                ),
            });
        }
        if capacities_kwh.iter().chain(powers_kw).any(|v| *v < 0.0) {
            return Err(ConfigError {
                field: "sweep".into(),
                message: "capacities and powers must be >= 0".into(),
            });
        }

        let mut candidates = Vec::with_capacity(capacities_kwh.len() + 1);
        if include_baseline {
            candidates.push(Candidate {
                capacity_kwh: 0.0,
                power_kw: 0.0,
            });
        }
        candidates.extend(
            capacities_kwh
                .iter()
                .zip(powers_kw)
                .map(|(&capacity_kwh, &power_kw)| Candidate {
                    capacity_kwh,
                    power_kw,
                }),
        );
        if candidates.is_empty() {
            return Err(ConfigError {
                field: "sweep.capacities_kwh".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(Self { candidates })
    }

    /// Builds the plan from its configuration section.
    ///
    /// # Errors
    ///
    /// See [`SweepPlan::new`].
    pub fn from_config(cfg: &SweepConfig) -> Result<Self, ConfigError> {
        Self::new(&cfg.capacities_kwh, &cfg.powers_kw, cfg.include_baseline)
    }

    /// Candidates in run order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Candidate with the largest capacity (the first one on ties).
    pub fn largest(&self) -> Option<Candidate> {
        self.candidates
            .iter()
            .copied()
            .reduce(|best, c| if c.capacity_kwh > best.capacity_kwh { c } else { best })
    }
}

/// Everything shared by the candidates of one sweep.
#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub battery: BatteryConfig,
    pub strategy: StrategyConfig,
    pub economics: Economics,
}

/// Per-step output of a single candidate run.
#[derive(Debug, Clone)]
pub struct CandidateRun {
    pub candidate: Candidate,
    pub results: Vec<StepResult>,
    pub export_flags: Vec<bool>,
    pub summary: RunSummary,
}

/// Runs one candidate through a fresh battery, strategy and engine.
///
/// # Errors
///
/// Returns a `ConfigError` if the strategy kind is unknown.
pub fn run_candidate(
    series: &Arc<TimeSeries>,
    candidate: Candidate,
    settings: &SweepSettings,
) -> Result<CandidateRun, ConfigError> {
    let strategy = BmsStrategy::from_config(&settings.strategy)?;
    let battery = Battery::new(
        candidate.capacity_kwh,
        Some(candidate.power_kw),
        Some(settings.battery.initial_soc * candidate.capacity_kwh),
        settings.battery.params(),
    );
    let mut engine = Engine::new(Arc::clone(series), battery, strategy);
    let results = engine.run();
    let export_flags = engine.export_flags().to_vec();
    let summary = RunSummary::from_results(
        candidate.capacity_kwh,
        candidate.power_kw,
        &results,
        &export_flags,
        series.resolution_hours(),
        &settings.economics,
    );
    debug!(
        strategy = engine.strategy().name(),
        capacity_kwh = candidate.capacity_kwh,
        revenue_eur = summary.revenue_eur,
        "candidate finished"
    );
    Ok(CandidateRun {
        candidate,
        results,
        export_flags,
        summary,
    })
}

/// Runs every candidate of `plan` in parallel and returns the summaries in
/// plan order.
///
/// # Errors
///
/// Returns a `ConfigError` if the strategy kind is unknown.
pub fn run_sweep(
    series: &Arc<TimeSeries>,
    plan: &SweepPlan,
    settings: &SweepSettings,
) -> Result<Vec<RunSummary>, ConfigError> {
    // Surface configuration errors before spawning work
    let name = BmsStrategy::from_config(&settings.strategy)?.name();
    info!(
        strategy = name,
        candidates = plan.candidates().len(),
        steps = series.len(),
        "sweep started"
    );
    let summaries = plan
        .candidates()
        .par_iter()
        .map(|c| run_candidate(series, *c, settings).map(|run| run.summary))
        .collect::<Result<Vec<_>, _>>()?;
    info!(strategy = name, "sweep finished");
    Ok(summaries)
}
