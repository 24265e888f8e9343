//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bess_sim::config::{ScenarioConfig, StrategyConfig};
use bess_sim::devices::{Battery, BatteryParams};
use bess_sim::scenario::build_series;
use bess_sim::series::TimeSeries;
use bess_sim::sim::engine::Engine;
use bess_sim::sim::strategy::BmsStrategy;
use bess_sim::sim::sweep::SweepSettings;
use bess_sim::sim::types::StepResult;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// 2024-01-01 00:00.
pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start")
}

/// Preset scenario shortened to `days`.
pub fn preset(name: &str, days: usize) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::from_preset(name).expect("known preset");
    cfg.simulation.days = days;
    cfg
}

/// Input series of a preset shortened to `days`.
pub fn preset_series(name: &str, days: usize) -> Arc<TimeSeries> {
    build_series(&preset(name, days)).expect("series builds")
}

/// Hourly series with constant renewable input and demand around the
/// given price column; the reference average is the flat mean of `prices`.
pub fn hourly_series(renew_kwh: f64, demand_kwh: f64, prices: Vec<f64>) -> Arc<TimeSeries> {
    let n = prices.len();
    let mean = prices.iter().sum::<f64>() / n as f64;
    let timestamps = (0..n).map(|i| start() + Duration::hours(i as i64)).collect();
    Arc::new(
        TimeSeries::new(
            timestamps,
            vec![renew_kwh; n],
            vec![demand_kwh; n],
            prices,
            vec![mean; n],
        )
        .expect("valid series"),
    )
}

/// Daily price shape: cheap nights, expensive evenings.
pub fn daily_prices(days: usize) -> Vec<f64> {
    (0..days * 24)
        .map(|i| match i % 24 {
            0..=5 => 0.03,
            11..=14 => 0.06,
            17..=20 => 0.22,
            _ => 0.10,
        })
        .collect()
}

/// Battery at half charge with default physics.
pub fn battery(capacity_kwh: f64, power_kw: f64) -> Battery {
    Battery::new(
        capacity_kwh,
        Some(power_kw),
        Some(0.5 * capacity_kwh),
        BatteryParams::default(),
    )
}

/// Runs one strategy by name over `series`.
pub fn run(
    series: &Arc<TimeSeries>,
    kind: &str,
    capacity_kwh: f64,
    power_kw: f64,
) -> Vec<StepResult> {
    let strategy = BmsStrategy::from_config(&strategy_config(kind)).expect("known strategy");
    let mut engine = Engine::new(Arc::clone(series), battery(capacity_kwh, power_kw), strategy);
    engine.run()
}

pub fn strategy_config(kind: &str) -> StrategyConfig {
    StrategyConfig {
        kind: kind.to_string(),
        ..StrategyConfig::default()
    }
}

/// Sweep settings of a preset with the strategy replaced.
pub fn settings(cfg: &ScenarioConfig, kind: &str) -> SweepSettings {
    SweepSettings {
        battery: cfg.battery.clone(),
        strategy: strategy_config(kind),
        economics: cfg.prices.economics(),
    }
}

/// Energy entering minus energy leaving over a whole run (kWh).
///
/// Renewable input plus initial storage must equal export, final storage,
/// resistive loss, battery dissipation and curtailment.
pub fn ledger_gap(results: &[StepResult], initial_storage_kwh: f64) -> f64 {
    let inflow: f64 = results.iter().map(|r| r.renew_kwh).sum::<f64>() + initial_storage_kwh;
    let outflow: f64 = results
        .iter()
        .map(|r| r.export_kwh + r.loss_kwh + r.dissipated_kwh + r.curtailed_kwh)
        .sum::<f64>()
        + results.last().map_or(initial_storage_kwh, |r| r.storage_kwh);
    inflow - outflow
}
