//! Core simulation types: decision context, step actions, and step results.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Everything a strategy may look at when deciding one timestep.
///
/// Built fresh by the engine for each step and passed by reference; never stored.
///
/// # Examples
///
/// ```
/// use bess_sim::sim::types::DecisionContext;
///
/// let ctx = DecisionContext {
///     storage_kwh: 500.0,
///     capacity_kwh: 1000.0,
///     power_limit_kw: 200.0,
///     resolution_hours: 0.25,
///     ..DecisionContext::default()
/// };
/// assert_eq!(ctx.max_step_kwh(), 50.0);
/// assert_eq!(ctx.charge_headroom_kwh(), 450.0);
/// assert_eq!(ctx.discharge_headroom_kwh(), 450.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionContext {
    /// Timestep index.
    pub index: usize,
    /// Wall-clock start of the step.
    pub timestamp: NaiveDateTime,
    /// Renewable energy available this step (kWh).
    pub renew_kwh: f64,
    /// Demand this step (kWh); either sign convention, see [`Self::demand_abs_kwh`].
    pub demand_kwh: f64,
    /// Spot price (€/kWh).
    pub price: f64,
    /// Reference (rolling average) price (€/kWh).
    pub avg_price: f64,
    /// Energy in storage before the step (kWh).
    pub storage_kwh: f64,
    /// Battery capacity (kWh).
    pub capacity_kwh: f64,
    /// State of charge before the step (0.0 to 1.0).
    pub soc: f64,
    /// Battery power limit (kW).
    pub power_limit_kw: f64,
    /// Step duration (hours).
    pub resolution_hours: f64,
    /// Lower SOC bound of the battery.
    pub min_soc: f64,
    /// Upper SOC bound of the battery.
    pub max_soc: f64,
}

impl Default for DecisionContext {
    fn default() -> Self {
        Self {
            index: 0,
            timestamp: NaiveDateTime::default(),
            renew_kwh: 0.0,
            demand_kwh: 0.0,
            price: 0.0,
            avg_price: 0.0,
            storage_kwh: 0.0,
            capacity_kwh: 0.0,
            soc: 0.0,
            power_limit_kw: 0.0,
            resolution_hours: 1.0,
            min_soc: 0.05,
            max_soc: 0.95,
        }
    }
}

impl DecisionContext {
    /// Most energy the power limit allows in one step (kWh).
    pub fn max_step_kwh(&self) -> f64 {
        self.power_limit_kw * self.resolution_hours
    }

    /// Room left below the upper SOC bound (kWh, never negative).
    pub fn charge_headroom_kwh(&self) -> f64 {
        (self.max_soc * self.capacity_kwh - self.storage_kwh).max(0.0)
    }

    /// Energy available above the lower SOC bound (kWh, never negative).
    pub fn discharge_headroom_kwh(&self) -> f64 {
        (self.storage_kwh - self.min_soc * self.capacity_kwh).max(0.0)
    }

    /// Demand magnitude regardless of sign convention.
    pub fn demand_abs_kwh(&self) -> f64 {
        self.demand_kwh.abs()
    }
}

/// Which of the four mutually exclusive engine branches a step took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Discharge,
    Charge,
    ExportOnly,
    Idle,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discharge => "discharge",
            Self::Charge => "charge",
            Self::ExportOnly => "export_only",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete record of one simulation timestep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Timestep index.
    pub timestep: usize,
    /// Wall-clock start of the step.
    pub timestamp: NaiveDateTime,
    /// Branch taken by the engine.
    pub action: StepAction,
    /// Renewable input (kWh).
    pub renew_kwh: f64,
    /// Demand as supplied by the source (kWh).
    pub demand_kwh: f64,
    /// Stored energy after the step (kWh).
    pub storage_kwh: f64,
    /// State of charge after the step.
    pub soc: f64,
    /// Energy added to storage by charging (kWh).
    pub stored_kwh: f64,
    /// Energy delivered by the battery after losses (kWh).
    pub net_discharge_kwh: f64,
    /// Resistive loss (kWh).
    pub loss_kwh: f64,
    /// Battery-internal dissipation: efficiency, self-discharge, clamping (kWh).
    pub dissipated_kwh: f64,
    /// Energy fed to the grid (kWh, >= 0).
    pub export_kwh: f64,
    /// Unmet demand bought from the grid (kWh, >= 0).
    pub residual_kwh: f64,
    /// Renewable energy neither charged nor exported (kWh).
    pub curtailed_kwh: f64,
    /// Spot price (€/kWh).
    pub price: f64,
    /// Reference price (€/kWh).
    pub avg_price: f64,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} {} | {:<11} | renew={:>9.2} demand={:>9.2} | \
             storage={:>10.2} kWh (SoC={:>5.1}%) | export={:>9.2} residual={:>9.2} \
             loss={:.3} | price={:.4} avg={:.4}",
            self.timestep,
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.action,
            self.renew_kwh,
            self.demand_kwh,
            self.storage_kwh,
            self.soc * 100.0,
            self.export_kwh,
            self.residual_kwh,
            self.loss_kwh,
            self.price,
            self.avg_price,
        )
    }
}
