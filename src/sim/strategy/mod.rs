//! Pluggable battery decision policies.
//!
//! A [`Strategy`] answers, for one [`DecisionContext`], whether the battery
//! should discharge, charge or export, and how much energy to move. The
//! engine is generic over the trait; [`BmsStrategy`] is the closed set of
//! policies selectable from configuration.

use std::sync::Arc;

use crate::config::{ConfigError, StrategyConfig};
use crate::series::TimeSeries;

use super::types::DecisionContext;

pub mod day_ahead;
pub mod dynamic_discharge;
pub mod price_threshold;

pub use day_ahead::{DayAhead, PlannedAction};
pub use dynamic_discharge::DynamicDischarge;
pub use price_threshold::PriceThreshold;

/// Hour of day at which next-day prices are published.
pub const PUBLICATION_HOUR: u32 = 13;

/// Rank factor above which the dynamic policy discharges.
pub const DISCHARGE_FACTOR_THRESHOLD: f64 = 0.7;

/// Exponent of the concave discharge saturation curve.
pub const SATURATION_EXPONENT: f64 = 3.0;

/// Decision policy queried by the engine once per timestep.
///
/// `should_*` queries take `&mut self` because lookahead policies refresh
/// their cached price ranking lazily when the clock crosses a publication
/// boundary. Amounts are only requested after the matching `should_*`
/// returned true and are never negative.
pub trait Strategy {
    /// Receives the shared series before the first step and computes any
    /// initial lookahead so that step 0 is decided with information.
    fn prepare(&mut self, _series: &Arc<TimeSeries>) {}

    fn should_charge(&mut self, ctx: &DecisionContext) -> bool;

    fn should_discharge(&mut self, ctx: &DecisionContext) -> bool;

    /// Whether renewable energy not going into the battery may be sold.
    fn should_export(&self, ctx: &DecisionContext) -> bool;

    /// Energy to charge this step (kWh).
    fn charge_amount(&self, ctx: &DecisionContext) -> f64;

    /// Energy to discharge this step (kWh).
    fn discharge_amount(&self, ctx: &DecisionContext) -> f64;

    /// Configuration name of the policy.
    fn name(&self) -> &'static str;
}

/// Concave saturation curve used to scale discharge amounts.
///
/// Returns `substitute` whenever it is positive. Otherwise returns 0 for
/// `x <= threshold` and `1 - (1 - u)^exponent` with
/// `u = (x - threshold) / (1 - threshold)` clamped to at most 1.
///
/// # Examples
///
/// ```
/// use bess_sim::sim::strategy::saturation;
///
/// assert_eq!(saturation(0.7, 3.0, 0.7, 0.0), 0.0);
/// assert_eq!(saturation(1.0, 3.0, 0.7, 0.0), 1.0);
/// assert_eq!(saturation(0.2, 3.0, 0.7, 0.4), 0.4);
/// ```
pub fn saturation(x: f64, exponent: f64, threshold: f64, substitute: f64) -> f64 {
    if substitute > 0.0 {
        return substitute;
    }
    if x <= threshold {
        return 0.0;
    }
    let u = ((x - threshold) / (1.0 - threshold)).min(1.0);
    1.0 - (1.0 - u).powf(exponent)
}

/// The policies selectable by name in a scenario file.
#[derive(Debug, Clone)]
pub enum BmsStrategy {
    PriceThreshold(PriceThreshold),
    DynamicDischarge(DynamicDischarge),
    DayAhead(DayAhead),
}

impl BmsStrategy {
    /// Names accepted by [`BmsStrategy::from_config`].
    pub const NAMES: &[&str] = &["price_threshold", "dynamic_discharge", "day_ahead"];

    /// Builds a fresh policy from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `kind` names no known policy.
    pub fn from_config(cfg: &StrategyConfig) -> Result<Self, ConfigError> {
        match cfg.kind.as_str() {
            "price_threshold" => Ok(Self::PriceThreshold(PriceThreshold {
                load_threshold: cfg.load_threshold,
                load_threshold_high: cfg.load_threshold_high,
                export_threshold: cfg.export_threshold,
            })),
            "dynamic_discharge" => Ok(Self::DynamicDischarge(DynamicDischarge::new(
                cfg.limit_soc_threshold,
                cfg.control_exflow,
            ))),
            "day_ahead" => Ok(Self::DayAhead(DayAhead::new(
                cfg.discharge_threshold,
                cfg.charge_threshold,
                cfg.control_exflow,
            ))),
            other => Err(ConfigError {
                field: "strategy.kind".into(),
                message: format!(
                    "unknown strategy \"{other}\", available: {}",
                    Self::NAMES.join(", ")
                ),
            }),
        }
    }
}

impl Strategy for BmsStrategy {
    fn prepare(&mut self, series: &Arc<TimeSeries>) {
        match self {
            Self::PriceThreshold(s) => s.prepare(series),
            Self::DynamicDischarge(s) => s.prepare(series),
            Self::DayAhead(s) => s.prepare(series),
        }
    }

    fn should_charge(&mut self, ctx: &DecisionContext) -> bool {
        match self {
            Self::PriceThreshold(s) => s.should_charge(ctx),
            Self::DynamicDischarge(s) => s.should_charge(ctx),
            Self::DayAhead(s) => s.should_charge(ctx),
        }
    }

    fn should_discharge(&mut self, ctx: &DecisionContext) -> bool {
        match self {
            Self::PriceThreshold(s) => s.should_discharge(ctx),
            Self::DynamicDischarge(s) => s.should_discharge(ctx),
            Self::DayAhead(s) => s.should_discharge(ctx),
        }
    }

    fn should_export(&self, ctx: &DecisionContext) -> bool {
        match self {
            Self::PriceThreshold(s) => s.should_export(ctx),
            Self::DynamicDischarge(s) => s.should_export(ctx),
            Self::DayAhead(s) => s.should_export(ctx),
        }
    }

    fn charge_amount(&self, ctx: &DecisionContext) -> f64 {
        match self {
            Self::PriceThreshold(s) => s.charge_amount(ctx),
            Self::DynamicDischarge(s) => s.charge_amount(ctx),
            Self::DayAhead(s) => s.charge_amount(ctx),
        }
    }

    fn discharge_amount(&self, ctx: &DecisionContext) -> f64 {
        match self {
            Self::PriceThreshold(s) => s.discharge_amount(ctx),
            Self::DynamicDischarge(s) => s.discharge_amount(ctx),
            Self::DayAhead(s) => s.discharge_amount(ctx),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::PriceThreshold(s) => s.name(),
            Self::DynamicDischarge(s) => s.name(),
            Self::DayAhead(s) => s.name(),
        }
    }
}
