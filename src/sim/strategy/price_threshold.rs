use super::Strategy;
use crate::sim::types::DecisionContext;

/// Charges below and discharges above a multiple of the rolling average price.
///
/// The same `load_threshold` multiplier gates both directions, so the band
/// between the two triggers is empty. `load_threshold_high` and
/// `export_threshold` are carried for configuration compatibility and do
/// not take part in the decision. The policy never exports on its own:
/// energy is only sold as a side effect of discharging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceThreshold {
    /// Multiplier on the average price for both charge and discharge triggers.
    pub load_threshold: f64,
    /// Unused upper multiplier.
    pub load_threshold_high: f64,
    /// Unused export multiplier.
    pub export_threshold: f64,
}

impl Default for PriceThreshold {
    fn default() -> Self {
        Self {
            load_threshold: 1.0,
            load_threshold_high: 1.2,
            export_threshold: 0.9,
        }
    }
}

impl Strategy for PriceThreshold {
    fn should_charge(&mut self, ctx: &DecisionContext) -> bool {
        ctx.price < self.load_threshold * ctx.avg_price
    }

    fn should_discharge(&mut self, ctx: &DecisionContext) -> bool {
        ctx.price > self.load_threshold * ctx.avg_price.abs()
    }

    fn should_export(&self, _ctx: &DecisionContext) -> bool {
        false
    }

    fn charge_amount(&self, ctx: &DecisionContext) -> f64 {
        ctx.renew_kwh
            .min(ctx.max_step_kwh())
            .min(ctx.charge_headroom_kwh())
            .max(0.0)
    }

    /// Full power down to the SOC floor, regardless of renewable inflow or demand.
    fn discharge_amount(&self, ctx: &DecisionContext) -> f64 {
        ctx.max_step_kwh().min(ctx.discharge_headroom_kwh())
    }

    fn name(&self) -> &'static str {
        "price_threshold"
    }
}
