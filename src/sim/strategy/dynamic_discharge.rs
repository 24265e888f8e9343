//! Price-ranking policy with a saturating discharge curve.

use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use tracing::trace;

use super::{
    DISCHARGE_FACTOR_THRESHOLD, PUBLICATION_HOUR, SATURATION_EXPONENT, Strategy, saturation,
};
use crate::series::TimeSeries;
use crate::sim::types::DecisionContext;

/// Spread below which a set of prices or ranks counts as flat.
const FLAT_SPREAD: f64 = 0.001;

/// Rank assigned to hours that do not appear in the lookahead window.
const MISSING_HOUR_RANK: f64 = 12.0;

/// Ranks the hours of the coming day by price and trades on the rank.
///
/// Each hour of day gets a factor in [-1, 1]: -1 for the cheapest hour of
/// the lookahead window, +1 for the most expensive. The battery charges in
/// below-average hours and discharges when the factor exceeds 0.7, scaling
/// the amount by [`saturation`]. The ranking is rebuilt once a day when the
/// clock reaches the publication hour.
#[derive(Debug, Clone)]
pub struct DynamicDischarge {
    /// SOC margin kept away from both bounds (fraction of capacity).
    pub limit_soc_threshold: f64,
    /// Export control flag; exporting is allowed when greater than 1.
    pub control_exflow: u32,
    price_array: [f64; 24],
    last_update_day: Option<NaiveDate>,
    series: Option<Arc<TimeSeries>>,
}

impl Default for DynamicDischarge {
    fn default() -> Self {
        Self::new(0.05, 3)
    }
}

impl DynamicDischarge {
    pub fn new(limit_soc_threshold: f64, control_exflow: u32) -> Self {
        Self {
            limit_soc_threshold,
            control_exflow,
            price_array: [0.0; 24],
            last_update_day: None,
            series: None,
        }
    }

    /// Current rank factors indexed by hour of day.
    pub fn price_array(&self) -> &[f64; 24] {
        &self.price_array
    }

    fn factor(&self, ctx: &DecisionContext) -> f64 {
        self.price_array[ctx.timestamp.hour() as usize]
    }

    /// Rebuilds the rank factors from up to 24 hours of prices starting at `index`.
    pub fn update_price_array(&mut self, index: usize) {
        let Some(series) = &self.series else {
            return;
        };
        let window = (24.0 / series.resolution_hours()).round().max(1.0) as usize;
        let end = index.saturating_add(window).min(series.len());

        let mut seen = [false; 24];
        let mut pairs = Vec::with_capacity(24);
        for i in index..end {
            let hour = series.hour(i) as usize;
            if !seen[hour] {
                seen[hour] = true;
                pairs.push((hour, series.prices()[i]));
            }
        }

        self.price_array = rank_factors(&pairs);
        trace!(index, hours = pairs.len(), "price ranking refreshed");
    }

    fn refresh_if_published(&mut self, ctx: &DecisionContext) {
        let day = ctx.timestamp.date();
        if ctx.timestamp.hour() >= PUBLICATION_HOUR && self.last_update_day != Some(day) {
            self.update_price_array(ctx.index);
            self.last_update_day = Some(day);
        }
    }
}

/// Maps `(hour, price)` pairs to per-hour factors in [-1, 1] by price rank.
///
/// Hours missing from `pairs` keep a middle rank. A flat price window, or a
/// flat rank vector, yields all zeros.
pub fn rank_factors(pairs: &[(usize, f64)]) -> [f64; 24] {
    let mut factors = [0.0; 24];
    if pairs.is_empty() {
        return factors;
    }

    let (lo, hi) = pairs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, p)| {
            (lo.min(p), hi.max(p))
        });
    if hi - lo <= FLAT_SPREAD {
        return factors;
    }

    let mut ranked = pairs.to_vec();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = [MISSING_HOUR_RANK; 24];
    for (rank, &(hour, _)) in ranked.iter().enumerate() {
        ranks[hour] = rank as f64;
    }

    let rmin = ranks.iter().copied().fold(f64::INFINITY, f64::min);
    let rmax = ranks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if rmax - rmin <= FLAT_SPREAD {
        return factors;
    }
    for (f, r) in factors.iter_mut().zip(ranks) {
        *f = (r - rmin) / (rmax - rmin) * 2.0 - 1.0;
    }
    factors
}

impl Strategy for DynamicDischarge {
    fn prepare(&mut self, series: &Arc<TimeSeries>) {
        self.series = Some(Arc::clone(series));
        self.update_price_array(0);
    }

    fn should_charge(&mut self, ctx: &DecisionContext) -> bool {
        self.refresh_if_published(ctx);
        let lst = self.limit_soc_threshold;
        self.factor(ctx) < 0.0
            && ctx.storage_kwh <= (ctx.max_soc - lst) * ctx.capacity_kwh
            && ctx.storage_kwh >= lst * ctx.capacity_kwh
    }

    fn should_discharge(&mut self, ctx: &DecisionContext) -> bool {
        self.refresh_if_published(ctx);
        self.factor(ctx) > DISCHARGE_FACTOR_THRESHOLD
            && ctx.storage_kwh >= (ctx.min_soc + self.limit_soc_threshold) * ctx.capacity_kwh
    }

    fn should_export(&self, ctx: &DecisionContext) -> bool {
        ctx.price >= 0.0 && self.control_exflow > 1
    }

    /// Only the renewable surplus over demand is stored.
    fn charge_amount(&self, ctx: &DecisionContext) -> f64 {
        let surplus = (ctx.renew_kwh - ctx.demand_abs_kwh()).max(0.0);
        surplus
            .min(ctx.max_step_kwh())
            .min(ctx.charge_headroom_kwh())
    }

    fn discharge_amount(&self, ctx: &DecisionContext) -> f64 {
        let allowed = ctx.max_step_kwh().min(ctx.discharge_headroom_kwh());
        let factor = saturation(
            self.factor(ctx),
            SATURATION_EXPONENT,
            DISCHARGE_FACTOR_THRESHOLD,
            0.0,
        );
        let amount = factor * allowed;

        // positive demand means a consumer behind the meter: cover the deficit only
        if ctx.demand_kwh > 0.0 {
            let deficit = ctx.demand_kwh - ctx.renew_kwh;
            if deficit <= 0.0 {
                return 0.0;
            }
            return amount.min(deficit);
        }
        amount
    }

    fn name(&self) -> &'static str {
        "dynamic_discharge"
    }
}
