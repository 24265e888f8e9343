//! Day-ahead planning constrained to published prices.
//!
//! Before the publication hour only the current day's prices are visible.
//! From the publication hour on, the next day's 24 prices are visible too.
//! The plan is never computed from prices beyond that boundary.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Timelike};
use tracing::trace;

use super::{PUBLICATION_HOUR, SATURATION_EXPONENT, Strategy, saturation};
use crate::series::TimeSeries;
use crate::sim::types::DecisionContext;

/// Action scheduled for one (date, hour) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    Charge,
    Discharge,
    Idle,
}

/// Schedules charge and discharge hours against the mean of the known prices.
///
/// An hour is a discharge hour when its price is at least
/// `discharge_threshold` times the known mean and a charge hour when it is at
/// most `charge_threshold` times the mean.
#[derive(Debug, Clone)]
pub struct DayAhead {
    /// Multiplier on the known mean price that marks discharge hours.
    pub discharge_threshold: f64,
    /// Multiplier on the known mean price that marks charge hours.
    pub charge_threshold: f64,
    /// Export control flag; exporting is allowed when greater than 1.
    pub control_exflow: u32,
    series: Option<Arc<TimeSeries>>,
    plan: HashMap<(NaiveDate, u32), PlannedAction>,
    known_avg: f64,
    known_until: Option<NaiveDate>,
    last_plan_day: Option<NaiveDate>,
    last_publication_day: Option<NaiveDate>,
}

impl Default for DayAhead {
    fn default() -> Self {
        Self::new(1.2, 0.8, 3)
    }
}

impl DayAhead {
    pub fn new(discharge_threshold: f64, charge_threshold: f64, control_exflow: u32) -> Self {
        Self {
            discharge_threshold,
            charge_threshold,
            control_exflow,
            series: None,
            plan: HashMap::new(),
            known_avg: 0.0,
            known_until: None,
            last_plan_day: None,
            last_publication_day: None,
        }
    }

    /// Scheduled action for `date` at `hour`; unplanned slots are idle.
    pub fn planned_action(&self, date: NaiveDate, hour: u32) -> PlannedAction {
        self.plan
            .get(&(date, hour))
            .copied()
            .unwrap_or(PlannedAction::Idle)
    }

    /// Mean of the prices visible when the plan was last built.
    pub fn known_avg(&self) -> f64 {
        self.known_avg
    }

    /// Last calendar day covered by visible prices.
    pub fn known_until(&self) -> Option<NaiveDate> {
        self.known_until
    }

    /// Rebuilds the plan from the prices visible at step `index`.
    ///
    /// If no price is visible the previous plan and mean stay in place.
    pub fn update_plan(&mut self, index: usize) {
        let Some(series) = self.series.as_ref() else {
            return;
        };
        let now = series.timestamp(index);
        let today = now.date();
        let published = now.hour() >= PUBLICATION_HOUR;

        let mut slots: Vec<(NaiveDate, u32)> = Vec::with_capacity(48);
        if published {
            slots.extend((now.hour()..24).map(|h| (today, h)));
            if let Some(tomorrow) = today.checked_add_days(Days::new(1)) {
                slots.extend((0..24).map(|h| (tomorrow, h)));
            }
        } else {
            slots.extend((0..24).map(|h| (today, h)));
        }

        let known: Vec<(NaiveDate, u32, f64)> = slots
            .into_iter()
            .filter_map(|(date, hour)| {
                series
                    .index_at(date, hour)
                    .map(|i| (date, hour, series.prices()[i]))
            })
            .collect();

        self.last_plan_day = Some(today);
        if published {
            self.last_publication_day = Some(today);
        }
        if known.is_empty() {
            trace!(index, "no visible prices, keeping the previous plan");
            return;
        }

        self.plan.clear();
        self.known_avg = known.iter().map(|k| k.2).sum::<f64>() / known.len() as f64;
        for &(date, hour, price) in &known {
            let action = if price >= self.discharge_threshold * self.known_avg {
                PlannedAction::Discharge
            } else if price <= self.charge_threshold * self.known_avg {
                PlannedAction::Charge
            } else {
                PlannedAction::Idle
            };
            self.plan.insert((date, hour), action);
        }
        self.known_until = known.last().map(|k| k.0);
        trace!(index, slots = known.len(), known_avg = self.known_avg, "day-ahead plan rebuilt");
    }

    fn refresh_if_due(&mut self, ctx: &DecisionContext) {
        let today = ctx.timestamp.date();
        let published = ctx.timestamp.hour() >= PUBLICATION_HOUR;
        if self.last_plan_day != Some(today)
            || (published && self.last_publication_day != Some(today))
        {
            self.update_plan(ctx.index);
        }
    }

    fn current_action(&self, ctx: &DecisionContext) -> PlannedAction {
        self.planned_action(ctx.timestamp.date(), ctx.timestamp.hour())
    }
}

impl Strategy for DayAhead {
    fn prepare(&mut self, series: &Arc<TimeSeries>) {
        self.series = Some(Arc::clone(series));
        self.update_plan(0);
    }

    fn should_charge(&mut self, ctx: &DecisionContext) -> bool {
        self.refresh_if_due(ctx);
        self.current_action(ctx) == PlannedAction::Charge
            && ctx.storage_kwh < ctx.max_soc * ctx.capacity_kwh
    }

    fn should_discharge(&mut self, ctx: &DecisionContext) -> bool {
        self.refresh_if_due(ctx);
        self.current_action(ctx) == PlannedAction::Discharge
            && ctx.storage_kwh > ctx.min_soc * ctx.capacity_kwh
    }

    fn should_export(&self, ctx: &DecisionContext) -> bool {
        ctx.price >= 0.0 && self.control_exflow > 1
    }

    fn charge_amount(&self, ctx: &DecisionContext) -> f64 {
        ctx.renew_kwh
            .min(ctx.max_step_kwh())
            .min(ctx.charge_headroom_kwh())
            .max(0.0)
    }

    /// Scales the allowed amount by how far the price sits between the
    /// discharge threshold and twice the known mean.
    fn discharge_amount(&self, ctx: &DecisionContext) -> f64 {
        let allowed = ctx.max_step_kwh().min(ctx.discharge_headroom_kwh());
        if self.known_avg <= 0.0 {
            return allowed;
        }
        let ratio = ctx.price / self.known_avg;
        let factor = saturation(
            ratio / 2.0,
            SATURATION_EXPONENT,
            self.discharge_threshold / 2.0,
            0.0,
        );
        factor * allowed
    }

    fn name(&self) -> &'static str {
        "day_ahead"
    }
}
