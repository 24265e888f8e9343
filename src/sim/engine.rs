//! Battery management engine that drives one battery through a time series.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::devices::{Battery, BatteryCommand};
use crate::series::TimeSeries;

use super::strategy::Strategy;
use super::types::{DecisionContext, StepAction, StepResult};

/// Battery management engine owning one battery and one strategy.
///
/// Generic over `S: Strategy` for static dispatch. Steps must run in order
/// because each step mutates the battery state the next one reads. The
/// series is shared read-only so several engines can run side by side.
pub struct Engine<S: Strategy> {
    series: Arc<TimeSeries>,
    battery: Battery,
    strategy: S,
    export_flags: Vec<bool>,
    initialized: bool,
}

impl<S: Strategy> Engine<S> {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `series` - Shared input series
    /// * `battery` - Battery owned by this run
    /// * `strategy` - Decision policy owned by this run
    pub fn new(series: Arc<TimeSeries>, battery: Battery, strategy: S) -> Self {
        let export_flags = vec![false; series.len()];
        Self {
            series,
            battery,
            strategy,
            export_flags,
            initialized: false,
        }
    }

    /// Hands the series to the strategy and computes its initial lookahead.
    ///
    /// Called automatically by [`Engine::run`]; call it explicitly before
    /// driving [`Engine::step`] by hand.
    pub fn initialize(&mut self) {
        self.strategy.prepare(&self.series);
        self.initialized = true;
    }

    /// Executes one timestep and returns its result.
    ///
    /// Exactly one of four branches applies, checked in order: discharge,
    /// charge, export only, idle.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range, or if the step would produce a
    /// negative export, which means the strategy or its configuration is
    /// inconsistent. The residual is unmet demand and never drops below zero.
    pub fn step(&mut self, index: usize) -> StepResult {
        let dt = self.series.resolution_hours();
        let (renew_kwh, demand_kwh) = self.series.energy(index);
        let (price, avg_price) = self.series.price(index);
        let params = *self.battery.params();

        // 1. Build the decision context
        let ctx = DecisionContext {
            index,
            timestamp: self.series.timestamp(index),
            renew_kwh,
            demand_kwh,
            price,
            avg_price,
            storage_kwh: self.battery.storage_kwh,
            capacity_kwh: self.battery.capacity_kwh,
            soc: self.battery.soc(),
            power_limit_kw: self.battery.power_limit_kw,
            resolution_hours: dt,
            min_soc: params.min_soc,
            max_soc: params.max_soc,
        };

        // 2. Resolve the branch and drive the battery
        let mut exported = false;
        let (action, outcome, export_kwh, charged_kwh) = if self.strategy.should_discharge(&ctx) {
            let amount = self.strategy.discharge_amount(&ctx);
            let outcome = self.battery.execute(BatteryCommand::Discharge(amount), dt);
            exported = true;
            (
                StepAction::Discharge,
                outcome,
                renew_kwh + outcome.net_discharge_kwh,
                0.0,
            )
        } else if self.strategy.should_charge(&ctx) {
            let amount = self.strategy.charge_amount(&ctx);
            let outcome = self.battery.execute(BatteryCommand::Charge(amount), dt);
            let leftover = renew_kwh - amount;
            let export = if leftover > 0.0 && self.strategy.should_export(&ctx) {
                exported = true;
                leftover
            } else {
                0.0
            };
            (StepAction::Charge, outcome, export, amount)
        } else if self.strategy.should_export(&ctx) {
            let outcome = self.battery.execute(BatteryCommand::Idle, dt);
            let export = renew_kwh.max(0.0);
            exported = export > 0.0;
            (StepAction::ExportOnly, outcome, export, 0.0)
        } else {
            let outcome = self.battery.execute(BatteryCommand::Idle, dt);
            (StepAction::Idle, outcome, 0.0, 0.0)
        };
        self.export_flags[index] = exported;

        // 3. Grid balance
        assert!(
            export_kwh >= 0.0,
            "negative export {export_kwh} kWh at step {index} ({})",
            self.strategy.name()
        );
        // surplus generation is export or curtailment, not negative residual
        let residual_kwh = (demand_kwh.abs() - renew_kwh - outcome.net_discharge_kwh).max(0.0);

        let curtailed_kwh = match action {
            StepAction::Discharge => 0.0,
            _ => (renew_kwh - charged_kwh - export_kwh).max(0.0),
        };

        let result = StepResult {
            timestep: index,
            timestamp: ctx.timestamp,
            action,
            renew_kwh,
            demand_kwh,
            storage_kwh: outcome.storage_kwh,
            soc: outcome.soc,
            stored_kwh: outcome.stored_kwh,
            net_discharge_kwh: outcome.net_discharge_kwh,
            loss_kwh: outcome.loss_kwh,
            dissipated_kwh: outcome.dissipated_kwh,
            export_kwh,
            residual_kwh,
            curtailed_kwh,
            price,
            avg_price,
        };
        trace!(%result, "step");
        result
    }

    /// Runs every timestep in order and returns the results.
    pub fn run(&mut self) -> Vec<StepResult> {
        if !self.initialized {
            self.initialize();
        }
        debug!(
            strategy = self.strategy.name(),
            capacity_kwh = self.battery.capacity_kwh,
            power_kw = self.battery.power_limit_kw,
            steps = self.series.len(),
            "run started"
        );
        let mut results = Vec::with_capacity(self.series.len());
        for i in 0..self.series.len() {
            results.push(self.step(i));
        }
        debug!(
            strategy = self.strategy.name(),
            capacity_kwh = self.battery.capacity_kwh,
            final_storage_kwh = self.battery.storage_kwh,
            "run finished"
        );
        results
    }

    /// Per-step flags marking steps that sold energy to the grid.
    pub fn export_flags(&self) -> &[bool] {
        &self.export_flags
    }

    /// Returns a reference to the battery.
    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    /// Returns a reference to the strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the shared series.
    pub fn series(&self) -> &Arc<TimeSeries> {
        &self.series
    }
}
