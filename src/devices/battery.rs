use serde::Serialize;

/// Physical parameters shared by every battery in a capacity sweep.
///
/// Capacity and power vary per sweep candidate and are passed to
/// [`Battery::new`] separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryParams {
    /// Fraction of stored energy lost per hour while idle or active.
    pub self_discharge_per_hour: f64,
    /// Charging efficiency (0..1.0].
    pub efficiency_charge: f64,
    /// Discharging efficiency (0..1.0].
    pub efficiency_discharge: f64,
    /// Lower state-of-charge bound as a fraction of capacity.
    pub min_soc: f64,
    /// Upper state-of-charge bound as a fraction of capacity.
    pub max_soc: f64,
    /// C-rate used to derive the power limit when none is given.
    pub max_c_rate: f64,
    /// Internal resistance in ohms.
    pub r0_ohm: f64,
    /// Nominal terminal voltage in volts.
    pub u_nom_v: f64,
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            self_discharge_per_hour: 0.0005,
            efficiency_charge: 0.96,
            efficiency_discharge: 0.96,
            min_soc: 0.05,
            max_soc: 0.95,
            max_c_rate: 0.5,
            r0_ohm: 0.006,
            u_nom_v: 800.0,
        }
    }
}

/// A single battery instruction for one timestep.
///
/// Charging and discharging are mutually exclusive within a step; amounts
/// are gross energies in kWh requested over the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryCommand {
    Idle,
    Charge(f64),
    Discharge(f64),
}

/// What happened inside the battery during one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryOutcome {
    /// Stored energy after the step (kWh).
    pub storage_kwh: f64,
    /// State of charge after the step (0.0 to 1.0).
    pub soc: f64,
    /// Energy that ended up in storage from charging (kWh).
    pub stored_kwh: f64,
    /// Energy delivered at the terminals after losses (kWh).
    pub net_discharge_kwh: f64,
    /// Resistive (I²R) loss (kWh).
    pub loss_kwh: f64,
    /// Energy removed by conversion efficiency, self-discharge and SOC
    /// clamping (kWh). Negative when the lower clamp lifts storage.
    pub dissipated_kwh: f64,
}

/// A stationary battery with resistive losses, conversion efficiency,
/// self-discharge and hard state-of-charge limits.
///
/// Storage is clamped into `[min_soc, max_soc] * capacity` after every call
/// to [`Battery::execute`]. A zero-capacity battery is valid and acts as the
/// no-storage baseline.
#[derive(Debug, Clone)]
pub struct Battery {
    /// Usable capacity in kilowatt-hours.
    pub capacity_kwh: f64,

    /// Maximum charge or discharge power in kilowatts.
    pub power_limit_kw: f64,

    /// Currently stored energy in kilowatt-hours.
    pub storage_kwh: f64,

    params: BatteryParams,
    history: Vec<BatteryOutcome>,
}

impl Battery {
    /// Creates a new battery.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Capacity in kWh (may be zero for a baseline run)
    /// * `power_limit_kw` - Power limit in kW, defaults to `max_c_rate * capacity`
    /// * `initial_storage_kwh` - Starting energy in kWh, defaults to half the capacity
    /// * `params` - Physical parameters
    ///
    /// # Panics
    ///
    /// Panics if capacity, power or initial storage are negative, the initial
    /// storage exceeds capacity, efficiencies are outside (0, 1], the SOC
    /// window is inverted or outside [0, 1], self-discharge is outside
    /// [0, 1], or the internal resistance is negative.
    pub fn new(
        capacity_kwh: f64,
        power_limit_kw: Option<f64>,
        initial_storage_kwh: Option<f64>,
        params: BatteryParams,
    ) -> Self {
        assert!(capacity_kwh >= 0.0, "capacity_kwh must be >= 0");
        assert!(
            params.efficiency_charge > 0.0 && params.efficiency_charge <= 1.0,
            "efficiency_charge must be in (0, 1]"
        );
        assert!(
            params.efficiency_discharge > 0.0 && params.efficiency_discharge <= 1.0,
            "efficiency_discharge must be in (0, 1]"
        );
        assert!(
            (0.0..=1.0).contains(&params.min_soc) && (0.0..=1.0).contains(&params.max_soc),
            "SOC bounds must be in [0, 1]"
        );
        assert!(params.min_soc <= params.max_soc, "min_soc must be <= max_soc");
        assert!(
            (0.0..=1.0).contains(&params.self_discharge_per_hour),
            "self_discharge_per_hour must be in [0, 1]"
        );
        assert!(params.r0_ohm >= 0.0, "r0_ohm must be >= 0");

        let power_limit_kw = power_limit_kw.unwrap_or(params.max_c_rate * capacity_kwh);
        assert!(power_limit_kw >= 0.0, "power_limit_kw must be >= 0");

        let storage_kwh = initial_storage_kwh.unwrap_or(0.5 * capacity_kwh);
        assert!(
            (0.0..=capacity_kwh).contains(&storage_kwh),
            "initial storage must be within [0, capacity]"
        );

        Self {
            capacity_kwh,
            power_limit_kw,
            storage_kwh,
            params,
            history: Vec::new(),
        }
    }

    /// Physical parameters of this battery.
    pub fn params(&self) -> &BatteryParams {
        &self.params
    }

    /// State of charge as a fraction of capacity; 0.0 for a zero-capacity battery.
    pub fn soc(&self) -> f64 {
        if self.capacity_kwh == 0.0 {
            return 0.0;
        }
        self.storage_kwh / self.capacity_kwh
    }

    /// Lowest allowed storage level (kWh).
    pub fn min_storage_kwh(&self) -> f64 {
        self.params.min_soc * self.capacity_kwh
    }

    /// Highest allowed storage level (kWh).
    pub fn max_storage_kwh(&self) -> f64 {
        self.params.max_soc * self.capacity_kwh
    }

    /// Resistive loss for moving `power_kw` through the internal resistance for `dt_h` hours.
    ///
    /// Returns 0.0 when resistance, voltage or power is zero.
    pub fn resistive_loss_kwh(&self, power_kw: f64, dt_h: f64) -> f64 {
        if self.params.r0_ohm <= 0.0 || self.params.u_nom_v <= 0.0 || power_kw == 0.0 {
            return 0.0;
        }
        let current_a = power_kw.abs() * 1000.0 / self.params.u_nom_v;
        let loss_w = current_a * current_a * self.params.r0_ohm;
        loss_w * dt_h / 1000.0
    }

    /// Applies one command over a step of `dt_h` hours.
    ///
    /// Charging stores `max(0, amount - loss) * eta_c`. Discharging delivers
    /// `max(0, amount - loss) * eta_d` and draws `amount / eta_d` from storage.
    /// Self-discharge is applied on every call, then storage is clamped to the
    /// SOC window. Non-positive amounts behave like [`BatteryCommand::Idle`].
    ///
    /// The outcome is also appended to the run history.
    pub fn execute(&mut self, command: BatteryCommand, dt_h: f64) -> BatteryOutcome {
        debug_assert!(dt_h > 0.0, "dt_h must be > 0");
        let before_kwh = self.storage_kwh;
        let mut charged_kwh = 0.0;
        let mut stored_kwh = 0.0;
        let mut delivered_kwh = 0.0;
        let mut loss_kwh = 0.0;

        match command {
            BatteryCommand::Charge(amount) if amount > 0.0 => {
                loss_kwh = self.resistive_loss_kwh(amount / dt_h, dt_h);
                stored_kwh = (amount - loss_kwh).max(0.0) * self.params.efficiency_charge;
                charged_kwh = amount;
                self.storage_kwh += stored_kwh;
            }
            BatteryCommand::Discharge(amount) if amount > 0.0 => {
                loss_kwh = self.resistive_loss_kwh(amount / dt_h, dt_h);
                delivered_kwh = (amount - loss_kwh).max(0.0) * self.params.efficiency_discharge;
                self.storage_kwh -= amount / self.params.efficiency_discharge;
            }
            _ => {}
        }

        self.storage_kwh *= 1.0 - self.params.self_discharge_per_hour * dt_h;
        self.storage_kwh = self
            .storage_kwh
            .clamp(self.min_storage_kwh(), self.max_storage_kwh());

        let outcome = BatteryOutcome {
            storage_kwh: self.storage_kwh,
            soc: self.soc(),
            stored_kwh,
            net_discharge_kwh: delivered_kwh,
            loss_kwh,
            dissipated_kwh: before_kwh + charged_kwh
                - self.storage_kwh
                - delivered_kwh
                - loss_kwh,
        };
        self.history.push(outcome);
        outcome
    }

    /// Outcomes of every `execute` call since construction or the last reset.
    pub fn history(&self) -> &[BatteryOutcome] {
        &self.history
    }

    /// Restores the starting storage and clears the history.
    ///
    /// `initial_storage_kwh` defaults to half the capacity.
    pub fn reset(&mut self, initial_storage_kwh: Option<f64>) {
        self.storage_kwh = initial_storage_kwh
            .unwrap_or(0.5 * self.capacity_kwh)
            .clamp(0.0, self.capacity_kwh);
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params(min_soc: f64, max_soc: f64) -> BatteryParams {
        BatteryParams {
            min_soc,
            max_soc,
            ..BatteryParams::default()
        }
    }

    #[test]
    fn test_new_battery_defaults() {
        let battery = Battery::new(1000.0, None, None, BatteryParams::default());
        assert_eq!(battery.capacity_kwh, 1000.0);
        assert_eq!(battery.power_limit_kw, 500.0);
        assert_eq!(battery.storage_kwh, 500.0);
        assert_eq!(battery.params().efficiency_charge, 0.96);
        assert_eq!(battery.params().efficiency_discharge, 0.96);
    }

    #[test]
    fn test_soc_fraction() {
        let mut battery = Battery::new(1000.0, Some(500.0), None, BatteryParams::default());
        battery.storage_kwh = 750.0;
        assert_eq!(battery.soc(), 0.75);
    }

    #[test]
    fn test_zero_capacity_soc_is_zero() {
        let mut battery = Battery::new(0.0, Some(0.0), None, BatteryParams::default());
        assert_eq!(battery.soc(), 0.0);
        let outcome = battery.execute(BatteryCommand::Idle, 1.0);
        assert_eq!(outcome.storage_kwh, 0.0);
        assert_eq!(outcome.soc, 0.0);
    }

    #[test]
    #[should_panic]
    fn test_negative_capacity() {
        Battery::new(-1.0, None, None, BatteryParams::default());
    }

    #[test]
    #[should_panic]
    fn test_inverted_soc_window() {
        Battery::new(100.0, None, None, params(0.9, 0.1));
    }

    #[test]
    #[should_panic]
    fn test_efficiency_above_one() {
        let p = BatteryParams {
            efficiency_charge: 1.1,
            ..BatteryParams::default()
        };
        Battery::new(100.0, None, None, p);
    }

    #[test]
    #[should_panic]
    fn test_initial_storage_above_capacity() {
        Battery::new(100.0, None, Some(150.0), BatteryParams::default());
    }

    #[test]
    fn test_resistive_loss_formula() {
        let battery = Battery::new(1000.0, Some(500.0), None, BatteryParams::default());
        // 100 kW at 800 V = 125 A; 125² * 0.006 Ω = 93.75 W over 1 h
        assert_abs_diff_eq!(battery.resistive_loss_kwh(100.0, 1.0), 0.09375, epsilon = 1e-12);
        assert_eq!(battery.resistive_loss_kwh(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_resistive_loss_zero_without_resistance() {
        let p = BatteryParams {
            r0_ohm: 0.0,
            ..BatteryParams::default()
        };
        let battery = Battery::new(1000.0, None, None, p);
        assert_eq!(battery.resistive_loss_kwh(250.0, 1.0), 0.0);
    }

    #[test]
    fn test_charge_increases_storage_with_losses() {
        let mut battery = Battery::new(1000.0, Some(500.0), Some(500.0), params(0.1, 0.9));
        let outcome = battery.execute(BatteryCommand::Charge(100.0), 1.0);
        assert!(outcome.storage_kwh > 500.0);
        assert!(outcome.loss_kwh > 0.0);
        assert!(outcome.stored_kwh < 100.0);
        assert_eq!(outcome.net_discharge_kwh, 0.0);
    }

    #[test]
    fn test_discharge_decreases_storage_with_losses() {
        let mut battery = Battery::new(1000.0, Some(500.0), Some(600.0), BatteryParams::default());
        let outcome = battery.execute(BatteryCommand::Discharge(100.0), 1.0);
        assert!(outcome.storage_kwh < 600.0);
        assert!(outcome.net_discharge_kwh > 0.0);
        assert!(outcome.net_discharge_kwh < 100.0);
        assert_eq!(outcome.stored_kwh, 0.0);
        assert!(outcome.loss_kwh > 0.0);
    }

    #[test]
    fn test_discharge_draws_more_than_delivered() {
        let p = BatteryParams {
            self_discharge_per_hour: 0.0,
            r0_ohm: 0.0,
            efficiency_discharge: 0.8,
            ..BatteryParams::default()
        };
        let mut battery = Battery::new(1000.0, None, Some(500.0), p);
        let outcome = battery.execute(BatteryCommand::Discharge(80.0), 1.0);
        assert_abs_diff_eq!(outcome.net_discharge_kwh, 64.0, epsilon = 1e-9);
        assert_abs_diff_eq!(outcome.storage_kwh, 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_idle_only_self_discharges() {
        let p = BatteryParams {
            self_discharge_per_hour: 0.001,
            ..BatteryParams::default()
        };
        let mut battery = Battery::new(1000.0, Some(500.0), Some(500.0), p);
        let outcome = battery.execute(BatteryCommand::Idle, 1.0);
        assert_abs_diff_eq!(outcome.storage_kwh, 499.5, epsilon = 1e-9);
        assert_eq!(outcome.stored_kwh, 0.0);
        assert_eq!(outcome.net_discharge_kwh, 0.0);
        assert_eq!(outcome.loss_kwh, 0.0);
    }

    #[test]
    fn test_zero_amounts_behave_like_idle() {
        let mut a = Battery::new(1000.0, None, None, BatteryParams::default());
        let mut b = a.clone();
        let idle = a.execute(BatteryCommand::Idle, 0.25);
        let zero = b.execute(BatteryCommand::Charge(0.0), 0.25);
        assert_eq!(idle, zero);
    }

    #[test]
    fn test_clamped_to_min_soc() {
        let mut battery = Battery::new(1000.0, Some(500.0), Some(150.0), params(0.1, 0.9));
        let outcome = battery.execute(BatteryCommand::Discharge(200.0), 1.0);
        assert_abs_diff_eq!(outcome.storage_kwh, 100.0, epsilon = 1e-9);
        assert!(outcome.dissipated_kwh < outcome.net_discharge_kwh);
    }

    #[test]
    fn test_clamped_to_max_soc() {
        let mut battery = Battery::new(1000.0, Some(500.0), Some(880.0), params(0.1, 0.9));
        let outcome = battery.execute(BatteryCommand::Charge(200.0), 1.0);
        assert_abs_diff_eq!(outcome.storage_kwh, 900.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ledger_closes_for_every_command() {
        let mut battery = Battery::new(1000.0, Some(500.0), Some(500.0), params(0.1, 0.9));
        let commands = [
            BatteryCommand::Charge(300.0),
            BatteryCommand::Idle,
            BatteryCommand::Discharge(450.0),
            BatteryCommand::Discharge(450.0),
            BatteryCommand::Charge(500.0),
        ];
        for command in commands {
            let before = battery.storage_kwh;
            let charge_in = match command {
                BatteryCommand::Charge(amount) => amount,
                _ => 0.0,
            };
            let out = battery.execute(command, 1.0);
            let balance = before + charge_in
                - out.storage_kwh
                - out.net_discharge_kwh
                - out.loss_kwh
                - out.dissipated_kwh;
            assert_abs_diff_eq!(balance, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_history_and_reset() {
        let mut battery = Battery::new(100.0, None, None, BatteryParams::default());
        battery.execute(BatteryCommand::Charge(10.0), 1.0);
        battery.execute(BatteryCommand::Idle, 1.0);
        assert_eq!(battery.history().len(), 2);

        battery.reset(Some(20.0));
        assert!(battery.history().is_empty());
        assert_eq!(battery.storage_kwh, 20.0);

        battery.reset(None);
        assert_eq!(battery.storage_kwh, 50.0);
    }
}
