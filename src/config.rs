//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::devices::BatteryParams;
use crate::sim::kpi::Economics;
use crate::sim::strategy::BmsStrategy;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the biogas scenario. Load from TOML
/// with [`ScenarioConfig::from_toml_file`] or use one of the presets.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation calendar and random seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Generation and demand source.
    #[serde(default)]
    pub source: SourceConfig,
    /// Spot price input and tariff economics.
    #[serde(default)]
    pub prices: PricesConfig,
    /// Physical battery parameters shared by all sweep candidates.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Decision policy and its parameters.
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Capacity/power candidates.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Optional result files.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Simulation calendar and random seed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First timestamp of the series (wall clock).
    pub start: NaiveDateTime,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Step length in minutes (must divide 60 or be a multiple of 60).
    pub resolution_minutes: u32,
    /// Seed for synthetic profiles and prices.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            days: 28,
            resolution_minutes: 60,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Step length in hours.
    pub fn resolution_hours(&self) -> f64 {
        f64::from(self.resolution_minutes) / 60.0
    }

    /// Number of timesteps covered by `days`.
    pub fn steps(&self) -> usize {
        if self.resolution_minutes == 0 {
            return 0;
        }
        self.days * 24 * 60 / self.resolution_minutes as usize
    }
}

/// Generation and demand source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Source type: `"biogas"`, `"solar"` or `"community"`.
    pub kind: String,
    /// Constant biogas generator output (kW).
    pub constant_biogas_kw: f64,
    /// Installed PV peak power (kW).
    pub solar_max_power_kw: f64,
    /// Installed onshore wind power (kW).
    pub wind_nominal_power_kw: f64,
    /// Annual demand the reference profile is scaled to (kWh, sign kept).
    pub year_demand_kwh: f64,
    /// Reference profile CSV (`timestamp,solar,wind,demand`); synthetic when absent.
    pub profile_csv: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "biogas".to_string(),
            constant_biogas_kw: 1000.0,
            solar_max_power_kw: 0.0,
            wind_nominal_power_kw: 0.0,
            year_demand_kwh: 0.0,
            profile_csv: None,
        }
    }
}

/// Spot price input and tariff economics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricesConfig {
    /// Use the fixed tariff for both price and average instead of spot prices.
    pub fix_contract: bool,
    /// Hourly price CSV (`time,price` in ct/kWh); synthetic when absent.
    pub price_csv: Option<PathBuf>,
    /// Fixed grid tariff (ct/kWh).
    pub fix_costs_per_kwh: f64,
    /// Direct marketing fee added to spot prices (€/kWh, may be negative).
    pub marketing_costs: f64,
    /// Width of the centered rolling average (hours, must be > 0).
    pub average_window_hours: usize,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            fix_contract: false,
            price_csv: None,
            fix_costs_per_kwh: 11.0,
            marketing_costs: 0.0,
            average_window_hours: 25,
        }
    }
}

impl PricesConfig {
    /// Tariff values used by the run summaries.
    pub fn economics(&self) -> Economics {
        Economics {
            fix_costs_per_kwh: self.fix_costs_per_kwh,
            marketing_costs: self.marketing_costs,
        }
    }
}

/// Physical battery parameters shared by all sweep candidates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Fraction of stored energy lost per hour.
    pub self_discharge_per_hour: f64,
    /// Charge efficiency (0.0–1.0].
    pub efficiency_charge: f64,
    /// Discharge efficiency (0.0–1.0].
    pub efficiency_discharge: f64,
    /// Lower SOC bound (0.0–1.0).
    pub min_soc: f64,
    /// Upper SOC bound (0.0–1.0).
    pub max_soc: f64,
    /// C-rate used when a candidate has no explicit power.
    pub max_c_rate: f64,
    /// Internal resistance (ohm).
    pub r0_ohm: f64,
    /// Nominal voltage (V).
    pub u_nom_v: f64,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        let p = BatteryParams::default();
        Self {
            self_discharge_per_hour: p.self_discharge_per_hour,
            efficiency_charge: p.efficiency_charge,
            efficiency_discharge: p.efficiency_discharge,
            min_soc: p.min_soc,
            max_soc: p.max_soc,
            max_c_rate: p.max_c_rate,
            r0_ohm: p.r0_ohm,
            u_nom_v: p.u_nom_v,
            initial_soc: 0.5,
        }
    }
}

impl BatteryConfig {
    /// Typed battery parameters for [`crate::devices::Battery::new`].
    pub fn params(&self) -> BatteryParams {
        BatteryParams {
            self_discharge_per_hour: self.self_discharge_per_hour,
            efficiency_charge: self.efficiency_charge,
            efficiency_discharge: self.efficiency_discharge,
            min_soc: self.min_soc,
            max_soc: self.max_soc,
            max_c_rate: self.max_c_rate,
            r0_ohm: self.r0_ohm,
            u_nom_v: self.u_nom_v,
        }
    }
}

/// Decision policy and its parameters.
///
/// Only the fields of the selected `kind` take effect.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    /// Policy: `"price_threshold"`, `"dynamic_discharge"` or `"day_ahead"`.
    pub kind: String,
    /// Price-threshold multiplier on the rolling average.
    pub load_threshold: f64,
    /// Price-threshold upper multiplier (parsed, not used by the rule).
    pub load_threshold_high: f64,
    /// Price-threshold export multiplier (parsed, not used by the rule).
    pub export_threshold: f64,
    /// SOC margin kept away from the bounds by the dynamic policy.
    pub limit_soc_threshold: f64,
    /// Export control flag; exporting is allowed when greater than 1.
    pub control_exflow: u32,
    /// Day-ahead discharge multiplier on the known mean (must be < 2.0).
    pub discharge_threshold: f64,
    /// Day-ahead charge multiplier on the known mean.
    pub charge_threshold: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: "price_threshold".to_string(),
            load_threshold: 1.0,
            load_threshold_high: 1.2,
            export_threshold: 0.9,
            limit_soc_threshold: 0.05,
            control_exflow: 3,
            discharge_threshold: 1.2,
            charge_threshold: 0.8,
        }
    }
}

/// Capacity/power candidates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Battery capacities (kWh).
    pub capacities_kwh: Vec<f64>,
    /// Battery powers (kW), one per capacity.
    pub powers_kw: Vec<f64>,
    /// Prepend a zero-capacity run as the revenue baseline.
    pub include_baseline: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            capacities_kwh: vec![1000.0, 5000.0, 10000.0, 20000.0, 100000.0],
            powers_kw: vec![500.0, 2500.0, 5000.0, 10000.0, 50000.0],
            include_baseline: true,
        }
    }
}

/// Optional result files; command-line flags take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Per-step CSV of the largest candidate.
    pub steps_csv: Option<PathBuf>,
    /// Summary table as CSV.
    pub summary_csv: Option<PathBuf>,
    /// Summary table as JSON.
    pub summary_json: Option<PathBuf>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.days"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Constant 1 MW biogas plant selling on the spot market.
    ///
    /// Exports only while the battery discharges.
    pub fn biogas() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            source: SourceConfig::default(),
            prices: PricesConfig {
                marketing_costs: -0.003,
                ..PricesConfig::default()
            },
            battery: BatteryConfig::default(),
            strategy: StrategyConfig {
                control_exflow: 0,
                ..StrategyConfig::default()
            },
            sweep: SweepConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// 10 MWp PV park with a small own consumption.
    pub fn solar() -> Self {
        Self {
            source: SourceConfig {
                kind: "solar".to_string(),
                constant_biogas_kw: 0.0,
                solar_max_power_kw: 10_000.0,
                year_demand_kwh: -100_000.0,
                ..SourceConfig::default()
            },
            strategy: StrategyConfig {
                kind: "dynamic_discharge".to_string(),
                ..StrategyConfig::default()
            },
            ..Self::biogas()
        }
    }

    /// Mixed PV and wind supplying a local community.
    pub fn community() -> Self {
        Self {
            source: SourceConfig {
                kind: "community".to_string(),
                constant_biogas_kw: 0.0,
                solar_max_power_kw: 5000.0,
                wind_nominal_power_kw: 5000.0,
                year_demand_kwh: 2804.0 * 1000.0 * 6.0,
                ..SourceConfig::default()
            },
            prices: PricesConfig {
                marketing_costs: 0.003,
                ..PricesConfig::default()
            },
            strategy: StrategyConfig {
                kind: "dynamic_discharge".to_string(),
                ..StrategyConfig::default()
            },
            ..Self::biogas()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["biogas", "solar", "community"];

    /// Source kinds accepted in `source.kind`.
    pub const SOURCES: &[&str] = &["biogas", "solar", "community"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "biogas" => Ok(Self::biogas()),
            "solar" => Ok(Self::solar()),
            "community" => Ok(Self::community()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        let r = s.resolution_minutes;
        if r == 0 || (r < 60 && 60 % r != 0) || (r > 60 && r % 60 != 0) {
            errors.push(ConfigError::new(
                "simulation.resolution_minutes",
                format!("must divide 60 or be a multiple of 60, got {r}"),
            ));
        }

        let src = &self.source;
        if !Self::SOURCES.contains(&src.kind.as_str()) {
            errors.push(ConfigError::new(
                "source.kind",
                format!(
                    "must be one of {}, got \"{}\"",
                    Self::SOURCES.join(", "),
                    src.kind
                ),
            ));
        }
        for (field, value) in [
            ("source.constant_biogas_kw", src.constant_biogas_kw),
            ("source.solar_max_power_kw", src.solar_max_power_kw),
            ("source.wind_nominal_power_kw", src.wind_nominal_power_kw),
        ] {
            if value < 0.0 {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }

        let p = &self.prices;
        if p.average_window_hours == 0 {
            errors.push(ConfigError::new("prices.average_window_hours", "must be > 0"));
        }
        if p.fix_costs_per_kwh < 0.0 {
            errors.push(ConfigError::new("prices.fix_costs_per_kwh", "must be >= 0"));
        }

        let bat = &self.battery;
        for (field, value) in [
            ("battery.efficiency_charge", bat.efficiency_charge),
            ("battery.efficiency_discharge", bat.efficiency_discharge),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                errors.push(ConfigError::new(field, "must be in (0.0, 1.0]"));
            }
        }
        for (field, value) in [
            ("battery.min_soc", bat.min_soc),
            ("battery.max_soc", bat.max_soc),
            ("battery.initial_soc", bat.initial_soc),
            ("battery.self_discharge_per_hour", bat.self_discharge_per_hour),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
            }
        }
        if bat.min_soc > bat.max_soc {
            errors.push(ConfigError::new("battery.min_soc", "must be <= battery.max_soc"));
        }
        if bat.max_c_rate <= 0.0 {
            errors.push(ConfigError::new("battery.max_c_rate", "must be > 0"));
        }
        if bat.r0_ohm < 0.0 {
            errors.push(ConfigError::new("battery.r0_ohm", "must be >= 0"));
        }

        let st = &self.strategy;
        if let Err(e) = BmsStrategy::from_config(st) {
            errors.push(e);
        }
        if st.load_threshold <= 0.0 {
            errors.push(ConfigError::new("strategy.load_threshold", "must be > 0"));
        }
        if st.load_threshold_high < st.load_threshold {
            errors.push(ConfigError::new(
                "strategy.load_threshold_high",
                "must be >= strategy.load_threshold",
            ));
        }
        if !(0.0..0.5).contains(&st.limit_soc_threshold) {
            errors.push(ConfigError::new(
                "strategy.limit_soc_threshold",
                "must be in [0.0, 0.5)",
            ));
        }
        if !(st.discharge_threshold > 0.0 && st.discharge_threshold < 2.0) {
            errors.push(ConfigError::new(
                "strategy.discharge_threshold",
                format!("must be in (0.0, 2.0), got {}", st.discharge_threshold),
            ));
        }
        if st.charge_threshold >= st.discharge_threshold {
            errors.push(ConfigError::new(
                "strategy.charge_threshold",
                "must be < strategy.discharge_threshold",
            ));
        }

        let sw = &self.sweep;
        if sw.capacities_kwh.len() != sw.powers_kw.len() {
            errors.push(ConfigError::new(
                "sweep.powers_kw",
                format!(
                    "has {} entries but sweep.capacities_kwh has {}",
                    sw.powers_kw.len(),
                    sw.capacities_kwh.len()
                ),
            ));
        }
        if sw.capacities_kwh.is_empty() && !sw.include_baseline {
            errors.push(ConfigError::new("sweep.capacities_kwh", "must not be empty"));
        }
        if sw.capacities_kwh.iter().any(|c| *c < 0.0) {
            errors.push(ConfigError::new("sweep.capacities_kwh", "must be >= 0"));
        }
        if sw.powers_kw.iter().any(|p| *p < 0.0) {
            errors.push(ConfigError::new("sweep.powers_kw", "must be >= 0"));
        }

        errors
    }
}
