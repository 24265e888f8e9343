//! Generation and demand sources scaled from the reference profile.

use tracing::debug;

use crate::config::{ConfigError, SourceConfig};
use crate::profile::GridProfile;

/// Kind of plant feeding the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Constant generator output, no demand.
    Biogas,
    /// PV (and optional wind) park with its own, usually small, consumption.
    Solar,
    /// PV and wind supplying a local community's demand.
    Community,
}

/// A plant turning the reference profile into per-step energies.
///
/// Demand follows the sign of `year_demand_kwh`: negative values model
/// consumption in the generator sign convention, positive values model a
/// load that the engine may cover from the battery.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySource {
    pub kind: SourceKind,
    /// Constant biogas output (kW).
    pub constant_biogas_kw: f64,
    /// Installed PV peak power (kW).
    pub solar_max_power_kw: f64,
    /// Installed wind power (kW).
    pub wind_nominal_power_kw: f64,
    /// Annual demand (kWh, signed).
    pub year_demand_kwh: f64,
}

impl EnergySource {
    /// Builds a source from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `kind` names no known source.
    pub fn from_config(cfg: &SourceConfig) -> Result<Self, ConfigError> {
        let kind = match cfg.kind.as_str() {
            "biogas" => SourceKind::Biogas,
            "solar" => SourceKind::Solar,
            "community" => SourceKind::Community,
            other => {
                return Err(ConfigError {
                    field: "source.kind".into(),
                    message: format!("unknown source \"{other}\""),
                });
            }
        };
        Ok(Self {
            kind,
            constant_biogas_kw: cfg.constant_biogas_kw,
            solar_max_power_kw: cfg.solar_max_power_kw,
            wind_nominal_power_kw: cfg.wind_nominal_power_kw,
            year_demand_kwh: cfg.year_demand_kwh,
        })
    }

    /// Renewable input and demand per step (kWh) for `profile`.
    ///
    /// PV and wind are scaled by their installed power relative to the
    /// profile's peak (a peak below 1 counts as 1). Demand is the profile's
    /// demand shape scaled to `year_demand_kwh` over the whole profile.
    pub fn energy(&self, profile: &GridProfile) -> (Vec<f64>, Vec<f64>) {
        let dt = profile.resolution_hours();
        let n = profile.len();
        let (renew, demand) = match self.kind {
            SourceKind::Biogas => (vec![self.constant_biogas_kw * dt; n], vec![0.0; n]),
            SourceKind::Solar | SourceKind::Community => {
                let solar_scale = self.solar_max_power_kw / peak(&profile.solar);
                let wind_scale = self.wind_nominal_power_kw / peak(&profile.wind);
                let renew = profile
                    .solar
                    .iter()
                    .zip(&profile.wind)
                    .map(|(s, w)| (s * solar_scale + w * wind_scale) * dt)
                    .collect();

                let total: f64 = profile.demand.iter().sum();
                let demand = if total.abs() > f64::EPSILON {
                    profile
                        .demand
                        .iter()
                        .map(|d| d * self.year_demand_kwh / total)
                        .collect()
                } else {
                    vec![0.0; n]
                };
                (renew, demand)
            }
        };
        debug!(
            kind = ?self.kind,
            renew_kwh = renew.iter().sum::<f64>(),
            demand_kwh = demand.iter().sum::<f64>(),
            "source energies computed"
        );
        (renew, demand)
    }
}

fn peak(values: &[f64]) -> f64 {
    values.iter().copied().fold(1.0, f64::max)
}
