//! Assembles the shared input series for a scenario.

use std::sync::Arc;

use chrono::Timelike;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::devices::EnergySource;
use crate::error::{Error, Result};
use crate::prices::{PriceTable, fixed_contract};
use crate::profile::GridProfile;
use crate::series::TimeSeries;

/// Seed offset separating price noise from profile noise.
const PRICE_SEED_OFFSET: u64 = 1000;

/// Loads or generates the reference profile, scales it through the
/// configured source and attaches aligned prices.
///
/// A profile CSV is cut to `simulation.days`; its own start and resolution
/// take precedence over `simulation.start` and `resolution_minutes`.
///
/// # Errors
///
/// Returns an error if an input file cannot be read or parsed, the source
/// kind is unknown, or the assembled columns are inconsistent.
pub fn build_series(cfg: &ScenarioConfig) -> Result<Arc<TimeSeries>> {
    let sim = &cfg.simulation;
    let profile = match &cfg.source.profile_csv {
        Some(path) => {
            let mut profile = GridProfile::from_csv(path)?;
            let dt = profile.resolution_hours();
            let steps = (sim.days as f64 * 24.0 / dt).round() as usize;
            profile.truncate(steps.max(1));
            profile
        }
        None => GridProfile::synthetic(sim.start, sim.steps(), sim.resolution_hours(), sim.seed),
    };
    let (Some(&first), Some(&last)) = (profile.timestamps.first(), profile.timestamps.last())
    else {
        return Err(Error::InvalidData("scenario covers no timesteps".into()));
    };

    let source = EnergySource::from_config(&cfg.source)?;
    let (renew, demand) = source.energy(&profile);

    let p = &cfg.prices;
    let (price, avg_price) = if p.fix_contract {
        fixed_contract(profile.len(), p.fix_costs_per_kwh / 100.0, p.marketing_costs)
    } else {
        let table = match &p.price_csv {
            Some(path) => PriceTable::from_csv(path, p.average_window_hours)?,
            None => {
                let hours = ((last - first).num_hours() + 2) as usize;
                let start = first.date().and_hms_opt(first.hour(), 0, 0).unwrap_or(first);
                PriceTable::synthetic(
                    start,
                    hours,
                    sim.seed.wrapping_add(PRICE_SEED_OFFSET),
                    p.average_window_hours,
                )?
            }
        };
        table.align(&profile.timestamps, p.marketing_costs)?
    };

    let series = TimeSeries::new(profile.timestamps, renew, demand, price, avg_price)?;
    info!(
        source = %cfg.source.kind,
        steps = series.len(),
        resolution_h = series.resolution_hours(),
        "input series ready"
    );
    Ok(Arc::new(series))
}
