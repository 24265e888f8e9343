//! Post-hoc financial summaries computed from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

/// Tariff values used to price residual and exported energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Economics {
    /// Fixed grid tariff (ct/kWh).
    pub fix_costs_per_kwh: f64,
    /// Direct marketing fee deducted from export revenue (€/kWh).
    pub marketing_costs: f64,
}

impl Default for Economics {
    fn default() -> Self {
        Self {
            fix_costs_per_kwh: 11.0,
            marketing_costs: 0.0,
        }
    }
}

impl Economics {
    /// Fixed tariff in €/kWh.
    pub fn fix_cost_eur_per_kwh(&self) -> f64 {
        self.fix_costs_per_kwh / 100.0
    }
}

/// Aggregate energy and money figures of one capacity run.
///
/// Computed post-hoc from `Vec<StepResult>` to ensure consistency between
/// step data and reported metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub capacity_kwh: f64,
    pub power_kw: f64,
    /// Unmet demand bought from the grid (kWh).
    pub residual_kwh: f64,
    pub export_kwh: f64,
    /// Resistive battery loss (kWh).
    pub loss_kwh: f64,
    /// Signed demand total (kWh).
    pub demand_kwh: f64,
    pub renew_kwh: f64,
    pub curtailed_kwh: f64,
    /// Share of demand met without grid purchase; 1.0 without positive demand.
    pub autarky_rate: f64,
    /// Residual energy priced at spot (€).
    pub spot_cost_eur: f64,
    /// Residual energy priced at the fixed tariff (€).
    pub fix_cost_eur: f64,
    /// Export priced at spot minus marketing costs (€).
    pub revenue_eur: f64,
    /// Hours in which energy was sold.
    pub export_hours: f64,
    pub net_profit_spot_eur: f64,
    pub net_profit_fix_eur: f64,
    pub final_storage_kwh: f64,
}

impl RunSummary {
    /// Computes the summary of one run.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Battery capacity of the run
    /// * `power_kw` - Battery power of the run
    /// * `results` - Complete step results of the run
    /// * `export_flags` - Per-step export flags from the engine
    /// * `resolution_hours` - Timestep duration in hours
    /// * `economics` - Tariff values
    pub fn from_results(
        capacity_kwh: f64,
        power_kw: f64,
        results: &[StepResult],
        export_flags: &[bool],
        resolution_hours: f64,
        economics: &Economics,
    ) -> Self {
        let mut residual = 0.0;
        let mut export = 0.0;
        let mut loss = 0.0;
        let mut demand = 0.0;
        let mut renew = 0.0;
        let mut curtailed = 0.0;
        let mut spot_cost = 0.0;
        let mut revenue = 0.0;

        for r in results {
            residual += r.residual_kwh;
            export += r.export_kwh;
            loss += r.loss_kwh;
            demand += r.demand_kwh;
            renew += r.renew_kwh;
            curtailed += r.curtailed_kwh;
            spot_cost += r.residual_kwh * r.price;
            revenue += r.export_kwh * (r.price - economics.marketing_costs);
        }

        let autarky_rate = if demand > 0.0 {
            1.0 - residual / demand
        } else {
            1.0
        };
        let fix_cost = residual * economics.fix_cost_eur_per_kwh();
        let export_steps = export_flags.iter().filter(|f| **f).count();

        Self {
            capacity_kwh,
            power_kw,
            residual_kwh: residual,
            export_kwh: export,
            loss_kwh: loss,
            demand_kwh: demand,
            renew_kwh: renew,
            curtailed_kwh: curtailed,
            autarky_rate,
            spot_cost_eur: spot_cost,
            fix_cost_eur: fix_cost,
            revenue_eur: revenue,
            export_hours: export_steps as f64 * resolution_hours,
            net_profit_spot_eur: revenue - spot_cost,
            net_profit_fix_eur: revenue - fix_cost,
            final_storage_kwh: results.last().map_or(0.0, |r| r.storage_kwh),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- Run {:.0} kWh / {:.0} kW ---",
            self.capacity_kwh, self.power_kw
        )?;
        writeln!(f, "Residual:        {:.2} kWh", self.residual_kwh)?;
        writeln!(f, "Export:          {:.2} kWh", self.export_kwh)?;
        writeln!(f, "Export time:     {:.1} h", self.export_hours)?;
        writeln!(f, "Loss:            {:.2} kWh", self.loss_kwh)?;
        writeln!(f, "Autarky:         {:.3}", self.autarky_rate)?;
        writeln!(f, "Spot cost:       {:.2} EUR", self.spot_cost_eur)?;
        writeln!(f, "Fixed cost:      {:.2} EUR", self.fix_cost_eur)?;
        write!(f, "Revenue:         {:.2} EUR", self.revenue_eur)
    }
}

/// Revenue gain of one run over the baseline row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityRoi {
    pub capacity_kwh: f64,
    pub power_kw: f64,
    pub export_kwh: f64,
    pub export_hours: f64,
    pub autarky_rate: f64,
    pub revenue_eur: f64,
    /// Revenue minus the first row's revenue (€).
    pub revenue_gain_eur: f64,
    /// Revenue gain per kWh of capacity; `None` for zero capacity.
    pub eur_per_kwh: Option<f64>,
}

/// Compares every run with the first one, which is taken as the baseline.
///
/// An empty input yields an empty vector.
pub fn capacity_roi(summaries: &[RunSummary]) -> Vec<CapacityRoi> {
    let Some(baseline) = summaries.first() else {
        return Vec::new();
    };
    summaries
        .iter()
        .map(|s| {
            let gain = s.revenue_eur - baseline.revenue_eur;
            CapacityRoi {
                capacity_kwh: s.capacity_kwh,
                power_kw: s.power_kw,
                export_kwh: s.export_kwh,
                export_hours: s.export_hours,
                autarky_rate: s.autarky_rate,
                revenue_eur: s.revenue_eur,
                revenue_gain_eur: gain,
                eur_per_kwh: (s.capacity_kwh > 0.0).then(|| gain / s.capacity_kwh),
            }
        })
        .collect()
}

/// Sweep results rendered as an aligned text table.
///
/// Energies switch to MWh and money to T€ once the largest capacity or
/// export exceeds 1 GWh.
pub struct ResultsTable<'a> {
    pub strategy: &'a str,
    pub summaries: &'a [RunSummary],
}

impl ResultsTable<'_> {
    /// Divisor and unit labels for energy and money.
    fn scale(&self) -> (f64, &'static str, &'static str) {
        let largest = self
            .summaries
            .iter()
            .map(|s| s.capacity_kwh.max(s.export_kwh))
            .fold(0.0, f64::max);
        if largest / 1000.0 > 1000.0 {
            (1000.0, "MWh", "T€")
        } else {
            (1.0, "kWh", "€")
        }
    }
}

impl fmt::Display for ResultsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scaler, energy, money) = self.scale();
        writeln!(f, "--- Battery Sweep Results ({}) ---", self.strategy)?;
        if self.summaries.is_empty() {
            return write!(f, "no runs");
        }
        writeln!(
            f,
            "{:>14} {:>14} {:>10} {:>8} {:>14} {:>12} {:>10}",
            format!("cap [{energy}]"),
            format!("export [{energy}]"),
            "export [h]",
            "autarky",
            format!("revenue [{money}]"),
            format!("gain [{money}]"),
            "€/kWh",
        )?;
        let rows = capacity_roi(self.summaries);
        for (i, r) in rows.iter().enumerate() {
            let per_kwh = r
                .eur_per_kwh
                .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
            write!(
                f,
                "{:>14.1} {:>14.1} {:>10.0} {:>8.3} {:>14.1} {:>12.2} {:>10}",
                r.capacity_kwh / scaler,
                r.export_kwh / scaler,
                r.export_hours,
                r.autarky_rate,
                r.revenue_eur / scaler,
                r.revenue_gain_eur / scaler,
                per_kwh,
            )?;
            if i + 1 < rows.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
