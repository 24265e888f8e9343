//! Time-aligned input series consumed by the battery management engine.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Per-timestep renewable input, demand, spot price and reference price.
///
/// All columns share one index and one fixed resolution. The series is
/// built once before simulation and shared read-only between concurrent
/// capacity runs.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    renew_kwh: Vec<f64>,
    demand_kwh: Vec<f64>,
    price: Vec<f64>,
    avg_price: Vec<f64>,
    resolution_hours: f64,
}

impl TimeSeries {
    /// Assembles a series from equally long columns.
    ///
    /// The resolution is the distance between the first two timestamps,
    /// or one hour for a single-row series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if the series is empty, the columns
    /// differ in length, or timestamps are not strictly increasing.
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        renew_kwh: Vec<f64>,
        demand_kwh: Vec<f64>,
        price: Vec<f64>,
        avg_price: Vec<f64>,
    ) -> Result<Self> {
        let n = timestamps.len();
        if n == 0 {
            return Err(Error::InvalidData("time series is empty".into()));
        }
        for (name, len) in [
            ("renew_kwh", renew_kwh.len()),
            ("demand_kwh", demand_kwh.len()),
            ("price", price.len()),
            ("avg_price", avg_price.len()),
        ] {
            if len != n {
                return Err(Error::InvalidData(format!(
                    "column {name} has {len} rows, expected {n}"
                )));
            }
        }
        if let Some(w) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::InvalidData(format!(
                "timestamps must be strictly increasing ({} follows {})",
                w[1], w[0]
            )));
        }

        Ok(Self {
            resolution_hours: resolution_hours(&timestamps),
            timestamps,
            renew_kwh,
            demand_kwh,
            price,
            avg_price,
        })
    }

    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Always false for a constructed series; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Duration of one timestep in hours.
    pub fn resolution_hours(&self) -> f64 {
        self.resolution_hours
    }

    /// Timestamp of step `i`.
    pub fn timestamp(&self, i: usize) -> NaiveDateTime {
        self.timestamps[i]
    }

    /// `(renewable_kwh, demand_kwh)` for step `i`.
    pub fn energy(&self, i: usize) -> (f64, f64) {
        (self.renew_kwh[i], self.demand_kwh[i])
    }

    /// `(price, avg_price)` in €/kWh for step `i`.
    pub fn price(&self, i: usize) -> (f64, f64) {
        (self.price[i], self.avg_price[i])
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn renew(&self) -> &[f64] {
        &self.renew_kwh
    }

    pub fn demand(&self) -> &[f64] {
        &self.demand_kwh
    }

    pub fn prices(&self) -> &[f64] {
        &self.price
    }

    pub fn avg_prices(&self) -> &[f64] {
        &self.avg_price
    }

    /// Index of the step that starts at `date` `hour`:00, assuming a regular grid.
    ///
    /// Computed as `round((target - start) / resolution)`; `None` when the
    /// result falls outside the series.
    pub fn index_at(&self, date: NaiveDate, hour: u32) -> Option<usize> {
        let target = date.and_hms_opt(hour, 0, 0)?;
        let offset_h = (target - self.timestamps[0]).num_seconds() as f64 / 3600.0;
        let idx = (offset_h / self.resolution_hours).round();
        if idx < 0.0 || idx >= self.len() as f64 {
            return None;
        }
        Some(idx as usize)
    }

    /// Hour of day (0..24) of step `i`.
    pub fn hour(&self, i: usize) -> u32 {
        self.timestamps[i].hour()
    }
}

/// Step length in hours derived from the first two timestamps (1.0 if fewer).
pub fn resolution_hours(timestamps: &[NaiveDateTime]) -> f64 {
    match timestamps {
        [t0, t1, ..] => (*t1 - *t0).num_seconds() as f64 / 3600.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hourly(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid start");
        (0..n).map(|i| start + Duration::hours(i as i64)).collect()
    }

    fn series(n: usize) -> TimeSeries {
        TimeSeries::new(hourly(n), vec![1.0; n], vec![0.0; n], vec![0.1; n], vec![0.1; n])
            .expect("valid series")
    }

    #[test]
    fn resolution_from_first_two_rows() {
        assert_eq!(series(48).resolution_hours(), 1.0);
        assert_eq!(series(1).resolution_hours(), 1.0);

        let start = hourly(1)[0];
        let quarter: Vec<_> = (0..8).map(|i| start + Duration::minutes(15 * i)).collect();
        assert_eq!(resolution_hours(&quarter), 0.25);
    }

    #[test]
    fn rejects_empty_series() {
        let result = TimeSeries::new(vec![], vec![], vec![], vec![], vec![]);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn rejects_mismatched_columns() {
        let result =
            TimeSeries::new(hourly(3), vec![0.0; 3], vec![0.0; 2], vec![0.0; 3], vec![0.0; 3]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unordered_timestamps() {
        let mut ts = hourly(3);
        ts.swap(1, 2);
        let result = TimeSeries::new(ts, vec![0.0; 3], vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]);
        assert!(result.is_err());
    }

    #[test]
    fn index_at_maps_calendar_hours() {
        let s = series(48);
        let day2 = NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date");
        assert_eq!(s.index_at(day2, 5), Some(29));
        let day3 = NaiveDate::from_ymd_opt(2024, 1, 3).expect("valid date");
        assert_eq!(s.index_at(day3, 0), None);
        let before = NaiveDate::from_ymd_opt(2023, 12, 31).expect("valid date");
        assert_eq!(s.index_at(before, 23), None);
    }
}
