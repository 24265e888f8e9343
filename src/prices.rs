//! Hourly spot prices, their rolling reference average and alignment to a
//! simulation grid.

use std::f64::consts::PI;
use std::io::Read;
use std::path::Path;

use chrono::{Duration, NaiveDateTime, Timelike};
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::devices::types::{Ar1, gaussian_noise};
use crate::error::{Error, Result};
use crate::profile::parse_timestamp;

#[derive(Debug, Deserialize)]
struct PriceRow {
    time: String,
    price: f64,
}

/// Hourly spot prices in €/kWh with a centered rolling average.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    start: NaiveDateTime,
    price: Vec<f64>,
    avg_price: Vec<f64>,
}

impl PriceTable {
    /// Builds a table from hourly prices in ct/kWh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if `prices_ct` is empty or `window` is 0.
    pub fn from_hourly_ct(
        start: NaiveDateTime,
        prices_ct: &[f64],
        window: usize,
    ) -> Result<Self> {
        if prices_ct.is_empty() {
            return Err(Error::InvalidData("price table has no rows".into()));
        }
        if window == 0 {
            return Err(Error::InvalidData("averaging window must be > 0".into()));
        }
        let price: Vec<f64> = prices_ct.iter().map(|p| p / 100.0).collect();
        let avg_price = rolling_mean(&price, window);
        Ok(Self {
            start,
            price,
            avg_price,
        })
    }

    /// Loads hourly prices from a CSV file with header `time,price` (ct/kWh).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or is empty.
    pub fn from_csv(path: &Path, window: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file, window)?;
        debug!(path = %path.display(), hours = table.len(), "price table loaded");
        Ok(table)
    }

    /// Reads hourly prices (ct/kWh) from any CSV source.
    ///
    /// Only the first timestamp is used; rows are taken as consecutive hours.
    ///
    /// # Errors
    ///
    /// Returns an error if a row fails to parse or there are no rows.
    pub fn from_reader<R: Read>(reader: R, window: usize) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut start = None;
        let mut prices = Vec::new();
        for row in rdr.deserialize() {
            let row: PriceRow = row?;
            if start.is_none() {
                start = Some(parse_timestamp(&row.time)?);
            }
            prices.push(row.price);
        }
        let start = start.ok_or_else(|| Error::InvalidData("price table has no rows".into()))?;
        Self::from_hourly_ct(start, &prices, window)
    }

    /// Generates seeded hourly prices in ct/kWh.
    ///
    /// The shape has a morning and an evening peak, a midday solar dip and
    /// an AR(1) daily level, so that a handful of hours per year go negative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if `hours` or `window` is 0.
    pub fn synthetic(
        start: NaiveDateTime,
        hours: usize,
        seed: u64,
        window: usize,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut level = Ar1::new(9.0, 0.97, 0.6, 2.0, 20.0);
        let mut prices = Vec::with_capacity(hours);
        let mut t = start;
        for i in 0..hours {
            if i % 24 == 0 {
                level.advance(&mut rng);
            }
            let h = f64::from(t.hour());
            let morning = 2.5 * (-(h - 8.0).powi(2) / 4.0).exp();
            let evening = 5.0 * (-(h - 19.0).powi(2) / 4.0).exp();
            let solar_dip = 4.0 * (PI * (h - 7.0) / 12.0).sin().max(0.0).powi(2);
            let noise = gaussian_noise(&mut rng, 1.0);
            prices.push(level.value() + morning + evening - solar_dip + noise);
            t += Duration::hours(1);
        }
        Self::from_hourly_ct(start, &prices, window)
    }

    /// Number of hourly rows.
    pub fn len(&self) -> usize {
        self.price.len()
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_empty()
    }

    /// Timestamp of the first row.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Hourly prices (€/kWh).
    pub fn prices(&self) -> &[f64] {
        &self.price
    }

    /// Rolling average prices (€/kWh).
    pub fn avg_prices(&self) -> &[f64] {
        &self.avg_price
    }

    /// Price and average for each timestamp, with `marketing_costs` added.
    ///
    /// Each timestamp takes the row of the whole hours elapsed since the
    /// table start, clamped into the table, so sub-hourly steps repeat their
    /// hour. Steps past either end of the table reuse its first or last row
    /// and are reported with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if no timestamp falls inside the table,
    /// e.g. a price file for another year.
    pub fn align(
        &self,
        timestamps: &[NaiveDateTime],
        marketing_costs: f64,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let end = self.start + Duration::hours(self.len() as i64);
        let outside = timestamps
            .iter()
            .filter(|t| **t < self.start || **t >= end)
            .count();
        if let (Some(first), Some(last)) = (timestamps.first(), timestamps.last()) {
            if outside == timestamps.len() {
                return Err(Error::InvalidData(format!(
                    "price table covers {} to {}, simulation runs {first} to {last}",
                    self.start, end
                )));
            }
            if outside > 0 {
                warn!(
                    steps = outside,
                    table_start = %self.start,
                    table_end = %end,
                    "steps outside the price table reuse its first or last price"
                );
            }
        }

        let last = self.len().saturating_sub(1) as i64;
        Ok(timestamps
            .iter()
            .map(|t| {
                let hours = (*t - self.start).num_seconds() / 3600;
                let i = hours.clamp(0, last) as usize;
                (self.price[i] + marketing_costs, self.avg_price[i] + marketing_costs)
            })
            .unzip())
    }
}

/// Price and average of a fixed supply contract: both equal the tariff
/// (€/kWh) plus `marketing_costs`.
pub fn fixed_contract(
    n: usize,
    tariff_eur_per_kwh: f64,
    marketing_costs: f64,
) -> (Vec<f64>, Vec<f64>) {
    let p = tariff_eur_per_kwh + marketing_costs;
    (vec![p; n], vec![p; n])
}

/// Centered rolling mean with a minimum of one observation.
///
/// The window around index `i` spans `[i - window/2, i + (window-1)/2]`,
/// truncated at both ends of the data.
///
/// # Examples
///
/// ```
/// use bess_sim::prices::rolling_mean;
///
/// assert_eq!(rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3), vec![1.5, 2.0, 3.0, 3.5]);
/// ```
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let before = window / 2;
    let after = window.saturating_sub(1) / 2;
    let mut prefix = Vec::with_capacity(n + 1);
    let mut sum = 0.0;
    prefix.push(sum);
    for v in values {
        sum += v;
        prefix.push(sum);
    }
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after + 1).min(n);
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid start")
    }

    #[test]
    fn rolling_mean_is_centered_and_truncated() {
        let values: Vec<f64> = (0..30).map(f64::from).collect();
        let avg = rolling_mean(&values, 25);
        // index 0 sees 0..=12
        assert_abs_diff_eq!(avg[0], 6.0, epsilon = 1e-12);
        // index 15 sees 3..=27
        assert_abs_diff_eq!(avg[15], 15.0, epsilon = 1e-12);
        // index 29 sees 17..=29
        assert_abs_diff_eq!(avg[29], 23.0, epsilon = 1e-12);
    }

    #[test]
    fn rolling_mean_of_even_window() {
        // window 4 around i spans [i-2, i+1]
        let avg = rolling_mean(&[4.0, 8.0, 0.0, 4.0, 8.0], 4);
        assert_abs_diff_eq!(avg[2], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(avg[0], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn converts_cents_to_euro() {
        let table = PriceTable::from_hourly_ct(start(), &[10.0, 20.0], 25).expect("valid");
        assert_eq!(table.prices(), &[0.1, 0.2]);
        assert_abs_diff_eq!(table.avg_prices()[0], 0.15, epsilon = 1e-12);
    }

    #[test]
    fn reads_price_csv() {
        let data = "time,price\n2024-01-01 00:00:00,8.5\n2024-01-01 01:00:00,-1.0\n";
        let table = PriceTable::from_reader(data.as_bytes(), 25).expect("valid csv");
        assert_eq!(table.len(), 2);
        assert_eq!(table.start(), start());
        assert_abs_diff_eq!(table.prices()[1], -0.01, epsilon = 1e-12);
    }

    #[test]
    fn empty_csv_is_rejected() {
        let data = "time,price\n";
        assert!(PriceTable::from_reader(data.as_bytes(), 25).is_err());
    }

    #[test]
    fn align_repeats_hours_and_clamps_overhang() {
        let table = PriceTable::from_hourly_ct(start(), &[10.0, 20.0, 30.0], 1).expect("valid");
        let timestamps = vec![
            start() - Duration::hours(2),
            start() + Duration::minutes(45),
            start() + Duration::minutes(60),
            start() + Duration::hours(7),
        ];
        let (price, avg) = table.align(&timestamps, 0.01).expect("partly covered");
        let expected = [0.11, 0.11, 0.21, 0.31];
        for (p, e) in price.iter().zip(expected) {
            assert_abs_diff_eq!(*p, e, epsilon = 1e-12);
        }
        assert_eq!(price, avg);
    }

    #[test]
    fn align_rejects_table_from_another_year() {
        let table_start = NaiveDate::from_ymd_opt(2023, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid start");
        let table = PriceTable::from_hourly_ct(table_start, &[5.0, 40.0, 12.0], 25).expect("valid");
        let steps: Vec<NaiveDateTime> = (0..4)
            .map(|h| table_start + Duration::days(366) + Duration::hours(h))
            .collect();
        let result = table.align(&steps, 0.0);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn align_of_no_timestamps_is_empty() {
        let table = PriceTable::from_hourly_ct(start(), &[10.0], 1).expect("valid");
        let (price, avg) = table.align(&[], 0.0).expect("nothing to align");
        assert!(price.is_empty() && avg.is_empty());
    }

    #[test]
    fn fixed_contract_adds_marketing() {
        let (price, avg) = fixed_contract(3, 0.11, -0.003);
        assert_abs_diff_eq!(price[2], 0.107, epsilon = 1e-12);
        assert_eq!(price, avg);
    }

    #[test]
    fn synthetic_prices_are_reproducible() {
        let a = PriceTable::synthetic(start(), 24 * 7, 1, 25).expect("valid");
        let b = PriceTable::synthetic(start(), 24 * 7, 1, 25).expect("valid");
        assert_eq!(a, b);
        assert_eq!(a.len(), 168);
    }

    #[test]
    fn synthetic_evening_beats_midday() {
        let t = PriceTable::synthetic(start(), 24 * 60, 2, 25).expect("valid");
        let mean_at = |h: usize| {
            let v: Vec<f64> = t.prices().iter().skip(h).step_by(24).copied().collect();
            v.iter().sum::<f64>() / v.len() as f64
        };
        assert!(mean_at(19) > mean_at(13));
    }
}
