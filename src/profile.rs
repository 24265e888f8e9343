//! National reference profile of solar, wind and total demand.
//!
//! Sources scale this profile to their installed power and annual demand.
//! Values are in arbitrary but consistent units per column; only shapes and
//! ratios matter.

use std::f64::consts::PI;
use std::io::Read;
use std::path::Path;

use chrono::{Duration, NaiveDateTime, Timelike};
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;
use tracing::debug;

use crate::devices::types::{Ar1, gaussian_noise};
use crate::error::{Error, Result};

/// Formats accepted for timestamps in input files.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a wall-clock timestamp in ISO-like formats.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] if no known format matches.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| Error::InvalidData(format!("unrecognized timestamp \"{s}\"")))
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    timestamp: String,
    solar: f64,
    wind: f64,
    demand: f64,
}

/// Time-indexed solar, wind and demand reference columns.
#[derive(Debug, Clone, PartialEq)]
pub struct GridProfile {
    pub timestamps: Vec<NaiveDateTime>,
    pub solar: Vec<f64>,
    pub wind: Vec<f64>,
    pub demand: Vec<f64>,
}

impl GridProfile {
    /// Loads a profile from a CSV file with header `timestamp,solar,wind,demand`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a row fails to parse, or
    /// the profile is empty.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let profile = Self::from_reader(file)?;
        debug!(path = %path.display(), rows = profile.len(), "grid profile loaded");
        Ok(profile)
    }

    /// Reads a profile from any CSV source.
    ///
    /// Empty cells are not allowed; missing values must be written as 0.
    ///
    /// # Errors
    ///
    /// Returns an error if a row fails to parse or the profile is empty.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut profile = Self {
            timestamps: Vec::new(),
            solar: Vec::new(),
            wind: Vec::new(),
            demand: Vec::new(),
        };
        for row in rdr.deserialize() {
            let row: ProfileRow = row?;
            profile.timestamps.push(parse_timestamp(&row.timestamp)?);
            profile.solar.push(row.solar);
            profile.wind.push(row.wind);
            profile.demand.push(row.demand);
        }
        if profile.is_empty() {
            return Err(Error::InvalidData("grid profile has no rows".into()));
        }
        Ok(profile)
    }

    /// Generates a seeded synthetic profile.
    ///
    /// Solar follows a clipped daylight sine (06:00 to 18:00) scaled by an
    /// AR(1) cloud multiplier, wind is an AR(1) capacity factor and demand
    /// is a daily sinusoid peaking in the early evening with small noise.
    ///
    /// # Arguments
    ///
    /// * `start` - First timestamp
    /// * `steps` - Number of rows
    /// * `resolution_hours` - Step length in hours
    /// * `seed` - Random seed for reproducible profiles
    pub fn synthetic(
        start: NaiveDateTime,
        steps: usize,
        resolution_hours: f64,
        seed: u64,
    ) -> Self {
        let step = Duration::seconds((resolution_hours * 3600.0).round() as i64);
        let mut cloud_rng = StdRng::seed_from_u64(seed);
        let mut wind_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        let mut demand_rng = StdRng::seed_from_u64(seed.wrapping_add(2));
        let mut cloud = Ar1::new(0.8, 0.9, 0.15, 0.2, 1.2);
        let mut wind_cf = Ar1::new(0.35, 0.95, 0.08, 0.0, 1.0);

        let mut profile = Self {
            timestamps: Vec::with_capacity(steps),
            solar: Vec::with_capacity(steps),
            wind: Vec::with_capacity(steps),
            demand: Vec::with_capacity(steps),
        };
        let mut t = start;
        for _ in 0..steps {
            let hour = f64::from(t.hour()) + f64::from(t.minute()) / 60.0;

            // Cloud state evolves at night too, keeping temporal correlation
            let m = cloud.advance(&mut cloud_rng);
            let daylight = if (6.0..18.0).contains(&hour) {
                (PI * (hour - 6.0) / 12.0).sin()
            } else {
                0.0
            };
            let daily = (2.0 * PI * (hour - 13.0) / 24.0).cos();
            let load = 1.0 + 0.2 * daily + gaussian_noise(&mut demand_rng, 0.02);

            profile.timestamps.push(t);
            profile.solar.push((daylight * m).max(0.0));
            profile.wind.push(wind_cf.advance(&mut wind_rng));
            profile.demand.push(load.max(0.1));
            t += step;
        }
        profile
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Step length in hours derived from the first two timestamps.
    pub fn resolution_hours(&self) -> f64 {
        crate::series::resolution_hours(&self.timestamps)
    }

    /// Keeps at most the first `n` rows.
    pub fn truncate(&mut self, n: usize) {
        self.timestamps.truncate(n);
        self.solar.truncate(n);
        self.wind.truncate(n);
        self.demand.truncate(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid start")
    }

    #[test]
    fn parses_common_timestamp_formats() {
        let expected = start() + Duration::hours(13);
        for s in [
            "2024-06-01T13:00:00",
            "2024-06-01 13:00:00",
            "2024-06-01 13:00",
            " 2024-06-01T13:00 ",
        ] {
            assert_eq!(parse_timestamp(s).ok(), Some(expected), "format {s:?}");
        }
        assert!(parse_timestamp("01.06.2024 13:00").is_err());
    }

    #[test]
    fn reads_csv_rows() {
        let data = "timestamp,solar,wind,demand\n\
                    2024-06-01 00:00,0,10,100\n\
                    2024-06-01 01:00,0,12,95\n\
                    2024-06-01 02:00,1.5,11,90\n";
        let profile = GridProfile::from_reader(data.as_bytes()).expect("valid csv");
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.resolution_hours(), 1.0);
        assert_eq!(profile.solar[2], 1.5);
        assert_eq!(profile.demand, vec![100.0, 95.0, 90.0]);
    }

    #[test]
    fn rejects_header_only_csv() {
        let data = "timestamp,solar,wind,demand\n";
        assert!(matches!(
            GridProfile::from_reader(data.as_bytes()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let data = "timestamp,solar,wind,demand\n2024-06-01 00:00,abc,1,1\n";
        assert!(matches!(
            GridProfile::from_reader(data.as_bytes()),
            Err(Error::Csv(_))
        ));
    }

    #[test]
    fn synthetic_solar_is_dark_at_night() {
        let p = GridProfile::synthetic(start(), 48, 1.0, 42);
        assert_eq!(p.len(), 48);
        for (t, s) in p.timestamps.iter().zip(&p.solar) {
            if t.hour() < 6 || t.hour() >= 18 {
                assert_eq!(*s, 0.0, "solar at {t}");
            }
        }
        assert!(p.solar[12] > 0.0);
    }

    #[test]
    fn synthetic_columns_are_bounded() {
        let p = GridProfile::synthetic(start(), 24 * 14, 0.25, 5);
        assert_eq!(p.resolution_hours(), 0.25);
        assert!(p.wind.iter().all(|w| (0.0..=1.0).contains(w)));
        assert!(p.solar.iter().all(|s| (0.0..=1.2).contains(s)));
        assert!(p.demand.iter().all(|d| *d >= 0.1));
    }

    #[test]
    fn synthetic_is_reproducible() {
        let a = GridProfile::synthetic(start(), 100, 1.0, 9);
        let b = GridProfile::synthetic(start(), 100, 1.0, 9);
        let c = GridProfile::synthetic(start(), 100, 1.0, 10);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn truncate_shortens_every_column() {
        let mut p = GridProfile::synthetic(start(), 10, 1.0, 1);
        p.truncate(4);
        assert_eq!(p.len(), 4);
        assert_eq!(p.demand.len(), 4);
        assert_eq!(p.wind.len(), 4);
    }
}
