//! CSV and JSON export for step results and sweep summaries.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::sim::kpi::{CapacityRoi, RunSummary, capacity_roi};
use crate::sim::types::StepResult;

/// Column header for the per-step CSV export.
const STEP_HEADER: &str = "timestep,timestamp,action,renew_kwh,demand_kwh,storage_kwh,soc,\
                           stored_kwh,net_discharge_kwh,loss_kwh,dissipated_kwh,export_kwh,\
                           residual_kwh,curtailed_kwh,price,avg_price";

/// Column header for the sweep summary CSV, in [`RunSummary`] field order.
const SUMMARY_HEADER: [&str; 16] = [
    "capacity_kwh",
    "power_kw",
    "residual_kwh",
    "export_kwh",
    "loss_kwh",
    "demand_kwh",
    "renew_kwh",
    "curtailed_kwh",
    "autarky_rate",
    "spot_cost_eur",
    "fix_cost_eur",
    "revenue_eur",
    "export_hours",
    "net_profit_spot_eur",
    "net_profit_fix_eur",
    "final_storage_kwh",
];

/// Exports step results to a CSV file at the given path.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_steps_csv(results: &[StepResult], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_steps_csv(results, io::BufWriter::new(file))
}

/// Writes step results as CSV to any writer.
///
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_steps_csv(results: &[StepResult], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(STEP_HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.timestep.to_string(),
            r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.action.as_str().to_string(),
            format!("{:.4}", r.renew_kwh),
            format!("{:.4}", r.demand_kwh),
            format!("{:.4}", r.storage_kwh),
            format!("{:.6}", r.soc),
            format!("{:.4}", r.stored_kwh),
            format!("{:.4}", r.net_discharge_kwh),
            format!("{:.6}", r.loss_kwh),
            format!("{:.6}", r.dissipated_kwh),
            format!("{:.4}", r.export_kwh),
            format!("{:.4}", r.residual_kwh),
            format!("{:.4}", r.curtailed_kwh),
            format!("{:.5}", r.price),
            format!("{:.5}", r.avg_price),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports sweep summaries, one row per candidate, to a CSV file.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_summary_csv(summaries: &[RunSummary], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_summary_csv(summaries, io::BufWriter::new(file))
}

/// Writes sweep summaries as CSV; columns follow [`RunSummary`]'s fields.
///
/// The header is written even when there are no summaries.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary_csv(summaries: &[RunSummary], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(SUMMARY_HEADER)?;
    for s in summaries {
        wtr.serialize(s)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Sweep report as written to JSON.
#[derive(Debug, Serialize)]
pub struct SweepReport<'a> {
    pub strategy: &'a str,
    pub source: &'a str,
    pub summaries: &'a [RunSummary],
    pub roi: Vec<CapacityRoi>,
}

impl<'a> SweepReport<'a> {
    pub fn new(strategy: &'a str, source: &'a str, summaries: &'a [RunSummary]) -> Self {
        Self {
            strategy,
            source,
            summaries,
            roi: capacity_roi(summaries),
        }
    }
}

/// Exports a sweep report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if file creation or serialization fails.
pub fn export_summary_json(report: &SweepReport<'_>, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_summary_json(report, io::BufWriter::new(file))
}

/// Writes a sweep report as pretty-printed JSON to any writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_summary_json(report: &SweepReport<'_>, mut writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::kpi::Economics;
    use crate::sim::types::StepAction;
    use chrono::{Duration, NaiveDate};

    fn make_step(t: usize) -> StepResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid start");
        StepResult {
            timestep: t,
            timestamp: start + Duration::hours(t as i64),
            action: StepAction::Charge,
            renew_kwh: 100.0,
            demand_kwh: 0.0,
            storage_kwh: 550.0,
            soc: 0.55,
            stored_kwh: 47.9,
            net_discharge_kwh: 0.0,
            loss_kwh: 0.0005,
            dissipated_kwh: 2.1,
            export_kwh: 50.0,
            residual_kwh: 0.0,
            curtailed_kwh: 0.0,
            price: 0.05,
            avg_price: 0.09,
        }
    }

    fn summaries() -> Vec<RunSummary> {
        let steps: Vec<StepResult> = (0..3).map(make_step).collect();
        let econ = Economics::default();
        vec![
            RunSummary::from_results(0.0, 0.0, &steps, &[true, true, true], 1.0, &econ),
            RunSummary::from_results(1000.0, 500.0, &steps, &[true, false, true], 1.0, &econ),
        ]
    }

    #[test]
    fn step_header_and_rows() {
        let results: Vec<StepResult> = (0..24).map(make_step).collect();
        let mut buf = Vec::new();
        write_steps_csv(&results, &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 25);
        assert_eq!(lines[0].split(',').count(), 16);
        assert!(lines[0].starts_with("timestep,timestamp,action,renew_kwh"));
        assert!(lines[2].starts_with("1,2024-01-01 01:00:00,charge,100.0000"));
    }

    #[test]
    fn step_columns_parse_back() {
        let results: Vec<StepResult> = (0..3).map(make_step).collect();
        let mut buf = Vec::new();
        write_steps_csv(&results, &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.ok();
            assert!(rec.is_some(), "every row should parse");
            let rec = rec.unwrap_or_default();
            for i in 3..16 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
            rows += 1;
        }
        assert_eq!(rows, 3);
    }

    #[test]
    fn summary_csv_has_one_row_per_run() {
        let mut buf = Vec::new();
        write_summary_csv(&summaries(), &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("capacity_kwh,power_kw,residual_kwh"));
        assert!(lines[2].starts_with("1000.0,500.0,"));
    }

    #[test]
    fn empty_summary_csv_keeps_header() {
        let mut buf = Vec::new();
        write_summary_csv(&[], &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        assert_eq!(output.lines().collect::<Vec<_>>(), vec![SUMMARY_HEADER.join(",")]);
    }

    #[test]
    fn summary_header_matches_serialized_fields() {
        let mut derived = Vec::new();
        {
            let mut wtr = csv::Writer::from_writer(&mut derived);
            wtr.serialize(&summaries()[0]).ok();
            wtr.flush().ok();
        }
        let derived = String::from_utf8(derived).unwrap_or_default();
        assert_eq!(derived.lines().next(), Some(SUMMARY_HEADER.join(",").as_str()));
    }

    #[test]
    fn summary_json_includes_roi() {
        let s = summaries();
        let report = SweepReport::new("price_threshold", "biogas", &s);
        let mut buf = Vec::new();
        write_summary_json(&report, &mut buf).ok();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap_or_default();
        assert_eq!(value["strategy"], "price_threshold");
        assert_eq!(value["summaries"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["roi"][1]["revenue_gain_eur"], 0.0);
        assert!(value["roi"][0]["eur_per_kwh"].is_null());
    }

    #[test]
    fn deterministic_output() {
        let results: Vec<StepResult> = (0..5).map(make_step).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_steps_csv(&results, &mut buf1).ok();
        write_steps_csv(&results, &mut buf2).ok();
        assert_eq!(buf1, buf2);
    }
}
