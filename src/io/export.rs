//! Summary report CSV.
//!
//! One header row plus one data row per run, in the column layout downstream
//! spreadsheets already expect.

use std::path::Path;

use serde::Serialize;

use crate::domain::BestFit;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub target: String,
    /// Empty when the run spans several sectors.
    pub sector: Option<u32>,
    pub best_period_days: f64,
    pub transit_time_bjd: f64,
    pub transit_duration_days: f64,
    pub transit_depth_ppm: f64,
    pub snr: f64,
}

impl ReportRow {
    pub fn new(target: &str, sector: Option<u32>, best: &BestFit) -> Self {
        Self {
            target: target.to_string(),
            sector,
            best_period_days: best.period,
            transit_time_bjd: best.transit_time,
            transit_duration_days: best.duration,
            transit_depth_ppm: best.depth * 1e6,
            snr: best.snr,
        }
    }
}

pub fn write_report_csv(path: &Path, row: &ReportRow) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(4, format!("Failed to create report CSV '{}': {e}", path.display()))
    })?;
    writer
        .serialize(row)
        .map_err(|e| AppError::new(4, format!("Failed to write report CSV row: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write report CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScoreCurve, ScoreRecord};

    fn best() -> BestFit {
        BestFit::from_record(
            ScoreRecord {
                period: 3.5,
                power: 1250.0,
                snr: 50.0,
                depth: 0.0042,
                depth_err: 0.000084,
                transit_time: 1.0,
                duration: 0.1,
            },
            ScoreCurve::default(),
        )
    }

    #[test]
    fn report_has_header_and_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report_csv(&path, &ReportRow::new("TIC 1", Some(12), &best())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "target,sector,best_period_days,transit_time_bjd,transit_duration_days,transit_depth_ppm,snr"
        );
        assert_eq!(lines.len(), 2);
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[0], "TIC 1");
        assert_eq!(fields[1], "12");
        assert_eq!(fields[2].parse::<f64>().unwrap(), 3.5);
        assert!((fields[5].parse::<f64>().unwrap() - 4200.0).abs() < 1e-6);
    }

    #[test]
    fn missing_sector_is_an_empty_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report_csv(&path, &ReportRow::new("Pi Men", None, &best())).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("Pi Men,,3.5,"));
    }
}
