//! Local light-curve CSV input/output.
//!
//! Expected header (case-insensitive, any column order):
//!
//! - `time` (aliases: `btjd`, `bjd`, `t`)
//! - `flux` (aliases: `pdcsap_flux`, `sap_flux`)
//! - optional `flux_err` (aliases: `pdcsap_flux_err`, `sap_flux_err`, `err`)
//! - optional `quality`
//!
//! Empty cells and `nan` parse as NaN and are left for the cleaning stage to
//! drop; any other unparseable cell is an error.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::TimeSeries;
use crate::error::AcquireError;

const TIME_COLUMNS: &[&str] = &["time", "btjd", "bjd", "t"];
const FLUX_COLUMNS: &[&str] = &["flux", "pdcsap_flux", "sap_flux"];
const ERR_COLUMNS: &[&str] = &["flux_err", "pdcsap_flux_err", "sap_flux_err", "err"];
const QUALITY_COLUMNS: &[&str] = &["quality"];

pub fn read_light_curve_csv(path: &Path) -> Result<TimeSeries, AcquireError> {
    let file = File::open(path).map_err(|e| {
        AcquireError::InvalidData(format!("failed to open CSV '{}': {e}", path.display()))
    })?;
    read_light_curve(file)
}

/// Parse a light-curve CSV from any reader.
pub fn read_light_curve<R: std::io::Read>(input: R) -> Result<TimeSeries, AcquireError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AcquireError::InvalidData(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let time_idx = find_column(&header_map, TIME_COLUMNS)
        .ok_or_else(|| AcquireError::InvalidData("missing required column: `time`".to_string()))?;
    let flux_idx = find_column(&header_map, FLUX_COLUMNS)
        .ok_or_else(|| AcquireError::InvalidData("missing required column: `flux`".to_string()))?;
    let err_idx = find_column(&header_map, ERR_COLUMNS);
    let quality_idx = find_column(&header_map, QUALITY_COLUMNS);

    let mut time = Vec::new();
    let mut flux = Vec::new();
    let mut flux_err = err_idx.map(|_| Vec::new());
    let mut quality = quality_idx.map(|_| Vec::new());

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, lines are 1-based.
        let line = idx + 2;
        let record =
            result.map_err(|e| AcquireError::InvalidData(format!("line {line}: CSV parse error: {e}")))?;

        time.push(parse_float(&record, time_idx, "time", line)?);
        flux.push(parse_float(&record, flux_idx, "flux", line)?);
        if let (Some(col), Some(values)) = (err_idx, flux_err.as_mut()) {
            values.push(parse_float(&record, col, "flux_err", line)?);
        }
        if let (Some(col), Some(values)) = (quality_idx, quality.as_mut()) {
            let q = parse_float(&record, col, "quality", line)?;
            // A missing flag is treated as bad data.
            values.push(if q.is_finite() { q as i32 } else { i32::MAX });
        }
    }

    if time.is_empty() {
        return Err(AcquireError::InvalidData("CSV contains no data rows".to_string()));
    }

    TimeSeries::new(time, flux, flux_err, quality).map_err(|e| AcquireError::InvalidData(e.to_string()))
}

/// Write `time,flux[,flux_err][,quality]` rows.
pub fn write_light_curve_csv(path: &Path, series: &TimeSeries) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["time", "flux"];
    if series.flux_err.is_some() {
        header.push("flux_err");
    }
    if series.quality.is_some() {
        header.push("quality");
    }
    writer.write_record(&header)?;

    for i in 0..series.len() {
        let mut row = vec![format!("{:.8}", series.time[i]), format!("{:.10}", series.flux[i])];
        if let Some(err) = &series.flux_err {
            row.push(format!("{:.10}", err[i]));
        }
        if let Some(q) = &series.quality {
            row.push(q[i].to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|a| header_map.get(*a).copied())
}

fn parse_float(record: &StringRecord, idx: usize, column: &str, line: usize) -> Result<f64, AcquireError> {
    let raw = record.get(idx).unwrap_or("").trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw == "--" {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>()
        .map_err(|_| AcquireError::InvalidData(format!("line {line}: invalid {column} value '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_aliases_and_optional_columns() {
        let csv = "\u{feff}BTJD, PDCSAP_FLUX ,flux_err,quality\n\
                   # comment line\n\
                   1.0,100.0,1.0,0\n\
                   2.0,,1.0,0\n\
                   3.0,101.0,1.0,512\n";
        let ts = read_light_curve(csv.as_bytes()).unwrap();
        assert_eq!(ts.time, vec![1.0, 2.0, 3.0]);
        assert!(ts.flux[1].is_nan());
        assert_eq!(ts.flux_err, Some(vec![1.0; 3]));
        assert_eq!(ts.quality, Some(vec![0, 0, 512]));
    }

    #[test]
    fn minimal_columns_are_enough() {
        let ts = read_light_curve("time,flux\n0.5,1.0\n1.5,0.99\n".as_bytes()).unwrap();
        assert_eq!(ts.len(), 2);
        assert!(ts.flux_err.is_none());
        assert!(ts.quality.is_none());
    }

    #[test]
    fn reports_missing_columns_and_bad_cells() {
        let err = read_light_curve("time,value\n1,2\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("`flux`"));

        let err = read_light_curve("time,flux\n1,abc\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        assert!(read_light_curve("time,flux\n".as_bytes()).is_err());
    }

    #[test]
    fn written_files_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.csv");
        let ts = TimeSeries::new(vec![0.0, 0.25], vec![1.0, 0.995], Some(vec![1e-3, 1e-3]), None).unwrap();
        write_light_curve_csv(&path, &ts).unwrap();

        let back = read_light_curve_csv(&path).unwrap();
        assert_eq!(back.time, ts.time);
        assert_eq!(back.flux, ts.flux);
        assert_eq!(back.flux_err, ts.flux_err);
    }
}
