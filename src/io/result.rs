//! Read/write `result.json`.
//!
//! The result file is the portable record of a run: metadata, search and
//! cleaning configuration, the best candidate, the strongest peaks, the score
//! curve, and a binned phase fold for quick re-plotting. The schema is
//! `domain::ResultFile`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::domain::ResultFile;
use crate::error::AppError;

pub fn write_result_json(path: &Path, result: &ResultFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(4, format!("Failed to create result JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), result)
        .map_err(|e| AppError::new(4, format!("Failed to write result JSON: {e}")))?;
    Ok(())
}

pub fn read_result_json(path: &Path) -> Result<ResultFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(3, format!("Failed to open result JSON '{}': {e}", path.display()))
    })?;
    let result: ResultFile = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::new(3, format!("Invalid result JSON: {e}")))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{CleanConfig, PhaseFoldGrid, ScoreCurve, ScoreRecord, SearchConfig};

    #[test]
    fn result_file_survives_a_round_trip() {
        let best = ScoreRecord {
            period: 3.5,
            power: 200.0,
            snr: 20.0,
            depth: 0.01,
            depth_err: 5e-4,
            transit_time: 1.0,
            duration: 0.1,
        };
        let result = ResultFile {
            tool: "transit-finder".to_string(),
            version: "0.1.0".to_string(),
            created_at: Utc::now(),
            target: "TIC 1".to_string(),
            sector: None,
            samples: 1000,
            search: SearchConfig::default(),
            clean: CleanConfig::default(),
            best,
            peaks: vec![best],
            score_curve: ScoreCurve::from_records(&[best]),
            phase_fold: PhaseFoldGrid {
                phase: vec![-0.1, 0.0, 0.1],
                flux: vec![1.0, 0.99, 1.0],
                count: vec![10, 3, 10],
            },
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        write_result_json(&path, &result).unwrap();
        assert_eq!(read_result_json(&path).unwrap(), result);
    }

    #[test]
    fn unreadable_result_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_result_json(&path).unwrap_err().exit_code(), 3);
    }
}
