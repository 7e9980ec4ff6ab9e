//! Light-curve acquisition.
//!
//! - archive download (`mast`) and FITS parsing (`fits`)
//! - local CSV or FITS input (`CsvSource`, `FitsSource`)
//! - synthetic data (`synthetic`)
//! - stitching several segments into one series

pub mod fits;
pub mod mast;
pub mod synthetic;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::{LightCurveSegment, TargetQuery, TimeSeries};
use crate::error::AcquireError;
use crate::math::median;

pub use mast::MastClient;

/// Anything that can turn a target query into light-curve segments.
pub trait LightCurveSource {
    fn fetch(&self, query: &TargetQuery) -> Result<Vec<LightCurveSegment>, AcquireError>;
}

/// A single local CSV file; the query only labels the result.
pub struct CsvSource {
    pub path: PathBuf,
}

impl LightCurveSource for CsvSource {
    fn fetch(&self, query: &TargetQuery) -> Result<Vec<LightCurveSegment>, AcquireError> {
        let series = crate::io::read_light_curve_csv(&self.path)?;
        info!(path = %self.path.display(), samples = series.len(), "loaded local light curve");
        Ok(vec![LightCurveSegment {
            sector: query.sector,
            origin: self.path.display().to_string(),
            series,
        }])
    }
}

/// A single local light-curve product (`*_lc.fits`).
pub struct FitsSource {
    pub path: PathBuf,
}

impl LightCurveSource for FitsSource {
    fn fetch(&self, query: &TargetQuery) -> Result<Vec<LightCurveSegment>, AcquireError> {
        let mut segment = fits::read_light_curve_file(&self.path, &self.path.display().to_string())?;
        segment.sector = segment.sector.or(query.sector);
        info!(path = %self.path.display(), samples = segment.series.len(), "loaded local light curve");
        Ok(vec![segment])
    }
}

/// Whether a local input should be read as FITS rather than CSV.
pub fn is_fits_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "fits" | "fit" | "fts"))
}

/// Normalize every segment by its median flux and concatenate them in time
/// order.
pub fn stitch(segments: &[LightCurveSegment]) -> Result<TimeSeries, AcquireError> {
    if segments.is_empty() {
        return Err(AcquireError::InvalidData("no light-curve segments to stitch".to_string()));
    }
    let with_errors = segments.iter().all(|s| s.series.flux_err.is_some());
    // Segments without a QUALITY column count as all-good samples.
    let with_quality = segments.iter().any(|s| s.series.quality.is_some());

    let mut out = TimeSeries {
        flux_err: with_errors.then(Vec::new),
        quality: with_quality.then(Vec::new),
        ..TimeSeries::default()
    };

    for seg in segments {
        let finite: Vec<f64> = seg
            .series
            .flux
            .iter()
            .copied()
            .filter(|f| f.is_finite())
            .collect();
        let level = match median(&finite) {
            Some(m) if m != 0.0 => m,
            _ => {
                warn!(origin = %seg.origin, "segment has no usable flux level; kept unnormalized");
                1.0
            }
        };

        out.time.extend_from_slice(&seg.series.time);
        out.flux.extend(seg.series.flux.iter().map(|f| f / level));
        if let (Some(dst), Some(src)) = (out.flux_err.as_mut(), seg.series.flux_err.as_ref()) {
            dst.extend(src.iter().map(|e| e / level));
        }
        if let Some(dst) = out.quality.as_mut() {
            match seg.series.quality.as_ref() {
                Some(src) => dst.extend_from_slice(src),
                None => dst.resize(dst.len() + seg.series.len(), 0),
            }
        }
    }

    Ok(out.sorted_by_time())
}

/// Sector to report: the requested one, else the only one downloaded.
pub fn report_sector(requested: Option<u32>, segments: &[LightCurveSegment]) -> Option<u32> {
    if requested.is_some() {
        return requested;
    }
    let mut sectors: Vec<u32> = segments.iter().filter_map(|s| s.sector).collect();
    sectors.sort_unstable();
    sectors.dedup();
    match sectors.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(sector: u32, time: Vec<f64>, flux: Vec<f64>) -> LightCurveSegment {
        let n = time.len();
        LightCurveSegment {
            sector: Some(sector),
            origin: format!("s{sector}"),
            series: TimeSeries::new(time, flux, Some(vec![2.0; n]), Some(vec![0; n])).unwrap(),
        }
    }

    #[test]
    fn stitch_normalizes_each_segment() {
        let a = segment(2, vec![10.0, 11.0, 12.0], vec![200.0, 200.0, 190.0]);
        let b = segment(1, vec![0.0, 1.0, 2.0], vec![50.0, f64::NAN, 50.0]);
        let ts = stitch(&[a, b]).unwrap();

        assert_eq!(ts.time, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(ts.flux[0], 1.0);
        assert!(ts.flux[1].is_nan());
        assert_eq!(ts.flux[3], 1.0);
        assert!((ts.flux[5] - 0.95).abs() < 1e-12);
        let err = ts.flux_err.unwrap();
        assert!((err[0] - 0.04).abs() < 1e-12);
        assert!((err[3] - 0.01).abs() < 1e-12);
        assert_eq!(ts.quality.unwrap().len(), 6);
    }

    #[test]
    fn stitch_keeps_quality_when_one_segment_lacks_it() {
        let mut flagged = segment(1, vec![0.0, 1.0], vec![5.0, 5.0]);
        flagged.series.quality = Some(vec![0, 4096]);
        let mut plain = segment(2, vec![2.0, 3.0, 4.0], vec![7.0, 7.0, 7.0]);
        plain.series.quality = None;

        let ts = stitch(&[plain, flagged]).unwrap();
        assert_eq!(ts.quality, Some(vec![0, 4096, 0, 0, 0]));
    }

    #[test]
    fn fits_paths_are_recognized_by_extension() {
        assert!(is_fits_path(Path::new("tess_lc.fits")));
        assert!(is_fits_path(Path::new("a/b/LC.FITS")));
        assert!(!is_fits_path(Path::new("lc.csv")));
        assert!(!is_fits_path(Path::new("fits")));
    }

    #[test]
    fn local_fits_source_reads_header_sector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local_lc.fits");
        fits::tests::write_light_curve(&path, 22, "PDCSAP_FLUX", &[(1.0, 3.0, 0.1, 0), (2.0, 3.0, 0.1, 1)]);
        let query = TargetQuery {
            target: "local".to_string(),
            sector: Some(5),
        };

        let segments = FitsSource { path }.fetch(&query).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].sector, Some(22));
        assert_eq!(segments[0].series.quality, Some(vec![0, 1]));
    }

    #[test]
    fn stitch_rejects_empty_input() {
        assert!(matches!(stitch(&[]), Err(AcquireError::InvalidData(_))));
    }

    #[test]
    fn report_sector_prefers_request_then_single_download() {
        let a = segment(3, vec![0.0], vec![1.0]);
        let b = segment(4, vec![1.0], vec![1.0]);
        assert_eq!(report_sector(Some(9), &[a.clone(), b.clone()]), Some(9));
        assert_eq!(report_sector(None, &[a.clone(), a.clone()]), Some(3));
        assert_eq!(report_sector(None, &[a, b]), None);
    }

    #[test]
    fn fits_segments_flow_through_stitch() {
        let bytes = fits::tests::light_curve_fits(
            7,
            &[(1.0, 10.0, 0.1, 0), (2.0, 10.0, 0.1, 0), (3.0, 12.0, 0.1, 0)],
        );
        let seg = fits::read_light_curve(&bytes, "mem").unwrap();
        assert_eq!(report_sector(None, std::slice::from_ref(&seg)), Some(7));
        let ts = stitch(&[seg]).unwrap();
        assert_eq!(ts.flux[0], 1.0);
        assert!((ts.flux[2] - 1.2).abs() < 1e-6);
    }
}
