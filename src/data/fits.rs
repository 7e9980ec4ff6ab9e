//! TESS light-curve files (`*_lc.fits`), read through `fitsio`.
//!
//! The samples live in the `LIGHTCURVE` binary table (first extension) and
//! the primary header carries `SECTOR`. cfitsio reads from disk, so archive
//! downloads are spooled to a temporary file first.

use std::io::Write;
use std::path::Path;

use fitsio::FitsFile;
use fitsio::hdu::{FitsHdu, HduInfo};
use tracing::{debug, warn};

use crate::domain::{LightCurveSegment, TimeSeries};
use crate::error::AcquireError;

const TABLE_EXTNAME: &str = "LIGHTCURVE";

fn invalid(message: impl Into<String>) -> AcquireError {
    AcquireError::InvalidData(message.into())
}

/// Parse a downloaded light-curve product held in memory.
pub fn read_light_curve(bytes: &[u8], origin: &str) -> Result<LightCurveSegment, AcquireError> {
    let mut spool = tempfile::Builder::new()
        .prefix("transit-finder-")
        .suffix(".fits")
        .tempfile()
        .map_err(|e| invalid(format!("{origin}: cannot spool FITS data: {e}")))?;
    spool
        .write_all(bytes)
        .and_then(|_| spool.flush())
        .map_err(|e| invalid(format!("{origin}: cannot spool FITS data: {e}")))?;
    read_light_curve_file(spool.path(), origin)
}

/// Parse a light-curve product on disk.
///
/// Flux comes from `PDCSAP_FLUX`, falling back to `SAP_FLUX` when the
/// pipeline-corrected column is absent. Error and quality columns are
/// optional.
pub fn read_light_curve_file(path: &Path, origin: &str) -> Result<LightCurveSegment, AcquireError> {
    let fits_err = |e: fitsio::errors::Error| invalid(format!("{origin}: {e}"));

    let mut fptr = FitsFile::open(path).map_err(fits_err)?;
    let primary = fptr.primary_hdu().map_err(fits_err)?;
    let sector = primary
        .read_key::<i64>(&mut fptr, "SECTOR")
        .ok()
        .and_then(|s| u32::try_from(s).ok());

    let table = match fptr.hdu(TABLE_EXTNAME) {
        Ok(hdu) => hdu,
        Err(_) => fptr.hdu(1).map_err(fits_err)?,
    };
    let columns = column_names(&table)
        .ok_or_else(|| invalid(format!("{origin}: light-curve extension is not a table")))?;
    let has = |name: &str| columns.iter().any(|c| c.eq_ignore_ascii_case(name));
    debug!(origin, columns = columns.len(), "opened light-curve table");

    if !has("TIME") {
        return Err(invalid(format!("{origin}: TIME column missing")));
    }
    let (flux_col, err_col) = if has("PDCSAP_FLUX") {
        ("PDCSAP_FLUX", "PDCSAP_FLUX_ERR")
    } else if has("SAP_FLUX") {
        warn!(origin, "PDCSAP_FLUX missing, falling back to SAP_FLUX");
        ("SAP_FLUX", "SAP_FLUX_ERR")
    } else {
        return Err(invalid(format!("{origin}: no PDCSAP_FLUX or SAP_FLUX column")));
    };

    let time: Vec<f64> = table.read_col(&mut fptr, "TIME").map_err(fits_err)?;
    let flux: Vec<f64> = table.read_col(&mut fptr, flux_col).map_err(fits_err)?;
    let flux_err = if has(err_col) {
        Some(table.read_col::<f64>(&mut fptr, err_col).map_err(fits_err)?)
    } else {
        None
    };
    let quality = if has("QUALITY") {
        Some(table.read_col::<i32>(&mut fptr, "QUALITY").map_err(fits_err)?)
    } else {
        None
    };

    let series = TimeSeries::new(time, flux, flux_err, quality)
        .map_err(|e| invalid(format!("{origin}: {e}")))?;

    Ok(LightCurveSegment {
        sector,
        origin: origin.to_string(),
        series,
    })
}

fn column_names(hdu: &FitsHdu) -> Option<Vec<String>> {
    match &hdu.info {
        HduInfo::TableInfo {
            column_descriptions, ..
        } => Some(column_descriptions.iter().map(|c| c.name.clone()).collect()),
        _ => None,
    }
}
