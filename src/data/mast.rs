//! MAST archive client for TESS light curves.
//!
//! Flow:
//!
//! 1. `TIC <id>` targets are queried by target name; other names are resolved
//!    to coordinates (`Mast.Name.Lookup`) and queried by position
//! 2. observations are filtered to TESS time series (optionally one sector)
//! 3. each observation's product list is scanned for `*_lc.fits` files
//! 4. matching files are downloaded and parsed
//!
//! All requests go through the `invoke` endpoint of the MAST portal API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::data::LightCurveSource;
use crate::data::fits::read_light_curve;
use crate::domain::{LightCurveSegment, TargetQuery};
use crate::error::AcquireError;

pub const DEFAULT_BASE_URL: &str = "https://mast.stsci.edu";
const INVOKE_PATH: &str = "/api/v0/invoke";
const DOWNLOAD_PATH: &str = "/api/v0.1/Download/file";

/// Cone radius (degrees) for name-resolved targets.
const SEARCH_RADIUS_DEG: f64 = 0.0001;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct MastClient {
    client: Client,
    base_url: String,
}

impl MastClient {
    /// Client against `MAST_API_URL` (from the environment or `.env`), or the
    /// public portal.
    pub fn from_env() -> Result<Self, AcquireError> {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var("MAST_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self, AcquireError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("transit-finder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcquireError::Download(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn invoke(&self, request: &Value) -> Result<Value, AcquireError> {
        let url = format!("{}{INVOKE_PATH}", self.base_url);
        let service = request["service"].as_str().unwrap_or("?");
        debug!(service, "MAST request");

        let resp = self
            .client
            .post(&url)
            .form(&[("request", request.to_string())])
            .send()
            .map_err(|e| AcquireError::Download(format!("MAST request {service} failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AcquireError::Download(format!(
                "MAST request {service} failed with status {}",
                resp.status()
            )));
        }
        resp.json()
            .map_err(|e| AcquireError::Download(format!("failed to parse MAST {service} response: {e}")))
    }

    fn resolve_coordinates(&self, name: &str) -> Result<Option<(f64, f64)>, AcquireError> {
        let body = self.invoke(&json!({
            "service": "Mast.Name.Lookup",
            "params": { "input": name, "format": "json" },
            "format": "json",
        }))?;
        let lookup: NameLookup = serde_json::from_value(body)
            .map_err(|e| AcquireError::Download(format!("unexpected name lookup response: {e}")))?;
        Ok(lookup
            .resolved_coordinate
            .into_iter()
            .next()
            .map(|c| (c.ra, c.decl)))
    }

    fn find_observations(&self, query: &TargetQuery) -> Result<Vec<String>, AcquireError> {
        let mut filters = vec![
            json!({ "paramName": "obs_collection", "values": ["TESS"] }),
            json!({ "paramName": "dataproduct_type", "values": ["timeseries"] }),
        ];
        if let Some(sector) = query.sector {
            filters.push(json!({ "paramName": "sequence_number", "values": [sector] }));
        }

        let request = match tic_id(&query.target) {
            Some(id) => {
                filters.push(json!({ "paramName": "target_name", "values": [id] }));
                json!({
                    "service": "Mast.Caom.Filtered",
                    "format": "json",
                    "params": { "columns": "obsid,sequence_number", "filters": filters },
                })
            }
            None => {
                let Some((ra, dec)) = self.resolve_coordinates(&query.target)? else {
                    return Ok(Vec::new());
                };
                debug!(ra, dec, "resolved target name");
                json!({
                    "service": "Mast.Caom.Filtered.Position",
                    "format": "json",
                    "params": {
                        "columns": "obsid,sequence_number",
                        "filters": filters,
                        "position": format!("{ra}, {dec}, {SEARCH_RADIUS_DEG}"),
                    },
                })
            }
        };

        let body = self.invoke(&request)?;
        let table: DataTable = serde_json::from_value(body)
            .map_err(|e| AcquireError::Download(format!("unexpected observation response: {e}")))?;
        Ok(table.data.iter().filter_map(|row| id_string(&row["obsid"])).collect())
    }

    fn light_curve_products(&self, obsid: &str) -> Result<Vec<Product>, AcquireError> {
        let body = self.invoke(&json!({
            "service": "Mast.Caom.Products",
            "format": "json",
            "params": { "obsid": obsid },
        }))?;
        let table: DataTable = serde_json::from_value(body)
            .map_err(|e| AcquireError::Download(format!("unexpected product response: {e}")))?;
        Ok(table
            .data
            .into_iter()
            .filter_map(|row| serde_json::from_value::<Product>(row).ok())
            .filter(|p| p.product_filename.ends_with("_lc.fits"))
            .collect())
    }

    fn download(&self, product: &Product) -> Result<Vec<u8>, AcquireError> {
        let url = format!("{}{DOWNLOAD_PATH}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("uri", product.data_uri.as_str())])
            .send()
            .map_err(|e| {
                AcquireError::Download(format!("download of {} failed: {e}", product.product_filename))
            })?;
        if !resp.status().is_success() {
            return Err(AcquireError::Download(format!(
                "download of {} failed with status {}",
                product.product_filename,
                resp.status()
            )));
        }
        let bytes = resp.bytes().map_err(|e| {
            AcquireError::Download(format!("download of {} failed: {e}", product.product_filename))
        })?;
        Ok(bytes.to_vec())
    }
}

impl LightCurveSource for MastClient {
    fn fetch(&self, query: &TargetQuery) -> Result<Vec<LightCurveSegment>, AcquireError> {
        let not_found = || AcquireError::NotFound {
            target: query.target.clone(),
            sector: query.sector,
        };

        info!(object = %query.target, sector = ?query.sector, "searching MAST for TESS light curves");
        let obsids = self.find_observations(query)?;
        if obsids.is_empty() {
            return Err(not_found());
        }

        let mut products = Vec::new();
        for obsid in &obsids {
            products.extend(self.light_curve_products(obsid)?);
        }
        products.sort_by(|a, b| a.product_filename.cmp(&b.product_filename));
        products.dedup_by(|a, b| a.product_filename == b.product_filename);
        if products.is_empty() {
            return Err(not_found());
        }

        info!(observations = obsids.len(), files = products.len(), "downloading light curves");
        let mut segments = Vec::with_capacity(products.len());
        for product in &products {
            let bytes = self.download(product)?;
            let segment = read_light_curve(&bytes, &product.product_filename)?;
            debug!(
                file = %product.product_filename,
                sector = ?segment.sector,
                samples = segment.series.len(),
                "parsed light curve"
            );
            segments.push(segment);
        }
        Ok(segments)
    }
}

#[derive(Debug, Deserialize)]
struct NameLookup {
    #[serde(rename = "resolvedCoordinate", default)]
    resolved_coordinate: Vec<Coordinate>,
}

#[derive(Debug, Deserialize)]
struct Coordinate {
    ra: f64,
    decl: f64,
}

#[derive(Debug, Deserialize)]
struct DataTable {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct Product {
    #[serde(rename = "productFilename")]
    product_filename: String,
    #[serde(rename = "dataURI")]
    data_uri: String,
}

/// Numeric part of a `TIC 12345` / `TIC12345` identifier.
pub fn tic_id(target: &str) -> Option<String> {
    let trimmed = target.trim();
    let rest = trimmed
        .get(..3)
        .filter(|p| p.eq_ignore_ascii_case("TIC"))
        .map(|_| trimmed[3..].trim_start_matches([' ', '-']))?;
    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
        Some(rest.trim_start_matches('0').to_string()).filter(|s| !s.is_empty())
    } else {
        None
    }
}

/// MAST returns ids as numbers or strings depending on the service.
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
