//! Error types.
//!
//! Each layer returns its own typed error; the binary boundary converts them
//! into an [`AppError`] carrying the process exit code:
//!
//! - `2`: invalid arguments or search bounds
//! - `3`: acquisition failures (target not found, download, unreadable input)
//! - `4`: cleaning, search, and other runtime failures

use thiserror::Error;

/// Failures of the period search core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// Malformed search bounds or grid parameters.
    #[error("invalid search range: {0}")]
    InvalidRange(String),
    /// The grid builder produced no trial periods.
    #[error("period grid is empty")]
    EmptyGrid,
    /// The time series cannot be searched (too short, NaNs, unsorted).
    #[error("invalid time series: {0}")]
    InvalidSeries(String),
    /// Every trial period was evaluated but none had a scorable window.
    #[error("no scorable transit window across {periods} trial periods")]
    NoScorableCandidate { periods: usize },
}

/// Failures of light-curve acquisition.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("no light curve found for target '{target}'{}", sector_suffix(*.sector))]
    NotFound { target: String, sector: Option<u32> },
    #[error("download failed: {0}")]
    Download(String),
    #[error("invalid light curve data: {0}")]
    InvalidData(String),
}

fn sector_suffix(sector: Option<u32>) -> String {
    sector.map(|s| format!(" in sector {s}")).unwrap_or_default()
}

/// Failures of the cleaning/detrending stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CleanError {
    #[error("only {remaining} samples left after {stage}; at least {required} are needed")]
    TooFewSamples {
        stage: &'static str,
        remaining: usize,
        required: usize,
    },
    #[error("invalid cleaning parameter: {0}")]
    InvalidParameter(String),
}

/// Failures while drawing a diagnostic artifact.
#[derive(Debug, Error)]
#[error("failed to render {artifact}: {message}")]
pub struct RenderError {
    pub artifact: String,
    pub message: String,
}

impl RenderError {
    pub fn new(artifact: impl Into<String>, message: impl ToString) -> Self {
        Self {
            artifact: artifact.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        let code = match err {
            SearchError::InvalidRange(_) => 2,
            _ => 4,
        };
        AppError::new(code, format!("Search failed: {err}"))
    }
}

impl From<AcquireError> for AppError {
    fn from(err: AcquireError) -> Self {
        AppError::new(3, format!("Acquisition failed: {err}"))
    }
}

impl From<CleanError> for AppError {
    fn from(err: CleanError) -> Self {
        let code = match err {
            CleanError::InvalidParameter(_) => 2,
            CleanError::TooFewSamples { .. } => 4,
        };
        AppError::new(code, format!("Cleaning failed: {err}"))
    }
}
