//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the light curve container (`TimeSeries`) and acquisition units (`LightCurveSegment`)
//! - search and cleaning configuration (`SearchConfig`, `CleanConfig`, `RunConfig`)
//! - search outputs (`ScoreRecord`, `ScoreCurve`, `BestFit`)

pub mod types;

pub use types::*;
