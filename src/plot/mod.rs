//! Diagnostic plots.
//!
//! - terminal plots (`ascii`)
//! - PNG/GIF artifacts (`png`) and their embedded font (`font`)

pub mod ascii;
pub mod font;
pub mod png;

pub use ascii::*;
pub use png::{PlotSize, ANIMATION_FRAMES};
