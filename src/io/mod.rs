//! Input/output helpers.
//!
//! - light-curve CSV read/write (`ingest`)
//! - summary report CSV (`export`)
//! - result JSON read/write (`result`)

pub mod export;
pub mod ingest;
pub mod result;

pub use export::*;
pub use ingest::*;
pub use result::*;
