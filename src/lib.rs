//! `transit-finder` library crate.
//!
//! The binary (`transit-finder`) is a thin wrapper around this library so that:
//!
//! - the search core is testable without spawning processes
//! - acquisition, cleaning, and rendering can be reused on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod clean;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod search;
pub mod tui;
