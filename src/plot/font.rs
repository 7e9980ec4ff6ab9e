//! Embedded chart font.
//!
//! Plotters is built with its `ab_glyph` text backend, which only knows the
//! faces registered at runtime. Every chart renderer calls
//! [`ensure_registered`] before laying out text.

use std::sync::OnceLock;

use plotters::style::{FontStyle, register_font};

/// Family name used by every caption, axis label and legend.
pub const FAMILY: &str = "sans-serif";

static REGISTERED: OnceLock<bool> = OnceLock::new();

/// Register the embedded face under [`FAMILY`] (once per process).
pub fn ensure_registered() -> Result<(), &'static str> {
    let ok = *REGISTERED.get_or_init(|| {
        register_font(FAMILY, FontStyle::Normal, epaint_default_fonts::UBUNTU_LIGHT).is_ok()
    });
    if ok { Ok(()) } else { Err("embedded chart font could not be parsed") }
}
