//! ASCII/Unicode plotting for terminal output.
//!
//! - horizontal bar charts for feature importance (`bars`)
//!
//! Rendering is intentionally "dumb" (fixed-size grids), optimized for quick
//! visual sanity checks in a terminal and deterministic output (helpful for
//! golden tests). The TUI uses the Plotters-backed widgets instead.

pub mod bars;

pub use bars::*;
