//! Input/output helpers.
//!
//! - explanation artifact exports (CSV/JSON) (`export`)
//!
//! Reference CSV ingest lives in `data::reference`, next to the matrix type
//! it produces.

pub mod export;

pub use export::*;
