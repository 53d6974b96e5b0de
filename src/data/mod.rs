//! Data access for the dashboard.
//!
//! - scoring-service HTTP client (`scoring`)
//! - bounded response cache backing its memoization (`cache`)
//! - reference feature matrix ingest (`reference`)
//! - synthetic reference generation for demo/offline sessions (`sample`)

pub mod cache;
pub mod reference;
pub mod sample;
pub mod scoring;

pub use cache::*;
pub use reference::*;
pub use sample::*;
pub use scoring::*;
