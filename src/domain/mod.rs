//! Domain types used throughout the dashboard.
//!
//! This module defines:
//!
//! - applicant identifiers and prediction results (`ClientId`, `Prediction`)
//! - the service-defined decision flag with its inverted polarity (`Decision`)
//! - the resolved application configuration (`AppConfig`, `ReferenceSource`)

pub mod types;

pub use types::*;
