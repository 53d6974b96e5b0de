//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during a dashboard session
//! - exported to JSON/CSV
//! - reloaded later for comparisons

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Integer key uniquely identifying a loan applicant.
///
/// Sourced from the scoring service; used only as a lookup key, never mutated.
pub type ClientId = u64;

/// The scoring service's binary decision flag.
///
/// The wire contract is inverted relative to the usual "1 = positive outcome"
/// convention: `1` denotes rejection, `0` approval. We keep that polarity
/// exactly as the service defines it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// Decode the wire flag. Returns `None` for anything outside {0, 1}.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Decision::Approved),
            1 => Some(Decision::Rejected),
            _ => None,
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            Decision::Approved => 0,
            Decision::Rejected => 1,
        }
    }

    pub fn is_rejected(self) -> bool {
        matches!(self, Decision::Rejected)
    }

    /// Banner text shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            Decision::Approved => "Loan approved",
            Decision::Rejected => "Loan rejected",
        }
    }
}

/// A validated prediction for one applicant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Model-estimated likelihood of repayment, in [0, 1].
    pub proba: f64,
    pub decision: Decision,
}

/// Where the reference feature matrix comes from.
///
/// `None` is a valid configuration for predict-only sessions; requesting an
/// explanation without reference data is an explicit error, never a silent
/// fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    None,
    Csv(PathBuf),
    Synthetic { count: usize, seed: u64 },
}

/// Resolved application configuration (CLI flags over environment over
/// built-in defaults).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Scoring service base URL (`GET /` lists applicants, `POST /` scores one).
    pub service_url: String,
    /// Model registry base URL.
    pub registry_url: String,
    pub model_name: String,
    pub model_version: String,
    pub reference: ReferenceSource,
    /// Request timeout applied to both the registry and the scoring service.
    pub timeout: Duration,
    /// Optional TTL for cached scoring responses. `None` caches for the
    /// session lifetime.
    pub cache_ttl: Option<Duration>,
    /// Maximum number of cached predictions.
    pub cache_capacity: usize,
    /// How many features to show in importance tables and charts.
    pub top_n: usize,
    /// Subsample size for global importance on large reference matrices.
    /// `0` disables subsampling.
    pub background_rows: usize,
    /// Seed for the background subsample and the synthetic generator.
    pub sample_seed: u64,
    pub export_importance: Option<PathBuf>,
    pub export_explanation: Option<PathBuf>,
    pub debug_bundle: bool,
}

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080/";
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8080";
pub const DEFAULT_MODEL_NAME: &str = "smote_lightgbm_pipeline_model";
pub const DEFAULT_MODEL_VERSION: &str = "8";
