//! Command-line parsing for the credit scoring dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the client/model code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cscope", version, about = "Credit scoring desk dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive dashboard.
    ///
    /// This uses the same scoring client and explanation engine as the
    /// non-interactive commands, but renders results in a terminal UI using
    /// Ratatui.
    Tui(SessionArgs),
    /// Print the known applicant identifiers.
    Clients(SessionArgs),
    /// Request a prediction for one applicant.
    Predict(PredictArgs),
    /// Compute feature-importance explanations (global, and per-applicant
    /// with --client).
    Explain(ExplainArgs),
}

/// Common options shared by every command.
#[derive(Debug, Parser, Clone)]
pub struct SessionArgs {
    /// Scoring service base URL (env: SCORING_SERVICE_URL).
    #[arg(long)]
    pub service_url: Option<String>,

    /// Model registry base URL (env: MODEL_REGISTRY_URL).
    #[arg(long)]
    pub registry_url: Option<String>,

    /// Registered model name (env: SCORING_MODEL_NAME).
    #[arg(long)]
    pub model_name: Option<String>,

    /// Pinned model version (env: SCORING_MODEL_VERSION).
    #[arg(long)]
    pub model_version: Option<String>,

    /// Reference feature matrix CSV (first column client_id; env:
    /// REFERENCE_MATRIX_CSV).
    #[arg(long, value_name = "CSV")]
    pub reference: Option<PathBuf>,

    /// Generate a synthetic reference matrix with this many applicants
    /// instead of loading a CSV.
    #[arg(long, conflicts_with = "reference")]
    pub synthetic_count: Option<usize>,

    /// Seed for the synthetic generator and importance subsampling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Optional TTL for cached scoring responses, in seconds.
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Maximum number of cached predictions.
    #[arg(long, default_value_t = 256)]
    pub cache_capacity: usize,

    /// Show the top-N features in importance tables and charts.
    #[arg(long, default_value_t = 15)]
    pub top: usize,

    /// Subsample size for global importance on large matrices (0 = use all
    /// rows).
    #[arg(long, default_value_t = 512)]
    pub background_rows: usize,
}

/// Options for `cscope predict`.
#[derive(Debug, Parser)]
pub struct PredictArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Applicant identifier to score.
    #[arg(short, long)]
    pub client: u64,
}

/// Options for `cscope explain`.
#[derive(Debug, Parser)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Also compute the local attribution for this applicant.
    #[arg(short, long)]
    pub client: Option<u64>,

    /// Export the global importance ranking to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the full explanation (global + local) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Also write a Markdown debug bundle under debug/.
    #[arg(long)]
    pub debug_bundle: bool,
}
