//! Shared dashboard session used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the startup workflow:
//! resolve config -> load model artifact -> build scoring client -> load
//! reference matrix. The CLI and the TUI can then focus on presentation
//! (printing vs widgets).

use tracing::warn;

use crate::data::reference::{load_reference_csv, ReferenceMatrix};
use crate::data::sample::generate_reference;
use crate::data::scoring::ScoringClient;
use crate::domain::{AppConfig, ClientId, ReferenceSource};
use crate::error::AppError;
use crate::explain::{self, ExplainOptions, GlobalImportance, LocalAttribution};
use crate::model::registry::RegistryClient;
use crate::model::TreeEnsemble;

/// One operator session: the immutable model handle, the scoring client with
/// its caches, and the optional reference matrix.
pub struct Session {
    pub config: AppConfig,
    pub model: TreeEnsemble,
    pub scoring: ScoringClient,
    pub reference: Option<ReferenceMatrix>,
}

impl Session {
    /// Start a session. Model loading is a hard dependency: failure here is
    /// fatal and the UI never starts.
    pub fn start(config: AppConfig) -> Result<Self, AppError> {
        let registry = RegistryClient::new(&config)?;
        let model = registry.fetch_model(&config.model_name, &config.model_version)?;
        let scoring = ScoringClient::new(&config)?;

        let reference = match &config.reference {
            ReferenceSource::None => None,
            ReferenceSource::Csv(path) => {
                let ingest = load_reference_csv(path)?;
                for err in &ingest.row_errors {
                    warn!(line = err.line, "{}", err.message);
                }
                Some(ingest.matrix)
            }
            ReferenceSource::Synthetic { count, seed } => {
                Some(generate_reference(&model.feature_names, *count, *seed)?)
            }
        };

        // Surface a schema mismatch at startup rather than on the first
        // explanation request.
        if let Some(matrix) = &reference {
            if matrix.n_features() != model.n_features() {
                return Err(AppError::config(format!(
                    "Reference matrix has {} features but model '{}:{}' expects {}.",
                    matrix.n_features(),
                    model.name,
                    model.version,
                    model.n_features()
                )));
            }
        }

        Ok(Self {
            config,
            model,
            scoring,
            reference,
        })
    }

    pub fn explain_options(&self) -> ExplainOptions {
        ExplainOptions {
            background_rows: self.config.background_rows,
            seed: self.config.sample_seed,
        }
    }

    /// Global feature importance over the configured reference matrix.
    pub fn global_importance(&self) -> Result<GlobalImportance, AppError> {
        explain::global_importance(&self.model, self.reference()?, &self.explain_options())
    }

    /// Local attribution for one applicant, resolved via the id→row lookup.
    pub fn local_attribution(&self, client_id: ClientId) -> Result<LocalAttribution, AppError> {
        explain::local_attribution(&self.model, self.reference()?, client_id)
    }

    fn reference(&self) -> Result<&ReferenceMatrix, AppError> {
        self.reference.as_ref().ok_or_else(|| {
            AppError::config(
                "No reference data configured. Provide --reference <csv> or --synthetic-count <n>.",
            )
        })
    }
}
