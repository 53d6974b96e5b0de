//! Debug bundle writer for inspecting a dashboard session.

use std::fs::create_dir_all;
use std::path::PathBuf;

use chrono::Local;

use crate::domain::{AppConfig, ClientId, Prediction, ReferenceSource};
use crate::error::AppError;
use crate::explain::GlobalImportance;
use crate::model::TreeEnsemble;
use crate::report;

/// Write a Markdown bundle of the current session state under `debug/` and
/// return its path.
pub fn write_debug_bundle(
    config: &AppConfig,
    model: &TreeEnsemble,
    prediction: Option<(ClientId, Prediction)>,
    global: Option<&GlobalImportance>,
) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir)
        .map_err(|e| AppError::runtime(format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("scoring_debug_{}_{}_{ts}.md", model.name, model.version));

    let mut out = String::new();
    out.push_str("# cscope debug bundle\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- service_url: {}\n", config.service_url));
    out.push_str(&format!("- registry_url: {}\n", config.registry_url));
    out.push_str(&format!("- model: {}:{}\n", model.name, model.version));
    if let Some(created_at) = model.created_at {
        out.push_str(&format!("- model_created_at: {created_at}\n"));
    }
    out.push_str(&format!(
        "- trees: {} | features: {} | base_score: {:.4}\n",
        model.trees.len(),
        model.n_features(),
        model.base_score
    ));
    out.push_str(&format!("- reference: {}\n", reference_label(&config.reference)));
    out.push_str(&format!(
        "- timeout: {}s | cache_capacity: {} | background_rows: {}\n",
        config.timeout.as_secs(),
        config.cache_capacity,
        config.background_rows
    ));

    if let Some((client_id, prediction)) = prediction {
        out.push_str("\n## Last prediction\n\n```\n");
        out.push_str(&report::format_prediction(client_id, &prediction));
        out.push_str("```\n");
    }

    if let Some(global) = global {
        out.push_str("\n## Global importance\n\n```\n");
        out.push_str(&report::format_global(global, config.top_n));
        out.push_str("```\n");
    }

    std::fs::write(&path, out)
        .map_err(|e| AppError::runtime(format!("Failed to write debug bundle: {e}")))?;

    Ok(path)
}

fn reference_label(source: &ReferenceSource) -> String {
    match source {
        ReferenceSource::None => "none".to_string(),
        ReferenceSource::Csv(path) => format!("csv:{}", path.display()),
        ReferenceSource::Synthetic { count, seed } => {
            format!("synthetic (count={count}, seed={seed})")
        }
    }
}
