//! Write computed explanations to CSV/JSON files.
//!
//! The JSON file is the "portable" representation of an explanation run:
//! which artifact produced it, when, and the global/local attributions. It is
//! a one-shot artifact export, not a prediction history.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::explain::{GlobalImportance, LocalAttribution};
use crate::error::AppError;

/// Schema of the exported explanation JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ExplanationFile {
    pub tool: String,
    pub model_name: String,
    pub model_version: String,
    pub generated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalImportance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalAttribution>,
}

impl ExplanationFile {
    pub fn new(
        model_name: &str,
        model_version: &str,
        global: Option<GlobalImportance>,
        local: Option<LocalAttribution>,
    ) -> Self {
        Self {
            tool: "cscope".to_string(),
            model_name: model_name.to_string(),
            model_version: model_version.to_string(),
            generated: chrono::Local::now().to_rfc3339(),
            global,
            local,
        }
    }
}

/// Write the global importance ranking as a two-column CSV.
pub fn write_importance_csv(path: &Path, global: &GlobalImportance) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::config(format!(
            "Failed to create importance CSV '{}': {e}",
            path.display()
        ))
    })?;

    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(["feature", "mean_abs_contribution"])
        .map_err(|e| AppError::config(format!("Failed to write importance CSV: {e}")))?;
    for feature in &global.features {
        writer
            .write_record([feature.name.as_str(), &format!("{}", feature.mean_abs)])
            .map_err(|e| AppError::config(format!("Failed to write importance CSV: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to write importance CSV: {e}")))?;
    Ok(())
}

/// Write an explanation JSON file.
pub fn write_explanation_json(path: &Path, explanation: &ExplanationFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::config(format!(
            "Failed to create explanation JSON '{}': {e}",
            path.display()
        ))
    })?;

    serde_json::to_writer_pretty(file, explanation)
        .map_err(|e| AppError::config(format!("Failed to write explanation JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::FeatureImportance;

    fn global() -> GlobalImportance {
        GlobalImportance {
            rows_used: 2,
            features: vec![
                FeatureImportance {
                    name: "ext_source_1".to_string(),
                    mean_abs: 0.75,
                },
                FeatureImportance {
                    name: "amt_credit".to_string(),
                    mean_abs: 0.25,
                },
            ],
        }
    }

    #[test]
    fn importance_csv_round_trips_through_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importance.csv");
        write_importance_csv(&path, &global()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("feature,mean_abs_contribution"));
        assert_eq!(lines.next(), Some("ext_source_1,0.75"));
        assert_eq!(lines.next(), Some("amt_credit,0.25"));
    }

    #[test]
    fn explanation_json_is_valid_and_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explanation.json");
        let file = ExplanationFile::new("m", "8", Some(global()), None);
        write_explanation_json(&path, &file).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "cscope");
        assert_eq!(value["model_version"], "8");
        assert_eq!(value["global"]["rows_used"], 2);
        assert!(value.get("local").is_none());
    }
}
