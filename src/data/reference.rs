//! Reference feature matrix ingest.
//!
//! This module turns a reference CSV (one row per applicant, first column
//! `client_id`, remaining columns numeric features) into a dense matrix plus
//! an explicit identifier-to-row lookup. Explanations never treat an
//! applicant identifier as a positional row index; the lookup table is the
//! only bridge between the two.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness)

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use nalgebra::DMatrix;

use crate::domain::ClientId;
use crate::error::AppError;

/// Feature vectors for the known applicants.
///
/// Rows are applicants, columns are features; values are stored densely so
/// per-row attribution passes stay cache-friendly.
#[derive(Debug, Clone)]
pub struct ReferenceMatrix {
    feature_names: Vec<String>,
    ids: Vec<ClientId>,
    index: HashMap<ClientId, usize>,
    values: DMatrix<f64>,
}

impl ReferenceMatrix {
    /// Build a matrix from row-major values. `flat.len()` must equal
    /// `ids.len() * feature_names.len()`.
    pub fn new(
        feature_names: Vec<String>,
        ids: Vec<ClientId>,
        flat: Vec<f64>,
    ) -> Result<Self, AppError> {
        let n_rows = ids.len();
        let n_cols = feature_names.len();
        if flat.len() != n_rows * n_cols {
            return Err(AppError::config(format!(
                "Reference matrix shape mismatch: {} values for {n_rows}x{n_cols}.",
                flat.len()
            )));
        }

        let mut index = HashMap::with_capacity(n_rows);
        for (row, id) in ids.iter().enumerate() {
            if index.insert(*id, row).is_some() {
                return Err(AppError::config(format!(
                    "Duplicate client_id {id} in reference matrix."
                )));
            }
        }

        Ok(Self {
            feature_names,
            ids,
            index,
            values: DMatrix::from_row_slice(n_rows, n_cols, &flat),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn ids(&self) -> &[ClientId] {
        &self.ids
    }

    /// Resolve an applicant identifier to its row position, if present.
    pub fn row_of(&self, id: ClientId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn row_values(&self, row: usize) -> Vec<f64> {
        self.values.row(row).iter().copied().collect()
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the matrix plus per-row diagnostics.
#[derive(Debug, Clone)]
pub struct ReferenceIngest {
    pub matrix: ReferenceMatrix,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load and validate a reference CSV.
pub fn load_reference_csv(path: &Path) -> Result<ReferenceIngest, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::config(format!(
            "Failed to open reference CSV '{}': {e}",
            path.display()
        ))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read reference CSV headers: {e}")))?
        .clone();

    let Some(id_header) = headers.get(0) else {
        return Err(AppError::config("Reference CSV has no columns."));
    };
    if !id_header.eq_ignore_ascii_case("client_id") {
        return Err(AppError::config(format!(
            "Reference CSV must have 'client_id' as its first column (found '{id_header}')."
        )));
    }

    let feature_names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    if feature_names.is_empty() {
        return Err(AppError::config(
            "Reference CSV has no feature columns beside client_id.",
        ));
    }

    let mut ids: Vec<ClientId> = Vec::new();
    let mut flat: Vec<f64> = Vec::new();
    let mut row_errors: Vec<RowError> = Vec::new();
    let mut rows_read = 0usize;
    let mut seen: HashMap<ClientId, usize> = HashMap::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header row and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("unreadable row: {e}"),
                });
                continue;
            }
        };

        let Some(raw_id) = record.get(0) else {
            row_errors.push(RowError {
                line,
                message: "missing client_id".to_string(),
            });
            continue;
        };
        let id: ClientId = match raw_id.parse() {
            Ok(id) => id,
            Err(_) => {
                row_errors.push(RowError {
                    line,
                    message: format!("invalid client_id '{raw_id}'"),
                });
                continue;
            }
        };
        if seen.contains_key(&id) {
            row_errors.push(RowError {
                line,
                message: format!("duplicate client_id {id} (keeping first occurrence)"),
            });
            continue;
        }

        let mut row: Vec<f64> = Vec::with_capacity(feature_names.len());
        let mut bad: Option<String> = None;
        for (col, name) in feature_names.iter().enumerate() {
            let raw = record.get(col + 1).unwrap_or("");
            match raw.parse::<f64>() {
                Ok(v) => row.push(v),
                Err(_) => {
                    bad = Some(format!("invalid value '{raw}' for feature '{name}'"));
                    break;
                }
            }
        }
        if let Some(message) = bad {
            row_errors.push(RowError { line, message });
            continue;
        }

        seen.insert(id, ids.len());
        ids.push(id);
        flat.extend(row);
    }

    if ids.is_empty() {
        return Err(AppError::config(format!(
            "Reference CSV '{}' contains no usable rows ({} rows read, {} rejected).",
            path.display(),
            rows_read,
            row_errors.len()
        )));
    }

    let matrix = ReferenceMatrix::new(feature_names, ids, flat)?;
    Ok(ReferenceIngest {
        matrix,
        row_errors,
        rows_read,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_ids_features_and_lookup() {
        let file = write_csv(
            "client_id,ext_source_1,amt_credit\n\
             100001,0.5,250000\n\
             100002,0.1,90000\n",
        );
        let ingest = load_reference_csv(file.path()).unwrap();
        let m = &ingest.matrix;
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_features(), 2);
        assert_eq!(m.feature_names(), ["ext_source_1", "amt_credit"]);
        assert_eq!(m.row_of(100002), Some(1));
        assert_eq!(m.row_of(999999), None);
        assert_eq!(m.row_values(0), vec![0.5, 250000.0]);
        assert!(ingest.row_errors.is_empty());
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let file = write_csv(
            "client_id,f\n\
             100001,0.5\n\
             oops,0.2\n\
             100001,0.9\n\
             100003,notanumber\n\
             100004,1.25\n",
        );
        let ingest = load_reference_csv(file.path()).unwrap();
        assert_eq!(ingest.matrix.n_rows(), 2);
        assert_eq!(ingest.rows_read, 5);
        assert_eq!(ingest.row_errors.len(), 3);
        // First occurrence wins on duplicates.
        assert_eq!(ingest.matrix.row_values(0), vec![0.5]);
    }

    #[test]
    fn rejects_missing_client_id_header() {
        let file = write_csv("id,f\n1,0.5\n");
        let err = load_reference_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("client_id"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_feature_free_schema() {
        let file = write_csv("client_id\n1\n");
        let err = load_reference_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("no feature columns"));
    }

    #[test]
    fn rejects_fully_unusable_file() {
        let file = write_csv("client_id,f\nbad,0.1\nworse,xyz\n");
        let err = load_reference_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("no usable rows"));
    }

    #[test]
    fn duplicate_ids_rejected_in_constructor() {
        let err = ReferenceMatrix::new(
            vec!["f".to_string()],
            vec![1, 1],
            vec![0.0, 1.0],
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate client_id"));
    }
}
