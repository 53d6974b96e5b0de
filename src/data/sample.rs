//! Synthetic reference matrix generation.
//!
//! Explanations need a reference feature matrix, which production sessions
//! load from a CSV export of the feature store. For demos and offline work a
//! seeded synthetic matrix can be generated instead, matching the loaded
//! model's feature schema. This is an explicit opt-in (`--synthetic-count`),
//! never a silent fallback.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::reference::ReferenceMatrix;
use crate::domain::ClientId;
use crate::error::AppError;

/// First synthetic applicant identifier. Mirrors the numbering style of the
/// production feature store so demo sessions look familiar.
const FIRST_CLIENT_ID: ClientId = 100_001;

/// Generate `count` synthetic applicants for the given feature schema.
///
/// Features are drawn standardized (zero mean, unit variance) with a small
/// deterministic per-feature offset so columns are distinguishable in charts.
/// The same `(feature_names, count, seed)` triple always yields the same
/// matrix.
pub fn generate_reference(
    feature_names: &[String],
    count: usize,
    seed: u64,
) -> Result<ReferenceMatrix, AppError> {
    if count == 0 {
        return Err(AppError::config("Synthetic reference count must be > 0."));
    }
    if feature_names.is_empty() {
        return Err(AppError::config(
            "Cannot generate a synthetic reference matrix for a model with no features.",
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;

    let n_features = feature_names.len();
    let mut ids = Vec::with_capacity(count);
    let mut flat = Vec::with_capacity(count * n_features);

    for i in 0..count {
        ids.push(FIRST_CLIENT_ID + i as ClientId);
        for j in 0..n_features {
            let offset = feature_offset(j);
            flat.push(offset + normal.sample(&mut rng));
        }
    }

    ReferenceMatrix::new(feature_names.to_vec(), ids, flat)
}

/// Deterministic per-feature mean shift in [-0.5, 0.5].
fn feature_offset(feature: usize) -> f64 {
    ((feature as f64) * 0.7311).sin() * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i:02}")).collect()
    }

    #[test]
    fn shape_and_ids_match_request() {
        let m = generate_reference(&names(4), 10, 42).unwrap();
        assert_eq!(m.n_rows(), 10);
        assert_eq!(m.n_features(), 4);
        assert_eq!(m.ids()[0], 100_001);
        assert_eq!(m.ids()[9], 100_010);
        assert_eq!(m.row_of(100_007), Some(6));
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = generate_reference(&names(3), 5, 7).unwrap();
        let b = generate_reference(&names(3), 5, 7).unwrap();
        for row in 0..5 {
            assert_eq!(a.row_values(row), b.row_values(row));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_reference(&names(3), 5, 7).unwrap();
        let b = generate_reference(&names(3), 5, 8).unwrap();
        assert_ne!(a.row_values(0), b.row_values(0));
    }

    #[test]
    fn zero_count_is_an_error() {
        let err = generate_reference(&names(3), 0, 7).unwrap_err();
        assert!(err.to_string().contains("must be > 0"));
    }
}
