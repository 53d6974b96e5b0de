//! Feature attribution for the loaded ensemble.
//!
//! Attributions are tree-path contributions: walking an applicant's decision
//! path, each split charges its feature with the change in expected margin
//! between the node and the chosen child, summed over all trees. The
//! contributions plus the ensemble baseline reconstruct the row's raw margin
//! exactly, which keeps the charts honest.
//!
//! Both operations recompute from scratch on every invocation. That is fine
//! here: explanation requests are operator-initiated, infrequent, and scoped
//! to a single session.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::reference::ReferenceMatrix;
use crate::domain::ClientId;
use crate::error::AppError;
use crate::model::ensemble::{sigmoid, TreeEnsemble};

/// Mean absolute contribution of one feature across the reference rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub mean_abs: f64,
}

/// Global importance ranking, descending by magnitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalImportance {
    /// Number of reference rows the ranking was computed over.
    pub rows_used: usize,
    pub features: Vec<FeatureImportance>,
}

/// One feature's signed contribution to a single applicant's margin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub name: String,
    /// The applicant's value for this feature.
    pub value: f64,
    pub contribution: f64,
}

/// Local attribution for one applicant row, sorted by |contribution|.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAttribution {
    pub client_id: ClientId,
    pub row: usize,
    /// Expected margin before observing any feature.
    pub baseline: f64,
    /// Raw margin of this row under the local artifact.
    pub margin: f64,
    /// `sigmoid(margin)` — the local artifact's probability, which may differ
    /// from the remote service's when the two deployments drift.
    pub proba: f64,
    pub contributions: Vec<FeatureContribution>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExplainOptions {
    /// Subsample size for global importance. `0` uses every row.
    pub background_rows: usize,
    pub seed: u64,
}

fn check_reference(model: &TreeEnsemble, reference: &ReferenceMatrix) -> Result<(), AppError> {
    if reference.is_empty() {
        return Err(AppError::config(
            "No reference data configured: the reference feature matrix has no rows.",
        ));
    }
    if reference.n_features() != model.n_features() {
        return Err(AppError::config(format!(
            "Reference matrix has {} features but model '{}:{}' expects {}.",
            reference.n_features(),
            model.name,
            model.version,
            model.n_features()
        )));
    }
    Ok(())
}

/// Rank features by mean absolute contribution over the reference rows.
pub fn global_importance(
    model: &TreeEnsemble,
    reference: &ReferenceMatrix,
    opts: &ExplainOptions,
) -> Result<GlobalImportance, AppError> {
    check_reference(model, reference)?;

    let n_rows = reference.n_rows();
    let rows: Vec<usize> = if opts.background_rows > 0 && n_rows > opts.background_rows {
        let mut rng = StdRng::seed_from_u64(opts.seed);
        rand::seq::index::sample(&mut rng, n_rows, opts.background_rows).into_vec()
    } else {
        (0..n_rows).collect()
    };
    debug!(rows = rows.len(), total = n_rows, "computing global importance");

    let n_features = model.n_features();
    let totals = rows
        .par_iter()
        .fold(
            || vec![0.0f64; n_features],
            |mut acc, &row| {
                let contributions = model.path_contributions(&reference.row_values(row));
                for (a, c) in acc.iter_mut().zip(&contributions) {
                    *a += c.abs();
                }
                acc
            },
        )
        .reduce(
            || vec![0.0f64; n_features],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(&b) {
                    *x += y;
                }
                a
            },
        );

    let rows_used = rows.len();
    let mut features: Vec<FeatureImportance> = reference
        .feature_names()
        .iter()
        .zip(&totals)
        .map(|(name, total)| FeatureImportance {
            name: name.clone(),
            mean_abs: total / rows_used as f64,
        })
        .collect();

    features.sort_by(|a, b| {
        b.mean_abs
            .partial_cmp(&a.mean_abs)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(GlobalImportance {
        rows_used,
        features,
    })
}

/// Compute signed contributions for one applicant.
///
/// The identifier is resolved through the matrix's lookup table; it is never
/// used as a positional row index.
pub fn local_attribution(
    model: &TreeEnsemble,
    reference: &ReferenceMatrix,
    client_id: ClientId,
) -> Result<LocalAttribution, AppError> {
    check_reference(model, reference)?;

    let row = reference.row_of(client_id).ok_or_else(|| {
        AppError::config(format!(
            "Applicant {client_id} not found in the reference matrix."
        ))
    })?;

    let values = reference.row_values(row);
    let raw = model.path_contributions(&values);
    let margin = model.margin(&values);

    let mut contributions: Vec<FeatureContribution> = reference
        .feature_names()
        .iter()
        .zip(values.iter().zip(&raw))
        .map(|(name, (value, contribution))| FeatureContribution {
            name: name.clone(),
            value: *value,
            contribution: *contribution,
        })
        .collect();

    contributions.sort_by(|a, b| {
        b.contribution
            .abs()
            .partial_cmp(&a.contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(LocalAttribution {
        client_id,
        row,
        baseline: model.baseline(),
        margin,
        proba: sigmoid(margin),
        contributions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ensemble::{Tree, TreeNode};

    fn leaf(value: f64) -> TreeNode {
        TreeNode {
            feature: None,
            threshold: None,
            left: None,
            right: None,
            value,
        }
    }

    fn split(feature: usize, threshold: f64, left: usize, right: usize, value: f64) -> TreeNode {
        TreeNode {
            feature: Some(feature),
            threshold: Some(threshold),
            left: Some(left),
            right: Some(right),
            value,
        }
    }

    /// Two features; only f0 is ever split on, so f1's importance is zero.
    fn model() -> TreeEnsemble {
        TreeEnsemble {
            name: "m".to_string(),
            version: "1".to_string(),
            created_at: None,
            feature_names: vec!["f0".to_string(), "f1".to_string()],
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![split(0, 0.0, 1, 2, 0.0), leaf(-1.0), leaf(1.0)],
            }],
        }
    }

    fn matrix(rows: &[(u64, [f64; 2])]) -> ReferenceMatrix {
        let ids: Vec<u64> = rows.iter().map(|(id, _)| *id).collect();
        let flat: Vec<f64> = rows.iter().flat_map(|(_, r)| r.iter().copied()).collect();
        ReferenceMatrix::new(vec!["f0".to_string(), "f1".to_string()], ids, flat).unwrap()
    }

    fn opts() -> ExplainOptions {
        ExplainOptions {
            background_rows: 0,
            seed: 42,
        }
    }

    #[test]
    fn empty_matrix_is_a_validation_error() {
        let empty = ReferenceMatrix::new(
            vec!["f0".to_string(), "f1".to_string()],
            Vec::new(),
            Vec::new(),
        )
        .unwrap();
        let err = global_importance(&model(), &empty, &opts()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("no rows"));
    }

    #[test]
    fn feature_count_mismatch_is_rejected() {
        let narrow =
            ReferenceMatrix::new(vec!["f0".to_string()], vec![1], vec![0.5]).unwrap();
        let err = global_importance(&model(), &narrow, &opts()).unwrap_err();
        assert!(err.to_string().contains("expects 2"));
    }

    #[test]
    fn global_ranks_split_feature_above_unused_feature() {
        let m = matrix(&[(1, [-1.0, 9.0]), (2, [1.0, -9.0]), (3, [2.0, 0.0])]);
        let global = global_importance(&model(), &m, &opts()).unwrap();
        assert_eq!(global.rows_used, 3);
        assert_eq!(global.features[0].name, "f0");
        assert_eq!(global.features[0].mean_abs, 1.0);
        assert_eq!(global.features[1].name, "f1");
        assert_eq!(global.features[1].mean_abs, 0.0);
    }

    #[test]
    fn subsampling_is_deterministic_and_bounded() {
        let rows: Vec<(u64, [f64; 2])> = (0..100).map(|i| (i, [i as f64 - 50.0, 0.0])).collect();
        let m = matrix(&rows);
        let o = ExplainOptions {
            background_rows: 10,
            seed: 7,
        };
        let a = global_importance(&model(), &m, &o).unwrap();
        let b = global_importance(&model(), &m, &o).unwrap();
        assert_eq!(a.rows_used, 10);
        assert_eq!(a.features[0].mean_abs, b.features[0].mean_abs);
    }

    #[test]
    fn local_resolves_identifier_through_lookup() {
        // Identifier 100002 sits at row 1; using the identifier as a row
        // index would be out of bounds entirely.
        let m = matrix(&[(100001, [-3.0, 0.0]), (100002, [4.0, 0.0])]);
        let local = local_attribution(&model(), &m, 100002).unwrap();
        assert_eq!(local.row, 1);
        assert_eq!(local.client_id, 100002);
        assert_eq!(local.contributions[0].name, "f0");
        assert_eq!(local.contributions[0].value, 4.0);
        assert_eq!(local.contributions[0].contribution, 1.0);
    }

    #[test]
    fn unknown_identifier_is_an_explicit_error() {
        let m = matrix(&[(100001, [0.0, 0.0])]);
        let err = local_attribution(&model(), &m, 424242).unwrap_err();
        assert!(err.to_string().contains("424242"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn local_contributions_reconstruct_margin() {
        let m = matrix(&[(1, [0.25, -2.0])]);
        let local = local_attribution(&model(), &m, 1).unwrap();
        let total: f64 = local.contributions.iter().map(|c| c.contribution).sum();
        assert!((local.baseline + total - local.margin).abs() < 1e-12);
        assert!((local.proba - sigmoid(local.margin)).abs() < 1e-12);
    }
}
