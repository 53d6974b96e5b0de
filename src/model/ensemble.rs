//! Gradient-boosted tree ensemble artifact.
//!
//! The registry serves a JSON document: metadata, a `base_score` margin, and
//! a list of trees whose nodes carry the split definition plus the expected
//! raw margin at that node (leaves carry the leaf value). Storing per-node
//! expected values lets attribution walk a decision path and charge each
//! split with the change in expectation it caused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One node of a decision tree.
///
/// Internal nodes have `feature`, `threshold`, `left`, and `right` set;
/// leaves have only `value`. Child indices must point past their parent, so a
/// well-formed tree is acyclic by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<usize>,
    /// Expected raw margin at this node (training-weighted mean for internal
    /// nodes, leaf value for leaves).
    pub value: f64,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.feature.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

/// The deserialized model artifact.
///
/// Immutable once loaded; a session never swaps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub feature_names: Vec<String>,
    /// Constant log-odds margin added to every prediction.
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Structural validation of a freshly decoded artifact.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_names.is_empty() {
            return Err("artifact declares no features".to_string());
        }
        if self.trees.is_empty() {
            return Err("artifact contains no trees".to_string());
        }
        if !self.base_score.is_finite() {
            return Err("base_score is not finite".to_string());
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if !node.value.is_finite() {
                    return Err(format!("tree {t} node {i} has non-finite value"));
                }
                if node.is_leaf() {
                    if node.threshold.is_some() || node.left.is_some() || node.right.is_some() {
                        return Err(format!("tree {t} node {i} is a leaf with split fields"));
                    }
                    continue;
                }

                let feature = node.feature.unwrap_or_default();
                if feature >= self.n_features() {
                    return Err(format!(
                        "tree {t} node {i} splits on feature {feature}, but artifact has {} features",
                        self.n_features()
                    ));
                }
                let (Some(threshold), Some(left), Some(right)) =
                    (node.threshold, node.left, node.right)
                else {
                    return Err(format!("tree {t} node {i} is missing split fields"));
                };
                if !threshold.is_finite() {
                    return Err(format!("tree {t} node {i} has non-finite threshold"));
                }
                for child in [left, right] {
                    if child >= tree.nodes.len() {
                        return Err(format!(
                            "tree {t} node {i} references out-of-range child {child}"
                        ));
                    }
                    if child <= i {
                        return Err(format!(
                            "tree {t} node {i} references backward child {child}"
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Raw log-odds margin for one feature row.
    pub fn margin(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.n_features());
        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += descend(&tree.nodes, row, |_, _, _| {});
        }
        margin
    }

    /// Class-membership probability for one feature row.
    pub fn proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.margin(row))
    }

    /// Expected margin before any feature is observed: the base score plus
    /// every tree's root expectation. Attribution contributions for any row
    /// sum to `margin(row) - baseline()` exactly.
    pub fn baseline(&self) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.nodes[0].value).sum::<f64>()
    }

    /// Per-feature path contributions for one row.
    ///
    /// Each split along the row's decision path charges its feature with the
    /// change in expected margin between the node and the chosen child,
    /// summed over all trees.
    pub fn path_contributions(&self, row: &[f64]) -> Vec<f64> {
        debug_assert_eq!(row.len(), self.n_features());
        let mut contributions = vec![0.0; self.n_features()];
        for tree in &self.trees {
            descend(&tree.nodes, row, |node, child, feature| {
                contributions[feature] += child.value - node.value;
            });
        }
        contributions
    }
}

/// Walk from the root to a leaf, invoking `on_step(node, chosen_child,
/// feature)` at every split, and return the leaf value.
///
/// Non-finite feature values follow the left branch, matching how the
/// training pipeline routes missing values.
fn descend(
    nodes: &[TreeNode],
    row: &[f64],
    mut on_step: impl FnMut(&TreeNode, &TreeNode, usize),
) -> f64 {
    let mut idx = 0usize;
    loop {
        let node = &nodes[idx];
        let (Some(feature), Some(threshold), Some(left), Some(right)) =
            (node.feature, node.threshold, node.left, node.right)
        else {
            return node.value;
        };

        let v = row[feature];
        let next = if !v.is_finite() || v < threshold {
            left
        } else {
            right
        };
        on_step(node, &nodes[next], feature);
        idx = next;
    }
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    /// One stump: f0 < 0.5 -> -1.0, else +1.0, root expectation 0.
    fn stump() -> TreeEnsemble {
        TreeEnsemble {
            name: "stump".to_string(),
            version: "1".to_string(),
            created_at: None,
            feature_names: vec!["f0".to_string()],
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![split(0, 0.5, 1, 2, 0.0), leaf(-1.0), leaf(1.0)],
            }],
        }
    }

    fn two_feature_ensemble() -> TreeEnsemble {
        // Tree 0 splits on f0, tree 1 splits on f1 then f0.
        TreeEnsemble {
            name: "pair".to_string(),
            version: "2".to_string(),
            created_at: None,
            feature_names: vec!["f0".to_string(), "f1".to_string()],
            base_score: -0.25,
            trees: vec![
                Tree {
                    nodes: vec![split(0, 1.0, 1, 2, 0.1), leaf(-0.4), leaf(0.6)],
                },
                Tree {
                    nodes: vec![
                        split(1, 0.0, 1, 2, -0.05),
                        leaf(-0.3),
                        split(0, 2.0, 3, 4, 0.2),
                        leaf(0.05),
                        leaf(0.35),
                    ],
                },
            ],
        }
    }

    #[test]
    fn stump_routes_both_sides() {
        let m = stump();
        assert_eq!(m.margin(&[0.0]), -1.0);
        assert_eq!(m.margin(&[0.5]), 1.0);
        assert_eq!(m.margin(&[2.0]), 1.0);
    }

    #[test]
    fn non_finite_features_follow_the_left_branch() {
        let m = stump();
        assert_eq!(m.margin(&[f64::NAN]), -1.0);
    }

    #[test]
    fn proba_is_sigmoid_of_margin() {
        let m = stump();
        assert!((m.proba(&[2.0]) - sigmoid(1.0)).abs() < 1e-12);
        assert!(m.proba(&[0.0]) < 0.5);
        assert!(m.proba(&[2.0]) > 0.5);
    }

    #[test]
    fn contributions_reconstruct_margin() {
        let m = two_feature_ensemble();
        for row in [[0.5, -1.0], [0.5, 1.0], [3.0, 1.0], [3.0, -1.0]] {
            let contributions = m.path_contributions(&row);
            let total: f64 = contributions.iter().sum();
            assert!(
                (m.baseline() + total - m.margin(&row)).abs() < 1e-12,
                "row {row:?}: baseline {} + contributions {total} != margin {}",
                m.baseline(),
                m.margin(&row)
            );
        }
    }

    #[test]
    fn stump_charges_the_split_feature() {
        let m = stump();
        let c = m.path_contributions(&[0.0]);
        assert_eq!(c, vec![-1.0]);
        let c = m.path_contributions(&[1.0]);
        assert_eq!(c, vec![1.0]);
    }

    #[test]
    fn decode_accepts_well_formed_artifact() {
        let json = r#"{
            "name": "smote_lightgbm_pipeline_model",
            "version": "8",
            "created_at": "2026-03-14T09:30:00Z",
            "feature_names": ["ext_source_1", "amt_credit"],
            "base_score": -0.1,
            "trees": [
                {"nodes": [
                    {"feature": 0, "threshold": 0.4, "left": 1, "right": 2, "value": 0.0},
                    {"value": -0.5},
                    {"value": 0.5}
                ]}
            ]
        }"#;
        let m: TreeEnsemble = serde_json::from_str(json).unwrap();
        m.validate().unwrap();
        assert_eq!(m.n_features(), 2);
        assert!(m.created_at.is_some());
        assert_eq!(m.margin(&[0.3, 0.0]), -0.6);
    }

    #[test]
    fn validate_rejects_out_of_range_child() {
        let mut m = stump();
        m.trees[0].nodes[0].right = Some(9);
        assert!(m.validate().unwrap_err().contains("out-of-range child"));
    }

    #[test]
    fn validate_rejects_backward_child() {
        let mut m = stump();
        m.trees[0].nodes[0].left = Some(0);
        assert!(m.validate().unwrap_err().contains("backward child"));
    }

    #[test]
    fn validate_rejects_split_on_unknown_feature() {
        let mut m = stump();
        m.trees[0].nodes[0].feature = Some(5);
        assert!(m.validate().unwrap_err().contains("feature 5"));
    }

    #[test]
    fn validate_rejects_empty_trees() {
        let mut m = stump();
        m.trees.clear();
        assert!(m.validate().unwrap_err().contains("no trees"));
    }

    #[test]
    fn validate_rejects_leaf_with_split_fields() {
        let mut m = stump();
        m.trees[0].nodes[1].threshold = Some(0.2);
        assert!(m.validate().unwrap_err().contains("leaf with split fields"));
    }
}
