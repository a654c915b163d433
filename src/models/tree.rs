//! Gradient-boosted tree ensemble evaluated natively.
//!
//! Artifact layout follows an XGBoost JSON dump: a base margin, a list of
//! trees whose split nodes send `value < threshold` to `yes` and everything
//! else to `no`, and a logistic link from summed margin to probability.

use serde::Deserialize;

use crate::schema::{ModelSchema, FEATURE_COUNT};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum Objective {
    #[serde(rename = "binary:logistic")]
    BinaryLogistic,
}

/// Serialized form of a tree ensemble model.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsembleArtifact {
    #[serde(default)]
    pub name: Option<String>,
    pub schema: ModelSchema,
    pub objective: Objective,
    pub base_margin: f64,
    pub trees: Vec<Tree>,
}

/// Validated, immutable tree ensemble.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    base_margin: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Validate an artifact's structure.
    ///
    /// Children must come after their parent, so evaluation always reaches a
    /// leaf. Split features must address the schema's columns.
    pub fn from_artifact(artifact: &TreeEnsembleArtifact) -> Result<Self, String> {
        if !artifact.base_margin.is_finite() {
            return Err("base_margin is not finite".to_string());
        }
        if artifact.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        let feature_limit = artifact.schema.features.len().min(FEATURE_COUNT);

        for (t, tree) in artifact.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            let len = tree.nodes.len();
            for (n, node) in tree.nodes.iter().enumerate() {
                match *node {
                    TreeNode::Leaf { leaf } if !leaf.is_finite() => {
                        return Err(format!("tree {t} node {n}: leaf value is not finite"));
                    }
                    TreeNode::Leaf { .. } => {}
                    TreeNode::Split {
                        feature,
                        threshold,
                        yes,
                        no,
                    } => {
                        if feature >= feature_limit {
                            return Err(format!(
                                "tree {t} node {n}: feature index {feature} out of range"
                            ));
                        }
                        if !threshold.is_finite() {
                            return Err(format!("tree {t} node {n}: threshold is not finite"));
                        }
                        for child in [yes, no] {
                            if child <= n || child >= len {
                                return Err(format!(
                                    "tree {t} node {n}: child {child} must be in {}..{len}",
                                    n + 1
                                ));
                            }
                        }
                    }
                }
            }
        }

        Ok(Self {
            base_margin: artifact.base_margin,
            trees: artifact.trees.clone(),
        })
    }

    /// Summed raw margin before the logistic link.
    pub fn margin(&self, features: &[f64]) -> f64 {
        self.base_margin
            + self
                .trees
                .iter()
                .map(|tree| leaf_value(tree, features))
                .sum::<f64>()
    }

    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.margin(features))
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

fn leaf_value(tree: &Tree, features: &[f64]) -> f64 {
    let mut idx = 0;
    loop {
        match tree.nodes[idx] {
            TreeNode::Leaf { leaf } => return leaf,
            TreeNode::Split {
                feature,
                threshold,
                yes,
                no,
            } => {
                let value = features.get(feature).copied().unwrap_or(0.0);
                idx = if value < threshold { yes } else { no };
            }
        }
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(json: &str) -> TreeEnsembleArtifact {
        serde_json::from_str(json).unwrap()
    }

    const STUMP: &str = r#"{
        "schema": {"version": "graph-centrality-v1", "features": ["amount","src_pagerank","dst_pagerank","src_degree","dst_degree","src_betweenness","dst_betweenness"]},
        "objective": "binary:logistic",
        "base_margin": 0.0,
        "trees": [
            {"nodes": [
                {"feature": 0, "threshold": 1000.0, "yes": 1, "no": 2},
                {"leaf": -1.0},
                {"leaf": 1.0}
            ]}
        ]
    }"#;

    #[test]
    fn test_stump_routes_on_threshold() {
        let model = TreeEnsemble::from_artifact(&artifact(STUMP)).unwrap();
        let below = [999.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let at = [1000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        assert_eq!(model.margin(&below), -1.0);
        assert_eq!(model.margin(&at), 1.0);
        assert!((model.predict_proba(&at) - 0.7310585786).abs() < 1e-9);
    }

    #[test]
    fn test_zero_margin_is_one_half() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
    }

    #[test]
    fn test_rejects_backward_child() {
        let mut a = artifact(STUMP);
        a.trees[0].nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 1.0,
            yes: 0,
            no: 2,
        };
        assert!(TreeEnsemble::from_artifact(&a).unwrap_err().contains("child 0"));
    }

    #[test]
    fn test_rejects_out_of_range_feature() {
        let mut a = artifact(STUMP);
        a.trees[0].nodes[0] = TreeNode::Split {
            feature: 7,
            threshold: 1.0,
            yes: 1,
            no: 2,
        };
        assert!(TreeEnsemble::from_artifact(&a).is_err());
    }

    #[test]
    fn test_rejects_empty_ensemble() {
        let mut a = artifact(STUMP);
        a.trees.clear();
        assert!(TreeEnsemble::from_artifact(&a).is_err());
    }
}
