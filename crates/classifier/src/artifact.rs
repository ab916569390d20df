//! On-disk model bundle.
//!
//! An artifact is a JSON document produced by the offline training job:
//!
//! ```json
//! {
//!   "feature_names": ["source_centrality", "..."],
//!   "label_encoder": { "classes": ["ally", "enemy", "family"] },
//!   "model": { "kind": "random_forest", "trees": [ { "nodes": [...] } ] }
//! }
//! ```
//!
//! Tree nodes are either splits (`feature`, `threshold`, `left`, `right`,
//! with `x[feature] <= threshold` going left) or leaves (`value`, one weight
//! per class). The root is node 0 and children always come after their parent.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ClassifierError, corrupt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub label_encoder: LabelEncoder,
    pub model: ModelParams,
}

/// Maps class indices to human-readable labels and back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParams {
    RandomForest { trees: Vec<Tree> },
    DecisionTree { tree: Tree },
    LogisticRegression { coef: Vec<Vec<f64>>, intercept: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl ModelArtifact {
    pub fn read(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::ArtifactMissing(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Structural checks so that inference can index without bounds failures.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let n_classes = self.label_encoder.len();
        let n_features = self.feature_names.len();

        if n_classes == 0 {
            return Err(corrupt("label encoder has no classes"));
        }
        if n_features == 0 {
            return Err(corrupt("no feature names"));
        }

        match &self.model {
            ModelParams::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(corrupt("random forest has no trees"));
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n_features, n_classes)
                        .map_err(|e| corrupt(format!("tree {i}: {e}")))?;
                }
            }
            ModelParams::DecisionTree { tree } => {
                tree.validate(n_features, n_classes).map_err(corrupt)?;
            }
            ModelParams::LogisticRegression { coef, intercept } => {
                let binary = n_classes == 2 && coef.len() == 1;
                if !binary && coef.len() != n_classes {
                    return Err(corrupt(format!(
                        "{} coefficient rows for {} classes",
                        coef.len(),
                        n_classes
                    )));
                }
                if intercept.len() != coef.len() {
                    return Err(corrupt("intercept length does not match coefficient rows"));
                }
                if coef.iter().any(|row| row.len() != n_features) {
                    return Err(corrupt("coefficient row width does not match feature count"));
                }
                if coef.iter().flatten().chain(intercept).any(|w| !w.is_finite()) {
                    return Err(corrupt("non-finite coefficient"));
                }
            }
        }

        Ok(())
    }
}

impl Tree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {i} splits on unknown feature {feature}"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {i} has {} weights for {} classes",
                            value.len(),
                            n_classes
                        ));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(format!("leaf {i} has a negative or non-finite weight"));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("leaf {i} has no weight"));
                    }
                }
            }
        }

        Ok(())
    }
}
