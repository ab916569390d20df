use crate::artifact::{ModelArtifact, ModelParams, Tree, TreeNode};
use crate::error::{ClassifierError, corrupt};
use crate::features::FeatureVector;

/// Most probable class for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Probability of `label`, rounded to 3 decimals.
    pub confidence: f64,
}

/// A validated artifact, ready for inference. Immutable once built.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    artifact: ModelArtifact,
}

impl LoadedModel {
    pub fn new(artifact: ModelArtifact) -> Result<Self, ClassifierError> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    pub fn classes(&self) -> &[String] {
        &self.artifact.label_encoder.classes
    }

    /// Encode `features` in the order the model was trained on. Any
    /// disagreement with the request order is refused rather than guessed at.
    pub fn encode(&self, features: &FeatureVector) -> Result<Vec<f64>, ClassifierError> {
        let expected = self.feature_names();
        if !expected.iter().map(String::as_str).eq(FeatureVector::NAMES) {
            return Err(ClassifierError::FeatureOrderMismatch {
                expected: expected.to_vec(),
                provided: FeatureVector::NAMES.iter().map(|s| s.to_string()).collect(),
            });
        }

        Ok(features.values().to_vec())
    }

    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        match &self.artifact.model {
            ModelParams::RandomForest { trees } => {
                let mut total = vec![0.0; self.classes().len()];
                for tree in trees {
                    for (acc, p) in total.iter_mut().zip(tree.leaf_distribution(x)) {
                        *acc += p;
                    }
                }
                let n = trees.len() as f64;
                total.into_iter().map(|p| p / n).collect()
            }
            ModelParams::DecisionTree { tree } => tree.leaf_distribution(x),
            ModelParams::LogisticRegression { coef, intercept } => {
                let scores: Vec<f64> = coef
                    .iter()
                    .zip(intercept)
                    .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
                    .collect();
                if scores.len() == 1 {
                    let p = sigmoid(scores[0]);
                    vec![1.0 - p, p]
                } else {
                    softmax(&scores)
                }
            }
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        let x = self.encode(features)?;
        let probabilities = self.predict_proba(&x);

        let (best, probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
                Some((_, top)) if top >= p => best,
                _ => Some((i, p)),
            })
            .ok_or_else(|| corrupt("model produced no probabilities"))?;

        if !probability.is_finite() {
            return Err(corrupt("model produced a non-finite probability"));
        }

        let label = self
            .artifact
            .label_encoder
            .inverse_transform(best)
            .ok_or_else(|| corrupt(format!("class index {best} has no label")))?;

        Ok(Prediction {
            label: label.to_string(),
            confidence: round3(probability),
        })
    }
}

impl Tree {
    fn leaf_distribution(&self, x: &[f64]) -> Vec<f64> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    return value.iter().map(|w| w / total).collect();
                }
            }
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use serde_json::json;

    fn features(source_centrality: f64, same_work: bool) -> FeatureVector {
        FeatureVector {
            source_centrality,
            target_centrality: 0.5,
            source_name_length: 5,
            target_name_length: 6,
            same_work,
            source_in_work: true,
        }
    }

    fn model(model: serde_json::Value) -> LoadedModel {
        let artifact: ModelArtifact = serde_json::from_value(json!({
            "feature_names": FEATURE_NAMES,
            "label_encoder": {"classes": ["ally", "enemy", "family"]},
            "model": model
        }))
        .unwrap();
        LoadedModel::new(artifact).unwrap()
    }

    #[test]
    fn test_forest_averages_tree_distributions() {
        let forest = model(json!({
            "kind": "random_forest",
            "trees": [
                {"nodes": [
                    {"feature": 4, "threshold": 0.5, "left": 1, "right": 2},
                    {"value": [0.0, 3.0, 1.0]},
                    {"value": [2.0, 0.0, 2.0]}
                ]},
                {"nodes": [
                    {"feature": 0, "threshold": 0.3, "left": 1, "right": 2},
                    {"value": [0.0, 1.0, 0.0]},
                    {"value": [1.0, 0.0, 0.0]}
                ]}
            ]
        }));

        // same work, central source: tree 1 -> [.5, 0, .5], tree 2 -> [1, 0, 0]
        let p = forest.predict_proba(&features(0.8, true).values());
        assert_eq!(p, vec![0.75, 0.0, 0.25]);

        let prediction = forest.predict(&features(0.8, true)).unwrap();
        assert_eq!(prediction.label, "ally");
        assert_eq!(prediction.confidence, 0.75);

        // different works, peripheral source: [0, .75, .25] and [0, 1, 0]
        let prediction = forest.predict(&features(0.1, false)).unwrap();
        assert_eq!(prediction.label, "enemy");
        assert_eq!(prediction.confidence, 0.875);
    }

    #[test]
    fn test_confidence_is_rounded() {
        let tree = model(json!({
            "kind": "decision_tree",
            "tree": {"nodes": [{"value": [1.0, 1.0, 1.0]}]}
        }));

        let prediction = tree.predict(&features(0.5, true)).unwrap();
        // ties resolve to the first class
        assert_eq!(prediction.label, "ally");
        assert_eq!(prediction.confidence, 0.333);
    }

    #[test]
    fn test_logistic_regression_softmax() {
        let logistic = model(json!({
            "kind": "logistic_regression",
            "coef": [
                [0.0, 0.0, 0.0, 0.0, 2.0, 0.0],
                [0.0, 0.0, 0.0, 0.0, -2.0, 0.0],
                [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
            ],
            "intercept": [0.0, 1.0, 0.0]
        }));

        let p = logistic.predict_proba(&features(0.5, true).values());
        let total: f64 = p.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);

        let prediction = logistic.predict(&features(0.5, true)).unwrap();
        assert_eq!(prediction.label, "ally");

        let prediction = logistic.predict(&features(0.5, false)).unwrap();
        assert_eq!(prediction.label, "enemy");
    }

    #[test]
    fn test_encode_follows_declared_order() {
        let tree = model(json!({
            "kind": "decision_tree",
            "tree": {"nodes": [{"value": [1.0, 0.0, 0.0]}]}
        }));

        let x = tree.encode(&features(0.8, false)).unwrap();
        assert_eq!(x, vec![0.8, 0.5, 5.0, 6.0, 0.0, 1.0]);
        let named: Vec<f64> = tree
            .feature_names()
            .iter()
            .map(|name| features(0.8, false).value(name).unwrap())
            .collect();
        assert_eq!(x, named);
    }

    #[test]
    fn test_reordered_features_are_refused() {
        let mut names: Vec<&str> = FEATURE_NAMES.to_vec();
        names.swap(0, 1);
        let artifact: ModelArtifact = serde_json::from_value(json!({
            "feature_names": names,
            "label_encoder": {"classes": ["ally"]},
            "model": {"kind": "decision_tree", "tree": {"nodes": [{"value": [1.0]}]}}
        }))
        .unwrap();
        let reordered = LoadedModel::new(artifact).unwrap();

        let err = reordered.predict(&features(0.5, true)).unwrap_err();
        assert!(matches!(err, ClassifierError::FeatureOrderMismatch { .. }));
        assert!(err.to_string().starts_with("feature order mismatch"));
    }
}
