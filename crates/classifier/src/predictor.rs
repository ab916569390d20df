use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{error, info, warn};

use crate::artifact::ModelArtifact;
use crate::error::ClassifierError;
use crate::features::FeatureVector;
use crate::model::LoadedModel;

pub const DEFAULT_ARTIFACT_PATH: &str = "models/relationship_predictor.json";

/// Wire shape of a prediction. Exactly one of `predicted_relationship` +
/// `confidence` or `error` is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_relationship: Option<String>,
    pub confidence: Option<f64>,
    pub error: Option<String>,
}

impl PredictionResult {
    pub fn success(label: String, confidence: f64) -> Self {
        Self {
            predicted_relationship: Some(label),
            confidence: Some(confidence),
            error: None,
        }
    }

    pub fn failure(err: &ClassifierError) -> Self {
        Self {
            predicted_relationship: None,
            confidence: None,
            error: Some(err.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a load attempt. Never an error: an unusable artifact only
/// makes the classifier unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadResult {
    Loaded { features: usize, classes: usize },
    Unavailable { reason: String },
}

impl LoadResult {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadResult::Loaded { .. })
    }
}

/// Snapshot served by the model health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub ml_model_loaded: bool,
    pub model_features: Option<Vec<String>>,
    pub label_classes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
enum LoadState {
    Unloaded,
    Loaded(Arc<LoadedModel>),
    Failed(String),
}

/// Predicts relationship labels with a model trained offline.
///
/// The model sits behind an `Arc` that is swapped as a whole when a load
/// finishes. Predictions clone the current `Arc` and run without holding any
/// lock, so any number of them can run alongside each other and alongside a
/// reload. Loads are serialized so two concurrent attempts cannot interleave.
pub struct RelationshipClassifier {
    artifact_path: PathBuf,
    state: RwLock<Arc<LoadState>>,
    load_lock: Mutex<()>,
}

impl RelationshipClassifier {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            state: RwLock::new(Arc::new(LoadState::Unloaded)),
            load_lock: Mutex::new(()),
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Load (or reload) the artifact at the configured path.
    pub fn load(&self) -> LoadResult {
        let path = self.artifact_path.clone();
        self.load_from(&path)
    }

    pub fn load_from(&self, path: &Path) -> LoadResult {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let loaded = ModelArtifact::read(path).and_then(LoadedModel::new);

        let (next, result) = match loaded {
            Ok(model) => {
                info!(
                    path = %path.display(),
                    features = model.feature_names().len(),
                    classes = model.classes().len(),
                    "Relationship model loaded"
                );
                let result = LoadResult::Loaded {
                    features: model.feature_names().len(),
                    classes: model.classes().len(),
                };
                (LoadState::Loaded(Arc::new(model)), result)
            }
            Err(err) => {
                let reason = err.to_string();
                match err {
                    ClassifierError::ArtifactMissing(_) => {
                        warn!(path = %path.display(), "Model file not found, predictions disabled")
                    }
                    _ => error!(path = %path.display(), error = %reason, "Failed to load model"),
                }
                (
                    LoadState::Failed(reason.clone()),
                    LoadResult::Unavailable { reason },
                )
            }
        };

        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        result
    }

    fn current(&self) -> Arc<LoadState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn model(&self) -> Option<Arc<LoadedModel>> {
        match self.current().as_ref() {
            LoadState::Loaded(model) => Some(Arc::clone(model)),
            LoadState::Unloaded | LoadState::Failed(_) => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model().is_some()
    }

    pub fn predict(&self, features: &FeatureVector) -> PredictionResult {
        let outcome = self
            .model()
            .ok_or(ClassifierError::ModelUnavailable)
            .and_then(|model| model.predict(features));

        match outcome {
            Ok(prediction) => PredictionResult::success(prediction.label, prediction.confidence),
            Err(err) => {
                if !matches!(err, ClassifierError::ModelUnavailable) {
                    warn!(error = %err, "Prediction failed");
                }
                PredictionResult::failure(&err)
            }
        }
    }

    pub fn status(&self) -> ModelStatus {
        match self.current().as_ref() {
            LoadState::Loaded(model) => ModelStatus {
                ml_model_loaded: true,
                model_features: Some(model.feature_names().to_vec()),
                label_classes: Some(model.classes().to_vec()),
                reason: None,
            },
            LoadState::Unloaded => ModelStatus {
                ml_model_loaded: false,
                model_features: None,
                label_classes: None,
                reason: Some("model has not been loaded".to_string()),
            },
            LoadState::Failed(reason) => ModelStatus {
                ml_model_loaded: false,
                model_features: None,
                label_classes: None,
                reason: Some(reason.clone()),
            },
        }
    }
}

impl Default for RelationshipClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_PATH)
    }
}
