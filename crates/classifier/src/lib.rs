//! Relationship-type classification from a pre-trained model artifact.

pub mod artifact;
pub mod error;
pub mod features;
pub mod model;
pub mod predictor;

pub use artifact::{LabelEncoder, ModelArtifact, ModelParams, Tree, TreeNode};
pub use error::ClassifierError;
pub use features::{FEATURE_NAMES, FeatureVector};
pub use model::{LoadedModel, Prediction};
pub use predictor::{
    DEFAULT_ARTIFACT_PATH, LoadResult, ModelStatus, PredictionResult, RelationshipClassifier,
};
