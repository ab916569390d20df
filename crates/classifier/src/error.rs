use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// No model has been loaded successfully in this process.
    #[error("model not loaded")]
    ModelUnavailable,

    #[error("model artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("model artifact is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model artifact is corrupt: {0}")]
    CorruptArtifact(String),

    /// The artifact was trained on a different feature order than the one
    /// requests are encoded in.
    #[error("feature order mismatch: model expects {expected:?}, request provides {provided:?}")]
    FeatureOrderMismatch {
        expected: Vec<String>,
        provided: Vec<String>,
    },
}

pub(crate) fn corrupt(message: impl Into<String>) -> ClassifierError {
    ClassifierError::CorruptArtifact(message.into())
}
