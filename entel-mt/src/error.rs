//! Error types for model loading, inference and fine-tuning
use entel::DatasetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MtError {
    /// The model could not be loaded; the process must not serve requests
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    /// A single translate call failed after the model was loaded
    #[error("Generation failed: {0}")]
    Generation(String),
    /// A training step or evaluation failed; the run is aborted
    #[error("Training failed in epoch {epoch}: {message}")]
    Training { epoch: usize, message: String },
    /// Checkpoint directory handling failed
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
    /// Invalid configuration (missing environment variable, bad hyperparameter)
    #[error("Configuration error: {0}")]
    Config(String),
    /// Failure talking to a remote model runtime
    #[error("Network error: {0}")]
    Network(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for MtError {
    fn from(err: reqwest::Error) -> Self {
        MtError::Network(err.to_string())
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;
