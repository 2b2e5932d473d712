//! Error types for corpus preparation and request validation
use thiserror::Error;

/// Failures while preparing a parallel corpus.
///
/// Every variant aborts the preparation run; nothing is written to disk.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The input table lacks one of the required columns
    #[error("input must have '{source_column}' and '{target_column}' columns. Found: {found:?}")]
    Schema {
        source_column: String,
        target_column: String,
        found: Vec<String>,
    },
    /// Too few usable records survived filtering to form three partitions
    #[error("only {usable} usable records after filtering; at least {required} are needed")]
    Empty { usable: usize, required: usize },
    /// Split fractions that cannot produce a train partition
    #[error("invalid split fractions: {0}")]
    InvalidSplit(String),
    /// A prepared partition file does not have the expected two-column layout
    #[error("malformed partition file '{path}': {reason}")]
    MalformedPartition { path: String, reason: String },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Caller-facing failures of a single translation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Input text cannot be empty.")]
    EmptyInput,
    #[error("Supported languages are {supported}. Unsupported: {}", .codes.join(", "))]
    UnsupportedLanguage {
        codes: Vec<String>,
        supported: String,
    },
    #[error("Source and target languages must be different.")]
    IdenticalLanguage,
}

impl RequestError {
    /// Stable machine-readable category for clients
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::EmptyInput => "empty-input",
            RequestError::UnsupportedLanguage { .. } => "unsupported-language",
            RequestError::IdenticalLanguage => "identical-language",
        }
    }
}

/// Result type for corpus preparation
pub type DatasetResult<T> = Result<T, DatasetError>;
