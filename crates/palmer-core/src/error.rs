use thiserror::Error;

/// Broad category of a pipeline failure.
///
/// None of these are retried: every stage fails fast and reports the
/// offending column, value or path to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing column, empty dataset after cleaning, malformed row.
    Data,
    /// Unseen category or label presented to a fitted encoder.
    Encoding,
    /// Invalid hyperparameter or configuration value.
    Config,
    /// Persisted encoder/model missing, corrupt or incompatible.
    Artifact,
    /// Underlying filesystem failure.
    Io,
}

/// Error type shared by every Palmer crate.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing column '{column}'")]
    MissingColumn { column: String },

    #[error("Empty dataset: {context}")]
    EmptyDataset { context: String },

    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Unknown label '{value}' in column '{column}'")]
    UnknownLabel { column: String, value: String },

    #[error("{component} has not been fitted")]
    NotFitted { component: String },

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidConfig { parameter: String, reason: String },

    #[error("Artifact not found: {path}")]
    ArtifactMissing { path: String },

    #[error("Corrupt artifact {path}: {reason}")]
    ArtifactCorrupt { path: String, reason: String },

    #[error("Artifact schema mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: String, got: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MissingColumn { .. }
            | PipelineError::EmptyDataset { .. }
            | PipelineError::MalformedRow { .. }
            | PipelineError::ShapeMismatch { .. } => ErrorKind::Data,
            PipelineError::UnknownCategory { .. }
            | PipelineError::UnknownLabel { .. }
            | PipelineError::NotFitted { .. } => ErrorKind::Encoding,
            PipelineError::InvalidConfig { .. } => ErrorKind::Config,
            PipelineError::ArtifactMissing { .. }
            | PipelineError::ArtifactCorrupt { .. }
            | PipelineError::SchemaMismatch { .. } => ErrorKind::Artifact,
            PipelineError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn invalid_config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidConfig {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn empty(context: impl Into<String>) -> Self {
        PipelineError::EmptyDataset {
            context: context.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
