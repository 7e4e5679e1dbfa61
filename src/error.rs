//! Error types for Helm template evaluation and source reconciliation.

use thiserror::Error;

use crate::helm::relocate::RelocatedError;

/// Errors raised while driving the external template evaluator.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// No evaluator binary is shipped for the current OS/architecture.
    #[error("Template evaluator is not available for platform {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The evaluator process exited abnormally, produced no output, or was killed.
    #[error("{0}")]
    ProcessFailure(String),

    /// The evaluator output could not be decoded.
    #[error("Deserialization error: {0}")]
    SerializationFailure(#[from] prost::DecodeError),

    /// The template engine reported an error while rendering.
    #[error("Evaluation error in template engine: {0}")]
    RenderError(String),

    /// I/O failure while talking to the evaluator process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised at the per-file processing boundary.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Template evaluation failed.
    #[error("Failed to evaluate Helm file {path}: Template evaluation failed: {source}")]
    Evaluation {
        path: String,
        #[source]
        source: EvaluationError,
    },

    /// Neither `values.yaml` nor `values.yml` was supplied.
    #[error("Failed to evaluate Helm file {path}: Failed to find values file")]
    MissingValuesFile { path: String },

    /// A dependency file has no content.
    #[error("Failed to evaluate Helm file {path}: File at {dependency} is empty")]
    EmptyDependency { path: String, dependency: String },

    /// The evaluator was never initialized.
    #[error("Attempt to process Helm template {path} with uninitialized Helm evaluator")]
    Uninitialized { path: String },

    /// The evaluator failed to initialize.
    #[error("Failed to evaluate Helm file {path}: Helm evaluator is unavailable: {reason}")]
    EvaluatorUnavailable { path: String, reason: String },

    /// No `Chart.yaml` in the template's directory or any parent.
    #[error("Failed to evaluate Helm file {path}: No Chart.yaml found in any parent directory")]
    NoChart { path: String },

    /// A dependency file could not be read.
    #[error("Failed to evaluate Helm file {path}: Failed to read file at {dependency}: {message}")]
    UnreadableDependency {
        path: String,
        dependency: String,
        message: String,
    },
}

impl ProcessingError {
    /// The underlying evaluator message, when the failure came from the evaluator.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Evaluation { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }
}

/// Errors converting between byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Unable to calculate position from TextRange, line number {0} is too big")]
    LineTooBig(usize),

    #[error("Unable to calculate position from TextRange, line {0} doesn't exist")]
    MissingLine(usize),

    #[error("Unable to calculate position from TextRange, line offset {offset} is too big for line {line}")]
    OffsetTooBig { line: usize, offset: usize },

    #[error("Location {position}+{length} is outside of a source of {size} bytes")]
    OutOfBounds {
        position: usize,
        length: usize,
        size: usize,
    },
}

/// Errors from the shared evaluator worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is not running")]
    Stopped,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParsingFailed(String),
}

/// Top-level error type of the crate.
#[derive(Debug, Error)]
pub enum HelmIacError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] RelocatedError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HelmIacError>;
