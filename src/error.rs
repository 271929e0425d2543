//! Error types for the rnaseq-biomarker library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum BiomarkerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid expression value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error(
        "Found {total} missing values ({features} features, {samples} samples affected); \
         refusing to impute"
    )]
    MissingValues {
        total: usize,
        features: usize,
        samples: usize,
    },

    #[error("Found {0} non-finite expression values")]
    NonFinite(usize),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Unknown class label '{label}' for sample '{sample}'")]
    UnknownLabel { label: String, sample: String },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error in stage '{stage}': {reason}")]
    Pipeline { stage: String, reason: String },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BiomarkerError {
    /// Build a pipeline wiring error for the named stage.
    pub fn pipeline(stage: &str, reason: impl Into<String>) -> Self {
        BiomarkerError::Pipeline {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error comes from a data-integrity check on the inputs.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            BiomarkerError::InvalidValue { .. }
                | BiomarkerError::DimensionMismatch { .. }
                | BiomarkerError::SampleMismatch(_)
                | BiomarkerError::MissingValues { .. }
                | BiomarkerError::NonFinite(_)
                | BiomarkerError::DuplicateIdentifier(_)
                | BiomarkerError::UnknownLabel { .. }
                | BiomarkerError::MissingColumn(_)
                | BiomarkerError::EmptyData(_)
        )
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, BiomarkerError>;
