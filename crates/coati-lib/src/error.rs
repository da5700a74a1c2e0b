use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failures raised by the oscillation analysis core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("duplicate ROI identifier: {0}")]
    DuplicateRoi(String),

    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("analysis cancelled after {completed} ROIs")]
    Cancelled { completed: usize },
}
