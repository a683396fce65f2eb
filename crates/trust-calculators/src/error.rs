//! Error types shared by classifier wrappers and trust calculators.
use std::fmt;

use crate::calculators::ScoreColumn;

/// Failures raised by a classifier wrapper.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("training {model} failed: {message}")]
    Training { model: String, message: String },

    #[error("{0} was used before fit")]
    NotFitted(String),

    #[error("{model} expects {expected} features, got {found}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        found: usize,
    },
}

/// Failures raised while constructing or running a trust calculator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrustError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{0} must be fitted before scoring")]
    NotFitted(String),

    #[error("dimension mismatch in {what}: expected {expected}, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(
        "{requested} resamples cannot resolve a {confidence_level} confidence tail, at least {required} are required"
    )]
    ResamplingInsufficient {
        confidence_level: f64,
        requested: usize,
        required: usize,
    },

    /// The call ran out of budget. `partial` holds the rows finished so far,
    /// remaining rows are `None`.
    #[error("computation exceeded its budget after {completed} of {total} units")]
    ComputationTimeout {
        completed: usize,
        total: usize,
        partial: ScoreColumn,
    },

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Failure kinds reported to the driver, one per taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Configuration,
    NotFitted,
    DimensionMismatch,
    ResamplingInsufficient,
    ComputationTimeout,
    Training,
}

impl TrustError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrustError::Configuration(_) => ErrorKind::Configuration,
            TrustError::NotFitted(_) => ErrorKind::NotFitted,
            TrustError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            TrustError::ResamplingInsufficient { .. } => ErrorKind::ResamplingInsufficient,
            TrustError::ComputationTimeout { .. } => ErrorKind::ComputationTimeout,
            TrustError::Classifier(ClassifierError::Training { .. }) => ErrorKind::Training,
            TrustError::Classifier(ClassifierError::NotFitted(_)) => ErrorKind::NotFitted,
            TrustError::Classifier(ClassifierError::DimensionMismatch { .. }) => {
                ErrorKind::DimensionMismatch
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::NotFitted => "NotFittedError",
            ErrorKind::DimensionMismatch => "DimensionMismatchError",
            ErrorKind::ResamplingInsufficient => "ResamplingInsufficientError",
            ErrorKind::ComputationTimeout => "ComputationTimeout",
            ErrorKind::Training => "TrainingError",
        };
        write!(f, "{}", name)
    }
}

pub type Result<T, E = TrustError> = std::result::Result<T, E>;
