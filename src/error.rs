use std::fmt;

use thiserror::Error;

use crate::parameters::bounds::BoundsError;

/// Error types for the kinfit-rs library.
#[derive(Error, Debug)]
pub enum FitError {
    /// Malformed input: mismatched lengths, NaN or infinite values, bad options.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fewer distinct data points than the model has free parameters.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The iteration budget was exhausted without meeting a tolerance.
    #[error("Algorithm failed to converge: {0}")]
    ConvergenceFailure(String),

    /// Singular or near-singular Jacobian, undefined covariance.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// The wall-clock budget for a fit was exceeded.
    #[error("Fit exceeded its time budget of {0:?}")]
    Timeout(std::time::Duration),

    /// Error for boundary constraint violations.
    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`FitError`], used for batch skip reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitErrorKind {
    InvalidInput,
    InsufficientData,
    ConvergenceFailure,
    NumericalInstability,
    Timeout,
}

impl fmt::Display for FitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FitErrorKind::InvalidInput => "invalid input",
            FitErrorKind::InsufficientData => "insufficient data",
            FitErrorKind::ConvergenceFailure => "failed to converge",
            FitErrorKind::NumericalInstability => "numerical instability",
            FitErrorKind::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

impl FitError {
    /// Returns the kind of this error.
    ///
    /// Bounds and JSON errors can only come from malformed caller input, so they are
    /// reported as [`FitErrorKind::InvalidInput`].
    pub fn kind(&self) -> FitErrorKind {
        match self {
            FitError::InvalidInput(_) | FitError::Bounds(_) | FitError::Json(_) => {
                FitErrorKind::InvalidInput
            }
            FitError::InsufficientData(_) => FitErrorKind::InsufficientData,
            FitError::ConvergenceFailure(_) => FitErrorKind::ConvergenceFailure,
            FitError::NumericalInstability(_) => FitErrorKind::NumericalInstability,
            FitError::Timeout(_) => FitErrorKind::Timeout,
        }
    }

    /// The error message without its kind prefix.
    pub fn detail(&self) -> String {
        match self {
            FitError::InvalidInput(msg)
            | FitError::InsufficientData(msg)
            | FitError::ConvergenceFailure(msg)
            | FitError::NumericalInstability(msg) => msg.clone(),
            FitError::Timeout(budget) => format!("exceeded {:?}", budget),
            FitError::Bounds(e) => e.to_string(),
            FitError::Json(e) => e.to_string(),
        }
    }
}

/// Result type alias for kinfit-rs operations.
pub type Result<T> = std::result::Result<T, FitError>;
