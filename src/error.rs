//! Error types for the fable-forecast library.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for fitting and forecasting operations.
pub type Result<T> = std::result::Result<T, FableError>;

/// A structural candidate that was attempted during an automatic search and
/// the reason it was not retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedCandidate {
    /// Label of the candidate, e.g. `ETS(M,A,N)` or `ARIMA(2,1,1)`.
    pub candidate: String,
    /// Why the candidate failed.
    pub reason: String,
}

impl FailedCandidate {
    pub fn new(candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while specifying, fitting or forecasting models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FableError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Malformed model specification: unknown option or illegal value.
    #[error("invalid model specification: {0}")]
    InvalidSpec(String),

    /// The time index is not strictly increasing at a uniform interval.
    #[error("irregular series: {0}")]
    IrregularSeries(String),

    /// No admissible candidate could be fitted.
    #[error("failed to fit {model}: {} candidate(s) attempted, none admissible", attempts.len())]
    FitFailure {
        model: String,
        attempts: Vec<FailedCandidate>,
    },

    /// New data is incompatible with the fitted structure.
    #[error("refit failed: {0}")]
    Refit(String),

    /// New observations cannot extend the fitted state.
    #[error("stream failed: {0}")]
    Stream(String),

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl FableError {
    /// Short machine-friendly tag for the error kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FableError::EmptyData => "empty_data",
            FableError::InsufficientData { .. } => "insufficient_data",
            FableError::InvalidParameter(_) => "invalid_parameter",
            FableError::DimensionMismatch { .. } => "dimension_mismatch",
            FableError::InvalidSpec(_) => "invalid_spec",
            FableError::IrregularSeries(_) => "irregular_series",
            FableError::FitFailure { .. } => "fit_failure",
            FableError::Refit(_) => "refit",
            FableError::Stream(_) => "stream",
            FableError::IndexOutOfBounds { .. } => "index_out_of_bounds",
            FableError::ComputationError(_) => "computation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = FableError::InsufficientData { needed: 10, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10, got 5"
        );

        let err = FableError::InvalidSpec("unknown option `alpha` for ARIMA".to_string());
        assert_eq!(
            err.to_string(),
            "invalid model specification: unknown option `alpha` for ARIMA"
        );

        let err = FableError::FitFailure {
            model: "ETS".to_string(),
            attempts: vec![
                FailedCandidate::new("ETS(A,N,N)", "non-finite likelihood"),
                FailedCandidate::new("ETS(A,A,N)", "non-finite likelihood"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "failed to fit ETS: 2 candidate(s) attempted, none admissible"
        );
        assert_eq!(err.kind(), "fit_failure");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = FableError::Stream("gap in time index".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
        assert_ne!(err1, FableError::Refit("gap in time index".to_string()));
    }
}
