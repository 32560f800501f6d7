use thiserror::Error;

/// Errors surfaced by the forecast pipeline to its callers
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Model for {species} is not available")]
    ModelUnavailable { species: String },

    #[error("Date range of {requested_days} days exceeds maximum of {max_days} days")]
    RangeTooLarge { requested_days: i64, max_days: i64 },

    #[error("Failed to make forecast: {source}")]
    EstimationFailed {
        #[source]
        source: EstimatorError,
    },
}

impl ForecastError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ForecastError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Errors raised by an estimator while predicting or being introspected
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("Estimator does not support {capability}")]
    Unsupported { capability: &'static str },

    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Feature '{name}' missing from input table")]
    MissingFeature { name: String },

    #[error("Estimator backend failure: {reason}")]
    Backend { reason: String },
}

impl EstimatorError {
    pub fn backend(reason: impl std::fmt::Display) -> Self {
        EstimatorError::Backend {
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by a single model load strategy
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact bytes are not valid {encoding}")]
    Decode { encoding: &'static str },

    #[error("Unrecognised artifact format: {reason}")]
    Format { reason: String },

    #[error("Model backend rejected artifact: {reason}")]
    Backend { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_too_large_formatting() {
        let error = ForecastError::RangeTooLarge {
            requested_days: 400,
            max_days: 365,
        };

        let msg = error.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("365"));
    }

    #[test]
    fn test_estimation_failed_keeps_source() {
        let error = ForecastError::EstimationFailed {
            source: EstimatorError::ShapeMismatch {
                expected: 3,
                actual: 2,
            },
        };

        assert!(error.to_string().contains("expected 3 values, got 2"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
