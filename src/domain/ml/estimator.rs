use super::feature_table::FeatureTable;
use crate::domain::errors::EstimatorError;

/// Interface for fitted regression models.
///
/// Implementations must be side-effect-free per call: a single instance is
/// shared across concurrent forecasts without external locking.
pub trait Estimator: Send + Sync {
    /// Estimator family, e.g. "linear", "random_forest", "onnx"
    fn kind(&self) -> &str;

    /// One value per table row, in row order.
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, EstimatorError>;

    /// Whether `predict_interval` is worth attempting.
    fn supports_interval(&self) -> bool {
        false
    }

    /// `(lower, upper)` per row at the given confidence level (e.g. 0.95).
    fn predict_interval(
        &self,
        _table: &FeatureTable,
        _confidence: f64,
    ) -> Result<Vec<(f64, f64)>, EstimatorError> {
        Err(EstimatorError::Unsupported {
            capability: "predict_interval",
        })
    }

    /// Input column names recorded when the model was fitted.
    fn feature_names_in(&self) -> Option<Vec<String>> {
        None
    }

    /// Column names derived by the model's own input transformation.
    fn feature_names_out(&self) -> Result<Vec<String>, EstimatorError> {
        Err(EstimatorError::Unsupported {
            capability: "feature_names_out",
        })
    }
}
