use crate::domain::errors::EstimatorError;
use crate::domain::ml::{Estimator, FeatureTable};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Linear regression exported as plain coefficients.
///
/// When `residual_std` is known the model also produces symmetric normal
/// prediction intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearEstimator {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    coefficients: Vec<f64>,
    #[serde(default)]
    intercept: f64,
    #[serde(default)]
    residual_std: Option<f64>,
}

impl LinearEstimator {
    pub fn new(feature_names: Option<Vec<String>>, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            feature_names,
            coefficients,
            intercept,
            residual_std: None,
        }
    }

    pub fn with_residual_std(mut self, residual_std: f64) -> Self {
        self.residual_std = Some(residual_std);
        self
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("linear model has no coefficients".to_string());
        }
        if let Some(names) = &self.feature_names
            && names.len() != self.coefficients.len()
        {
            return Err(format!(
                "{} feature names for {} coefficients",
                names.len(),
                self.coefficients.len()
            ));
        }
        if let Some(std) = self.residual_std
            && !(std.is_finite() && std >= 0.0)
        {
            return Err(format!("invalid residual_std {}", std));
        }
        Ok(())
    }

    fn dot(&self, row: &[f64]) -> f64 {
        self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(x, c)| x * c)
                .sum::<f64>()
    }
}

impl Estimator for LinearEstimator {
    fn kind(&self) -> &str {
        "linear"
    }

    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, EstimatorError> {
        let rows = table.aligned_rows(self.feature_names.as_deref(), self.coefficients.len())?;
        Ok(rows.iter().map(|row| self.dot(row)).collect())
    }

    fn supports_interval(&self) -> bool {
        self.residual_std.is_some()
    }

    fn predict_interval(
        &self,
        table: &FeatureTable,
        confidence: f64,
    ) -> Result<Vec<(f64, f64)>, EstimatorError> {
        let std = self.residual_std.ok_or(EstimatorError::Unsupported {
            capability: "predict_interval",
        })?;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(EstimatorError::backend(format!(
                "confidence level {} outside (0, 1)",
                confidence
            )));
        }

        let normal = Normal::new(0.0, 1.0).map_err(EstimatorError::backend)?;
        let half_width = normal.inverse_cdf((1.0 + confidence) / 2.0) * std;

        Ok(self
            .predict(table)?
            .into_iter()
            .map(|v| (v - half_width, v + half_width))
            .collect())
    }

    fn feature_names_in(&self) -> Option<Vec<String>> {
        self.feature_names.clone()
    }
}
