use crate::domain::errors::EstimatorError;
use crate::domain::ml::{Estimator, FeatureTable};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub type ForestModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// SmartCore random forest, as written by `serde_json::to_writer`.
///
/// The serialized forest does not record how many columns it was fitted
/// on. The width comes from `feature_names` or an explicit `n_features`;
/// without either, a smartcore panic on a misshaped matrix is reported as
/// a backend error.
pub struct ForestEstimator {
    model: ForestModel,
    feature_names: Option<Vec<String>>,
    n_features: Option<usize>,
}

impl ForestEstimator {
    pub fn new(model: ForestModel, feature_names: Option<Vec<String>>) -> Self {
        let n_features = feature_names.as_ref().map(Vec::len);
        Self {
            model,
            feature_names,
            n_features,
        }
    }

    /// Record the training width of a forest saved without feature names.
    pub fn with_n_features(mut self, n_features: usize) -> Self {
        self.n_features = Some(n_features);
        self
    }

    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn to_matrix(&self, table: &FeatureTable) -> Result<DenseMatrix<f64>, EstimatorError> {
        let rows = match &self.feature_names {
            Some(names) => table.aligned_rows(Some(names.as_slice()), names.len())?,
            // No recorded layout: the forest sees columns in table order
            None => {
                if let Some(expected) = self.n_features
                    && expected != table.n_cols()
                {
                    return Err(EstimatorError::ShapeMismatch {
                        expected,
                        actual: table.n_cols(),
                    });
                }
                table.to_rows()
            }
        };
        DenseMatrix::from_2d_vec(&rows)
            .map_err(|e| EstimatorError::backend(format!("Matrix creation failed: {}", e)))
    }
}

impl Estimator for ForestEstimator {
    fn kind(&self) -> &str {
        "random_forest"
    }

    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, EstimatorError> {
        if table.is_empty() {
            return Ok(Vec::new());
        }
        let input_matrix = self.to_matrix(table)?;

        // smartcore indexes past the matrix instead of returning an error
        // when the column count is smaller than the training width
        match catch_unwind(AssertUnwindSafe(|| self.model.predict(&input_matrix))) {
            Ok(result) => {
                result.map_err(|e| EstimatorError::backend(format!("Prediction failed: {}", e)))
            }
            Err(_) => Err(EstimatorError::backend(format!(
                "Prediction panicked on a {}-column table",
                table.n_cols()
            ))),
        }
    }

    fn feature_names_in(&self) -> Option<Vec<String>> {
        self.feature_names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcore::ensemble::random_forest_regressor::RandomForestRegressorParameters;

    fn fitted_forest() -> ForestModel {
        let x = DenseMatrix::from_2d_vec(&vec![
            vec![200.0, 4000.0, 80.0],
            vec![250.0, 5000.0, 85.0],
            vec![300.0, 6000.0, 90.0],
            vec![220.0, 4500.0, 82.0],
            vec![280.0, 5500.0, 88.0],
            vec![260.0, 5200.0, 86.0],
        ])
        .unwrap();
        let y = vec![800.0, 1000.0, 1200.0, 880.0, 1100.0, 1040.0];
        let params = RandomForestRegressorParameters::default().with_n_trees(5);
        RandomForestRegressor::fit(&x, &y, params).unwrap()
    }

    fn fallback_table(rows: usize) -> FeatureTable {
        let columns = vec![
            "AvgWeight".to_string(),
            "Fingerlings".to_string(),
            "SurvivalRate".to_string(),
        ];
        FeatureTable::repeated(columns, &[250.0, 5000.0, 85.0], rows)
    }

    #[test]
    fn test_forest_predicts_one_value_per_row() {
        let estimator = ForestEstimator::new(fitted_forest(), None);
        let values = estimator.predict(&fallback_table(3)).unwrap();

        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| v.is_finite()));
        // Identical rows give identical predictions
        assert_eq!(values[0], values[2]);
    }

    #[test]
    fn test_forest_round_trips_through_json() {
        let json = serde_json::to_string(&fitted_forest()).unwrap();
        let model: ForestModel = serde_json::from_str(&json).unwrap();
        let estimator = ForestEstimator::new(model, None);

        assert_eq!(estimator.predict(&fallback_table(1)).unwrap().len(), 1);
    }

    /// Fitted on six columns, so the three-column fallback table is too narrow
    fn six_feature_forest() -> ForestModel {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| (0..6).map(|j| (i * 6 + j) as f64).collect())
            .collect();
        let y: Vec<f64> = (0..20).map(|i| i as f64 * 10.0).collect();
        let x = DenseMatrix::from_2d_vec(&rows).unwrap();
        let params = RandomForestRegressorParameters::default().with_n_trees(3);
        RandomForestRegressor::fit(&x, &y, params).unwrap()
    }

    #[test]
    fn test_narrow_table_without_width_is_backend_error() {
        let estimator = ForestEstimator::new(six_feature_forest(), None);
        let result = estimator.predict(&fallback_table(3));
        assert!(matches!(result, Err(EstimatorError::Backend { .. })));
    }

    #[test]
    fn test_recorded_width_is_checked_before_predicting() {
        let estimator = ForestEstimator::new(six_feature_forest(), None).with_n_features(6);
        let result = estimator.predict(&fallback_table(3));
        assert!(matches!(
            result,
            Err(EstimatorError::ShapeMismatch {
                expected: 6,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_width_follows_feature_names() {
        let names = vec!["AvgWeight".to_string(), "SurvivalRate".to_string()];
        let estimator = ForestEstimator::new(fitted_forest(), Some(names));
        assert_eq!(estimator.n_features(), Some(2));
    }

    #[test]
    fn test_forest_empty_table() {
        let estimator = ForestEstimator::new(fitted_forest(), None);
        assert!(estimator.predict(&fallback_table(0)).unwrap().is_empty());
    }
}
