use crate::application::ml::feature_synthesizer::FeatureSynthesizer;
use crate::application::ml::model_registry::ModelRegistry;
use crate::domain::errors::{EstimatorError, ForecastError};
use crate::domain::forecast::periods::{inclusive_span_days, month_starts, parse_date};
use crate::domain::forecast::{ForecastRequest, PredictionPoint, normalize_species};
use crate::domain::ml::{Estimator, FeatureTable};
use std::sync::Arc;
use tracing::{debug, error, instrument};

pub const DEFAULT_MAX_FORECAST_DAYS: i64 = 365;

/// Confidence level requested from estimators that support intervals
pub const INTERVAL_CONFIDENCE: f64 = 0.95;

/// Turns a forecast request into one prediction point per month start.
///
/// Holds only immutable state; one instance serves all requests
/// concurrently. Estimators are assumed side-effect-free per call.
pub struct ForecastEngine {
    registry: Arc<ModelRegistry>,
    synthesizer: FeatureSynthesizer,
    max_forecast_days: i64,
}

impl ForecastEngine {
    pub fn new(
        registry: Arc<ModelRegistry>,
        synthesizer: FeatureSynthesizer,
        max_forecast_days: i64,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            max_forecast_days,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn max_forecast_days(&self) -> i64 {
        self.max_forecast_days
    }

    /// Feature columns that would be built for `species`, if it is loaded.
    pub fn expected_features(&self, species: &str) -> Option<Vec<String>> {
        let model = self.registry.get(species)?;
        Some(
            self.synthesizer
                .resolve_schema(model.estimator.as_ref())
                .columns,
        )
    }

    /// Either the full, date-ordered point sequence or an error; never a
    /// partial result.
    #[instrument(skip(self, request), fields(species = %request.species))]
    pub fn forecast(&self, request: &ForecastRequest) -> Result<Vec<PredictionPoint>, ForecastError> {
        let species = normalize_species(&request.species);
        let model = self
            .registry
            .get(&species)
            .ok_or_else(|| ForecastError::ModelUnavailable {
                species: species.clone(),
            })?;

        let date_from = parse_date(&request.date_from).ok_or_else(|| {
            ForecastError::invalid(format!(
                "date_from '{}' must be in YYYY-MM-DD format",
                request.date_from
            ))
        })?;
        let date_to = parse_date(&request.date_to).ok_or_else(|| {
            ForecastError::invalid(format!(
                "date_to '{}' must be in YYYY-MM-DD format",
                request.date_to
            ))
        })?;
        if date_to < date_from {
            return Err(ForecastError::invalid("End date must be after start date"));
        }

        let requested_days = inclusive_span_days(date_from, date_to);
        if requested_days > self.max_forecast_days {
            return Err(ForecastError::RangeTooLarge {
                requested_days,
                max_days: self.max_forecast_days,
            });
        }

        let periods = month_starts(date_from, date_to);
        if periods.is_empty() {
            debug!("No month starts between {} and {}", date_from, date_to);
            return Ok(Vec::new());
        }

        let estimator = model.estimator.as_ref();
        let table = self.synthesizer.synthesize(
            estimator,
            &periods,
            &request.province,
            &request.city,
        );

        let values = estimator.predict(&table).map_err(|source| {
            error!("Forecast error for {}: {}", species, source);
            ForecastError::EstimationFailed { source }
        })?;
        if values.len() != periods.len() {
            let source = EstimatorError::ShapeMismatch {
                expected: periods.len(),
                actual: values.len(),
            };
            error!("Forecast error for {}: {}", species, source);
            return Err(ForecastError::EstimationFailed { source });
        }

        let bounds = confidence_bounds(estimator, &table, periods.len());

        Ok(periods
            .into_iter()
            .zip(values)
            .enumerate()
            .map(|(i, (date, value))| {
                PredictionPoint::new(date, value, bounds.as_ref().map(|b| b[i]))
            })
            .collect())
    }
}

/// Best effort: any failure drops bounds for the whole call.
fn confidence_bounds(
    estimator: &dyn Estimator,
    table: &FeatureTable,
    expected: usize,
) -> Option<Vec<(f64, f64)>> {
    if !estimator.supports_interval() {
        return None;
    }
    match estimator.predict_interval(table, INTERVAL_CONFIDENCE) {
        Ok(bounds) if bounds.len() == expected => Some(bounds),
        Ok(bounds) => {
            debug!(
                "Discarding {} interval bounds for {} periods",
                bounds.len(),
                expected
            );
            None
        }
        Err(e) => {
            debug!("Interval estimation skipped: {}", e);
            None
        }
    }
}
