use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const TILAPIA: &str = "tilapia";
pub const BANGUS: &str = "bangus";

/// Canonical registry key for a species string.
pub fn normalize_species(species: &str) -> String {
    species.trim().to_lowercase()
}

/// A single forecast call as received from a caller.
///
/// Dates stay as `YYYY-MM-DD` strings here; the engine owns parsing so that
/// malformed input is reported through the same error taxonomy as every
/// other validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub species: String,
    pub date_from: String,
    pub date_to: String,
    pub province: String,
    pub city: String,
}

impl ForecastRequest {
    pub fn new(
        species: impl Into<String>,
        date_from: impl Into<String>,
        date_to: impl Into<String>,
        province: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            species: species.into(),
            date_from: date_from.into(),
            date_to: date_to.into(),
            province: province.into(),
            city: city.into(),
        }
    }
}

/// One forecast value for the period starting at `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: NaiveDate,
    #[serde(rename = "predicted_value")]
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence_upper: Option<f64>,
}

impl PredictionPoint {
    /// Bounds are taken as a pair so a point never carries only one side.
    pub fn new(date: NaiveDate, value: f64, bounds: Option<(f64, f64)>) -> Self {
        let (confidence_lower, confidence_upper) = match bounds {
            Some((lower, upper)) => (Some(lower), Some(upper)),
            None => (None, None),
        };
        Self {
            date,
            value,
            confidence_lower,
            confidence_upper,
        }
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.confidence_lower.zip(self.confidence_upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Loaded,
    NotLoaded,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStatus::Loaded => write!(f, "loaded"),
            ModelStatus::NotLoaded => write!(f, "not_loaded"),
        }
    }
}

/// Immutable description of a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub species: String,
    pub display_name: String,
    pub version: String,
    pub source_path: PathBuf,
    /// Name of the load strategy that produced the estimator
    pub loader: String,
    /// Estimator family, e.g. "linear" or "onnx"
    pub kind: String,
    pub status: ModelStatus,
}
