//! Request and response bodies of the HTTP API.

use crate::domain::forecast::{ForecastRequest, ModelMetadata, PredictionPoint};
use crate::domain::repositories::{RequestSummary, StoredPrediction, StoredRequest};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `POST /predict`. Accepts camelCase and snake_case date keys.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictBody {
    pub species: String,
    #[serde(rename = "dateFrom", alias = "date_from")]
    pub date_from: String,
    #[serde(rename = "dateTo", alias = "date_to")]
    pub date_to: String,
    pub province: String,
    pub city: String,
}

impl From<PredictBody> for ForecastRequest {
    fn from(body: PredictBody) -> Self {
        ForecastRequest::new(
            body.species,
            body.date_from,
            body.date_to,
            body.province,
            body.city,
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub species: String,
    pub version: String,
    pub features_used: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub province: String,
    pub city: String,
    pub date_from: String,
    pub date_to: String,
    pub prediction_count: usize,
    /// What `predicted_value` measures
    pub quantity: String,
    pub request_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub predictions: Vec<PredictionPoint>,
    pub model_info: ModelInfo,
    pub metadata: ForecastMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models_loaded: BTreeMap<String, bool>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSummary {
    pub species: String,
    pub name: String,
    pub version: String,
    pub status: String,
    pub path: String,
    pub loader: String,
    pub kind: String,
}

impl From<ModelMetadata> for ModelSummary {
    fn from(meta: ModelMetadata) -> Self {
        Self {
            species: meta.species,
            name: meta.display_name,
            version: meta.version,
            status: meta.status.to_string(),
            path: meta.source_path.display().to_string(),
            loader: meta.loader,
            kind: meta.kind,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelSummary>,
    pub count: usize,
}

/// Query of `GET /predictions`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub species: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    crate::domain::repositories::MAX_PAGE_SIZE
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub data: Vec<RequestSummary>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

/// A stored point with values back as plain numbers
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredPointDto {
    pub date: NaiveDate,
    pub predicted_value: f64,
    pub confidence_lower: Option<f64>,
    pub confidence_upper: Option<f64>,
}

impl From<&StoredPrediction> for StoredPointDto {
    fn from(p: &StoredPrediction) -> Self {
        Self {
            date: p.prediction_date,
            predicted_value: p.value_f64(),
            confidence_lower: p.lower_f64(),
            confidence_upper: p.upper_f64(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestDetailResponse {
    pub success: bool,
    pub request: StoredRequest,
    pub predictions: Vec<StoredPointDto>,
    pub prediction_count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}
