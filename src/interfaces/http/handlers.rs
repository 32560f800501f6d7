use super::AppState;
use super::dto::{
    DeleteResponse, ForecastMetadata, HealthResponse, ListQuery, ListResponse, ModelInfo,
    ModelSummary, ModelsResponse, PredictBody, PredictResponse, RequestDetailResponse,
    StoredPointDto,
};
use super::error::ApiError;
use crate::application::forecast::ClientInfo;
use crate::domain::forecast::{ForecastRequest, normalize_species};
use crate::domain::repositories::{MAX_PAGE_SIZE, PredictionRepository, RequestFilter};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{Extensions, HeaderMap, header};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let prefix = &state.config.api_prefix;
    Json(serde_json::json!({
        "service": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "health": format!("{}/health", prefix),
        "models": format!("{}/models", prefix),
        "predict": format!("{}/predict", prefix),
        "predictions": format!("{}/predictions", prefix),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.engine.registry();
    let models_loaded = state
        .config
        .supported_species()
        .into_iter()
        .map(|species| {
            let loaded = registry.is_loaded(&species);
            (species, loaded)
        })
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models_loaded,
        timestamp: Utc::now(),
    })
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models: Vec<ModelSummary> = state
        .engine
        .registry()
        .all_info()
        .into_iter()
        .map(ModelSummary::from)
        .collect();

    Json(ModelsResponse {
        count: models.len(),
        models,
    })
}

/// Proxy header first, then the socket peer when the server exposes it.
fn client_info(headers: &HeaderMap, extensions: &Extensions) -> ClientInfo {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    ClientInfo {
        ip_address: forwarded.or(peer),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let expose = !state.config.is_production();
    let Json(body) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let species = normalize_species(&body.species);
    if !state.config.is_supported_species(&species) {
        return Err(ApiError::bad_request(format!(
            "Invalid species. Must be one of: {}",
            state.config.supported_species().join(", ")
        )));
    }

    let request = ForecastRequest::from(body);
    info!(
        "Prediction request: {} from {} to {}",
        species, request.date_from, request.date_to
    );

    let engine = state.engine.clone();
    let job = request.clone();
    let points = tokio::task::spawn_blocking(move || engine.forecast(&job))
        .await
        .map_err(|e| ApiError::internal("Forecast task failed", e, expose))?
        .map_err(|e| {
            error!("Prediction failed: {}", e);
            ApiError::from_forecast(e, expose)
        })?;

    let model = state
        .engine
        .registry()
        .info(&species)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("Model for {} is not available", species)))?;
    let features_used = state.engine.expected_features(&species).unwrap_or_default();

    let request_id = match &state.recorder {
        Some(recorder) => {
            recorder
                .record(&request, client_info(&headers, &extensions), &points)
                .await
        }
        None => None,
    };

    info!("Prediction successful: {} points generated", points.len());

    Ok(Json(PredictResponse {
        success: true,
        model_info: ModelInfo {
            model_name: model.display_name,
            species: model.species,
            version: model.version,
            features_used,
        },
        metadata: ForecastMetadata {
            province: request.province,
            city: request.city,
            date_from: request.date_from,
            date_to: request.date_to,
            prediction_count: points.len(),
            quantity: state.config.prediction_quantity.clone(),
            request_id,
            timestamp: Utc::now(),
        },
        predictions: points,
    }))
}

fn repository(state: &AppState) -> Result<&Arc<dyn PredictionRepository>, ApiError> {
    state
        .recorder
        .as_ref()
        .map(|recorder| recorder.repository())
        .ok_or_else(ApiError::database_unavailable)
}

pub async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let repo = repository(&state)?;
    let expose = !state.config.is_production();

    let filter = RequestFilter {
        species: query.species.as_deref().map(normalize_species),
        province: query.province,
        city: query.city,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let limit = query.limit.min(MAX_PAGE_SIZE);

    let fetch_failed = |e: anyhow::Error| {
        error!("Error fetching predictions: {:#}", e);
        ApiError::internal("Error fetching predictions", format!("{:#}", e), expose)
    };
    let data = repo
        .find_requests(&filter, query.skip, limit)
        .await
        .map_err(fetch_failed)?;
    let total = repo.count_requests(&filter).await.map_err(fetch_failed)?;

    Ok(Json(ListResponse {
        success: true,
        data,
        total,
        skip: query.skip,
        limit,
    }))
}

pub async fn get_prediction(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestDetailResponse>, ApiError> {
    let repo = repository(&state)?;
    let expose = !state.config.is_production();
    let fetch_failed = |e: anyhow::Error| {
        error!("Error fetching prediction: {:#}", e);
        ApiError::internal("Error fetching prediction", format!("{:#}", e), expose)
    };

    let request = repo
        .find_request(&request_id)
        .await
        .map_err(fetch_failed)?
        .ok_or_else(|| ApiError::not_found(format!("Prediction request {} not found", request_id)))?;
    let points = repo
        .predictions_for(&request_id)
        .await
        .map_err(fetch_failed)?;

    Ok(Json(RequestDetailResponse {
        success: true,
        request,
        prediction_count: points.len(),
        predictions: points.iter().map(StoredPointDto::from).collect(),
    }))
}

pub async fn delete_prediction(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let repo = repository(&state)?;
    let expose = !state.config.is_production();

    let deleted = repo.delete_request(&request_id).await.map_err(|e| {
        error!("Error deleting prediction: {:#}", e);
        ApiError::internal("Error deleting prediction", format!("{:#}", e), expose)
    })?;
    if !deleted {
        return Err(ApiError::not_found(format!(
            "Prediction request {} not found",
            request_id
        )));
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Prediction request {} deleted", request_id),
    }))
}
