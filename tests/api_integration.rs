use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use fishcast::application::ml::linear_predictor::LinearEstimator;
use fishcast::application::ml::model_registry::ModelRegistry;
use fishcast::application::system::Application;
use fishcast::config::Config;
use fishcast::domain::forecast::PredictionPoint;
use fishcast::domain::repositories::{
    NewPredictionRequest, PredictionRepository, RequestFilter, RequestSummary, StoredPrediction,
    StoredRequest,
};
use fishcast::infrastructure::{Database, InMemoryPredictionRepository, SqlitePredictionRepository};
use fishcast::interfaces::http::{AppState, router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn config(pairs: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| map.get(key).cloned()).unwrap()
}

/// Tilapia loaded, bangus configured but missing
fn registry() -> Arc<ModelRegistry> {
    let tilapia = LinearEstimator::new(None, vec![1.0, 0.0, 0.0], 10.0).with_residual_std(5.0);
    let mut builder = ModelRegistry::builder();
    builder.register("tilapia", "Tilapia Forecast Model", "1.0.0", Arc::new(tilapia));
    Arc::new(builder.build())
}

fn app_with(config: Config, repository: Option<Arc<dyn PredictionRepository>>) -> Router {
    let app = Application::from_parts(config, registry(), repository);
    router(AppState::from(&app))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "integration-test")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn quarter(species: &str) -> Value {
    json!({
        "species": species,
        "dateFrom": "2024-01-01",
        "dateTo": "2024-03-31",
        "province": "Pampanga",
        "city": "Mexico"
    })
}

#[tokio::test]
async fn test_root_health_and_models() {
    let app = app_with(config(&[]), None);

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["health"], "/api/v1/health");

    let (status, body) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models_loaded"]["tilapia"], true);
    assert_eq!(body["models_loaded"]["bangus"], false);

    let (status, body) = send(&app, get("/api/v1/models")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["models"][0]["species"], "tilapia");
    assert_eq!(body["models"][0]["status"], "loaded");
    assert_eq!(body["models"][0]["loader"], "in_process");
}

#[tokio::test]
async fn test_predict_success_without_persistence() {
    let app = app_with(config(&[]), None);

    let (status, body) = send(&app, post_json("/api/v1/predict", quarter("Tilapia"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0]["date"], "2024-01-01");
    assert_eq!(predictions[2]["date"], "2024-03-01");
    assert_eq!(predictions[0]["predicted_value"], 260.0);
    assert!(predictions[0]["confidence_lower"].as_f64().unwrap() < 260.0);

    assert_eq!(body["model_info"]["model_name"], "Tilapia Forecast Model");
    assert_eq!(
        body["model_info"]["features_used"],
        json!(["AvgWeight", "Fingerlings", "SurvivalRate"])
    );
    assert_eq!(body["metadata"]["prediction_count"], 3);
    assert_eq!(body["metadata"]["quantity"], "harvest_kg");
    assert_eq!(body["metadata"]["request_id"], Value::Null);
}

#[tokio::test]
async fn test_predict_error_statuses() {
    let app = app_with(config(&[]), None);

    // Not a configured species
    let (status, body) = send(&app, post_json("/api/v1/predict", quarter("salmon"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["status_code"], 400);

    // Configured but not loaded
    let (status, _) = send(&app, post_json("/api/v1/predict", quarter("bangus"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut inverted = quarter("tilapia");
    inverted["dateFrom"] = json!("2024-03-31");
    inverted["dateTo"] = json!("2024-01-01");
    let (status, _) = send(&app, post_json("/api/v1/predict", inverted)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut too_long = quarter("tilapia");
    too_long["dateTo"] = json!("2025-06-30");
    let (status, body) = send(&app, post_json("/api/v1/predict", too_long)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceeds maximum"));

    let (status, _) = send(&app, post_json("/api/v1/predict", json!({"species": "tilapia"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_endpoints_require_database() {
    let app = app_with(config(&[]), None);

    let (status, body) = send(&app, get("/api/v1/predictions")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Database not available");

    let (status, _) = send(&app, get("/api/v1/predictions/some-id")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_predict_is_recorded_and_browsable() {
    let db = Database::in_memory().await.unwrap();
    let repo: Arc<dyn PredictionRepository> = Arc::new(SqlitePredictionRepository::new(db.pool.clone()));
    let app = app_with(config(&[]), Some(repo));

    let (status, body) = send(&app, post_json("/api/v1/predict", quarter("tilapia"))).await;
    assert_eq!(status, StatusCode::OK);
    let request_id = body["metadata"]["request_id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/v1/predictions?species=Tilapia&limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["data"][0]["request_id"], request_id.as_str());
    assert_eq!(body["data"][0]["prediction_count"], 3);

    let uri = format!("/api/v1/predictions/{}", request_id);
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction_count"], 3);
    assert_eq!(body["request"]["ip_address"], "203.0.113.7");
    assert_eq!(body["request"]["user_agent"], "integration-test");
    assert_eq!(body["predictions"][0]["predicted_value"], 260.0);

    let delete = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Every write fails
struct FailingRepository;

#[async_trait]
impl PredictionRepository for FailingRepository {
    async fn create_request(&self, _: &NewPredictionRequest) -> Result<StoredRequest> {
        anyhow::bail!("connection refused")
    }
    async fn save_predictions(&self, _: &str, _: &[PredictionPoint]) -> Result<()> {
        anyhow::bail!("connection refused")
    }
    async fn find_request(&self, _: &str) -> Result<Option<StoredRequest>> {
        Ok(None)
    }
    async fn find_requests(&self, _: &RequestFilter, _: usize, _: usize) -> Result<Vec<RequestSummary>> {
        anyhow::bail!("connection refused")
    }
    async fn count_requests(&self, _: &RequestFilter) -> Result<usize> {
        anyhow::bail!("connection refused")
    }
    async fn predictions_for(&self, _: &str) -> Result<Vec<StoredPrediction>> {
        Ok(Vec::new())
    }
    async fn find_predictions(
        &self,
        _: &RequestFilter,
        _: usize,
        _: usize,
    ) -> Result<Vec<StoredPrediction>> {
        Ok(Vec::new())
    }
    async fn delete_request(&self, _: &str) -> Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_persistence_failure_does_not_change_forecast() {
    let healthy = app_with(
        config(&[]),
        Some(Arc::new(InMemoryPredictionRepository::new())),
    );
    let failing = app_with(config(&[("ENVIRONMENT", "production")]), Some(Arc::new(FailingRepository)));

    let (ok_status, ok_body) = send(&healthy, post_json("/api/v1/predict", quarter("tilapia"))).await;
    let (status, body) = send(&failing, post_json("/api/v1/predict", quarter("tilapia"))).await;

    assert_eq!(ok_status, StatusCode::OK);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], ok_body["predictions"]);
    assert!(ok_body["metadata"]["request_id"].is_string());
    assert_eq!(body["metadata"]["request_id"], Value::Null);

    // Listing errors surface as 500 without internals in production
    let (status, body) = send(&failing, get("/api/v1/predictions")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("detail").is_none());
}

#[tokio::test]
async fn test_cors_allows_configured_origins_only() {
    let app = app_with(config(&[]), None);

    let allowed = Request::builder()
        .uri("/api/v1/health")
        .header(header::ORIGIN, "https://fish-market.vercel.app")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(allowed).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://fish-market.vercel.app"
    );

    let denied = Request::builder()
        .uri("/api/v1/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(denied).await.unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_custom_prefix() {
    let app = app_with(config(&[("API_PREFIX", "/v2")]), None);

    let (status, _) = send(&app, get("/v2/health")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
