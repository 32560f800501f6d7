//! HTTP surface: axum router over the forecast engine and prediction
//! history.

pub mod dto;
pub mod error;
pub mod handlers;

use crate::application::forecast::{ForecastEngine, PredictionRecorder};
use crate::application::system::Application;
use crate::config::Config;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<ForecastEngine>,
    /// `None` when persistence is disabled
    pub recorder: Option<Arc<PredictionRecorder>>,
}

impl From<&Application> for AppState {
    fn from(app: &Application) -> Self {
        Self {
            config: app.config.clone(),
            engine: app.engine.clone(),
            recorder: app.recorder.clone(),
        }
    }
}

fn cors_layer(config: &Arc<Config>) -> CorsLayer {
    let config = config.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts| {
                origin
                    .to_str()
                    .map(|origin| config.origin_allowed(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

pub fn router(state: AppState) -> Router {
    let prefix = state.config.api_prefix.clone();
    let cors = cors_layer(&state.config);

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/models", get(handlers::list_models))
        .route("/predict", axum::routing::post(handlers::predict))
        .route("/predictions", get(handlers::list_predictions))
        .route(
            "/predictions/{request_id}",
            get(handlers::get_prediction).delete(handlers::delete_prediction),
        );

    let app = Router::new().route("/", get(handlers::root));
    let app = if prefix.is_empty() {
        app.merge(api)
    } else {
        app.nest(&prefix, api)
    };

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
