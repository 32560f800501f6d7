use crate::domain::errors::ForecastError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Uniform JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            detail: None,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    pub fn database_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "Database not available")
    }

    /// 500 whose cause is only shown outside production.
    pub fn internal(error: impl Into<String>, cause: impl std::fmt::Display, expose: bool) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            detail: expose.then(|| cause.to_string()),
        }
    }

    pub fn from_forecast(err: ForecastError, expose: bool) -> Self {
        match err {
            ForecastError::InvalidInput { .. } | ForecastError::RangeTooLarge { .. } => {
                Self::bad_request(err.to_string())
            }
            ForecastError::ModelUnavailable { .. } => Self::not_found(err.to_string()),
            ForecastError::EstimationFailed { source } => {
                Self::internal("Failed to make forecast", source, expose)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.error,
            status_code: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
