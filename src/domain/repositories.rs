//! Repository Pattern Abstractions
//!
//! This module defines the repository trait for archiving forecast requests
//! and their prediction points, keeping the HTTP layer independent of the
//! storage implementation.
//!
//! # Current Implementations
//!
//! - `SqlitePredictionRepository`: durable storage through `sqlx`
//! - `InMemoryPredictionRepository`: `Arc<RwLock>` storage for tests and
//!   single-instance deployments
//!
//! # Example
//!
//! ```rust,no_run
//! use fishcast::domain::repositories::{PredictionRepository, RequestFilter};
//! use fishcast::infrastructure::InMemoryPredictionRepository;
//!
//! # async {
//! let repo = InMemoryPredictionRepository::new();
//! let recent = repo.find_requests(&RequestFilter::default(), 0, 10).await;
//! # };
//! ```

use crate::domain::forecast::PredictionPoint;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Maximum page size for listing queries
pub const MAX_PAGE_SIZE: usize = 100;

/// Request parameters as they are archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPredictionRequest {
    pub species: String,
    pub province: String,
    pub city: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest {
    pub request_id: String,
    pub species: String,
    pub province: String,
    pub city: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Listing row: a stored request plus how many points it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    #[serde(flatten)]
    pub request: StoredRequest,
    pub prediction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: i64,
    pub request_id: String,
    pub prediction_date: NaiveDate,
    pub predicted_value: Decimal,
    pub confidence_lower: Option<Decimal>,
    pub confidence_upper: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl StoredPrediction {
    pub fn value_f64(&self) -> f64 {
        self.predicted_value.to_f64().unwrap_or(f64::NAN)
    }

    pub fn lower_f64(&self) -> Option<f64> {
        self.confidence_lower.and_then(|d| d.to_f64())
    }

    pub fn upper_f64(&self) -> Option<f64> {
        self.confidence_upper.and_then(|d| d.to_f64())
    }
}

/// Stored values keep two decimal places.
pub fn to_stored_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(2))
}

/// Optional equality/range filters shared by listing queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub species: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    /// Requests starting on or after this date
    pub date_from: Option<NaiveDate>,
    /// Requests ending on or before this date
    pub date_to: Option<NaiveDate>,
}

impl RequestFilter {
    pub fn matches(&self, request: &StoredRequest) -> bool {
        self.species.as_ref().is_none_or(|s| *s == request.species)
            && self.province.as_ref().is_none_or(|p| *p == request.province)
            && self.city.as_ref().is_none_or(|c| *c == request.city)
            && self.date_from.is_none_or(|d| request.date_from >= d)
            && self.date_to.is_none_or(|d| request.date_to <= d)
    }
}

/// Repository for archived forecast requests and their points
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Store a request and assign it a fresh UUID
    async fn create_request(&self, request: &NewPredictionRequest) -> Result<StoredRequest>;

    /// Store the points produced for a request
    async fn save_predictions(&self, request_id: &str, points: &[PredictionPoint]) -> Result<()>;

    async fn find_request(&self, request_id: &str) -> Result<Option<StoredRequest>>;

    /// Newest first
    async fn find_requests(
        &self,
        filter: &RequestFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RequestSummary>>;

    async fn count_requests(&self, filter: &RequestFilter) -> Result<usize>;

    /// Points of one request, ordered by date
    async fn predictions_for(&self, request_id: &str) -> Result<Vec<StoredPrediction>>;

    /// Points across requests; `date_from`/`date_to` apply to the point date.
    /// Newest date first.
    async fn find_predictions(
        &self,
        filter: &RequestFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<StoredPrediction>>;

    /// Remove a request and its points. Returns false if it did not exist.
    async fn delete_request(&self, request_id: &str) -> Result<bool>;
}
