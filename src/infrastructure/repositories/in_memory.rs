//! In-Memory Repository Implementation
//!
//! Thread-safe, in-memory implementation of `PredictionRepository`.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Testing**: Ideal for unit tests and the HTTP integration tests
//! - **Same semantics**: Ordering, paging and 2-dp storage match the SQLite
//!   repository
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - No persistence across multiple instances

use crate::domain::forecast::PredictionPoint;
use crate::domain::repositories::{
    MAX_PAGE_SIZE, NewPredictionRequest, PredictionRepository, RequestFilter, RequestSummary,
    StoredPrediction, StoredRequest, to_stored_decimal,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Store {
    /// Insertion order, oldest first
    requests: Vec<StoredRequest>,
    predictions: Vec<StoredPrediction>,
    next_prediction_id: i64,
}

/// In-memory implementation of PredictionRepository
pub struct InMemoryPredictionRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
        }
    }
}

impl Default for InMemoryPredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    async fn create_request(&self, request: &NewPredictionRequest) -> Result<StoredRequest> {
        let stored = StoredRequest {
            request_id: Uuid::new_v4().to_string(),
            species: request.species.clone(),
            province: request.province.clone(),
            city: request.city.clone(),
            date_from: request.date_from,
            date_to: request.date_to,
            created_at: Utc::now(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
        };
        self.store.write().await.requests.push(stored.clone());
        Ok(stored)
    }

    async fn save_predictions(&self, request_id: &str, points: &[PredictionPoint]) -> Result<()> {
        let mut store = self.store.write().await;
        if !store.requests.iter().any(|r| r.request_id == request_id) {
            bail!("Unknown request {}", request_id);
        }

        // Convert everything first so a bad value stores nothing
        let created_at = Utc::now();
        let mut rows = Vec::with_capacity(points.len());
        for point in points {
            let value = to_stored_decimal(point.value)
                .with_context(|| format!("Non-finite predicted_value {}", point.value))?;
            let lower = point
                .confidence_lower
                .map(|v| to_stored_decimal(v).context("Non-finite confidence_lower"))
                .transpose()?;
            let upper = point
                .confidence_upper
                .map(|v| to_stored_decimal(v).context("Non-finite confidence_upper"))
                .transpose()?;
            rows.push((point.date, value, lower, upper));
        }

        for (date, value, lower, upper) in rows {
            store.next_prediction_id += 1;
            let id = store.next_prediction_id;
            store.predictions.push(StoredPrediction {
                id,
                request_id: request_id.to_string(),
                prediction_date: date,
                predicted_value: value,
                confidence_lower: lower,
                confidence_upper: upper,
                created_at,
            });
        }
        Ok(())
    }

    async fn find_request(&self, request_id: &str) -> Result<Option<StoredRequest>> {
        let store = self.store.read().await;
        Ok(store
            .requests
            .iter()
            .find(|r| r.request_id == request_id)
            .cloned())
    }

    async fn find_requests(
        &self,
        filter: &RequestFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RequestSummary>> {
        let store = self.store.read().await;
        Ok(store
            .requests
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .skip(skip)
            .take(limit.min(MAX_PAGE_SIZE))
            .map(|r| RequestSummary {
                request: r.clone(),
                prediction_count: store
                    .predictions
                    .iter()
                    .filter(|p| p.request_id == r.request_id)
                    .count(),
            })
            .collect())
    }

    async fn count_requests(&self, filter: &RequestFilter) -> Result<usize> {
        let store = self.store.read().await;
        Ok(store.requests.iter().filter(|r| filter.matches(r)).count())
    }

    async fn predictions_for(&self, request_id: &str) -> Result<Vec<StoredPrediction>> {
        let store = self.store.read().await;
        let mut points: Vec<StoredPrediction> = store
            .predictions
            .iter()
            .filter(|p| p.request_id == request_id)
            .cloned()
            .collect();
        points.sort_by_key(|p| (p.prediction_date, p.id));
        Ok(points)
    }

    async fn find_predictions(
        &self,
        filter: &RequestFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<StoredPrediction>> {
        let store = self.store.read().await;
        // Date bounds apply to the point, the rest to its request
        let request_filter = RequestFilter {
            date_from: None,
            date_to: None,
            ..filter.clone()
        };

        let mut points: Vec<StoredPrediction> = store
            .predictions
            .iter()
            .filter(|p| {
                filter.date_from.is_none_or(|d| p.prediction_date >= d)
                    && filter.date_to.is_none_or(|d| p.prediction_date <= d)
                    && store
                        .requests
                        .iter()
                        .any(|r| r.request_id == p.request_id && request_filter.matches(r))
            })
            .cloned()
            .collect();
        points.sort_by(|a, b| {
            b.prediction_date
                .cmp(&a.prediction_date)
                .then(b.id.cmp(&a.id))
        });

        Ok(points
            .into_iter()
            .skip(skip)
            .take(limit.min(MAX_PAGE_SIZE))
            .collect())
    }

    async fn delete_request(&self, request_id: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.requests.len();
        store.requests.retain(|r| r.request_id != request_id);
        store.predictions.retain(|p| p.request_id != request_id);
        Ok(store.requests.len() < before)
    }
}
