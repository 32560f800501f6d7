use crate::domain::forecast::periods::parse_date;
use crate::domain::forecast::{ForecastRequest, PredictionPoint, normalize_species};
use crate::domain::repositories::{NewPredictionRequest, PredictionRepository};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Caller details archived alongside a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Archives forecasts without ever failing them.
pub struct PredictionRecorder {
    repository: Arc<dyn PredictionRepository>,
}

impl PredictionRecorder {
    pub fn new(repository: Arc<dyn PredictionRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn PredictionRepository> {
        &self.repository
    }

    /// Returns the new request id, or `None` if anything went wrong.
    /// Failures are logged, never propagated.
    pub async fn record(
        &self,
        request: &ForecastRequest,
        client: ClientInfo,
        points: &[PredictionPoint],
    ) -> Option<String> {
        match self.try_record(request, client, points).await {
            Ok(request_id) => {
                info!("Predictions saved to database with request_id: {}", request_id);
                Some(request_id)
            }
            Err(e) => {
                error!("Failed to save to database: {:#}", e);
                None
            }
        }
    }

    async fn try_record(
        &self,
        request: &ForecastRequest,
        client: ClientInfo,
        points: &[PredictionPoint],
    ) -> Result<String> {
        let new_request = NewPredictionRequest {
            species: normalize_species(&request.species),
            province: request.province.clone(),
            city: request.city.clone(),
            date_from: parse_date(&request.date_from).context("Invalid date_from")?,
            date_to: parse_date(&request.date_to).context("Invalid date_to")?,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
        };

        let stored = self.repository.create_request(&new_request).await?;

        if let Err(e) = self
            .repository
            .save_predictions(&stored.request_id, points)
            .await
        {
            // Do not leave a request without its points behind
            if let Err(cleanup) = self.repository.delete_request(&stored.request_id).await {
                warn!(
                    "Failed to remove partial request {}: {}",
                    stored.request_id, cleanup
                );
            }
            return Err(e);
        }

        Ok(stored.request_id)
    }
}
