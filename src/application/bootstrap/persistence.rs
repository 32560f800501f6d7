use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::repositories::PredictionRepository;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::SqlitePredictionRepository;

pub struct PersistenceHandle {
    pub db: Database,
    pub prediction_repository: Arc<dyn PredictionRepository>,
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(db_url: &str) -> Result<PersistenceHandle> {
        info!("Initializing Database at {}", db_url);

        let db = Database::new(db_url)
            .await
            .context("Failed to initialize database")?;

        let prediction_repository = Arc::new(SqlitePredictionRepository::new(db.pool.clone()));

        Ok(PersistenceHandle {
            db,
            prediction_repository,
        })
    }

    /// Persistence is optional: no URL or a failed connection both leave
    /// the service running without it.
    pub async fn init_optional(db_url: Option<&str>) -> Option<PersistenceHandle> {
        let Some(db_url) = db_url else {
            info!("DATABASE_URL not set, prediction history disabled");
            return None;
        };

        match Self::init(db_url).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Database unavailable, prediction history disabled: {:#}", e);
                None
            }
        }
    }
}
