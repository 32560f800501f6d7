use std::sync::Arc;
use tracing::info;

use crate::application::bootstrap::{
    models::ModelBootstrap,
    persistence::{PersistenceBootstrap, PersistenceHandle},
};
use crate::application::forecast::{ForecastEngine, PredictionRecorder};
use crate::application::ml::feature_synthesizer::FeatureSynthesizer;
use crate::application::ml::model_registry::ModelRegistry;
use crate::config::Config;
use crate::domain::repositories::PredictionRepository;

/// Everything the HTTP layer needs, wired once at startup
pub struct Application {
    pub config: Arc<Config>,
    pub registry: Arc<ModelRegistry>,
    pub engine: Arc<ForecastEngine>,
    pub recorder: Option<Arc<PredictionRecorder>>,
    pub persistence: Option<PersistenceHandle>,
}

impl Application {
    pub async fn build(config: Config) -> Self {
        info!(
            "Building {} (environment: {:?})...",
            config.app_name, config.environment
        );

        // 1. Models (loaded once, shared read-only)
        let registry = ModelBootstrap::init(&config.models);

        // 2. Optional persistence
        let persistence = PersistenceBootstrap::init_optional(config.database_url.as_deref()).await;
        let repository = persistence
            .as_ref()
            .map(|handle| handle.prediction_repository.clone());

        Self::assemble(config, registry, repository, persistence)
    }

    /// Wire pre-built parts; used by tests to inject registries and
    /// repositories.
    pub fn from_parts(
        config: Config,
        registry: Arc<ModelRegistry>,
        repository: Option<Arc<dyn PredictionRepository>>,
    ) -> Self {
        Self::assemble(config, registry, repository, None)
    }

    fn assemble(
        config: Config,
        registry: Arc<ModelRegistry>,
        repository: Option<Arc<dyn PredictionRepository>>,
        persistence: Option<PersistenceHandle>,
    ) -> Self {
        let engine = Arc::new(ForecastEngine::new(
            registry.clone(),
            FeatureSynthesizer::new(config.feature_defaults),
            config.max_forecast_days,
        ));
        let recorder = repository.map(|repo| Arc::new(PredictionRecorder::new(repo)));

        info!(
            "Application ready: {} model(s), persistence {}",
            registry.len(),
            if recorder.is_some() { "enabled" } else { "disabled" }
        );

        Self {
            config: Arc::new(config),
            registry,
            engine,
            recorder,
            persistence,
        }
    }
}
