use std::sync::Arc;
use tracing::{info, warn};

use crate::application::ml::loaders::LoadStrategy;
use crate::application::ml::model_registry::ModelRegistry;
use crate::config::ModelSpec;

pub struct ModelBootstrap;

impl ModelBootstrap {
    /// Load every configured species once. Species that fail to load are
    /// simply absent from the returned snapshot.
    pub fn init(specs: &[ModelSpec]) -> Arc<ModelRegistry> {
        Self::init_with(specs, None)
    }

    pub fn init_with(specs: &[ModelSpec], strategies: Option<Vec<LoadStrategy>>) -> Arc<ModelRegistry> {
        info!("Loading {} configured model(s)...", specs.len());

        let mut builder = ModelRegistry::builder();
        if let Some(strategies) = strategies {
            builder = builder.with_strategies(strategies);
        }
        for spec in specs {
            builder.load_spec(spec);
        }
        let registry = builder.build();

        if registry.is_empty() {
            warn!("No models loaded; every forecast will report the model as unavailable");
        }
        Arc::new(registry)
    }
}
