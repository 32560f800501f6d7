use super::loaders::{LoadStrategy, default_strategies};
use crate::config::ModelSpec;
use crate::domain::forecast::{ModelMetadata, ModelStatus, normalize_species};
use crate::domain::ml::Estimator;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MODEL_VERSION: &str = "1.0.0";

/// A species' estimator together with its metadata
#[derive(Clone)]
pub struct LoadedModel {
    pub metadata: ModelMetadata,
    pub estimator: Arc<dyn Estimator>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("metadata", &self.metadata)
            .field("estimator", &self.estimator.kind())
            .finish()
    }
}

/// Read-only snapshot of every model loaded at startup.
///
/// Built once through [`ModelRegistryBuilder`] and shared behind an `Arc`;
/// nothing mutates it afterwards, so lookups need no locking.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, LoadedModel>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::new()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Case-insensitive
    pub fn is_loaded(&self, species: &str) -> bool {
        self.models.contains_key(&normalize_species(species))
    }

    pub fn get(&self, species: &str) -> Option<&LoadedModel> {
        self.models.get(&normalize_species(species))
    }

    pub fn info(&self, species: &str) -> Option<&ModelMetadata> {
        self.get(species).map(|m| &m.metadata)
    }

    /// Metadata for every loaded model, sorted by species
    pub fn all_info(&self) -> Vec<ModelMetadata> {
        let mut infos: Vec<ModelMetadata> =
            self.models.values().map(|m| m.metadata.clone()).collect();
        infos.sort_by(|a, b| a.species.cmp(&b.species));
        infos
    }

    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = self.models.keys().cloned().collect();
        species.sort();
        species
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Startup-time loader that produces a [`ModelRegistry`].
pub struct ModelRegistryBuilder {
    strategies: Vec<LoadStrategy>,
    models: HashMap<String, LoadedModel>,
}

impl Default for ModelRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistryBuilder {
    pub fn new() -> Self {
        Self {
            strategies: default_strategies(),
            models: HashMap::new(),
        }
    }

    /// Replace the fallback list; order is priority.
    pub fn with_strategies(mut self, strategies: Vec<LoadStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn load_spec(&mut self, spec: &ModelSpec) -> bool {
        self.load_versioned(&spec.species, &spec.path, &spec.display_name, &spec.version)
    }

    pub fn load(&mut self, species: &str, path: &Path, display_name: &str) -> bool {
        self.load_versioned(species, path, display_name, DEFAULT_MODEL_VERSION)
    }

    /// Try each strategy in order; the first success is registered.
    ///
    /// Failure only leaves the species unregistered. Returns whether a
    /// model was registered.
    pub fn load_versioned(
        &mut self,
        species: &str,
        path: &Path,
        display_name: &str,
        version: &str,
    ) -> bool {
        let species = normalize_species(species);

        if !path.exists() {
            warn!("{} model not found at {:?}", species, path);
            return false;
        }

        for strategy in &self.strategies {
            debug!(
                "Attempting to load {} model with method: {}",
                species, strategy.name
            );
            match (strategy.load)(path) {
                Ok(estimator) => {
                    info!(
                        "{} model loaded successfully using {} ({})",
                        species,
                        strategy.name,
                        estimator.kind()
                    );
                    let metadata = ModelMetadata {
                        species: species.clone(),
                        display_name: display_name.to_string(),
                        version: version.to_string(),
                        source_path: path.to_path_buf(),
                        loader: strategy.name.to_string(),
                        kind: estimator.kind().to_string(),
                        status: ModelStatus::Loaded,
                    };
                    self.models.insert(
                        species,
                        LoadedModel {
                            metadata,
                            estimator,
                        },
                    );
                    return true;
                }
                Err(e) => {
                    debug!("Method {} failed: {}", strategy.name, e);
                }
            }
        }

        error!("Failed to load {} model with all methods", species);
        false
    }

    /// Register an estimator that was built in-process rather than loaded.
    pub fn register(
        &mut self,
        species: &str,
        display_name: &str,
        version: &str,
        estimator: Arc<dyn Estimator>,
    ) -> &mut Self {
        let species = normalize_species(species);
        let metadata = ModelMetadata {
            species: species.clone(),
            display_name: display_name.to_string(),
            version: version.to_string(),
            source_path: PathBuf::new(),
            loader: "in_process".to_string(),
            kind: estimator.kind().to_string(),
            status: ModelStatus::Loaded,
        };
        self.models.insert(
            species,
            LoadedModel {
                metadata,
                estimator,
            },
        );
        self
    }

    pub fn build(self) -> ModelRegistry {
        info!("Models loaded: {:?}", {
            let mut keys: Vec<_> = self.models.keys().collect();
            keys.sort();
            keys
        });
        ModelRegistry {
            models: self.models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::linear_predictor::LinearEstimator;
    use crate::domain::errors::LoadError;
    use std::fs;

    fn temp_artifact(contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("registry-{}.bin", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    fn always_fails(_: &Path) -> Result<Arc<dyn Estimator>, LoadError> {
        Err(LoadError::Format {
            reason: "unreadable".to_string(),
        })
    }

    fn constant_one(_: &Path) -> Result<Arc<dyn Estimator>, LoadError> {
        Ok(Arc::new(LinearEstimator::new(None, vec![0.0], 1.0)))
    }

    fn constant_two(_: &Path) -> Result<Arc<dyn Estimator>, LoadError> {
        Ok(Arc::new(LinearEstimator::new(None, vec![0.0], 2.0)))
    }

    #[test]
    fn test_first_successful_strategy_wins() {
        let path = temp_artifact(b"ignored");
        let mut builder = ModelRegistry::builder().with_strategies(vec![
            LoadStrategy::new("broken", always_fails),
            LoadStrategy::new("first", constant_one),
            LoadStrategy::new("second", constant_two),
        ]);

        assert!(builder.load("Tilapia", &path, "Tilapia Harvest Forecast Model"));
        let registry = builder.build();

        let info = registry.info("tilapia").unwrap();
        assert_eq!(info.loader, "first");
        assert_eq!(info.version, DEFAULT_MODEL_VERSION);
        assert_eq!(info.source_path, path);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_all_strategies_failing_leaves_species_absent() {
        let path = temp_artifact(b"ignored");
        let mut builder = ModelRegistry::builder().with_strategies(vec![
            LoadStrategy::new("a", always_fails),
            LoadStrategy::new("b", always_fails),
        ]);

        assert!(!builder.load("bangus", &path, "Bangus Harvest Forecast Model"));
        let registry = builder.build();

        assert!(!registry.is_loaded("bangus"));
        assert!(registry.all_info().is_empty());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let mut builder =
            ModelRegistry::builder().with_strategies(vec![LoadStrategy::new("one", constant_one)]);

        assert!(!builder.load("tilapia", Path::new("/no/such/model.json"), "Tilapia"));
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut builder = ModelRegistry::builder();
        builder.register(
            "TILAPIA",
            "Tilapia",
            "2.0.0",
            Arc::new(LinearEstimator::new(None, vec![1.0], 0.0)),
        );
        let registry = builder.build();

        assert!(registry.is_loaded("tilapia"));
        assert!(registry.is_loaded("Tilapia"));
        assert!(!registry.is_loaded("salmon"));
        assert_eq!(registry.species(), vec!["tilapia".to_string()]);
        assert_eq!(registry.all_info()[0].status, ModelStatus::Loaded);
    }

    #[test]
    fn test_default_strategies_load_json_artifact() {
        let path = temp_artifact(
            br#"{"format": "linear", "coefficients": [1.0, 1.0, 1.0], "intercept": 0.0}"#,
        );
        let mut builder = ModelRegistry::builder();

        assert!(builder.load("bangus", &path, "Bangus"));
        let registry = builder.build();
        let info = registry.info("bangus").unwrap();
        assert_eq!(info.loader, "json-utf8");
        assert_eq!(info.kind, "linear");
        fs::remove_file(path).ok();
    }
}
