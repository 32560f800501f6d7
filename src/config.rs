use crate::application::forecast::DEFAULT_MAX_FORECAST_DAYS;
use crate::application::ml::model_registry::DEFAULT_MODEL_VERSION;
use crate::domain::forecast::{BANGUS, TILAPIA, normalize_species};
use crate::domain::ml::FeatureDefaults;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!(
                "Invalid ENVIRONMENT: {}. Must be 'development' or 'production'",
                s
            ),
        }
    }
}

fn default_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

/// One species model to load at startup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelSpec {
    pub species: String,
    pub path: PathBuf,
    pub display_name: String,
    #[serde(default = "default_version")]
    pub version: String,
}

impl ModelSpec {
    pub fn new(species: &str, path: impl Into<PathBuf>, display_name: &str) -> Self {
        Self {
            species: normalize_species(species),
            path: path.into(),
            display_name: display_name.to_string(),
            version: default_version(),
        }
    }
}

/// Layout of the `MODELS_CONFIG` file
#[derive(Debug, Deserialize)]
struct ModelsFile {
    #[serde(default)]
    models: Vec<ModelSpec>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
    pub models_dir: PathBuf,
    /// Every configured species, sorted by species name
    pub models: Vec<ModelSpec>,
    pub max_forecast_days: i64,
    pub database_url: Option<String>,
    /// Name of the quantity the models predict, echoed in responses
    pub prediction_quantity: String,
    pub feature_defaults: FeatureDefaults,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_name =
            var("APP_NAME").unwrap_or_else(|| "Fish Price Forecast ML Service".to_string());

        let api_prefix = normalize_prefix(&var("API_PREFIX").unwrap_or_else(|| "/api/v1".to_string()));

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse PORT")?;

        let environment =
            Environment::from_str(&var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()))?;

        let allowed_origins: Vec<String> = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| {
                "http://localhost:3000,http://localhost:3001,https://*.railway.app,https://*.vercel.app"
                    .to_string()
            })
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let models_dir = PathBuf::from(var("MODELS_DIR").unwrap_or_else(|| "models".to_string()));

        let mut models = vec![
            ModelSpec::new(
                TILAPIA,
                var("TILAPIA_MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| models_dir.join("tilapia_forecast_best_model.json")),
                "Tilapia Forecast Model",
            ),
            ModelSpec::new(
                BANGUS,
                var("BANGUS_MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| models_dir.join("bangus_forecast_best_model.json")),
                "Bangus Forecast Model",
            ),
        ];

        if let Some(path) = var("MODELS_CONFIG") {
            for extra in load_models_file(Path::new(&path))? {
                merge_model(&mut models, extra);
            }
        }
        models.sort_by(|a, b| a.species.cmp(&b.species));

        let max_forecast_days = var("MAX_FORECAST_DAYS")
            .unwrap_or_else(|| DEFAULT_MAX_FORECAST_DAYS.to_string())
            .parse::<i64>()
            .context("Failed to parse MAX_FORECAST_DAYS")?;
        if max_forecast_days < 1 {
            anyhow::bail!("MAX_FORECAST_DAYS must be positive, got {}", max_forecast_days);
        }

        let database_url = var("DATABASE_URL");

        let prediction_quantity =
            var("PREDICTION_QUANTITY").unwrap_or_else(|| "harvest_kg".to_string());

        let fallback = FeatureDefaults::default();
        let feature_defaults = FeatureDefaults {
            avg_weight: parse_f64(&var, "DEFAULT_AVG_WEIGHT", fallback.avg_weight)?,
            fingerlings: parse_f64(&var, "DEFAULT_FINGERLINGS", fallback.fingerlings)?,
            survival_rate: parse_f64(&var, "DEFAULT_SURVIVAL_RATE", fallback.survival_rate)?,
        };

        Ok(Config {
            app_name,
            api_prefix,
            host,
            port,
            environment,
            allowed_origins,
            models_dir,
            models,
            max_forecast_days,
            database_url,
            prediction_quantity,
            feature_defaults,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Species accepted by the predict endpoint, whether loaded or not
    pub fn supported_species(&self) -> Vec<String> {
        self.models.iter().map(|m| m.species.clone()).collect()
    }

    pub fn is_supported_species(&self, species: &str) -> bool {
        let species = normalize_species(species);
        self.models.iter().any(|m| m.species == species)
    }

    /// Match an `Origin` header against `allowed_origins`.
    ///
    /// Supports `*` and `scheme://*.domain` subdomain wildcards.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|pattern| origin_matches(pattern, origin))
    }
}

fn origin_matches(pattern: &str, origin: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.split_once("://*.") {
        Some((scheme, domain)) => origin
            .strip_prefix(scheme)
            .and_then(|rest| rest.strip_prefix("://"))
            .and_then(|host| host.strip_suffix(domain))
            .and_then(|sub| sub.strip_suffix('.'))
            .is_some_and(|sub| !sub.is_empty()),
        None => pattern.trim_end_matches('/') == origin.trim_end_matches('/'),
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_f64<F>(var: &F, key: &str, default: f64) -> Result<f64>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

fn load_models_file(path: &Path) -> Result<Vec<ModelSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read MODELS_CONFIG {:?}", path))?;
    let file: ModelsFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse MODELS_CONFIG {:?}", path))?;

    // Relative paths are resolved against the config file's directory
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(file
        .models
        .into_iter()
        .map(|mut spec| {
            spec.species = normalize_species(&spec.species);
            if spec.path.is_relative() {
                spec.path = base.join(&spec.path);
            }
            spec
        })
        .collect())
}

/// Add a species, or replace the entry with the same name.
fn merge_model(models: &mut Vec<ModelSpec>, spec: ModelSpec) {
    match models.iter_mut().find(|m| m.species == spec.species) {
        Some(existing) => *existing = spec,
        None => models.push(spec),
    }
}
