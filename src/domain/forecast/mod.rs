pub mod periods;
pub mod types;

pub use types::{
    BANGUS, ForecastRequest, ModelMetadata, ModelStatus, PredictionPoint, TILAPIA,
    normalize_species,
};
