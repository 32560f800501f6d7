pub mod feature_synthesizer;
pub mod linear_predictor;
pub mod loaders;
pub mod model_registry;
pub mod onnx_predictor;
pub mod smartcore_predictor;

pub use feature_synthesizer::{FeatureSchema, FeatureSynthesizer, SchemaSource};
pub use linear_predictor::LinearEstimator;
pub use loaders::{LoadStrategy, default_strategies};
pub use model_registry::{LoadedModel, ModelRegistry, ModelRegistryBuilder};
pub use onnx_predictor::OnnxEstimator;
pub use smartcore_predictor::ForestEstimator;
