pub mod estimator;
pub mod feature_registry;
pub mod feature_table;

pub use estimator::Estimator;
pub use feature_registry::FeatureDefaults;
pub use feature_table::FeatureTable;
