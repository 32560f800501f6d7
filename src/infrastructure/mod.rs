pub mod persistence;
pub mod repositories;

pub use persistence::{Database, SqlitePredictionRepository};
pub use repositories::InMemoryPredictionRepository;
