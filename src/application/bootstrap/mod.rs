pub mod models;
pub mod persistence;

pub use models::ModelBootstrap;
pub use persistence::{PersistenceBootstrap, PersistenceHandle};
