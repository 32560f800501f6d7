// Startup wiring for models and persistence
pub mod bootstrap;

// Forecast generation and archiving
pub mod forecast;

// Model loading, estimators and feature synthesis
pub mod ml;

// Application orchestrator
pub mod system;
