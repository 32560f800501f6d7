// Forecast requests, points and calendar periods
pub mod forecast;

// Estimator port and feature tables
pub mod ml;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
