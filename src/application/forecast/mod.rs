pub mod engine;
pub mod recorder;

pub use engine::{DEFAULT_MAX_FORECAST_DAYS, ForecastEngine, INTERVAL_CONFIDENCE};
pub use recorder::{ClientInfo, PredictionRecorder};
