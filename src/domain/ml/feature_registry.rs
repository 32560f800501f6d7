use serde::{Deserialize, Serialize};

pub const AVG_WEIGHT: &str = "AvgWeight";
pub const FINGERLINGS: &str = "Fingerlings";
pub const SURVIVAL_RATE: &str = "SurvivalRate";

/// Column order used when the estimator does not advertise its inputs.
/// This order MUST match the order used when the fallback models were trained.
pub const FALLBACK_FEATURE_NAMES: &[&str] = &[AVG_WEIGHT, FINGERLINGS, SURVIVAL_RATE];

/// Typical aquaculture values used to fill features the caller cannot supply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefaults {
    /// Grams; typical market weight for tilapia/bangus
    pub avg_weight: f64,
    /// Stocking count per pond
    pub fingerlings: f64,
    /// Percent
    pub survival_rate: f64,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            avg_weight: 250.0,
            fingerlings: 5000.0,
            survival_rate: 85.0,
        }
    }
}

impl FeatureDefaults {
    /// Default for a named feature. Names outside the known vocabulary get 0.
    pub fn value_for(&self, name: &str) -> f64 {
        match name {
            AVG_WEIGHT => self.avg_weight,
            FINGERLINGS => self.fingerlings,
            SURVIVAL_RATE => self.survival_rate,
            _ => 0.0,
        }
    }

    pub fn is_known(name: &str) -> bool {
        FALLBACK_FEATURE_NAMES.contains(&name)
    }
}
