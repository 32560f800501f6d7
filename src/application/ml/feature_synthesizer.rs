use crate::domain::ml::feature_registry::FALLBACK_FEATURE_NAMES;
use crate::domain::ml::{Estimator, FeatureDefaults, FeatureTable};
use chrono::NaiveDate;
use tracing::debug;

/// Where the column layout of a feature table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    FeatureNamesIn,
    FeatureNamesOut,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    pub source: SchemaSource,
    pub columns: Vec<String>,
}

impl FeatureSchema {
    /// Columns outside the default vocabulary; these are filled with 0
    pub fn unknown_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|name| !FeatureDefaults::is_known(name))
            .collect()
    }
}

type Probe = fn(&dyn Estimator) -> Option<Vec<String>>;

fn probe_names_in(estimator: &dyn Estimator) -> Option<Vec<String>> {
    estimator.feature_names_in()
}

fn probe_names_out(estimator: &dyn Estimator) -> Option<Vec<String>> {
    match estimator.feature_names_out() {
        Ok(names) => Some(names),
        Err(e) => {
            debug!("feature_names_out unavailable: {}", e);
            None
        }
    }
}

/// Introspection capabilities in priority order
const PROBES: [(SchemaSource, Probe); 2] = [
    (SchemaSource::FeatureNamesIn, probe_names_in),
    (SchemaSource::FeatureNamesOut, probe_names_out),
];

/// Builds estimator input from the little a caller tells us.
///
/// The request only carries a location and a date range, so every known
/// feature is filled from [`FeatureDefaults`] and unknown ones with zero.
/// Location and period are accepted but not yet encoded: all rows of a
/// table are identical.
#[derive(Debug, Clone, Default)]
pub struct FeatureSynthesizer {
    defaults: FeatureDefaults,
}

impl FeatureSynthesizer {
    pub fn new(defaults: FeatureDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &FeatureDefaults {
        &self.defaults
    }

    /// Columns the estimator expects, falling back to the static
    /// aquaculture schema when it cannot tell us. An empty name list counts
    /// as unknown.
    pub fn resolve_schema(&self, estimator: &dyn Estimator) -> FeatureSchema {
        PROBES
            .iter()
            .find_map(|(source, probe)| {
                probe(estimator)
                    .filter(|names| !names.is_empty())
                    .map(|columns| FeatureSchema {
                        source: *source,
                        columns,
                    })
            })
            .unwrap_or_else(|| FeatureSchema {
                source: SchemaSource::Fallback,
                columns: FALLBACK_FEATURE_NAMES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            })
    }

    pub fn synthesize(
        &self,
        estimator: &dyn Estimator,
        periods: &[NaiveDate],
        province: &str,
        city: &str,
    ) -> FeatureTable {
        let schema = self.resolve_schema(estimator);
        let row: Vec<f64> = schema
            .columns
            .iter()
            .map(|name| self.defaults.value_for(name))
            .collect();

        let unknown = schema.unknown_columns();
        if !unknown.is_empty() {
            debug!(columns = ?unknown, "Filling features without a default with 0");
        }
        debug!(
            source = ?schema.source,
            columns = schema.columns.len(),
            rows = periods.len(),
            province,
            city,
            "Synthesized feature table"
        );
        FeatureTable::repeated(schema.columns, &row, periods.len())
    }
}
