//! Model artifact load strategies.
//!
//! A strategy turns a file into an estimator or explains why it could not.
//! The registry walks them in order and keeps the first success:
//!
//! 1. `onnx`: ONNX runtime session
//! 2. `json-utf8`: JSON artifact, bytes decoded as UTF-8
//! 3. `json-utf16`: JSON artifact, bytes decoded as UTF-16 (BOM-detected)
//! 4. `json-latin1`: JSON artifact, bytes decoded as ISO-8859-1
//!
//! JSON artifacts are either tagged envelopes (`{"format": "linear", ...}`,
//! `{"format": "random_forest", ...}`) or a bare SmartCore forest as written
//! by the training tool.

use super::linear_predictor::LinearEstimator;
use super::onnx_predictor::OnnxEstimator;
use super::smartcore_predictor::{ForestEstimator, ForestModel};
use crate::domain::errors::LoadError;
use crate::domain::ml::Estimator;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

pub type LoadFn = fn(&Path) -> Result<Arc<dyn Estimator>, LoadError>;

/// One named attempt in the registry's fallback list
#[derive(Clone, Copy)]
pub struct LoadStrategy {
    pub name: &'static str,
    pub load: LoadFn,
}

impl LoadStrategy {
    pub const fn new(name: &'static str, load: LoadFn) -> Self {
        Self { name, load }
    }
}

impl std::fmt::Debug for LoadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LoadStrategy").field(&self.name).finish()
    }
}

pub fn default_strategies() -> Vec<LoadStrategy> {
    vec![
        LoadStrategy::new("onnx", load_onnx),
        LoadStrategy::new("json-utf8", load_json_utf8),
        LoadStrategy::new("json-utf16", load_json_utf16),
        LoadStrategy::new("json-latin1", load_json_latin1),
    ]
}

fn load_onnx(path: &Path) -> Result<Arc<dyn Estimator>, LoadError> {
    Ok(Arc::new(OnnxEstimator::load(path)?))
}

fn load_json_utf8(path: &Path) -> Result<Arc<dyn Estimator>, LoadError> {
    let bytes = std::fs::read(path)?;
    parse_json_artifact(&decode_utf8(&bytes)?)
}

fn load_json_utf16(path: &Path) -> Result<Arc<dyn Estimator>, LoadError> {
    let bytes = std::fs::read(path)?;
    parse_json_artifact(&decode_utf16(&bytes)?)
}

fn load_json_latin1(path: &Path) -> Result<Arc<dyn Estimator>, LoadError> {
    let bytes = std::fs::read(path)?;
    parse_json_artifact(&decode_latin1(&bytes))
}

pub fn decode_utf8(bytes: &[u8]) -> Result<String, LoadError> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|_| LoadError::Decode { encoding: "UTF-8" })
}

/// Little-endian unless a big-endian BOM says otherwise.
pub fn decode_utf16(bytes: &[u8]) -> Result<String, LoadError> {
    const ENCODING: &str = "UTF-16";
    if bytes.len() % 2 != 0 {
        return Err(LoadError::Decode { encoding: ENCODING });
    }

    let (big_endian, body) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (true, rest),
        [0xFF, 0xFE, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        })
        .collect();

    String::from_utf16(&units).map_err(|_| LoadError::Decode { encoding: ENCODING })
}

/// Every byte maps to the code point of the same value, so this never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[derive(Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
enum JsonArtifact {
    Linear(LinearEstimator),
    RandomForest {
        #[serde(default)]
        feature_names: Option<Vec<String>>,
        /// Training width, for forests saved without feature names
        #[serde(default)]
        n_features: Option<usize>,
        model: ForestModel,
    },
}

pub fn parse_json_artifact(text: &str) -> Result<Arc<dyn Estimator>, LoadError> {
    match serde_json::from_str::<JsonArtifact>(text) {
        Ok(JsonArtifact::Linear(model)) => {
            model
                .validate()
                .map_err(|reason| LoadError::Format { reason })?;
            Ok(Arc::new(model))
        }
        Ok(JsonArtifact::RandomForest {
            feature_names,
            n_features,
            model,
        }) => {
            let estimator = ForestEstimator::new(model, feature_names);
            Ok(Arc::new(match n_features {
                Some(n) => estimator.with_n_features(n),
                None => estimator,
            }))
        }
        Err(envelope_err) => match serde_json::from_str::<ForestModel>(text) {
            Ok(model) => Ok(Arc::new(ForestEstimator::new(model, None))),
            Err(_) => Err(LoadError::Format {
                reason: envelope_err.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINEAR_JSON: &str = r#"{
        "format": "linear",
        "feature_names": ["AvgWeight", "Fingerlings", "SurvivalRate"],
        "coefficients": [1.5, 0.1, 2.0],
        "intercept": 10.0
    }"#;

    fn utf16_le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_default_strategy_order() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["onnx", "json-utf8", "json-utf16", "json-latin1"]);
    }

    #[test]
    fn test_parse_linear_artifact() {
        let estimator = parse_json_artifact(LINEAR_JSON).unwrap();
        assert_eq!(estimator.kind(), "linear");
        assert_eq!(estimator.feature_names_in().map(|n| n.len()), Some(3));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let result = parse_json_artifact(r#"{"format": "pickle", "blob": "..."}"#);
        assert!(matches!(result, Err(LoadError::Format { .. })));

        let result = parse_json_artifact("not json at all");
        assert!(matches!(result, Err(LoadError::Format { .. })));
    }

    #[test]
    fn test_parse_rejects_invalid_linear_model() {
        let json = r#"{"format": "linear", "feature_names": ["a"], "coefficients": [1.0, 2.0]}"#;
        assert!(matches!(
            parse_json_artifact(json),
            Err(LoadError::Format { .. })
        ));
    }

    #[test]
    fn test_decode_utf8_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"{}");
        assert_eq!(decode_utf8(&bytes).unwrap(), "{}");
        assert!(decode_utf8(&[0xFF, 0xFE, 0x00]).is_err());
    }

    #[test]
    fn test_decode_utf16_variants() {
        assert_eq!(decode_utf16(&utf16_le_with_bom("{}")).unwrap(), "{}");

        let big_endian = [0xFE, 0xFF, 0x00, b'{', 0x00, b'}'];
        assert_eq!(decode_utf16(&big_endian).unwrap(), "{}");

        let no_bom = [b'{', 0x00, b'}', 0x00];
        assert_eq!(decode_utf16(&no_bom).unwrap(), "{}");

        assert!(decode_utf16(&[0x7B]).is_err());
    }

    #[test]
    fn test_decode_latin1_maps_high_bytes() {
        assert_eq!(decode_latin1(&[b'a', 0xE9]), "a\u{e9}");
    }

    #[test]
    fn test_utf16_artifact_only_parses_after_decoding() {
        let bytes = utf16_le_with_bom(LINEAR_JSON);
        assert!(decode_utf8(&bytes).is_err());
        let text = decode_utf16(&bytes).unwrap();
        assert!(parse_json_artifact(&text).is_ok());
    }
}
