use crate::domain::errors::{EstimatorError, LoadError};
use crate::domain::ml::{Estimator, FeatureTable};
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// ONNX export of a fitted regressor.
///
/// Expects a single `[rows, features]` f32 input and reads the first output
/// as one value per row. `Session::run` needs `&mut`, so the session is the
/// one piece of estimator state kept behind a lock.
pub struct OnnxEstimator {
    session: Mutex<Session>,
}

impl OnnxEstimator {
    pub fn load(model_path: &Path) -> Result<Self, LoadError> {
        let builder = Session::builder().map_err(|e| LoadError::Backend {
            reason: format!("Failed to create ONNX session builder: {}", e),
        })?;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| LoadError::Backend {
                reason: format!("Failed to load ONNX model: {}", e),
            })?;

        info!("Loaded ONNX session from {:?}", model_path);
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Estimator for OnnxEstimator {
    fn kind(&self) -> &str {
        "onnx"
    }

    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, EstimatorError> {
        if table.is_empty() {
            return Ok(Vec::new());
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| EstimatorError::backend(format!("Mutex lock failed: {}", e)))?;

        let flat_data: Vec<f32> = table.as_slice().iter().map(|v| *v as f32).collect();
        let shape = vec![table.n_rows(), table.n_cols()];

        let input_value = ort::value::Value::from_array((shape.as_slice(), flat_data))
            .map_err(|e| EstimatorError::backend(format!("Input value creation failed: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(EstimatorError::backend)?;
        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| EstimatorError::backend("No output found"))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(EstimatorError::backend)?;

        Ok(data.1.iter().map(|v| *v as f64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(out: &mut Vec<u8>, mut value: u64) {
        while value >= 0x80 {
            out.push((value as u8) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
    }

    fn int_field(out: &mut Vec<u8>, field: u64, value: u64) {
        varint(out, field << 3);
        varint(out, value);
    }

    fn bytes_field(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
        varint(out, (field << 3) | 2);
        varint(out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }

    /// `ValueInfoProto` for a float tensor with symbolic dims
    fn float_tensor_info(name: &str, dims: &[Result<u64, &str>]) -> Vec<u8> {
        let mut shape = Vec::new();
        for dim in dims {
            let mut d = Vec::new();
            match dim {
                Ok(size) => int_field(&mut d, 1, *size),
                Err(param) => bytes_field(&mut d, 2, param.as_bytes()),
            }
            bytes_field(&mut shape, 1, &d);
        }
        let mut tensor = Vec::new();
        int_field(&mut tensor, 1, 1); // FLOAT
        bytes_field(&mut tensor, 2, &shape);
        let mut type_proto = Vec::new();
        bytes_field(&mut type_proto, 1, &tensor);

        let mut info = Vec::new();
        bytes_field(&mut info, 1, name.as_bytes());
        bytes_field(&mut info, 2, &type_proto);
        info
    }

    /// Opset 11 graph: y = ReduceSum(x, axes=[1], keepdims=0), x: [N, 3]
    fn row_sum_model() -> Vec<u8> {
        let mut axes = Vec::new();
        bytes_field(&mut axes, 1, b"axes");
        int_field(&mut axes, 8, 1);
        int_field(&mut axes, 20, 7); // INTS
        let mut keepdims = Vec::new();
        bytes_field(&mut keepdims, 1, b"keepdims");
        int_field(&mut keepdims, 3, 0);
        int_field(&mut keepdims, 20, 2); // INT

        let mut node = Vec::new();
        bytes_field(&mut node, 1, b"x");
        bytes_field(&mut node, 2, b"y");
        bytes_field(&mut node, 4, b"ReduceSum");
        bytes_field(&mut node, 5, &axes);
        bytes_field(&mut node, 5, &keepdims);

        let mut graph = Vec::new();
        bytes_field(&mut graph, 1, &node);
        bytes_field(&mut graph, 2, b"row_sum");
        bytes_field(&mut graph, 11, &float_tensor_info("x", &[Err("N"), Ok(3)]));
        bytes_field(&mut graph, 12, &float_tensor_info("y", &[Err("N")]));

        let mut opset = Vec::new();
        bytes_field(&mut opset, 1, b"");
        int_field(&mut opset, 2, 11);

        let mut model = Vec::new();
        int_field(&mut model, 1, 6); // IR version
        bytes_field(&mut model, 8, &opset);
        bytes_field(&mut model, 7, &graph);
        model
    }

    #[test]
    fn test_predict_returns_one_value_per_row() {
        let path = std::env::temp_dir().join(format!("fishcast-{}.onnx", uuid::Uuid::new_v4()));
        std::fs::write(&path, row_sum_model()).unwrap();

        let estimator = OnnxEstimator::load(&path).unwrap();
        let columns = vec![
            "AvgWeight".to_string(),
            "Fingerlings".to_string(),
            "SurvivalRate".to_string(),
        ];
        let table = FeatureTable::repeated(columns, &[250.0, 5000.0, 85.0], 2);

        assert_eq!(estimator.kind(), "onnx");
        assert_eq!(estimator.predict(&table).unwrap(), vec![5335.0, 5335.0]);
        assert!(estimator.predict(&FeatureTable::repeated(vec![], &[], 0)).unwrap().is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_onnx_file_is_load_error() {
        let result = OnnxEstimator::load(Path::new("non_existent.onnx"));
        assert!(matches!(result, Err(LoadError::Backend { .. })));
    }
}
