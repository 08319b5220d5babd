//! ONNX Runtime inference over an exported KNN graph

use crate::converter::{INPUT_NAME, LABEL_OUTPUT, PROBABILITIES_OUTPUT, ZIPMAP_LABEL_OUTPUT};
use crate::core::unified_error::{errors, ExportResult};
use ndarray::ArrayView2;
use ort::session::{Session, SessionOutputs};
use ort::value::Tensor;
use std::path::Path;
use tracing::info;

/// Label and class probabilities for one input row
#[derive(Debug, Clone, PartialEq)]
pub struct OnnxPrediction {
    pub label: i64,
    pub probabilities: Vec<f32>,
}

/// CPU ONNX Runtime session over a graph produced by [`crate::converter::convert_knn`]
pub struct IrisOnnxModel {
    session: Session,
}

impl IrisOnnxModel {
    pub fn load<P: AsRef<Path>>(path: P) -> ExportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(errors::file_not_found(path));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| errors::ort_error("session_builder", &e.to_string()))?
            .commit_from_file(path)
            .map_err(|e: ort::Error| errors::ort_error("load_model", &e.to_string()))?;

        info!(path = %path.display(), "loaded onnx model");
        Ok(Self { session })
    }

    /// Predicted label per row; works with and without ZipMap
    pub fn predict_labels(&mut self, rows: ArrayView2<f32>) -> ExportResult<Vec<i64>> {
        let outputs = self.run(rows)?;
        extract_labels(&outputs)
    }

    /// Label and probabilities per row; needs the raw `probabilities` tensor
    pub fn predict(&mut self, rows: ArrayView2<f32>) -> ExportResult<Vec<OnnxPrediction>> {
        let n_rows = rows.nrows();
        let outputs = self.run(rows)?;
        let labels = extract_labels(&outputs)?;

        let value = outputs.get(PROBABILITIES_OUTPUT).ok_or_else(|| {
            errors::inference_error(
                "extract_probabilities",
                "no 'probabilities' tensor; was the model exported with ZipMap?",
            )
        })?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| errors::inference_error("extract_probabilities", &e.to_string()))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 2 || dims[0] != n_rows {
            return Err(errors::inference_error(
                "extract_probabilities",
                &format!("expected shape [{n_rows}, classes], got {dims:?}"),
            ));
        }

        Ok(labels
            .into_iter()
            .zip(data.chunks(dims[1]))
            .map(|(label, probabilities)| OnnxPrediction {
                label,
                probabilities: probabilities.to_vec(),
            })
            .collect())
    }

    fn run(&mut self, rows: ArrayView2<f32>) -> ExportResult<SessionOutputs<'_>> {
        let (n_rows, n_features) = rows.dim();
        let data: Vec<f32> = rows.iter().copied().collect();

        let input = Tensor::from_array(([n_rows, n_features], data))
            .map_err(|e: ort::Error| errors::ort_error("create_input", &e.to_string()))?;

        self.session
            .run(ort::inputs![INPUT_NAME => input])
            .map_err(|e: ort::Error| errors::ort_error("session_run", &e.to_string()))
    }
}

fn extract_labels(outputs: &SessionOutputs<'_>) -> ExportResult<Vec<i64>> {
    let value = outputs
        .get(LABEL_OUTPUT)
        .or_else(|| outputs.get(ZIPMAP_LABEL_OUTPUT))
        .ok_or_else(|| errors::inference_error("extract_labels", "no label output"))?;
    let (_, data) = value
        .try_extract_tensor::<i64>()
        .map_err(|e| errors::inference_error("extract_labels", &e.to_string()))?;
    Ok(data.to_vec())
}
