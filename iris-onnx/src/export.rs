//! Fit, convert and write the Iris KNN graph

use crate::converter::{convert_knn, ConvertOptions, FloatTensorType, ModelProto, INPUT_NAME};
use crate::core::unified_error::{errors, ExportError, ExportResult};
use crate::runtime::IrisOnnxModel;
use iris_ml::{load_iris, IrisDataset, KnnClassifier, KnnParams, DEFAULT_SAMPLE, N_NEIGHBORS};
use linfa::prelude::*;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use prost::Message;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub bytes: usize,
    /// Number of probe rows checked against ONNX Runtime, if verification ran
    pub verified_rows: Option<usize>,
}

/// Encode and write a model, replacing any existing file
pub fn save_model<P: AsRef<Path>>(model: &ModelProto, path: P) -> ExportResult<usize> {
    let path = path.as_ref();
    let bytes = model.encode_to_vec();
    std::fs::write(path, &bytes).map_err(|e| errors::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote onnx model");
    Ok(bytes.len())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> ExportResult<ModelProto> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| errors::io(path, e))?;
    ModelProto::decode(bytes.as_slice()).map_err(|e| errors::decode(path, &e.to_string()))
}

/// Fit a fresh K=3 classifier on the whole dataset and export it to `path`
///
/// The fit is independent of any model persisted by training. With `verify`
/// the written file is reloaded in ONNX Runtime and checked against the
/// in-process classifier on [`verification_probes`].
pub fn export_iris_knn<P: AsRef<Path>>(
    path: P,
    options: ConvertOptions,
    verify: bool,
) -> ExportResult<ExportReport> {
    let path = path.as_ref();
    let iris = load_iris()?;
    let model = KnnParams::new(N_NEIGHBORS).fit(&iris.to_linfa())?;

    let initial_types = [(
        INPUT_NAME,
        FloatTensorType::new(vec![None, Some(iris.n_features())]),
    )];
    let onnx = convert_knn(&model, &initial_types, &options)?;
    let bytes = save_model(&onnx, path)?;
    info!(path = %path.display(), bytes, zipmap = options.zipmap, "exported knn model");

    let verified_rows = if verify {
        let probes = verification_probes(&iris)?;
        Some(verify_export(&model, path, probes.view())?)
    } else {
        None
    };

    Ok(ExportReport {
        path: path.to_path_buf(),
        bytes,
        verified_rows,
    })
}

/// The default sample plus each class centroid; all sit well inside one class
pub fn verification_probes(dataset: &IrisDataset) -> ExportResult<Array2<f64>> {
    let mut probes = Array2::from_shape_vec((1, DEFAULT_SAMPLE.len()), DEFAULT_SAMPLE.to_vec())
        .map_err(|e| errors::inference_error("verification_probes", &e.to_string()))?;

    for class_id in 0..dataset.target_names.len() {
        let rows: Vec<usize> = dataset
            .targets
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == class_id)
            .map(|(i, _)| i)
            .collect();
        let centroid: Option<Array1<f64>> =
            dataset.records.select(Axis(0), &rows).mean_axis(Axis(0));
        if let Some(centroid) = centroid {
            probes
                .push_row(centroid.view())
                .map_err(|e| errors::inference_error("verification_probes", &e.to_string()))?;
        }
    }
    Ok(probes)
}

/// Compare ONNX Runtime labels with the classifier's own predictions
///
/// Returns the number of rows checked.
pub fn verify_export<P: AsRef<Path>>(
    model: &KnnClassifier,
    path: P,
    probes: ArrayView2<f64>,
) -> ExportResult<usize> {
    let expected = model.predict(probes)?;
    let mut session = IrisOnnxModel::load(path)?;
    let actual = session.predict_labels(probes.mapv(|v| v as f32).view())?;

    let mismatched: Vec<usize> = expected
        .iter()
        .zip(&actual)
        .enumerate()
        .filter(|(_, (&e, &a))| e as i64 != a)
        .map(|(row, _)| row)
        .collect();

    if let Some(&first_row) = mismatched.first() {
        return Err(ExportError::VerificationFailed {
            mismatches: mismatched.len(),
            total: expected.len(),
            first_row,
            expected: expected[first_row],
            actual: actual[first_row],
        });
    }
    if actual.len() != expected.len() {
        return Err(errors::inference_error(
            "verify_export",
            &format!("expected {} labels, got {}", expected.len(), actual.len()),
        ));
    }

    info!(rows = expected.len(), "exported graph matches classifier");
    Ok(expected.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_probes_cover_each_class() {
        let iris = load_iris().unwrap();
        let probes = verification_probes(&iris).unwrap();

        assert_eq!(probes.dim(), (1 + iris.target_names.len(), iris.n_features()));
        assert_eq!(probes.row(0).to_vec(), DEFAULT_SAMPLE.to_vec());
        assert!(probes.iter().all(|v| v.is_finite()));
    }
}
