//! KNN (K-Nearest Neighbors) classifier using Linfa
//!
//! Fitting stores the training points; prediction finds the `k` closest
//! points with a linfa-nn Ball Tree and takes a majority vote. Vote ties go to
//! the lowest class index.
//!
//! Fitted models are persisted as JSON.

use crate::core::unified_error::{errors, UnifiedError, UnifiedResult};
use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_nn::{
    distance::{Distance, L2Dist},
    BallTree, NearestNeighbour,
};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const ALGORITHM: &str = "knn";

// ============================================================================
// Hyperparameters
// ============================================================================

/// Unfitted KNN configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnnParams {
    k: usize,
}

impl KnnParams {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Fit<Array2<f64>, Array1<usize>, UnifiedError> for KnnParams {
    type Object = KnnClassifier;

    fn fit(
        &self,
        dataset: &DatasetBase<Array2<f64>, Array1<usize>>,
    ) -> UnifiedResult<KnnClassifier> {
        let classifier = KnnClassifier::from_training_data(
            self.k,
            dataset.records().clone(),
            dataset.targets().clone(),
        )?;
        debug!(
            k = self.k,
            samples = classifier.n_samples(),
            classes = classifier.n_classes(),
            "fitted knn classifier"
        );
        Ok(classifier)
    }
}

// ============================================================================
// Fitted classifier
// ============================================================================

/// Fitted KNN classifier backed by Linfa's Ball Tree
#[derive(Debug, Clone, PartialEq)]
pub struct KnnClassifier {
    k: usize,
    training_points: Array2<f64>,
    labels: Array1<usize>,
    n_classes: usize,
}

/// Model data for JSON serialization
#[derive(Debug, Serialize, Deserialize)]
pub struct KnnModelData {
    pub algorithm: String,
    pub trained: bool,
    pub k: usize,
    pub n_classes: usize,
    pub training_points: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl KnnClassifier {
    fn from_training_data(
        k: usize,
        training_points: Array2<f64>,
        labels: Array1<usize>,
    ) -> UnifiedResult<Self> {
        if k == 0 {
            return Err(errors::config_error("n_neighbors", "must be at least 1"));
        }
        if training_points.nrows() == 0 || training_points.ncols() == 0 {
            return Err(errors::validation(
                "training_points",
                "a non-empty matrix",
                format!("{:?}", training_points.dim()),
            ));
        }
        if labels.len() != training_points.nrows() {
            return Err(errors::validation(
                "labels",
                training_points.nrows(),
                labels.len(),
            ));
        }
        let n_classes = labels.iter().max().map_or(0, |&max| max + 1);

        Ok(Self {
            k,
            training_points,
            labels,
            n_classes,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.training_points.ncols()
    }

    pub fn n_samples(&self) -> usize {
        self.training_points.nrows()
    }

    pub fn training_points(&self) -> &Array2<f64> {
        &self.training_points
    }

    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    /// Predict one class index per row
    pub fn predict(&self, records: ArrayView2<f64>) -> UnifiedResult<Array1<usize>> {
        let votes = self.neighbor_votes(records)?;
        Ok(votes
            .rows()
            .into_iter()
            .map(|row| {
                // First maximum wins, so ties resolve to the lowest class index
                let mut best = 0;
                for (class_id, &count) in row.iter().enumerate() {
                    if count > row[best] {
                        best = class_id;
                    }
                }
                best
            })
            .collect())
    }

    /// Fraction of neighbour votes per class, shape `[n_rows, n_classes]`
    pub fn predict_proba(&self, records: ArrayView2<f64>) -> UnifiedResult<Array2<f64>> {
        let votes = self.neighbor_votes(records)?;
        let k = self.effective_k() as f64;
        Ok(votes.mapv(|count| count as f64 / k))
    }

    fn effective_k(&self) -> usize {
        self.k.min(self.n_samples())
    }

    fn neighbor_votes(&self, records: ArrayView2<f64>) -> UnifiedResult<Array2<usize>> {
        if records.ncols() != self.n_features() {
            return Err(errors::validation(
                "records",
                format!("{} features", self.n_features()),
                records.ncols(),
            ));
        }

        let ball_tree = BallTree::new()
            .from_batch(&self.training_points, L2Dist)
            .map_err(|e| errors::inference_error("build_ball_tree", &e.to_string()))?;

        let k = self.effective_k();
        let mut votes = Array2::<usize>::zeros((records.nrows(), self.n_classes));

        for (i, row) in records.rows().into_iter().enumerate() {
            // linfa-nn panics on non-finite distances
            let finite = row.iter().all(|v| v.is_finite())
                && self
                    .training_points
                    .rows()
                    .into_iter()
                    .all(|point| L2Dist.rdistance(point, row).is_finite());
            if !finite {
                return Err(errors::validation(
                    "records",
                    "features with finite distances to the training points",
                    format!("row {i}: {row}"),
                ));
            }

            let neighbors = ball_tree
                .k_nearest(row, k)
                .map_err(|e| errors::inference_error("k_nearest", &e.to_string()))?;
            for (_point, idx) in neighbors {
                votes[[i, self.labels[idx]]] += 1;
            }
        }

        Ok(votes)
    }

    /// Save model to JSON
    pub fn to_json(&self) -> UnifiedResult<String> {
        let data = KnnModelData {
            algorithm: ALGORITHM.to_string(),
            trained: true,
            k: self.k,
            n_classes: self.n_classes,
            training_points: self
                .training_points
                .rows()
                .into_iter()
                .map(|r| r.to_vec())
                .collect(),
            labels: self.labels.to_vec(),
        };

        serde_json::to_string_pretty(&data)
            .map_err(|e| errors::invalid_json("<knn model>", &e.to_string()))
    }

    /// Load model from JSON
    pub fn from_json(json: &str) -> UnifiedResult<Self> {
        let data: KnnModelData = serde_json::from_str(json)
            .map_err(|e| errors::invalid_json("<knn model>", &e.to_string()))?;

        if data.algorithm != ALGORITHM {
            return Err(errors::validation("algorithm", ALGORITHM, &data.algorithm));
        }
        if !data.trained {
            return Err(UnifiedError::NotTrained);
        }

        let n = data.training_points.len();
        let dim = data.training_points.first().map_or(0, Vec::len);
        if let Some(row) = data.training_points.iter().position(|r| r.len() != dim) {
            return Err(errors::validation(
                &format!("training_points[{row}]"),
                format!("{dim} features"),
                data.training_points[row].len(),
            ));
        }
        if let Some(&label) = data.labels.iter().find(|&&l| l >= data.n_classes) {
            return Err(errors::validation(
                "labels",
                format!("class index below {}", data.n_classes),
                label,
            ));
        }

        let flat: Vec<f64> = data.training_points.into_iter().flatten().collect();
        let training_points = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| errors::validation("training_points", "a rectangular matrix", e))?;

        let mut classifier =
            Self::from_training_data(data.k, training_points, Array1::from_vec(data.labels))?;
        // Keep classes declared at fit time even if no training point carries them
        classifier.n_classes = classifier.n_classes.max(data.n_classes);
        Ok(classifier)
    }

    /// Write the model as JSON, replacing any existing file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> UnifiedResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| errors::io(path, e))?;
        info!(path = %path.display(), "saved knn model");
        Ok(())
    }

    /// Read a model written by [`KnnClassifier::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> UnifiedResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(errors::file_not_found(path));
        }
        let json = std::fs::read_to_string(path).map_err(|e| errors::io(path, e))?;
        let classifier =
            Self::from_json(&json).map_err(|e| errors::model_load(path, &e.to_string()))?;
        info!(path = %path.display(), k = classifier.k, "loaded knn model");
        Ok(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rstest::rstest;

    fn create_test_model_json() -> String {
        r#"{
            "algorithm": "knn",
            "trained": true,
            "k": 3,
            "n_classes": 2,
            "training_points": [
                [1.0, 0.0, 0.0],
                [1.0, 0.1, 0.0],
                [0.9, 0.0, 0.1],
                [0.0, 1.0, 0.0],
                [0.0, 1.0, 0.1],
                [0.1, 0.9, 0.0]
            ],
            "labels": [0, 0, 0, 1, 1, 1]
        }"#
        .to_string()
    }

    fn toy_dataset() -> DatasetBase<Array2<f64>, Array1<usize>> {
        let records = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
        ];
        let targets = array![0, 0, 0, 1, 1, 1];
        DatasetBase::new(records, targets)
    }

    #[test]
    fn test_knn_load_and_predict() {
        let classifier = KnnClassifier::from_json(&create_test_model_json()).unwrap();
        assert_eq!(classifier.k(), 3);
        assert_eq!(classifier.n_classes(), 2);

        let predictions = classifier
            .predict(array![[0.9, 0.1, 0.0], [0.1, 0.9, 0.0]].view())
            .unwrap();
        assert_eq!(predictions.to_vec(), vec![0, 1]);
    }

    #[test]
    fn test_fit_through_linfa() {
        let classifier = KnnParams::new(3).fit(&toy_dataset()).unwrap();
        assert_eq!(classifier.n_samples(), 6);
        assert_eq!(classifier.n_features(), 2);

        let predictions = classifier
            .predict(array![[0.05, 0.05], [4.9, 5.2]].view())
            .unwrap();
        assert_eq!(predictions.to_vec(), vec![0, 1]);
    }

    #[test]
    fn test_predict_proba_is_vote_fraction() {
        let records = array![[0.0], [0.1], [1.0], [5.0]];
        let targets = array![0, 0, 1, 1];
        let classifier = KnnParams::new(3)
            .fit(&DatasetBase::new(records, targets))
            .unwrap();

        let proba = classifier.predict_proba(array![[0.05]].view()).unwrap();
        assert!((proba[[0, 0]] - 2.0 / 3.0).abs() < 1e-12);
        assert!((proba[[0, 1]] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_vote_tie_goes_to_lowest_class() {
        // Two neighbours, one per class: the tie must resolve to class 0
        let records = array![[1.0], [-1.0], [10.0]];
        let targets = array![1, 0, 2];
        let classifier = KnnParams::new(2)
            .fit(&DatasetBase::new(records, targets))
            .unwrap();

        let predictions = classifier.predict(array![[0.0]].view()).unwrap();
        assert_eq!(predictions[0], 0);
    }

    #[test]
    fn test_k_larger_than_training_set_uses_all_points() {
        let classifier = KnnParams::new(10).fit(&toy_dataset()).unwrap();
        let proba = classifier.predict_proba(array![[0.0, 0.0]].view()).unwrap();
        assert!((proba.row(0).sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_k() {
        assert!(KnnParams::new(0).fit(&toy_dataset()).is_err());
    }

    #[rstest]
    #[case::overflowing_distance(1e200)]
    #[case::infinite(f64::INFINITY)]
    #[case::nan(f64::NAN)]
    fn test_rejects_non_finite_distances(#[case] value: f64) {
        let classifier = KnnParams::new(3).fit(&toy_dataset()).unwrap();
        let rows = array![[value, 0.0]];

        let err = classifier.predict(rows.view()).unwrap_err();
        assert!(matches!(
            err,
            UnifiedError::Validation { ref field, .. } if field == "records"
        ));
        assert!(classifier.predict_proba(rows.view()).is_err());
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let classifier = KnnParams::new(3).fit(&toy_dataset()).unwrap();
        let err = classifier
            .predict(array![[1.0, 2.0, 3.0]].view())
            .unwrap_err();
        assert!(matches!(err, UnifiedError::Validation { .. }));
    }

    #[test]
    fn test_knn_json_roundtrip() {
        let classifier = KnnParams::new(3).fit(&toy_dataset()).unwrap();
        let restored = KnnClassifier::from_json(&classifier.to_json().unwrap()).unwrap();
        assert_eq!(restored, classifier);
    }

    #[test]
    fn test_from_json_rejects_untrained() {
        let json = create_test_model_json().replace("\"trained\": true", "\"trained\": false");
        let err = KnnClassifier::from_json(&json).unwrap_err();
        assert!(matches!(err, UnifiedError::NotTrained));
    }

    #[test]
    fn test_from_json_rejects_ragged_points() {
        let json = r#"{
            "algorithm": "knn", "trained": true, "k": 1, "n_classes": 1,
            "training_points": [[1.0, 2.0], [3.0]],
            "labels": [0, 0]
        }"#;
        assert!(KnnClassifier::from_json(json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KnnClassifier::load(dir.path().join("absent.pkl")).unwrap_err();
        assert!(matches!(err, UnifiedError::FileNotFound { .. }));
    }
}
