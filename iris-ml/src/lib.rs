//! Iris KNN classifier
//!
//! Trains a K-Nearest-Neighbors classifier on the bundled Iris dataset,
//! persists it as JSON and reloads it for inference.
//!
//! ## Architecture
//! - **Dataset**: compiled-in CSV parsed into `ndarray` matrices
//! - **Split**: seeded shuffle into disjoint train/test partitions
//! - **KNN**: majority vote among the `k` nearest points, found with a linfa-nn Ball Tree
//! - **Workflow**: train-and-save or load-and-predict, selected by a single flag

pub mod core;
pub mod dataset;
pub mod knn;
pub mod split;
pub mod workflow;

// Re-exports for convenience
pub use crate::core::config::{
    TrainingConfig, DEFAULT_SAMPLE, MODEL_FILE, N_NEIGHBORS, ONNX_MODEL_FILE, RANDOM_STATE,
    TEST_SIZE,
};
pub use crate::core::logging;
pub use crate::core::unified_error::{UnifiedError, UnifiedResult};
pub use dataset::{load_iris, IrisDataset};
pub use knn::{KnnClassifier, KnnParams};
pub use split::{train_test_split, TrainTestSplit};
pub use workflow::{Outcome, Prediction, TrainingReport};
