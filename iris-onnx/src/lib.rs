//! Iris KNN export to ONNX
//!
//! Converts a fitted [`iris_ml::KnnClassifier`] into an ONNX graph, runs
//! exported graphs with ONNX Runtime and serves predictions over HTTP.
//!
//! ## Graph
//! Squared distances to every stored training point, `TopK` (smallest k),
//! one-hot neighbor labels averaged into class probabilities, `ArgMax` for the
//! label. An optional `ZipMap` turns the probabilities into per-row
//! `{class_id: probability}` maps.

pub mod converter;
pub mod core;
pub mod export;
pub mod runtime;
pub mod server;

// Re-export commonly used types
pub use crate::core::unified_error::{ExportError, ExportResult};
pub use converter::{convert_knn, ConvertOptions, FloatTensorType, ModelProto};
pub use export::{export_iris_knn, load_model, save_model, verify_export, ExportReport};
pub use runtime::{IrisOnnxModel, OnnxPrediction};
pub use server::{IrisServer, ServerConfig};
