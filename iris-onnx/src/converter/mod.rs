//! KNN to ONNX conversion
//!
//! `proto` mirrors the ONNX protobuf schema, `builder` assembles graph pieces
//! and `knn` lays out the classifier graph.

pub mod builder;
pub mod knn;
pub mod proto;

pub use knn::{
    convert_knn, ConvertOptions, FloatTensorType, INPUT_NAME, LABEL_OUTPUT, PROBABILITIES_OUTPUT,
    ZIPMAP_LABEL_OUTPUT, ZIPMAP_PROBABILITY_OUTPUT,
};
pub use proto::ModelProto;
