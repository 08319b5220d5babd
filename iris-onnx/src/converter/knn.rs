//! KNN classifier to ONNX graph conversion
//!
//! The graph reproduces [`KnnClassifier::predict`] with standard `ai.onnx`
//! operators:
//!
//! ```text
//!  float_input [N,F]
//!    │ Unsqueeze(axis 1)            [N,1,F]
//!    │ Sub training_points [M,F]    [N,M,F]
//!    │ Mul (square), ReduceSum(2)   [N,M]    squared distances
//!    │ TopK(k, smallest)            [N,k]    neighbour indices
//!    │ Gather training_labels       [N,k]
//!    │ OneHot(C), ReduceSum(1)      [N,C]    votes
//!    ├─► Div k ──► probabilities    [N,C]
//!    └─► ArgMax ─► label            [N]      first maximum = lowest class on ties
//! ```
//!
//! With ZipMap enabled the probabilities are additionally wrapped by
//! `ai.onnx.ml.ZipMap` into one `{class: probability}` map per row.

use super::builder::{
    float_tensor, int64_tensor, int_attr, ints_attr, sequence_of_maps, tensor_type, value_info,
    Dim, NodeBuilder,
};
use super::proto::{tensor_proto::DataType, GraphProto, ModelProto, OperatorSetIdProto};
use crate::core::unified_error::{errors, ExportResult};
use iris_ml::KnnClassifier;
use tracing::debug;

pub const INPUT_NAME: &str = "float_input";
pub const LABEL_OUTPUT: &str = "label";
pub const PROBABILITIES_OUTPUT: &str = "probabilities";
pub const ZIPMAP_LABEL_OUTPUT: &str = "output_label";
pub const ZIPMAP_PROBABILITY_OUTPUT: &str = "output_probability";

const IR_VERSION: i64 = 7;
const OPSET_VERSION: i64 = 13;
const ML_DOMAIN: &str = "ai.onnx.ml";
const ML_OPSET_VERSION: i64 = 1;
const MODEL_NAME: &str = "KNeighborsClassifier";

/// Declared float input; `None` marks a dimension of any size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatTensorType {
    pub shape: Vec<Option<usize>>,
}

impl FloatTensorType {
    pub fn new(shape: Vec<Option<usize>>) -> Self {
        Self { shape }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Wrap probabilities in a per-row class map instead of a raw tensor
    pub zipmap: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { zipmap: true }
    }
}

/// Convert a fitted classifier into an ONNX model
pub fn convert_knn(
    model: &KnnClassifier,
    initial_types: &[(&str, FloatTensorType)],
    options: &ConvertOptions,
) -> ExportResult<ModelProto> {
    let (input_name, input_type) = match initial_types {
        [(name, ty)] => (*name, ty),
        _ => {
            return Err(errors::conversion(
                MODEL_NAME,
                &format!("expected exactly one input, got {}", initial_types.len()),
            ))
        }
    };
    let n_features = model.n_features();
    match input_type.shape.as_slice() {
        [_, Some(f)] if *f == n_features => {}
        other => {
            return Err(errors::conversion(
                MODEL_NAME,
                &format!("input shape must be [batch, {n_features}], got {other:?}"),
            ))
        }
    }

    let k = model.k();
    let n_samples = model.n_samples();
    let n_classes = model.n_classes();
    if k == 0 {
        return Err(errors::conversion(
            MODEL_NAME,
            "n_neighbors must be positive",
        ));
    }
    if k > n_samples {
        return Err(errors::conversion(
            MODEL_NAME,
            &format!("n_neighbors={k} exceeds the {n_samples} training points"),
        ));
    }
    if n_classes == 0 {
        return Err(errors::conversion(
            MODEL_NAME,
            "model has no classes",
        ));
    }

    let (label_name, probabilities_name) = if options.zipmap {
        (ZIPMAP_LABEL_OUTPUT, ZIPMAP_PROBABILITY_OUTPUT)
    } else {
        (LABEL_OUTPUT, PROBABILITIES_OUTPUT)
    };
    // Raw probabilities tensor; only a graph output without ZipMap
    let raw_probabilities = PROBABILITIES_OUTPUT;

    let points: Vec<f32> = model.training_points().iter().map(|&v| v as f32).collect();
    let labels: Vec<i64> = model.labels().iter().map(|&l| l as i64).collect();

    let initializer = vec![
        float_tensor(
            "training_points",
            &[n_samples as i64, n_features as i64],
            points,
        ),
        int64_tensor("training_labels", &[n_samples as i64], labels),
        int64_tensor("unsqueeze_axes", &[1], vec![1]),
        int64_tensor("feature_axes", &[1], vec![2]),
        int64_tensor("neighbor_axes", &[1], vec![1]),
        int64_tensor("k", &[1], vec![k as i64]),
        int64_tensor("onehot_depth", &[1], vec![n_classes as i64]),
        float_tensor("onehot_values", &[2], vec![0.0, 1.0]),
        float_tensor("k_float", &[], vec![k as f32]),
    ];

    let mut node = vec![
        NodeBuilder::new("Unsqueeze", "expand_input")
            .inputs(&[input_name, "unsqueeze_axes"])
            .outputs(&["input_expanded"])
            .build(),
        NodeBuilder::new("Sub", "difference")
            .inputs(&["input_expanded", "training_points"])
            .outputs(&["diff"])
            .build(),
        NodeBuilder::new("Mul", "square")
            .inputs(&["diff", "diff"])
            .outputs(&["diff_squared"])
            .build(),
        NodeBuilder::new("ReduceSum", "squared_distance")
            .inputs(&["diff_squared", "feature_axes"])
            .outputs(&["distances"])
            .attr(int_attr("keepdims", 0))
            .build(),
        NodeBuilder::new("TopK", "nearest")
            .inputs(&["distances", "k"])
            .outputs(&["neighbor_distances", "neighbor_indices"])
            .attr(int_attr("axis", 1))
            .attr(int_attr("largest", 0))
            .attr(int_attr("sorted", 1))
            .build(),
        NodeBuilder::new("Gather", "neighbor_label_lookup")
            .inputs(&["training_labels", "neighbor_indices"])
            .outputs(&["neighbor_labels"])
            .attr(int_attr("axis", 0))
            .build(),
        NodeBuilder::new("OneHot", "one_hot")
            .inputs(&["neighbor_labels", "onehot_depth", "onehot_values"])
            .outputs(&["neighbor_votes"])
            .attr(int_attr("axis", -1))
            .build(),
        NodeBuilder::new("ReduceSum", "vote_count")
            .inputs(&["neighbor_votes", "neighbor_axes"])
            .outputs(&["votes"])
            .attr(int_attr("keepdims", 0))
            .build(),
        NodeBuilder::new("Div", "vote_fraction")
            .inputs(&["votes", "k_float"])
            .outputs(&[raw_probabilities])
            .build(),
        NodeBuilder::new("ArgMax", "majority")
            .inputs(&["votes"])
            .outputs(&[label_name])
            .attr(int_attr("axis", 1))
            .attr(int_attr("keepdims", 0))
            .build(),
    ];

    let mut opset_import = vec![OperatorSetIdProto {
        domain: String::new(),
        version: OPSET_VERSION,
    }];

    let input_dims: Vec<Dim> = input_type
        .shape
        .iter()
        .map(|d| match d {
            Some(n) => Dim::Fixed(*n as i64),
            None => Dim::Symbolic("N".to_string()),
        })
        .collect();
    let batch = Dim::Symbolic("N".to_string());

    let label_info = value_info(label_name, tensor_type(DataType::Int64, &[batch.clone()]));
    let probabilities_info = if options.zipmap {
        node.push(
            NodeBuilder::new("ZipMap", "zipmap")
                .domain(ML_DOMAIN)
                .inputs(&[raw_probabilities])
                .outputs(&[probabilities_name])
                .attr(ints_attr(
                    "classlabels_int64s",
                    (0..n_classes as i64).collect(),
                ))
                .build(),
        );
        opset_import.push(OperatorSetIdProto {
            domain: ML_DOMAIN.to_string(),
            version: ML_OPSET_VERSION,
        });
        value_info(
            probabilities_name,
            sequence_of_maps(DataType::Int64, DataType::Float),
        )
    } else {
        value_info(
            probabilities_name,
            tensor_type(DataType::Float, &[batch, Dim::Fixed(n_classes as i64)]),
        )
    };

    let graph = GraphProto {
        name: "knn_classifier".to_string(),
        node,
        initializer,
        input: vec![value_info(
            input_name,
            tensor_type(DataType::Float, &input_dims),
        )],
        output: vec![label_info, probabilities_info],
        ..Default::default()
    };

    debug!(
        k,
        samples = n_samples,
        classes = n_classes,
        zipmap = options.zipmap,
        nodes = graph.node.len(),
        "built knn onnx graph"
    );

    Ok(ModelProto {
        ir_version: IR_VERSION,
        producer_name: env!("CARGO_PKG_NAME").to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        graph: Some(graph),
        opset_import,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_ml::{load_iris, KnnParams};
    use linfa::prelude::*;

    fn fitted(params: KnnParams) -> KnnClassifier {
        params.fit(&load_iris().unwrap().to_linfa()).unwrap()
    }

    fn input() -> Vec<(&'static str, FloatTensorType)> {
        vec![(INPUT_NAME, FloatTensorType::new(vec![None, Some(4)]))]
    }

    fn op_types(model: &ModelProto) -> Vec<String> {
        model
            .graph
            .as_ref()
            .unwrap()
            .node
            .iter()
            .map(|n| n.op_type.clone())
            .collect()
    }

    #[test]
    fn test_raw_tensor_outputs_without_zipmap() {
        let model = fitted(KnnParams::new(3));
        let onnx = convert_knn(&model, &input(), &ConvertOptions { zipmap: false }).unwrap();
        let graph = onnx.graph.as_ref().unwrap();

        assert_eq!(graph.input[0].name, INPUT_NAME);
        let outputs: Vec<_> = graph.output.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(outputs, vec![LABEL_OUTPUT, PROBABILITIES_OUTPUT]);
        assert!(!op_types(&onnx).contains(&"ZipMap".to_string()));
        assert_eq!(onnx.opset_import.len(), 1);
        assert_eq!(onnx.opset_import[0].version, OPSET_VERSION);
    }

    #[test]
    fn test_zipmap_outputs() {
        let model = fitted(KnnParams::new(3));
        let onnx = convert_knn(&model, &input(), &ConvertOptions::default()).unwrap();
        let graph = onnx.graph.as_ref().unwrap();

        let outputs: Vec<_> = graph.output.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            outputs,
            vec![ZIPMAP_LABEL_OUTPUT, ZIPMAP_PROBABILITY_OUTPUT]
        );
        let zipmap = graph.node.iter().find(|n| n.op_type == "ZipMap").unwrap();
        assert_eq!(zipmap.domain, ML_DOMAIN);
        assert_eq!(zipmap.attribute[0].ints, vec![0, 1, 2]);
        assert!(onnx.opset_import.iter().any(|o| o.domain == ML_DOMAIN));
    }

    #[test]
    fn test_initializers_hold_training_data() {
        let model = fitted(KnnParams::new(3));
        let onnx = convert_knn(&model, &input(), &ConvertOptions { zipmap: false }).unwrap();
        let graph = onnx.graph.unwrap();

        let points = graph
            .initializer
            .iter()
            .find(|t| t.name == "training_points")
            .unwrap();
        assert_eq!(points.dims, vec![150, 4]);
        assert_eq!(points.float_data.len(), 600);
        assert_eq!(&points.float_data[..4], &[5.1f32, 3.5, 1.4, 0.2]);

        let k = graph.initializer.iter().find(|t| t.name == "k").unwrap();
        assert_eq!(k.int64_data, vec![3]);
    }

    #[test]
    fn test_rejects_wrong_feature_dimension() {
        let model = fitted(KnnParams::new(3));
        let inputs = vec![(INPUT_NAME, FloatTensorType::new(vec![None, Some(3)]))];
        let err = convert_knn(&model, &inputs, &ConvertOptions::default()).unwrap_err();
        assert!(err.to_string().contains("input shape"), "{err}");
    }

    #[test]
    fn test_rejects_multiple_inputs() {
        let model = fitted(KnnParams::new(3));
        let mut inputs = input();
        inputs.push(("extra", FloatTensorType::new(vec![None, Some(4)])));
        assert!(convert_knn(&model, &inputs, &ConvertOptions::default()).is_err());
    }

    #[test]
    fn test_rejects_k_above_training_size() {
        let model = fitted(KnnParams::new(151));
        let err = convert_knn(&model, &input(), &ConvertOptions::default()).unwrap_err();
        assert!(err.to_string().contains("n_neighbors=151"), "{err}");
    }
}
