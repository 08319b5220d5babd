//! Small constructors for ONNX graph pieces

use super::proto::{
    attribute_proto::AttributeType, tensor_proto::DataType, tensor_shape_proto, type_proto,
    AttributeProto, NodeProto, TensorProto, TensorShapeProto, TypeProto, ValueInfoProto,
};

/// One tensor dimension: fixed size or symbolic (`None` in the declared input shape)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dim {
    Fixed(i64),
    Symbolic(String),
}

pub fn float_tensor(name: &str, dims: &[i64], data: Vec<f32>) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims: dims.to_vec(),
        data_type: DataType::Float as i32,
        float_data: data,
        ..Default::default()
    }
}

pub fn int64_tensor(name: &str, dims: &[i64], data: Vec<i64>) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims: dims.to_vec(),
        data_type: DataType::Int64 as i32,
        int64_data: data,
        ..Default::default()
    }
}

pub fn tensor_type(elem_type: DataType, dims: &[Dim]) -> TypeProto {
    let dim = dims
        .iter()
        .map(|d| tensor_shape_proto::Dimension {
            value: Some(match d {
                Dim::Fixed(n) => tensor_shape_proto::dimension::Value::DimValue(*n),
                Dim::Symbolic(s) => tensor_shape_proto::dimension::Value::DimParam(s.clone()),
            }),
            ..Default::default()
        })
        .collect();

    TypeProto {
        value: Some(type_proto::Value::TensorType(type_proto::Tensor {
            elem_type: elem_type as i32,
            shape: Some(TensorShapeProto { dim }),
        })),
        ..Default::default()
    }
}

/// `seq(map(key_type, value_type))`, the ZipMap output type
pub fn sequence_of_maps(key_type: DataType, value_type: DataType) -> TypeProto {
    let value = TypeProto {
        value: Some(type_proto::Value::TensorType(type_proto::Tensor {
            elem_type: value_type as i32,
            shape: None,
        })),
        ..Default::default()
    };
    let map = TypeProto {
        value: Some(type_proto::Value::MapType(type_proto::Map {
            key_type: key_type as i32,
            value_type: Some(Box::new(value)),
        })),
        ..Default::default()
    };
    TypeProto {
        value: Some(type_proto::Value::SequenceType(type_proto::Sequence {
            elem_type: Some(Box::new(map)),
        })),
        ..Default::default()
    }
}

pub fn value_info(name: &str, r#type: TypeProto) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(r#type),
        ..Default::default()
    }
}

pub fn int_attr(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        i: value,
        r#type: AttributeType::Int as i32,
        ..Default::default()
    }
}

pub fn ints_attr(name: &str, values: Vec<i64>) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        ints: values,
        r#type: AttributeType::Ints as i32,
        ..Default::default()
    }
}

/// Builder for a single node. Node names must be unique within a graph.
pub struct NodeBuilder {
    node: NodeProto,
}

impl NodeBuilder {
    pub fn new(op_type: &str, name: &str) -> Self {
        Self {
            node: NodeProto {
                op_type: op_type.to_string(),
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.node.domain = domain.to_string();
        self
    }

    pub fn inputs(mut self, inputs: &[&str]) -> Self {
        self.node.input = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn outputs(mut self, outputs: &[&str]) -> Self {
        self.node.output = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn attr(mut self, attribute: AttributeProto) -> Self {
        self.node.attribute.push(attribute);
        self
    }

    pub fn build(self) -> NodeProto {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_type_dims() {
        let ty = tensor_type(DataType::Float, &[Dim::Symbolic("N".into()), Dim::Fixed(4)]);
        let Some(type_proto::Value::TensorType(tensor)) = ty.value else {
            panic!("expected tensor type");
        };
        assert_eq!(tensor.elem_type, DataType::Float as i32);
        let dims = tensor.shape.unwrap().dim;
        assert_eq!(dims.len(), 2);
        assert_eq!(
            dims[1].value,
            Some(tensor_shape_proto::dimension::Value::DimValue(4))
        );
    }

    #[test]
    fn test_node_builder() {
        let node = NodeBuilder::new("TopK", "topk")
            .inputs(&["x", "k"])
            .outputs(&["values", "indices"])
            .attr(int_attr("largest", 0))
            .build();
        assert_eq!(node.op_type, "TopK");
        assert_eq!(node.input, vec!["x", "k"]);
        assert_eq!(node.attribute[0].r#type, AttributeType::Int as i32);
        assert!(node.domain.is_empty());
    }
}
