use std::sync::Arc;

use crate::ir::{
    ArgType, Argument, AttributeValue, Attributes, ElementType, OperatorNode, TensorData,
    TensorType,
};

/// Builder for creating test node instances with convenient defaults.
///
/// ```ignore
/// let node = TestNodeBuilder::new("Clip", "clip1")
///     .input_tensor_f32("X", 4, None)
///     .attr_float("min", 0.0)
///     .output_tensor_f32("Y", 4, None)
///     .build();
/// ```
#[derive(Debug)]
pub struct TestNodeBuilder {
    op_type: String,
    name: String,
    inputs: Vec<Argument>,
    outputs: Vec<Argument>,
    attrs: Attributes,
    since_version: usize,
}

impl TestNodeBuilder {
    /// Create a new builder. The since-version defaults to 13.
    pub fn new(op_type: &str, name: &str) -> Self {
        Self {
            op_type: op_type.to_string(),
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attrs: Attributes::new(),
            since_version: 13,
        }
    }

    /// Set the since-version of the node.
    pub fn since_version(mut self, since_version: usize) -> Self {
        self.since_version = since_version;
        self
    }

    /// Add a dynamic tensor input.
    pub fn input_tensor(
        mut self,
        name: &str,
        rank: usize,
        elem_type: ElementType,
        static_shape: Option<Vec<usize>>,
    ) -> Self {
        self.inputs.push(Argument::tensor(
            name,
            TensorType::new(elem_type, rank, static_shape),
        ));
        self
    }

    /// Add a dynamic float32 tensor input.
    pub fn input_tensor_f32(self, name: &str, rank: usize, static_shape: Option<Vec<usize>>) -> Self {
        self.input_tensor(name, rank, ElementType::Float32, static_shape)
    }

    /// Add a dynamic scalar input.
    pub fn input_scalar(mut self, name: &str, elem_type: ElementType) -> Self {
        self.inputs
            .push(Argument::new(name).with_type(ArgType::Scalar(elem_type)));
        self
    }

    /// Add a rank 0 float32 tensor input.
    ///
    /// With a value the input is a constant initializer, without one it is a runtime input.
    pub fn input_scalar_tensor_f32(self, name: &str, value: Option<f32>) -> Self {
        match value {
            Some(value) => self.input_constant(name, scalar_f32(value)),
            None => self.input_tensor_f32(name, 0, None),
        }
    }

    /// Add a constant initializer input.
    pub fn input_constant(mut self, name: &str, data: TensorData) -> Self {
        self.inputs.push(Argument::constant(name, Arc::new(data)));
        self
    }

    /// Add an omitted optional input, keeping the positions of the following inputs.
    pub fn input_optional(mut self) -> Self {
        self.inputs.push(Argument::optional());
        self
    }

    /// Add a tensor output.
    pub fn output_tensor(
        mut self,
        name: &str,
        rank: usize,
        elem_type: ElementType,
        static_shape: Option<Vec<usize>>,
    ) -> Self {
        self.outputs.push(Argument::tensor(
            name,
            TensorType::new(elem_type, rank, static_shape),
        ));
        self
    }

    /// Add a float32 tensor output.
    pub fn output_tensor_f32(self, name: &str, rank: usize, static_shape: Option<Vec<usize>>) -> Self {
        self.output_tensor(name, rank, ElementType::Float32, static_shape)
    }

    /// Add a float attribute.
    pub fn attr_float(self, name: &str, value: f32) -> Self {
        self.attr(name, AttributeValue::Float32(value))
    }

    /// Add a float list attribute.
    pub fn attr_floats(self, name: &str, value: Vec<f32>) -> Self {
        self.attr(name, AttributeValue::Float32s(value))
    }

    /// Add an integer attribute.
    pub fn attr_int(self, name: &str, value: i64) -> Self {
        self.attr(name, AttributeValue::Int64(value))
    }

    /// Add an integer list attribute.
    pub fn attr_ints(self, name: &str, value: Vec<i64>) -> Self {
        self.attr(name, AttributeValue::Int64s(value))
    }

    /// Add a string attribute.
    pub fn attr_string(self, name: &str, value: &str) -> Self {
        self.attr(name, AttributeValue::String(value.to_string()))
    }

    fn attr(mut self, name: &str, value: AttributeValue) -> Self {
        self.attrs.insert(name.to_string(), value);
        self
    }

    /// Build the node.
    pub fn build(self) -> OperatorNode {
        OperatorNode::new(
            self.op_type,
            self.name,
            self.inputs,
            self.outputs,
            self.attrs,
            self.since_version,
        )
    }
}

/// Rank 0 float32 tensor data.
pub fn scalar_f32(value: f32) -> TensorData {
    TensorData::scalar(vec![value]).expect("one value fits a scalar")
}
