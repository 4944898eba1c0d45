use std::{fmt, sync::Arc};

use oplower_ir::{Argument, ElementType, TensorData};
use serde::Serialize;

/// Constant value bound to an operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ConstValue {
    Float(f32),
    Floats(Vec<f32>),
    Int(i64),
    Ints(Vec<i64>),
    String(String),
    Bool(bool),
    Tensor(Arc<TensorData>),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Float(value) => write!(f, "{value}"),
            ConstValue::Floats(values) => write_list(f, values.as_slice()),
            ConstValue::Int(value) => write!(f, "{value}"),
            ConstValue::Ints(values) => write_list(f, values.as_slice()),
            ConstValue::String(value) => write!(f, "{value:?}"),
            ConstValue::Bool(value) => write!(f, "{value}"),
            ConstValue::Tensor(data) => {
                write!(f, "tensor<{}", data.elem_type())?;
                write_list(f, data.shape())?;
                f.write_str(">")
            }
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    f.write_str("]")
}

/// What an operation parameter is bound to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBinding {
    /// A tensor of the model.
    Tensor(String),
    /// A named constant.
    Constant {
        /// Name of the constant in the model.
        name: String,
        /// The value.
        value: ConstValue,
    },
}

/// A parameter binding of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct OperationInput {
    /// Parameter name, e.g. `x` or `alpha`.
    pub param: String,
    /// What the parameter is bound to.
    #[serde(flatten)]
    pub binding: InputBinding,
}

/// Name and type of a tensor produced or consumed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorSpec {
    /// Tensor name.
    pub name: String,
    /// Element type.
    pub elem_type: ElementType,
    /// Rank of the tensor.
    pub rank: usize,
    /// Static shape, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
}

impl From<&Argument> for TensorSpec {
    fn from(arg: &Argument) -> Self {
        Self {
            name: arg.name.clone(),
            elem_type: arg.elem_type(),
            rank: arg.rank(),
            shape: arg.ty.static_shape().map(<[usize]>::to_vec),
        }
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}[", self.name, self.elem_type)?;
        for i in 0..self.rank {
            if i > 0 {
                f.write_str(", ")?;
            }
            match self.shape.as_ref().and_then(|shape| shape.get(i)) {
                Some(dim) => write!(f, "{dim}")?,
                None => f.write_str("?")?,
            }
        }
        f.write_str("]")
    }
}

/// One operation of the target model.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct Operation {
    /// Kind of the operation, e.g. `relu` or `threshold`.
    pub op_type: String,
    /// Unique name of the operation.
    pub name: String,
    /// Parameter bindings, in the order they were added.
    #[new(default)]
    pub inputs: Vec<OperationInput>,
    /// Produced tensors.
    #[new(default)]
    pub outputs: Vec<TensorSpec>,
}

impl Operation {
    /// Bind `param`, replacing an earlier binding of the same parameter.
    pub fn bind(&mut self, param: &str, binding: InputBinding) {
        match self.inputs.iter_mut().find(|input| input.param == param) {
            Some(input) => input.binding = binding,
            None => self
                .inputs
                .push(OperationInput::new(param.to_string(), binding)),
        }
    }

    /// Get the binding of `param`.
    pub fn input(&self, param: &str) -> Option<&InputBinding> {
        self.inputs
            .iter()
            .find(|input| input.param == param)
            .map(|input| &input.binding)
    }

    /// Name of the tensor bound to `param`, if it is bound to a tensor.
    pub fn tensor_input(&self, param: &str) -> Option<&str> {
        match self.input(param)? {
            InputBinding::Tensor(name) => Some(name),
            InputBinding::Constant { .. } => None,
        }
    }

    /// Value bound to `param`, if it is bound to a constant.
    pub fn constant_input(&self, param: &str) -> Option<&ConstValue> {
        match self.input(param)? {
            InputBinding::Constant { value, .. } => Some(value),
            InputBinding::Tensor(_) => None,
        }
    }

    /// Names of the produced tensors.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|output| output.name.as_str()).collect()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, output) in self.outputs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{output}")?;
        }
        write!(f, " = {}(", self.op_type)?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match &input.binding {
                InputBinding::Tensor(name) => write!(f, "{}={name}", input.param)?,
                InputBinding::Constant { value, .. } => write!(f, "{}={value}", input.param)?,
            }
        }
        write!(f, ") [{}]", self.name)
    }
}
