mod argument;
mod attribute;
mod node;
mod tensor_data;

pub use argument::*;
pub use attribute::*;
pub use node::*;
pub use tensor_data::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The type of an element.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// 16-bit floating point.
    Float16,
    /// 32-bit floating point.
    #[default]
    Float32,
    /// 64-bit floating point.
    Float64,
    /// 8-bit signed integer.
    Int8,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 8-bit unsigned integer.
    Uint8,
    /// Boolean.
    Bool,
}

impl ElementType {
    /// Returns true for floating point element types.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Returns true for signed and unsigned integer element types.
    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int32 | Self::Int64 | Self::Uint8)
    }

    /// Returns true for the boolean element type.
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }
}

/// Represents the type of a tensor.
#[derive(Debug, Clone, Default, PartialEq, Eq, new)]
pub struct TensorType {
    /// The element type of the tensor values (e.g. Float32, Int64, etc.)
    pub elem_type: ElementType,

    /// The number of dimensions in the tensor
    pub rank: usize,

    /// Static shape if known
    pub static_shape: Option<Vec<usize>>,
}

/// The type of an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// A single value.
    Scalar(ElementType),
    /// A tensor.
    Tensor(TensorType),
}

impl Default for ArgType {
    fn default() -> Self {
        Self::Tensor(TensorType::default())
    }
}

impl ArgType {
    /// Check if this is a scalar type
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Check if this is a tensor type
    pub fn is_tensor(&self) -> bool {
        matches!(self, Self::Tensor(_))
    }

    /// Get the rank (number of dimensions)
    pub fn rank(&self) -> usize {
        match self {
            ArgType::Scalar(_) => 0,
            ArgType::Tensor(t) => t.rank,
        }
    }

    /// Get the element type
    pub fn elem_type(&self) -> ElementType {
        match self {
            ArgType::Scalar(elem_type) => *elem_type,
            ArgType::Tensor(t) => t.elem_type,
        }
    }

    /// Get the static shape if available
    pub fn static_shape(&self) -> Option<&[usize]> {
        match self {
            ArgType::Tensor(t) => t.static_shape.as_deref(),
            ArgType::Scalar(_) => None,
        }
    }
}
