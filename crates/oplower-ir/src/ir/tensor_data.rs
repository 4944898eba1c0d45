//! Constant tensor values
//!
//! Initializers and constant-folded inputs carry their values as [`TensorData`]. The values keep
//! their original element type; helpers convert them when a builder needs a scalar or a flat
//! `f32`/`i64` list.

use half::f16;
use serde::{Deserialize, Serialize};

use super::ElementType;

/// Error raised when tensor data cannot be read as requested.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// The tensor has no element to read.
    #[error("Tensor has no elements")]
    Empty,

    /// The element type cannot be converted to the requested type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// The number of values does not match the shape.
    #[error("Shape {shape:?} expects {expected} values, got {actual}")]
    ShapeMismatch {
        /// The declared shape.
        shape: Vec<usize>,
        /// Number of values implied by the shape.
        expected: usize,
        /// Number of values provided.
        actual: usize,
    },

    /// The number of elements implied by the shape does not fit in `usize`.
    #[error("Shape {0:?} has too many elements")]
    ShapeOverflow(Vec<usize>),
}

/// Typed storage of tensor values.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum TensorValues {
    Float16(Vec<f16>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Bool(Vec<bool>),
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for TensorValues {
                fn from(values: Vec<$ty>) -> Self {
                    TensorValues::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec! {
    f16 => Float16,
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    bool => Bool,
}

impl TensorValues {
    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            TensorValues::Float16(v) => v.len(),
            TensorValues::Float32(v) => v.len(),
            TensorValues::Float64(v) => v.len(),
            TensorValues::Int8(v) => v.len(),
            TensorValues::Int32(v) => v.len(),
            TensorValues::Int64(v) => v.len(),
            TensorValues::Uint8(v) => v.len(),
            TensorValues::Bool(v) => v.len(),
        }
    }

    /// True when no value is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the stored values.
    pub fn elem_type(&self) -> ElementType {
        match self {
            TensorValues::Float16(_) => ElementType::Float16,
            TensorValues::Float32(_) => ElementType::Float32,
            TensorValues::Float64(_) => ElementType::Float64,
            TensorValues::Int8(_) => ElementType::Int8,
            TensorValues::Int32(_) => ElementType::Int32,
            TensorValues::Int64(_) => ElementType::Int64,
            TensorValues::Uint8(_) => ElementType::Uint8,
            TensorValues::Bool(_) => ElementType::Bool,
        }
    }

    /// Converts every value to `f64`. Booleans map to `0.0`/`1.0`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            TensorValues::Float16(v) => v.iter().map(|x| f64::from(*x)).collect(),
            TensorValues::Float32(v) => v.iter().map(|x| *x as f64).collect(),
            TensorValues::Float64(v) => v.clone(),
            TensorValues::Int8(v) => v.iter().map(|x| *x as f64).collect(),
            TensorValues::Int32(v) => v.iter().map(|x| *x as f64).collect(),
            TensorValues::Int64(v) => v.iter().map(|x| *x as f64).collect(),
            TensorValues::Uint8(v) => v.iter().map(|x| *x as f64).collect(),
            TensorValues::Bool(v) => v.iter().map(|x| if *x { 1.0 } else { 0.0 }).collect(),
        }
    }

    fn from_f64s(elem_type: ElementType, values: Vec<f64>) -> Self {
        match elem_type {
            ElementType::Float16 => values.into_iter().map(f16::from_f64).collect::<Vec<_>>().into(),
            ElementType::Float32 => values.into_iter().map(|v| v as f32).collect::<Vec<_>>().into(),
            ElementType::Float64 => values.into(),
            ElementType::Int8 => values.into_iter().map(|v| v as i8).collect::<Vec<_>>().into(),
            ElementType::Int32 => values.into_iter().map(|v| v as i32).collect::<Vec<_>>().into(),
            ElementType::Int64 => values.into_iter().map(|v| v as i64).collect::<Vec<_>>().into(),
            ElementType::Uint8 => values.into_iter().map(|v| v as u8).collect::<Vec<_>>().into(),
            ElementType::Bool => values.into_iter().map(|v| v != 0.0).collect::<Vec<_>>().into(),
        }
    }
}

/// Representation of a constant tensor with data and shape information.
///
/// Serialized as `{ "elem_type": ..., "shape": [...], "values": [...] }` where the values are
/// written as numbers regardless of the element type. Integers above 2^53 lose precision in that
/// form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorDataRepr", into = "TensorDataRepr")]
pub struct TensorData {
    shape: Vec<usize>,
    values: TensorValues,
}

#[derive(Serialize, Deserialize)]
struct TensorDataRepr {
    elem_type: ElementType,
    #[serde(default)]
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl TryFrom<TensorDataRepr> for TensorData {
    type Error = DataError;

    fn try_from(repr: TensorDataRepr) -> Result<Self, Self::Error> {
        TensorData::new(TensorValues::from_f64s(repr.elem_type, repr.values), repr.shape)
    }
}

impl From<TensorData> for TensorDataRepr {
    fn from(data: TensorData) -> Self {
        Self {
            elem_type: data.elem_type(),
            values: data.values.to_f64_vec(),
            shape: data.shape,
        }
    }
}

impl TensorData {
    /// Create new tensor data, checking that the number of values matches the shape.
    ///
    /// An empty shape describes a scalar and expects exactly one value.
    pub fn new<V: Into<TensorValues>>(values: V, shape: Vec<usize>) -> Result<Self, DataError> {
        let values = values.into();
        let expected = shape
            .iter()
            .try_fold(1usize, |count, &dim| count.checked_mul(dim))
            .ok_or_else(|| DataError::ShapeOverflow(shape.clone()))?;

        if values.len() != expected {
            return Err(DataError::ShapeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }

        Ok(Self { shape, values })
    }

    /// Create a rank 0 tensor holding one value.
    pub fn scalar<V: Into<TensorValues>>(value: V) -> Result<Self, DataError> {
        Self::new(value, Vec::new())
    }

    /// Get the shape
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of stored values.
    pub fn num_elements(&self) -> usize {
        self.values.len()
    }

    /// The element type of the tensor.
    pub fn elem_type(&self) -> ElementType {
        self.values.elem_type()
    }

    /// Borrow the typed values.
    pub fn values(&self) -> &TensorValues {
        &self.values
    }

    /// Extract the first element as f64, converting from any numeric type
    ///
    /// Useful for extracting scalar parameters from constant inputs.
    pub fn scalar_f64(&self) -> Result<f64, DataError> {
        let value = match &self.values {
            TensorValues::Float16(v) => v.first().map(|x| f64::from(*x)),
            TensorValues::Float32(v) => v.first().map(|x| *x as f64),
            TensorValues::Float64(v) => v.first().copied(),
            TensorValues::Int8(v) => v.first().map(|x| *x as f64),
            TensorValues::Int32(v) => v.first().map(|x| *x as f64),
            TensorValues::Int64(v) => v.first().map(|x| *x as f64),
            TensorValues::Uint8(v) => v.first().map(|x| *x as f64),
            TensorValues::Bool(_) => {
                return Err(DataError::TypeMismatch(
                    "Cannot convert Bool to f64".to_string(),
                ));
            }
        };

        value.ok_or(DataError::Empty)
    }

    /// Extract the first element as f32, converting from any numeric type
    pub fn scalar_f32(&self) -> Result<f32, DataError> {
        self.scalar_f64().map(|v| v as f32)
    }

    /// Convert to `Vec<f32>`, handling all numeric types with automatic conversion
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, DataError> {
        match &self.values {
            TensorValues::Float32(v) => Ok(v.clone()),
            TensorValues::Bool(_) => Err(DataError::TypeMismatch(
                "Cannot convert Bool to Vec<f32>".to_string(),
            )),
            other => Ok(other.to_f64_vec().into_iter().map(|v| v as f32).collect()),
        }
    }

    /// Convert to `Vec<i64>`, handling integer types
    ///
    /// Useful for extracting indices, shapes, or other integer arrays that need to be i64.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>, DataError> {
        match &self.values {
            TensorValues::Int64(v) => Ok(v.clone()),
            TensorValues::Int32(v) => Ok(v.iter().map(|x| *x as i64).collect()),
            TensorValues::Int8(v) => Ok(v.iter().map(|x| *x as i64).collect()),
            TensorValues::Uint8(v) => Ok(v.iter().map(|x| *x as i64).collect()),
            other => Err(DataError::TypeMismatch(format!(
                "Cannot convert {} to Vec<i64>",
                other.elem_type()
            ))),
        }
    }
}
