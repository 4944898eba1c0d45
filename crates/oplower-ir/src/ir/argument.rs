use std::sync::Arc;

use super::{ArgType, ElementType, TensorData, TensorType};

/// Describes where an argument's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Points to a graph input or a runtime node output
    Dynamic,
    /// Points to an initializer whose value is known when lowering
    Constant,
    /// Optional input that was not provided (empty name)
    Optional,
}

/// A node input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// The name of the tensor.
    pub name: String,

    /// The type of the argument.
    pub ty: ArgType,

    /// Describes where this argument's value comes from
    pub value_source: ValueSource,

    value: Option<Arc<TensorData>>,
}

impl Argument {
    /// Create a dynamic argument with the default type.
    ///
    /// An empty name yields an omitted optional argument.
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        let value_source = if name.is_empty() {
            ValueSource::Optional
        } else {
            ValueSource::Dynamic
        };

        Self {
            name,
            ty: ArgType::default(),
            value_source,
            value: None,
        }
    }

    /// Create a dynamic tensor argument.
    pub fn tensor<S: Into<String>>(name: S, ty: TensorType) -> Self {
        Self::new(name).with_type(ArgType::Tensor(ty))
    }

    /// Create an argument referring to a constant initializer. The type is taken from the data.
    pub fn constant<S: Into<String>>(name: S, data: impl Into<Arc<TensorData>>) -> Self {
        let data = data.into();
        let ty = ArgType::Tensor(TensorType::new(
            data.elem_type(),
            data.rank(),
            Some(data.shape().to_vec()),
        ));

        Self {
            name: name.into(),
            ty,
            value_source: ValueSource::Constant,
            value: Some(data),
        }
    }

    /// An omitted optional input.
    pub fn optional() -> Self {
        Self::new("")
    }

    /// Replace the type of the argument.
    pub fn with_type(mut self, ty: ArgType) -> Self {
        self.ty = ty;
        self
    }

    /// Same argument under another tensor name.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Get the constant value, if this argument refers to an initializer.
    pub fn value(&self) -> Option<&TensorData> {
        self.value.as_deref()
    }

    /// Shared handle on the constant value.
    pub fn shared_value(&self) -> Option<Arc<TensorData>> {
        self.value.clone()
    }

    /// Check if this argument points to a constant initializer
    pub fn is_constant(&self) -> bool {
        self.value_source == ValueSource::Constant
    }

    /// Check if this argument points to a runtime value
    pub fn is_dynamic(&self) -> bool {
        self.value_source == ValueSource::Dynamic
    }

    /// Check if this argument is optional/not provided
    pub fn is_optional(&self) -> bool {
        self.value_source == ValueSource::Optional
    }

    /// Element type of the argument.
    pub fn elem_type(&self) -> ElementType {
        self.ty.elem_type()
    }

    /// Rank of the argument.
    pub fn rank(&self) -> usize {
        self.ty.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_optional() {
        assert!(Argument::new("").is_optional());
        assert!(Argument::optional().is_optional());
        assert!(Argument::new("x").is_dynamic());
    }

    #[test]
    fn constant_takes_type_from_data() {
        let data = TensorData::new(vec![1i64, 2, 3, 4], vec![2, 2]).unwrap();
        let arg = Argument::constant("w", data);

        assert!(arg.is_constant());
        assert_eq!(arg.elem_type(), ElementType::Int64);
        assert_eq!(arg.rank(), 2);
        assert_eq!(arg.ty.static_shape(), Some(&[2, 2][..]));
        assert_eq!(arg.value().unwrap().num_elements(), 4);
    }
}
