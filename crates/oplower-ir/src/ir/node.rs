//! Operator node representation
//!
//! An [`OperatorNode`] is one computation step of the source graph. Builders only ever receive a
//! shared reference to it; everything they produce goes into the target model builder.

use super::{Argument, AttributeError, AttributeValue, Attributes};

/// Nodes of the source graph.
#[derive(Debug, Clone, PartialEq, new)]
pub struct OperatorNode {
    /// The operator type, e.g. `Conv` or `Clip`.
    pub op_type: String,

    /// The name of the node.
    pub name: String,

    /// The inputs of the node, in operator order. Omitted optional inputs keep their position.
    pub inputs: Vec<Argument>,

    /// The outputs of the node.
    pub outputs: Vec<Argument>,

    /// Static attributes (opset-specific parameters)
    pub attrs: Attributes,

    /// Operator set version in which the node's operator definition was introduced.
    pub since_version: usize,
}

impl OperatorNode {
    /// Get the input at `index`, skipping omitted optional inputs.
    pub fn input(&self, index: usize) -> Option<&Argument> {
        self.inputs.get(index).filter(|arg| !arg.is_optional())
    }

    /// Get the output at `index`.
    pub fn output(&self, index: usize) -> Option<&Argument> {
        self.outputs.get(index)
    }

    /// Check whether an attribute is set.
    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// Get a raw attribute value.
    pub fn attr(&self, key: &str) -> Option<&AttributeValue> {
        self.attrs.get(key)
    }

    /// Read a float attribute, or `default` when it is absent.
    pub fn get_float(&self, key: &str, default: f32) -> Result<f32, AttributeError> {
        self.typed_attr(key, "float", AttributeValue::as_f32)
            .map(|value| value.unwrap_or(default))
    }

    /// Read a float list attribute, or `default` when it is absent.
    pub fn get_floats(&self, key: &str, default: &[f32]) -> Result<Vec<f32>, AttributeError> {
        self.typed_attr(key, "floats", AttributeValue::as_f32s)
            .map(|value| value.unwrap_or(default).to_vec())
    }

    /// Read an integer attribute, or `default` when it is absent.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, AttributeError> {
        self.typed_attr(key, "int", AttributeValue::as_i64)
            .map(|value| value.unwrap_or(default))
    }

    /// Read an integer list attribute, or `default` when it is absent.
    pub fn get_ints(&self, key: &str, default: &[i64]) -> Result<Vec<i64>, AttributeError> {
        self.typed_attr(key, "ints", AttributeValue::as_i64s)
            .map(|value| value.unwrap_or(default).to_vec())
    }

    /// Read a string attribute, or `default` when it is absent.
    pub fn get_string(&self, key: &str, default: &str) -> Result<String, AttributeError> {
        self.typed_attr(key, "string", AttributeValue::as_str)
            .map(|value| value.unwrap_or(default).to_string())
    }

    fn typed_attr<'a, T>(
        &'a self,
        key: &str,
        expected: &'static str,
        read: impl FnOnce(&'a AttributeValue) -> Option<T>,
    ) -> Result<Option<T>, AttributeError> {
        let Some(value) = self.attrs.get(key) else {
            return Ok(None);
        };

        read(value).map(Some).ok_or_else(|| AttributeError {
            name: key.to_string(),
            expected,
            actual: value.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestNodeBuilder;

    #[test]
    fn getters_fall_back_to_defaults() {
        let node = TestNodeBuilder::new("Conv", "conv1").build();

        assert_eq!(node.get_int("group", 1).unwrap(), 1);
        assert_eq!(node.get_ints("strides", &[1, 1]).unwrap(), vec![1, 1]);
        assert_eq!(node.get_string("auto_pad", "NOTSET").unwrap(), "NOTSET");
        assert_eq!(node.get_float("alpha", 0.01).unwrap(), 0.01);
        assert!(node.get_floats("scales", &[]).unwrap().is_empty());
    }

    #[test]
    fn getters_read_present_attributes() {
        let node = TestNodeBuilder::new("Conv", "conv1")
            .attr_int("group", 2)
            .attr_ints("strides", vec![2, 2])
            .attr_string("auto_pad", "VALID")
            .build();

        assert_eq!(node.get_int("group", 1).unwrap(), 2);
        assert_eq!(node.get_ints("strides", &[1, 1]).unwrap(), vec![2, 2]);
        assert_eq!(node.get_string("auto_pad", "NOTSET").unwrap(), "VALID");
    }

    #[test]
    fn getters_reject_wrong_kind() {
        let node = TestNodeBuilder::new("Clip", "clip1")
            .attr_int("min", 0)
            .build();

        let err = node.get_float("min", f32::MIN).unwrap_err();
        assert_eq!(
            err,
            AttributeError {
                name: "min".to_string(),
                expected: "float",
                actual: "int",
            }
        );
    }

    #[test]
    fn input_skips_omitted_optionals() {
        let node = TestNodeBuilder::new("Clip", "clip1")
            .input_tensor_f32("x", 2, None)
            .input_optional()
            .input_scalar_tensor_f32("max", Some(1.0))
            .build();

        assert!(node.input(0).is_some());
        assert!(node.input(1).is_none());
        assert_eq!(node.input(2).unwrap().name, "max");
        assert!(node.input(3).is_none());
    }
}
