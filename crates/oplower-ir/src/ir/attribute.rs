//! Node attribute values
//!
//! This module contains the AttributeValue enum which represents the static parameters attached
//! to operator nodes (e.g. `min`/`max` of Clip before opset 11, `strides` of Conv).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::TensorData;

/// The type of an attribute.
///
/// In a graph description attributes are written as single-key objects, e.g.
/// `{ "float": 0.5 }` or `{ "ints": [1, 1] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum AttributeValue {
    #[serde(rename = "float")]
    Float32(f32),
    #[serde(rename = "floats")]
    Float32s(Vec<f32>),
    #[serde(rename = "int")]
    Int64(i64),
    #[serde(rename = "ints")]
    Int64s(Vec<i64>),
    String(String),
    Strings(Vec<String>),
    Tensor(TensorData),
}

/// Attributes of a node, keyed by name.
pub type Attributes = HashMap<String, AttributeValue>;

/// Error raised when an attribute is present with an unexpected type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Attribute '{name}' has type {actual}, expected {expected}")]
pub struct AttributeError {
    /// Attribute name.
    pub name: String,
    /// Expected attribute kind.
    pub expected: &'static str,
    /// Kind found on the node.
    pub actual: &'static str,
}

impl AttributeValue {
    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Float32(_) => "float",
            AttributeValue::Float32s(_) => "floats",
            AttributeValue::Int64(_) => "int",
            AttributeValue::Int64s(_) => "ints",
            AttributeValue::String(_) => "string",
            AttributeValue::Strings(_) => "strings",
            AttributeValue::Tensor(_) => "tensor",
        }
    }

    pub(crate) fn as_f32(&self) -> Option<f32> {
        match self {
            AttributeValue::Float32(elem) => Some(*elem),
            _ => None,
        }
    }

    pub(crate) fn as_f32s(&self) -> Option<&[f32]> {
        match self {
            AttributeValue::Float32s(elem) => Some(elem),
            _ => None,
        }
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int64(elem) => Some(*elem),
            _ => None,
        }
    }

    pub(crate) fn as_i64s(&self) -> Option<&[i64]> {
        match self {
            AttributeValue::Int64s(elem) => Some(elem),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(elem) => Some(elem),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_single_key_objects() {
        let attrs: Attributes = serde_json::from_str(
            r#"{
                "min": { "float": -1.5 },
                "group": { "int": 2 },
                "pads": { "ints": [0, 1, 0, 1] },
                "auto_pad": { "string": "VALID" }
            }"#,
        )
        .unwrap();

        assert_eq!(attrs["min"], AttributeValue::Float32(-1.5));
        assert_eq!(attrs["group"], AttributeValue::Int64(2));
        assert_eq!(attrs["pads"], AttributeValue::Int64s(vec![0, 1, 0, 1]));
        assert_eq!(attrs["auto_pad"].as_str(), Some("VALID"));
    }

    #[test]
    fn accessors_reject_other_kinds() {
        let value = AttributeValue::Int64(3);
        assert_eq!(value.as_i64(), Some(3));
        assert_eq!(value.as_f32(), None);
        assert_eq!(value.kind(), "int");
    }
}
