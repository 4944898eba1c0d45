#![warn(missing_docs)]

//! `oplower-ir` holds the operator graph representation consumed by the `oplower` builders.
//!
//! A graph is a list of [`OperatorNode`]s in declaration order. Every node input and output is an
//! [`Argument`] carrying its type and, for constant initializers, its materialized
//! [`TensorData`]. Graphs are usually loaded from a JSON description with
//! [`OperatorGraph::load`].

#[macro_use]
extern crate derive_new;

/// The intermediate representation types.
pub mod ir;

mod graph;

/// Helpers to build nodes in tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use graph::*;
pub use ir::{
    ArgType, Argument, AttributeError, AttributeValue, Attributes, DataError, ElementType,
    OperatorNode, TensorData, TensorType, TensorValues, ValueSource,
};
