//! Target side of the lowering.
//!
//! Builders never produce output directly. They describe operations through the
//! [`ModelBuilder`] trait, which owns naming, constants and the list of initializers the target
//! does not need to materialize.

mod operation;
mod program;

pub use operation::*;
pub use program::*;

use oplower_ir::{Argument, OperatorNode};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Flavour of the target model.
///
/// `Layers` targets only offer a fixed set of layer kinds, so some operators are decomposed and
/// constant inputs are folded into layer parameters. `Program` targets accept named constants and
/// a wider operation set.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    /// Layer based target without a native two sided clip.
    #[default]
    Layers,
    /// Program based target with named constants.
    Program,
}

/// Collaborator receiving the operations produced by builders.
pub trait ModelBuilder {
    /// Format of the model being built.
    fn format(&self) -> TargetFormat;

    /// Start a new operation for `node`. The operation name is unique in the model.
    fn create_operation(&mut self, node: &OperatorNode, op_type: &str) -> Operation;

    /// Bind the parameter `param` of `op` to the tensor `tensor`.
    fn add_operation_input(&mut self, op: &mut Operation, param: &str, tensor: &str);

    /// Append `output` to the outputs of `op`.
    fn add_operation_output(&mut self, op: &mut Operation, output: &Argument);

    /// Bind the parameter `param` of `op` to a constant value.
    fn add_constant_operation_input(&mut self, op: &mut Operation, param: &str, value: ConstValue);

    /// Append a finished operation to the model.
    fn add_operation(&mut self, op: Operation);

    /// Get a tensor name derived from `base` that is not used anywhere in the model yet.
    fn get_unique_name(&mut self, base: &str) -> String;

    /// Mark an initializer as not needed in the final model.
    fn add_initializer_to_skip(&mut self, name: &str);
}
