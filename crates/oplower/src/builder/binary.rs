//! Element-wise binary arithmetic: `Add`, `Sub`, `Mul` and `Div`.
//!
//! Operands are bound by name and must share their element type. Broadcasting follows the target.

use oplower_ir::{ElementType, OperatorNode};

use super::{
    BuilderSpec, BuilderType, InputParams, InputSpec, OpBuilder, OutputSpec, required_input,
    required_output,
};
use crate::error::BuildError;
use crate::registry::OpBuilderRegistrations;
use crate::target::ModelBuilder;

const BINARY_BUILDER: BuilderType = BuilderType::new("Binary");

const BINARY_TYPES: &[ElementType] = &[
    ElementType::Float32,
    ElementType::Float16,
    ElementType::Int32,
    ElementType::Int64,
];

fn target_op(op_type: &str) -> Option<&'static str> {
    match op_type {
        "Add" => Some("add"),
        "Sub" => Some("sub"),
        "Mul" => Some("mul"),
        "Div" => Some("real_div"),
        _ => None,
    }
}

/// Builder for element-wise binary nodes.
#[derive(Debug, Default)]
pub struct BinaryOpBuilder;

impl OpBuilder for BinaryOpBuilder {
    fn builder_type(&self) -> BuilderType {
        BINARY_BUILDER
    }

    fn spec(&self) -> BuilderSpec {
        BuilderSpec {
            min_opset: 7,
            max_opset: None,
            inputs: InputSpec::Exact(2),
            outputs: OutputSpec::Exact(1),
            input_types: BINARY_TYPES,
        }
    }

    fn check_node(&self, node: &OperatorNode, _params: &InputParams) -> Result<(), BuildError> {
        if target_op(&node.op_type).is_none() {
            return Err(BuildError::Custom(format!(
                "'{}' is not a binary operator",
                node.op_type
            )));
        }

        let lhs = required_input(node, 0, "A")?;
        let rhs = required_input(node, 1, "B")?;
        if lhs.elem_type() != rhs.elem_type() {
            return Err(BuildError::TypeMismatch {
                expected: lhs.elem_type(),
                actual: rhs.elem_type(),
            });
        }

        Ok(())
    }

    fn add_to_target(
        &self,
        target: &mut dyn ModelBuilder,
        node: &OperatorNode,
    ) -> Result<(), BuildError> {
        let op_type = target_op(&node.op_type).ok_or_else(|| {
            BuildError::Custom(format!("'{}' is not a binary operator", node.op_type))
        })?;
        let lhs = required_input(node, 0, "A")?;
        let rhs = required_input(node, 1, "B")?;
        let output = required_output(node)?;

        let mut op = target.create_operation(node, op_type);
        target.add_operation_input(&mut op, "x", &lhs.name);
        target.add_operation_input(&mut op, "y", &rhs.name);
        target.add_operation_output(&mut op, output);
        target.add_operation(op);

        Ok(())
    }
}

/// Register [`BinaryOpBuilder`] for `op_type`.
pub fn create_binary_op_builder(op_type: &str, registrations: &mut OpBuilderRegistrations) {
    registrations.add_op_builder(op_type, BINARY_BUILDER, || Box::new(BinaryOpBuilder));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetFormat;
    use crate::target::tests::RecordingModelBuilder;
    use oplower_ir::test_utils::TestNodeBuilder;

    fn node(op_type: &str, rhs: ElementType) -> OperatorNode {
        TestNodeBuilder::new(op_type, "bin1")
            .input_tensor_f32("a", 2, None)
            .input_tensor("b", 2, rhs, None)
            .output_tensor_f32("c", 2, None)
            .build()
    }

    #[test]
    fn lowers_operands_by_name() {
        let node = node("Div", ElementType::Float32);
        let mut target = RecordingModelBuilder::new(TargetFormat::Layers);

        BinaryOpBuilder
            .check_support(&node, &InputParams::default())
            .unwrap();
        BinaryOpBuilder.add_to_target(&mut target, &node).unwrap();

        let op = &target.operations[0];
        assert_eq!(op.op_type, "real_div");
        assert_eq!(op.tensor_input("x"), Some("a"));
        assert_eq!(op.tensor_input("y"), Some("b"));
        assert_eq!(op.output_names(), vec!["c"]);
    }

    #[test]
    fn rejects_mixed_operand_types() {
        let err = BinaryOpBuilder
            .check_support(&node("Add", ElementType::Int64), &InputParams::default())
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::TypeMismatch {
                expected: ElementType::Float32,
                actual: ElementType::Int64,
            }
        );
    }

    #[test]
    fn rejects_unknown_operator() {
        assert!(
            !BinaryOpBuilder.is_supported(&node("Pow", ElementType::Float32), &InputParams::default())
        );
    }
}
