//! Unary activations: `Relu`, `Sigmoid`, `Tanh`, `LeakyRelu` and `Elu`.
//!
//! All of them map to one target operation and share a single builder instance.

use oplower_ir::OperatorNode;

use super::{
    BuilderSpec, BuilderType, FLOAT_TYPES, InputParams, InputSpec, OpBuilder, OutputSpec,
    required_input, required_output,
};
use crate::error::BuildError;
use crate::registry::OpBuilderRegistrations;
use crate::target::{ConstValue, ModelBuilder};

const ACTIVATION_BUILDER: BuilderType = BuilderType::new("Activation");

/// Target operation of an activation and its `alpha` default, if it takes one.
fn target_op(op_type: &str) -> Option<(&'static str, Option<f32>)> {
    match op_type {
        "Relu" => Some(("relu", None)),
        "Sigmoid" => Some(("sigmoid", None)),
        "Tanh" => Some(("tanh", None)),
        "LeakyRelu" => Some(("leaky_relu", Some(0.01))),
        "Elu" => Some(("elu", Some(1.0))),
        _ => None,
    }
}

/// Builder for unary activation nodes.
#[derive(Debug, Default)]
pub struct ActivationOpBuilder;

impl OpBuilder for ActivationOpBuilder {
    fn builder_type(&self) -> BuilderType {
        ACTIVATION_BUILDER
    }

    fn spec(&self) -> BuilderSpec {
        BuilderSpec {
            min_opset: 1,
            max_opset: None,
            inputs: InputSpec::Exact(1),
            outputs: OutputSpec::Exact(1),
            input_types: FLOAT_TYPES,
        }
    }

    fn check_node(&self, node: &OperatorNode, _params: &InputParams) -> Result<(), BuildError> {
        let (_, alpha) = target_op(&node.op_type).ok_or_else(|| {
            BuildError::Custom(format!("'{}' is not an activation", node.op_type))
        })?;

        if let Some(default) = alpha {
            node.get_float("alpha", default)?;
        }

        Ok(())
    }

    fn add_to_target(
        &self,
        target: &mut dyn ModelBuilder,
        node: &OperatorNode,
    ) -> Result<(), BuildError> {
        let input = required_input(node, 0, "input")?;
        let output = required_output(node)?;
        let (op_type, alpha) = target_op(&node.op_type).ok_or_else(|| {
            BuildError::Custom(format!("'{}' is not an activation", node.op_type))
        })?;
        let alpha = alpha
            .map(|default| node.get_float("alpha", default))
            .transpose()?;

        let mut op = target.create_operation(node, op_type);
        target.add_operation_input(&mut op, "x", &input.name);
        if let Some(alpha) = alpha {
            target.add_constant_operation_input(&mut op, "alpha", ConstValue::Float(alpha));
        }
        target.add_operation_output(&mut op, output);
        target.add_operation(op);

        Ok(())
    }
}

/// Register [`ActivationOpBuilder`] for `op_type`.
pub fn create_activation_op_builder(op_type: &str, registrations: &mut OpBuilderRegistrations) {
    registrations.add_op_builder(op_type, ACTIVATION_BUILDER, || {
        Box::new(ActivationOpBuilder)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetFormat;
    use crate::target::tests::RecordingModelBuilder;
    use oplower_ir::test_utils::TestNodeBuilder;

    fn node(op_type: &str) -> TestNodeBuilder {
        TestNodeBuilder::new(op_type, "act1")
            .input_tensor_f32("x", 2, None)
            .output_tensor_f32("y", 2, None)
    }

    fn lower(node: &OperatorNode) -> RecordingModelBuilder {
        let mut target = RecordingModelBuilder::new(TargetFormat::Layers);
        ActivationOpBuilder.add_to_target(&mut target, node).unwrap();
        target
    }

    #[test]
    fn plain_activations() {
        for (op_type, expected) in [("Relu", "relu"), ("Sigmoid", "sigmoid"), ("Tanh", "tanh")] {
            let target = lower(&node(op_type).build());

            assert_eq!(target.op_types(), vec![expected]);
            assert!(target.operations[0].input("alpha").is_none());
        }
    }

    #[test]
    fn leaky_relu_defaults_alpha() {
        let target = lower(&node("LeakyRelu").build());

        assert_eq!(
            target.operations[0].constant_input("alpha"),
            Some(&ConstValue::Float(0.01))
        );
    }

    #[test]
    fn elu_forwards_alpha() {
        let target = lower(&node("Elu").attr_float("alpha", 0.5).build());

        assert_eq!(target.op_types(), vec!["elu"]);
        assert_eq!(
            target.operations[0].constant_input("alpha"),
            Some(&ConstValue::Float(0.5))
        );
    }

    #[test]
    fn rejects_unknown_activation() {
        let err = ActivationOpBuilder
            .check_support(&node("Gelu").build(), &InputParams::default())
            .unwrap_err();

        assert_eq!(err, BuildError::Custom("'Gelu' is not an activation".to_string()));
    }

    #[test]
    fn rejects_wrongly_typed_alpha() {
        let node = node("LeakyRelu").attr_int("alpha", 1).build();

        assert!(!ActivationOpBuilder.is_supported(&node, &InputParams::default()));
    }
}
