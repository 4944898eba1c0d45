//! # Conv
//!
//! 2-D convolution of an `NCHW` input with an `[M, C/group, kH, kW]` weight and an optional `[M]`
//! bias.
//!
//! Layer targets embed the weight and bias in the operation, so both must be constant and are
//! reported as skippable. Program targets bind them by name.

use std::collections::BTreeSet;

use oplower_ir::{Argument, OperatorNode};
use strum::EnumString;

use super::{
    BuilderSpec, BuilderType, FLOAT_TYPES, InputParams, InputSpec, OpBuilder, OutputSpec,
    required_input, required_output,
};
use crate::error::BuildError;
use crate::registry::OpBuilderRegistrations;
use crate::target::{ConstValue, ModelBuilder, TargetFormat};

const CONV_BUILDER: BuilderType = BuilderType::new("Conv");

/// Padding mode of a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum AutoPad {
    /// Explicit `pads`.
    #[strum(serialize = "NOTSET")]
    NotSet,
    /// Same output size, extra padding at the end.
    #[strum(serialize = "SAME_UPPER")]
    SameUpper,
    /// Same output size, extra padding at the beginning.
    #[strum(serialize = "SAME_LOWER")]
    SameLower,
    /// No padding.
    #[strum(serialize = "VALID")]
    Valid,
}

impl AutoPad {
    /// Name of the padding mode in the target.
    pub fn pad_type(&self) -> &'static str {
        match self {
            AutoPad::NotSet => "custom",
            AutoPad::SameUpper => "same",
            AutoPad::SameLower => "same_lower",
            AutoPad::Valid => "valid",
        }
    }
}

/// Resolved attributes of a 2-D convolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2dParams {
    /// Strides along height and width.
    pub strides: Vec<i64>,
    /// Dilations along height and width.
    pub dilations: Vec<i64>,
    /// Padding as `[top, bottom, left, right]`.
    pub pads: Vec<i64>,
    /// Number of groups.
    pub group: i64,
    /// Padding mode.
    pub auto_pad: AutoPad,
}

impl Conv2dParams {
    /// Read and check the attributes of `node` against its weight.
    pub fn from_node(node: &OperatorNode) -> Result<Self, BuildError> {
        let input = required_input(node, 0, "input")?;
        check_rank(input, 4)?;

        let weight = required_input(node, 1, "weight")?;
        check_rank(weight, 4)?;
        let weight_shape = weight.ty.static_shape();

        if let Some(bias) = node.input(2) {
            check_rank(bias, 1)?;
            let bias_len = bias.ty.static_shape().and_then(|shape| shape.first().copied());
            let out_channels = weight_shape.and_then(|shape| shape.first().copied());
            if let (Some(bias_len), Some(out_channels)) = (bias_len, out_channels) {
                if bias_len != out_channels {
                    return Err(BuildError::InvalidShape {
                        input: bias.name.clone(),
                        reason: format!(
                            "bias has {bias_len} values for {out_channels} output channels"
                        ),
                    });
                }
            }
        }

        if node.has_attr("kernel_shape") {
            let kernel_shape = node.get_ints("kernel_shape", &[])?;
            let kernel_len = kernel_shape.len();
            if kernel_len != 2 {
                return Err(invalid("kernel_shape", format!("expected 2 values, got {kernel_len}")));
            }
            if let Some(&[_, _, height, width]) = weight_shape {
                let expected = [height as i64, width as i64];
                if kernel_shape != expected {
                    return Err(invalid(
                        "kernel_shape",
                        format!("{kernel_shape:?} does not match weight kernel {expected:?}"),
                    ));
                }
            }
        }

        let strides = node.get_ints("strides", &[1, 1])?;
        let dilations = node.get_ints("dilations", &[1, 1])?;
        let pads = node.get_ints("pads", &[0, 0, 0, 0])?;
        let group = node.get_int("group", 1)?;
        let auto_pad = node.get_string("auto_pad", "NOTSET")?;

        check_len("strides", &strides, 2)?;
        check_len("dilations", &dilations, 2)?;
        check_len("pads", &pads, 4)?;
        if group < 1 {
            return Err(invalid("group", format!("must be positive, got {group}")));
        }

        let auto_pad = auto_pad
            .parse::<AutoPad>()
            .map_err(|_| invalid("auto_pad", format!("unknown mode '{auto_pad}'")))?;

        Ok(Self {
            strides,
            dilations,
            // [h_begin, w_begin, h_end, w_end] -> [h_begin, h_end, w_begin, w_end]
            pads: vec![pads[0], pads[2], pads[1], pads[3]],
            group,
            auto_pad,
        })
    }
}

fn check_rank(arg: &Argument, rank: usize) -> Result<(), BuildError> {
    if arg.rank() != rank {
        return Err(BuildError::InvalidShape {
            input: arg.name.clone(),
            reason: format!(
                "only 2-D convolution is supported, expected rank {rank}, got {}",
                arg.rank()
            ),
        });
    }
    Ok(())
}

fn check_len(name: &str, values: &[i64], len: usize) -> Result<(), BuildError> {
    if values.len() != len {
        return Err(invalid(
            name,
            format!("expected {len} values, got {}", values.len()),
        ));
    }
    Ok(())
}

fn invalid(name: &str, reason: String) -> BuildError {
    BuildError::InvalidAttribute {
        name: name.to_string(),
        reason,
    }
}

/// Builder for `Conv` nodes.
#[derive(Debug, Default)]
pub struct ConvOpBuilder;

impl OpBuilder for ConvOpBuilder {
    fn builder_type(&self) -> BuilderType {
        CONV_BUILDER
    }

    fn spec(&self) -> BuilderSpec {
        BuilderSpec {
            min_opset: 1,
            max_opset: None,
            inputs: InputSpec::Range(2, 3),
            outputs: OutputSpec::Exact(1),
            input_types: FLOAT_TYPES,
        }
    }

    fn check_node(&self, node: &OperatorNode, params: &InputParams) -> Result<(), BuildError> {
        Conv2dParams::from_node(node)?;

        if params.format == TargetFormat::Layers {
            for index in [1, 2] {
                if let Some(arg) = node.input(index) {
                    if !arg.is_constant() {
                        return Err(BuildError::NotConstant {
                            input: arg.name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn skippable_inputs(&self, node: &OperatorNode, params: &InputParams) -> BTreeSet<usize> {
        if params.format != TargetFormat::Layers {
            return BTreeSet::new();
        }

        [1, 2]
            .into_iter()
            .filter(|&index| node.input(index).is_some())
            .collect()
    }

    fn add_to_target(
        &self,
        target: &mut dyn ModelBuilder,
        node: &OperatorNode,
    ) -> Result<(), BuildError> {
        let input = required_input(node, 0, "input")?;
        let output = required_output(node)?;
        let conv = Conv2dParams::from_node(node)?;
        let embed = target.format() == TargetFormat::Layers;

        let weight = operand(required_input(node, 1, "weight")?, embed)?;
        let bias = node
            .input(2)
            .map(|bias| operand(bias, embed))
            .transpose()?;

        log::debug!(
            "Lowering conv {} with strides {:?}, group {} and {:?} padding",
            node.name,
            conv.strides,
            conv.group,
            conv.auto_pad
        );

        let mut op = target.create_operation(node, "conv");
        target.add_operation_input(&mut op, "x", &input.name);
        for (param, value) in [("weight", Some(weight)), ("bias", bias)] {
            match value {
                Some(Operand::Tensor(name)) => target.add_operation_input(&mut op, param, &name),
                Some(Operand::Constant(value)) => {
                    target.add_constant_operation_input(&mut op, param, value)
                }
                None => {}
            }
        }
        target.add_constant_operation_input(&mut op, "strides", ConstValue::Ints(conv.strides));
        target.add_constant_operation_input(
            &mut op,
            "dilations",
            ConstValue::Ints(conv.dilations),
        );
        target.add_constant_operation_input(&mut op, "groups", ConstValue::Int(conv.group));
        target.add_constant_operation_input(
            &mut op,
            "pad_type",
            ConstValue::String(conv.auto_pad.pad_type().to_string()),
        );
        if conv.auto_pad == AutoPad::NotSet {
            target.add_constant_operation_input(&mut op, "pad", ConstValue::Ints(conv.pads));
        }
        target.add_operation_output(&mut op, output);
        target.add_operation(op);

        Ok(())
    }
}

enum Operand {
    Tensor(String),
    Constant(ConstValue),
}

fn operand(arg: &Argument, embed: bool) -> Result<Operand, BuildError> {
    if !embed {
        return Ok(Operand::Tensor(arg.name.clone()));
    }

    arg.shared_value()
        .map(|data| Operand::Constant(ConstValue::Tensor(data)))
        .ok_or_else(|| BuildError::NotConstant {
            input: arg.name.clone(),
        })
}

/// Register [`ConvOpBuilder`] for `op_type`.
pub fn create_conv_op_builder(op_type: &str, registrations: &mut OpBuilderRegistrations) {
    registrations.add_op_builder(op_type, CONV_BUILDER, || Box::new(ConvOpBuilder));
}
