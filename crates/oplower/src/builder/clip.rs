//! # Clip
//!
//! Limits the values of the input tensor to `[min, max]`.
//!
//! ## Bounds
//!
//! - **Opset 6-10**: `min` and `max` are float attributes
//! - **Opset 11+**: `min` and `max` are optional inputs 1 and 2
//!
//! Both forms are read the same way: the attribute wins, then the constant input. A bound given
//! by a runtime input cannot be lowered. Bounds at or beyond the `f32` range are treated as absent.
//!
//! ## Lowering
//!
//! | bounds          | operations                                       |
//! |-----------------|--------------------------------------------------|
//! | none            | `identity`                                       |
//! | `[0, 6]`        | `relu6`                                          |
//! | `[0, +inf)`     | `relu`                                           |
//! | other, program  | `clip`                                           |
//! | other, layers   | `threshold` / `relu`, then `threshold` + `linear`|
//!
//! Layer targets have no two sided clip: `max(x, min)` is a threshold, and `min(x, max)` is
//! computed as `-max(-x, -max)`.

use std::collections::BTreeSet;

use oplower_ir::OperatorNode;

use super::{
    BuilderSpec, BuilderType, FLOAT_TYPES, InputParams, InputSpec, OpBuilder, OutputSpec,
    required_input, required_output,
};
use crate::error::BuildError;
use crate::registry::OpBuilderRegistrations;
use crate::target::{ConstValue, ModelBuilder, TargetFormat};

const CLIP_BUILDER: BuilderType = BuilderType::new("Clip");

/// Effective bounds of a clip node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipBounds {
    /// Lower bound, `f32::MIN` when absent.
    pub min: f32,
    /// Upper bound, `f32::MAX` when absent.
    pub max: f32,
}

impl ClipBounds {
    /// Whether a lower bound applies.
    pub fn has_min(&self) -> bool {
        self.min > f32::MIN
    }

    /// Whether an upper bound applies.
    pub fn has_max(&self) -> bool {
        self.max < f32::MAX
    }

    /// Read the bounds of `node`.
    pub fn from_node(node: &OperatorNode) -> Result<Self, BuildError> {
        Ok(Self {
            min: resolve_bound(node, "min", 1, f32::MIN)?,
            max: resolve_bound(node, "max", 2, f32::MAX)?,
        })
    }
}

fn resolve_bound(
    node: &OperatorNode,
    key: &str,
    index: usize,
    unbounded: f32,
) -> Result<f32, BuildError> {
    if node.has_attr(key) {
        return Ok(node.get_float(key, unbounded)?);
    }

    let Some(input) = node.input(index) else {
        return Ok(unbounded);
    };
    let data = input.value().ok_or_else(|| BuildError::NotConstant {
        input: input.name.clone(),
    })?;
    if data.rank() > 0 && data.num_elements() != 1 {
        return Err(BuildError::InvalidShape {
            input: input.name.clone(),
            reason: format!("bound must be a scalar, got shape {:?}", data.shape()),
        });
    }

    data.scalar_f32().map_err(|source| BuildError::Data {
        input: input.name.clone(),
        source,
    })
}

/// Builder for `Clip` nodes.
#[derive(Debug, Default)]
pub struct ClipOpBuilder;

impl OpBuilder for ClipOpBuilder {
    fn builder_type(&self) -> BuilderType {
        CLIP_BUILDER
    }

    fn spec(&self) -> BuilderSpec {
        BuilderSpec {
            min_opset: 6,
            max_opset: None,
            inputs: InputSpec::Range(1, 3),
            outputs: OutputSpec::Exact(1),
            input_types: FLOAT_TYPES,
        }
    }

    fn check_node(&self, node: &OperatorNode, _params: &InputParams) -> Result<(), BuildError> {
        ClipBounds::from_node(node).map(|_| ())
    }

    fn skippable_inputs(&self, node: &OperatorNode, params: &InputParams) -> BTreeSet<usize> {
        if params.format != TargetFormat::Layers || node.since_version < 11 {
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
        let bounds = ClipBounds::from_node(node)?;
        let (has_min, has_max) = (bounds.has_min(), bounds.has_max());

        log::debug!(
            "Lowering clip {} with min {:?} and max {:?}",
            node.name,
            has_min.then_some(bounds.min),
            has_max.then_some(bounds.max)
        );

        let fused = match (has_min, has_max) {
            (false, false) => Some("identity"),
            (true, true) if bounds.min == 0.0 && bounds.max == 6.0 => Some("relu6"),
            (true, false) if bounds.min == 0.0 => Some("relu"),
            _ => None,
        };

        if let Some(op_type) = fused {
            let mut op = target.create_operation(node, op_type);
            target.add_operation_input(&mut op, "x", &input.name);
            target.add_operation_output(&mut op, output);
            target.add_operation(op);
            return Ok(());
        }

        if target.format() == TargetFormat::Program {
            let mut op = target.create_operation(node, "clip");
            target.add_operation_input(&mut op, "x", &input.name);
            target.add_constant_operation_input(&mut op, "alpha", ConstValue::Float(bounds.min));
            target.add_constant_operation_input(&mut op, "beta", ConstValue::Float(bounds.max));
            target.add_operation_output(&mut op, output);
            target.add_operation(op);
            return Ok(());
        }

        // Tensor feeding the upper bound stage.
        let min_output = match (has_min, has_max) {
            (true, true) => target.get_unique_name(&format!("{}_min_output", node.name)),
            (true, false) => output.name.clone(),
            _ => input.name.clone(),
        };

        if has_min {
            let op_type = if bounds.min == 0.0 { "relu" } else { "threshold" };
            let mut op = target.create_operation(node, op_type);
            target.add_operation_input(&mut op, "x", &input.name);
            if bounds.min != 0.0 {
                target.add_constant_operation_input(&mut op, "alpha", ConstValue::Float(bounds.min));
            }
            target.add_operation_output(&mut op, &output.clone().with_name(min_output.clone()));
            target.add_operation(op);
        }

        if has_max {
            let threshold_output =
                target.get_unique_name(&format!("{}_threshold_output", node.name));

            let mut threshold = target.create_operation(node, "threshold");
            target.add_operation_input(&mut threshold, "x", &min_output);
            target.add_constant_operation_input(
                &mut threshold,
                "alpha",
                ConstValue::Float(-bounds.max),
            );
            target.add_constant_operation_input(&mut threshold, "scale", ConstValue::Float(-1.0));
            target.add_operation_output(
                &mut threshold,
                &output.clone().with_name(threshold_output.clone()),
            );
            target.add_operation(threshold);

            let mut linear = target.create_operation(node, "linear");
            target.add_operation_input(&mut linear, "x", &threshold_output);
            target.add_constant_operation_input(&mut linear, "alpha", ConstValue::Float(-1.0));
            target.add_operation_output(&mut linear, output);
            target.add_operation(linear);
        }

        Ok(())
    }
}

/// Register [`ClipOpBuilder`] for `op_type`.
pub fn create_clip_op_builder(op_type: &str, registrations: &mut OpBuilderRegistrations) {
    registrations.add_op_builder(op_type, CLIP_BUILDER, || Box::new(ClipOpBuilder));
}
