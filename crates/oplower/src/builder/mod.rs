//! Operator builders.
//!
//! Each submodule implements the lowering of one family of operators, providing:
//! - the support checks run before anything is emitted
//! - the operations emitted into the [`ModelBuilder`]
//! - the constant inputs the target can drop
//! - a `create_*_op_builder` function registering the builder under an operator type

use std::{collections::BTreeSet, fmt};

use oplower_ir::{Argument, ElementType, OperatorNode};

use crate::error::BuildError;
use crate::target::{ModelBuilder, TargetFormat};

pub mod activation;
pub mod binary;
pub mod clip;
pub mod conv;

pub use activation::{ActivationOpBuilder, create_activation_op_builder};
pub use binary::{BinaryOpBuilder, create_binary_op_builder};
pub use clip::{ClipOpBuilder, create_clip_op_builder};
pub use conv::{ConvOpBuilder, create_conv_op_builder};

/// Tag identifying a builder implementation.
///
/// Operator types registered with the same tag share one builder instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuilderType(&'static str);

impl BuilderType {
    /// Create a tag.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Name of the tag.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for BuilderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Target properties a builder may depend on when checking a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, new)]
pub struct InputParams {
    /// Format of the target model.
    pub format: TargetFormat,
}

/// Accepted number of inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSpec {
    /// Exactly this many.
    Exact(usize),
    /// This many or more.
    AtLeast(usize),
    /// Between the two bounds, inclusive.
    Range(usize, usize),
}

/// Accepted number of outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSpec {
    /// Exactly this many.
    Exact(usize),
    /// Between the two bounds, inclusive.
    Range(usize, usize),
}

impl InputSpec {
    fn accepts(&self, count: usize) -> bool {
        match *self {
            InputSpec::Exact(n) => count == n,
            InputSpec::AtLeast(n) => count >= n,
            InputSpec::Range(min, max) => (min..=max).contains(&count),
        }
    }
}

impl OutputSpec {
    fn accepts(&self, count: usize) -> bool {
        match *self {
            OutputSpec::Exact(n) => count == n,
            OutputSpec::Range(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSpec::Exact(n) => write!(f, "{n}"),
            InputSpec::AtLeast(n) => write!(f, "at least {n}"),
            InputSpec::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSpec::Exact(n) => write!(f, "{n}"),
            OutputSpec::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

/// Float element types accepted by most builders.
pub const FLOAT_TYPES: &[ElementType] = &[ElementType::Float32, ElementType::Float16];

/// Generic requirements of a builder, checked before the builder specific ones.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderSpec {
    /// Oldest supported since-version.
    pub min_opset: usize,
    /// Newest supported since-version, if bounded.
    pub max_opset: Option<usize>,
    /// Accepted input count, omitted optional inputs included.
    pub inputs: InputSpec,
    /// Accepted output count.
    pub outputs: OutputSpec,
    /// Accepted element types of the first input.
    pub input_types: &'static [ElementType],
}

impl BuilderSpec {
    /// Check `node` against the requirements.
    ///
    /// `Float16` inputs are only accepted by `Program` targets.
    pub fn validate(&self, node: &OperatorNode, params: &InputParams) -> Result<(), BuildError> {
        if node.since_version < self.min_opset {
            return Err(BuildError::UnsupportedOpset {
                required: self.min_opset,
                actual: node.since_version,
            });
        }
        if let Some(max) = self.max_opset {
            if node.since_version > max {
                return Err(BuildError::OpsetTooNew {
                    max,
                    actual: node.since_version,
                });
            }
        }

        if !self.inputs.accepts(node.inputs.len()) {
            return Err(BuildError::InvalidInputCount {
                expected: self.inputs,
                actual: node.inputs.len(),
            });
        }
        if !self.outputs.accepts(node.outputs.len()) {
            return Err(BuildError::InvalidOutputCount {
                expected: self.outputs,
                actual: node.outputs.len(),
            });
        }

        let input = node
            .input(0)
            .ok_or_else(|| BuildError::MissingInput("input".to_string()))?;
        let elem_type = input.elem_type();
        let layers_half = elem_type == ElementType::Float16 && params.format == TargetFormat::Layers;
        if !self.input_types.contains(&elem_type) || layers_half {
            return Err(BuildError::UnsupportedType {
                input: input.name.clone(),
                actual: elem_type,
            });
        }

        Ok(())
    }
}

/// Lowers nodes of one or more operator types into target operations.
///
/// Builders are stateless: everything they produce goes into the [`ModelBuilder`] and nodes are
/// only read.
pub trait OpBuilder: fmt::Debug + Send + Sync {
    /// Tag shared by every operator type this builder is registered for.
    fn builder_type(&self) -> BuilderType;

    /// Generic requirements on the nodes.
    fn spec(&self) -> BuilderSpec;

    /// Builder specific checks, run after [`BuilderSpec::validate`].
    fn check_node(&self, _node: &OperatorNode, _params: &InputParams) -> Result<(), BuildError> {
        Ok(())
    }

    /// Check whether `node` can be lowered, reporting why not.
    fn check_support(&self, node: &OperatorNode, params: &InputParams) -> Result<(), BuildError> {
        self.spec().validate(node, params)?;
        self.check_node(node, params)
    }

    /// Check whether `node` can be lowered.
    fn is_supported(&self, node: &OperatorNode, params: &InputParams) -> bool {
        match self.check_support(node, params) {
            Ok(()) => true,
            Err(err) => {
                log::debug!("{} node {} is not supported: {err}", node.op_type, node.name);
                false
            }
        }
    }

    /// Indices of constant inputs the target does not need once the node is lowered.
    fn skippable_inputs(&self, _node: &OperatorNode, _params: &InputParams) -> BTreeSet<usize> {
        BTreeSet::new()
    }

    /// Emit the operations of `node`.
    ///
    /// Only called on nodes accepted by [`OpBuilder::check_support`].
    fn add_to_target(
        &self,
        target: &mut dyn ModelBuilder,
        node: &OperatorNode,
    ) -> Result<(), BuildError>;
}

fn required_input<'a>(
    node: &'a OperatorNode,
    index: usize,
    name: &str,
) -> Result<&'a Argument, BuildError> {
    node.input(index)
        .ok_or_else(|| BuildError::MissingInput(name.to_string()))
}

fn required_output(node: &OperatorNode) -> Result<&Argument, BuildError> {
    node.output(0)
        .ok_or_else(|| BuildError::MissingOutput("output".to_string()))
}
