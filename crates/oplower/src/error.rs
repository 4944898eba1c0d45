use oplower_ir::{AttributeError, DataError, ElementType, GraphError};

use crate::builder::{InputSpec, OutputSpec};
use crate::config::ConfigError;

/// Error raised by an operator builder while checking or lowering a node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// The node's operator set version is older than the builder supports.
    #[error("Unsupported opset version: requires at least {required}, got {actual}")]
    UnsupportedOpset {
        /// Minimum supported version.
        required: usize,
        /// Version of the node.
        actual: usize,
    },

    /// The node's operator set version is newer than the builder supports.
    #[error("Unsupported opset version: supports at most {max}, got {actual}")]
    OpsetTooNew {
        /// Maximum supported version.
        max: usize,
        /// Version of the node.
        actual: usize,
    },

    /// Wrong number of inputs.
    #[error("Expected {expected} inputs, got {actual}")]
    InvalidInputCount {
        /// Accepted input count.
        expected: InputSpec,
        /// Number of inputs on the node.
        actual: usize,
    },

    /// Wrong number of outputs.
    #[error("Expected {expected} outputs, got {actual}")]
    InvalidOutputCount {
        /// Accepted output count.
        expected: OutputSpec,
        /// Number of outputs on the node.
        actual: usize,
    },

    /// An input has an element type the builder cannot lower.
    #[error("Input '{input}' has unsupported element type {actual}")]
    UnsupportedType {
        /// Input name.
        input: String,
        /// Element type found.
        actual: ElementType,
    },

    /// Two tensors that must agree on their element type differ.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected element type.
        expected: ElementType,
        /// Element type found.
        actual: ElementType,
    },

    /// An input has a rank or shape the builder cannot lower.
    #[error("Input '{input}' has an unsupported shape: {reason}")]
    InvalidShape {
        /// Input name.
        input: String,
        /// Why the shape is rejected.
        reason: String,
    },

    /// An attribute has a value the builder cannot lower.
    #[error("Invalid attribute '{name}': {reason}")]
    InvalidAttribute {
        /// Attribute name.
        name: String,
        /// Why the value is rejected.
        reason: String,
    },

    /// A required input is absent.
    #[error("Missing required input '{0}'")]
    MissingInput(String),

    /// A required output is absent.
    #[error("Missing required output '{0}'")]
    MissingOutput(String),

    /// An input must be a constant initializer but is produced at runtime.
    #[error("Input '{input}' must be a constant initializer")]
    NotConstant {
        /// Input name.
        input: String,
    },

    /// An attribute has the wrong kind.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// Constant data of an input cannot be read.
    #[error("Cannot read constant input '{input}': {source}")]
    Data {
        /// Input name.
        input: String,
        /// Underlying error.
        #[source]
        source: DataError,
    },

    /// Other unsupported configurations.
    #[error("{0}")]
    Custom(String),
}

/// Error aborting a lowering pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoweringError {
    /// No builder is registered for the node's operator type.
    #[error("Operator '{op_type}' of node '{node}' is not supported")]
    UnsupportedOperator {
        /// Node name.
        node: String,
        /// Operator type.
        op_type: String,
    },

    /// The builder rejected the node.
    #[error("Node '{node}' ({op_type}) cannot be lowered: {source}")]
    ValidationFailed {
        /// Node name.
        node: String,
        /// Operator type.
        op_type: String,
        /// Reason reported by the builder.
        #[source]
        source: BuildError,
    },

    /// The builder failed while emitting operations.
    #[error("Failed to lower node '{node}' ({op_type}): {source}")]
    LoweringFailed {
        /// Node name.
        node: String,
        /// Operator type.
        op_type: String,
        /// Reason reported by the builder.
        #[source]
        source: BuildError,
    },
}

impl LoweringError {
    /// Name of the node the error refers to.
    pub fn node(&self) -> &str {
        match self {
            Self::UnsupportedOperator { node, .. }
            | Self::ValidationFailed { node, .. }
            | Self::LoweringFailed { node, .. } => node,
        }
    }
}

/// Top level error of the `oplower` entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The graph description could not be loaded.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The graph could not be lowered.
    #[error(transparent)]
    Lowering(#[from] LoweringError),

    /// The program could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The program could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
