use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::ir::{ArgType, Argument, Attributes, ElementType, OperatorNode, TensorData, TensorType};

/// Default operator set version when the description does not name one.
pub const DEFAULT_OPSET_VERSION: usize = 13;

/// Error raised while loading a graph description.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The description file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The description is not valid JSON or does not match the expected layout.
    #[error("Invalid graph description: {0}")]
    Json(#[from] serde_json::Error),

    /// A node reads a tensor that no graph input, initializer or earlier node provides.
    #[error("Node '{node}' reads unknown tensor '{input}'")]
    UnknownInput {
        /// Node name.
        node: String,
        /// Missing tensor name.
        input: String,
    },

    /// A graph output is never produced.
    #[error("Graph output '{0}' is not produced by any node")]
    UnknownOutput(String),

    /// Two producers declare the same tensor name.
    #[error("Tensor '{0}' is defined more than once")]
    DuplicateTensor(String),

    /// Two nodes declare the same name.
    #[error("Node name '{0}' is used more than once")]
    DuplicateNode(String),

    /// The type of a node output cannot be determined.
    #[error("Cannot infer the type of '{output}' produced by node '{node}'")]
    MissingType {
        /// Node name.
        node: String,
        /// Output tensor name.
        output: String,
    },
}

/// Type information of a named tensor in a graph description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueInfo {
    /// Tensor name.
    pub name: String,
    /// Element type.
    pub elem_type: ElementType,
    /// Static shape, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    /// Rank, used when the shape is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

impl ValueInfo {
    fn to_type(&self) -> TensorType {
        let rank = self
            .shape
            .as_ref()
            .map(|shape| shape.len())
            .or(self.rank)
            .unwrap_or_default();

        TensorType::new(self.elem_type, rank, self.shape.clone())
    }
}

/// A named constant in a graph description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializerDescription {
    /// Tensor name.
    pub name: String,
    /// Tensor data.
    #[serde(flatten)]
    pub data: TensorData,
}

/// A node in a graph description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// Operator type.
    pub op_type: String,
    /// Node name. Generated from the operator type when empty.
    #[serde(default)]
    pub name: String,
    /// Input tensor names. Empty strings mark omitted optional inputs.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output tensor names.
    pub outputs: Vec<String>,
    /// Static attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// Since-version of the operator definition. Defaults to the graph opset version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_version: Option<usize>,
}

/// Serialized form of an [`OperatorGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    /// Operator set version of the model.
    #[serde(default = "default_opset_version")]
    pub opset_version: usize,
    /// Runtime inputs of the graph.
    #[serde(default)]
    pub inputs: Vec<ValueInfo>,
    /// Outputs of the graph.
    pub outputs: Vec<ValueInfo>,
    /// Constant tensors.
    #[serde(default)]
    pub initializers: Vec<InitializerDescription>,
    /// Type information for intermediate tensors.
    #[serde(default)]
    pub value_info: Vec<ValueInfo>,
    /// Nodes in declaration order.
    pub nodes: Vec<NodeDescription>,
}

fn default_opset_version() -> usize {
    DEFAULT_OPSET_VERSION
}

/// A named initializer of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    /// Tensor name.
    pub name: String,
    /// Tensor data, shared with the arguments referring to it.
    pub data: Arc<TensorData>,
}

/// Operator graph with resolved argument types.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorGraph {
    /// Operator set version of the model.
    pub opset_version: usize,
    /// The nodes of the graph, in declaration order.
    pub nodes: Vec<OperatorNode>,
    /// The inputs of the graph.
    pub inputs: Vec<Argument>,
    /// The outputs of the graph.
    pub outputs: Vec<Argument>,
    /// The constant tensors of the graph.
    pub initializers: Vec<Initializer>,
}

impl OperatorGraph {
    /// Load a graph description from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        log::debug!("Reading graph description from {}", path.display());

        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse a graph description from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let description: GraphDescription = serde_json::from_str(json)?;
        Self::from_description(description)
    }

    /// Resolve the arguments of a graph description.
    ///
    /// Inputs are bound by name to graph inputs, initializers or outputs of earlier nodes. Node
    /// outputs take their type from `value_info` or, when missing, from the first node input.
    pub fn from_description(description: GraphDescription) -> Result<Self, GraphError> {
        let mut scope: HashMap<String, Argument> = HashMap::new();

        let inputs = description
            .inputs
            .iter()
            .map(|info| {
                let arg = Argument::tensor(info.name.clone(), info.to_type());
                define(&mut scope, arg.clone())?;
                Ok(arg)
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        let initializers = description
            .initializers
            .into_iter()
            .map(|init| {
                let data = Arc::new(init.data);
                define(&mut scope, Argument::constant(init.name.clone(), data.clone()))?;
                Ok(Initializer {
                    name: init.name,
                    data,
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        let value_info: HashMap<&str, &ValueInfo> = description
            .value_info
            .iter()
            .chain(description.outputs.iter())
            .map(|info| (info.name.as_str(), info))
            .collect();

        let mut node_names = HashSet::new();
        for node in description.nodes.iter().filter(|node| !node.name.is_empty()) {
            if !node_names.insert(node.name.clone()) {
                return Err(GraphError::DuplicateNode(node.name.clone()));
            }
        }

        let mut name_counters: HashMap<String, usize> = HashMap::new();
        let mut nodes = Vec::with_capacity(description.nodes.len());

        for node in description.nodes {
            let name = if node.name.is_empty() {
                let prefix = node.op_type.to_lowercase();
                let counter = name_counters.entry(prefix.clone()).or_default();
                loop {
                    *counter += 1;
                    let name = format!("{prefix}{counter}");
                    if node_names.insert(name.clone()) {
                        break name;
                    }
                }
            } else {
                node.name
            };

            let node_inputs = node
                .inputs
                .iter()
                .map(|input| {
                    if input.is_empty() {
                        return Ok(Argument::optional());
                    }
                    scope
                        .get(input)
                        .cloned()
                        .ok_or_else(|| GraphError::UnknownInput {
                            node: name.clone(),
                            input: input.clone(),
                        })
                })
                .collect::<Result<Vec<_>, GraphError>>()?;

            let node_outputs = node
                .outputs
                .iter()
                .map(|output| {
                    let ty = match value_info.get(output.as_str()) {
                        Some(info) => ArgType::Tensor(info.to_type()),
                        None => same_as_first_input(&node_inputs).ok_or_else(|| {
                            GraphError::MissingType {
                                node: name.clone(),
                                output: output.clone(),
                            }
                        })?,
                    };
                    let arg = Argument::new(output.clone()).with_type(ty);
                    define(&mut scope, arg.clone())?;
                    Ok(arg)
                })
                .collect::<Result<Vec<_>, GraphError>>()?;

            let since_version = node.since_version.unwrap_or(description.opset_version);
            log::debug!(
                "Resolved node {name} ({}) with {} inputs, since version {since_version}",
                node.op_type,
                node_inputs.len()
            );

            nodes.push(OperatorNode::new(
                node.op_type,
                name,
                node_inputs,
                node_outputs,
                node.attributes,
                since_version,
            ));
        }

        let outputs = description
            .outputs
            .iter()
            .map(|info| {
                scope
                    .get(&info.name)
                    .filter(|arg| arg.is_dynamic())
                    .cloned()
                    .ok_or_else(|| GraphError::UnknownOutput(info.name.clone()))
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        Ok(Self {
            opset_version: description.opset_version,
            nodes,
            inputs,
            outputs,
            initializers,
        })
    }

    /// Get an initializer by name.
    pub fn initializer(&self, name: &str) -> Option<&Initializer> {
        self.initializers.iter().find(|init| init.name == name)
    }

    /// Every tensor name that appears in the graph.
    pub fn tensor_names(&self) -> HashSet<&str> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .map(|arg| arg.name.as_str())
            .chain(self.initializers.iter().map(|init| init.name.as_str()))
            .chain(self.nodes.iter().flat_map(|node| {
                node.inputs
                    .iter()
                    .chain(node.outputs.iter())
                    .map(|arg| arg.name.as_str())
            }))
            .filter(|name| !name.is_empty())
            .collect()
    }
}

fn define(scope: &mut HashMap<String, Argument>, arg: Argument) -> Result<(), GraphError> {
    if scope.contains_key(&arg.name) {
        return Err(GraphError::DuplicateTensor(arg.name));
    }
    scope.insert(arg.name.clone(), arg);
    Ok(())
}

fn same_as_first_input(inputs: &[Argument]) -> Option<ArgType> {
    inputs
        .iter()
        .find(|arg| !arg.is_optional())
        .map(|arg| arg.ty.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::AttributeValue;

    const CLIP_GRAPH: &str = r#"{
        "opset_version": 13,
        "inputs": [{ "name": "x", "elem_type": "float32", "shape": [1, 8] }],
        "outputs": [{ "name": "y", "elem_type": "float32", "shape": [1, 8] }],
        "initializers": [
            { "name": "lo", "elem_type": "float32", "values": [0.0] },
            { "name": "hi", "elem_type": "float32", "values": [6.0] }
        ],
        "nodes": [
            { "op_type": "Relu", "inputs": ["x"], "outputs": ["r"] },
            { "op_type": "Clip", "inputs": ["r", "lo", "hi"], "outputs": ["y"] }
        ]
    }"#;

    #[test]
    fn resolves_arguments() {
        let graph = OperatorGraph::from_json(CLIP_GRAPH).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].name, "relu1");
        assert_eq!(graph.nodes[1].name, "clip1");
        assert_eq!(graph.nodes[1].since_version, 13);

        let clip = &graph.nodes[1];
        assert!(clip.inputs[0].is_dynamic());
        assert_eq!(clip.inputs[0].ty.static_shape(), Some(&[1, 8][..]));
        assert!(clip.inputs[1].is_constant());
        assert_eq!(clip.inputs[2].value().unwrap().scalar_f32().unwrap(), 6.0);

        assert_eq!(graph.outputs[0].name, "y");
        assert!(graph.initializer("lo").is_some());
        assert!(graph.tensor_names().contains("r"));
    }

    #[test]
    fn keeps_optional_positions_and_attributes() {
        let graph = OperatorGraph::from_json(
            r#"{
                "inputs": [{ "name": "x", "elem_type": "float32", "rank": 2 }],
                "outputs": [{ "name": "y", "elem_type": "float32", "rank": 2 }],
                "initializers": [{ "name": "hi", "elem_type": "float32", "values": [1.0] }],
                "nodes": [{
                    "op_type": "Clip",
                    "name": "clamp",
                    "inputs": ["x", "", "hi"],
                    "outputs": ["y"],
                    "attributes": { "note": { "string": "kept" } },
                    "since_version": 11
                }]
            }"#,
        )
        .unwrap();

        let node = &graph.nodes[0];
        assert_eq!(graph.opset_version, DEFAULT_OPSET_VERSION);
        assert_eq!(node.since_version, 11);
        assert!(node.inputs[1].is_optional());
        assert_eq!(node.inputs[2].name, "hi");
        assert_eq!(
            node.attr("note"),
            Some(&AttributeValue::String("kept".to_string()))
        );
    }

    #[test]
    fn unknown_input_is_an_error() {
        let err = OperatorGraph::from_json(
            r#"{
                "outputs": [{ "name": "y", "elem_type": "float32" }],
                "nodes": [{ "op_type": "Relu", "inputs": ["missing"], "outputs": ["y"] }]
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::UnknownInput { ref input, .. } if input == "missing"));
    }

    #[test]
    fn duplicate_tensor_is_an_error() {
        let err = OperatorGraph::from_json(
            r#"{
                "inputs": [{ "name": "x", "elem_type": "float32" }],
                "outputs": [{ "name": "x", "elem_type": "float32" }],
                "nodes": [{ "op_type": "Relu", "inputs": ["x"], "outputs": ["x"] }]
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::DuplicateTensor(ref name) if name == "x"));
    }

    #[test]
    fn output_without_type_source_is_an_error() {
        let err = OperatorGraph::from_json(
            r#"{
                "outputs": [{ "name": "y", "elem_type": "float32" }],
                "nodes": [{ "op_type": "RandomNormal", "outputs": ["z"] }]
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::MissingType { ref output, .. } if output == "z"));
    }

    #[test]
    fn invalid_initializer_is_rejected() {
        let err = OperatorGraph::from_json(
            r#"{
                "outputs": [],
                "initializers": [{ "name": "w", "elem_type": "float32", "shape": [2], "values": [1.0] }],
                "nodes": []
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::Json(_)));
    }

    #[test]
    fn generated_names_skip_explicit_names() {
        let graph = OperatorGraph::from_json(
            r#"{
                "inputs": [{ "name": "x", "elem_type": "float32", "rank": 2 }],
                "outputs": [{ "name": "z", "elem_type": "float32", "rank": 2 }],
                "nodes": [
                    { "op_type": "Relu", "inputs": ["x"], "outputs": ["y"] },
                    { "op_type": "Relu", "name": "relu2", "inputs": ["y"], "outputs": ["w"] },
                    { "op_type": "Relu", "inputs": ["w"], "outputs": ["z"] }
                ]
            }"#,
        )
        .unwrap();

        let names: Vec<_> = graph.nodes.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, vec!["relu1", "relu2", "relu3"]);
    }

    #[test]
    fn duplicate_node_name_is_an_error() {
        let err = OperatorGraph::from_json(
            r#"{
                "inputs": [{ "name": "x", "elem_type": "float32", "rank": 2 }],
                "outputs": [{ "name": "z", "elem_type": "float32", "rank": 2 }],
                "nodes": [
                    { "op_type": "Relu", "name": "act", "inputs": ["x"], "outputs": ["y"] },
                    { "op_type": "Tanh", "name": "act", "inputs": ["y"], "outputs": ["z"] }
                ]
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::DuplicateNode(ref name) if name == "act"));
    }

    #[test]
    fn overflowing_initializer_shape_is_rejected() {
        let err = OperatorGraph::from_json(
            r#"{
                "outputs": [],
                "initializers": [{
                    "name": "w",
                    "elem_type": "float32",
                    "shape": [4294967296, 4294967296, 2],
                    "values": []
                }],
                "nodes": []
            }"#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::Json(_)));
        assert!(err.to_string().contains("too many elements"));
    }
}
