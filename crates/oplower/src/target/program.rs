use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    sync::Arc,
};

use oplower_ir::{Argument, OperatorGraph, OperatorNode, TensorData};
use serde::Serialize;

use super::{ConstValue, InputBinding, ModelBuilder, Operation, TargetFormat, TensorSpec};

/// Initializer kept in a lowered program.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct NamedTensor {
    /// Tensor name.
    pub name: String,
    /// Tensor data.
    pub data: Arc<TensorData>,
}

/// Lowered model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    /// Format the program was lowered for.
    pub format: TargetFormat,
    /// Graph inputs.
    pub inputs: Vec<TensorSpec>,
    /// Graph outputs.
    pub outputs: Vec<TensorSpec>,
    /// Initializers still needed by the operations.
    pub initializers: Vec<NamedTensor>,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
}

impl Program {
    /// Get an operation by name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Kinds of the operations, in execution order.
    pub fn op_types(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.op_type.as_str()).collect()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "program({})", self.format)?;
        for input in &self.inputs {
            writeln!(f, "  input {input}")?;
        }
        for init in &self.initializers {
            writeln!(f, "  const {} = {}", init.name, ConstValue::Tensor(init.data.clone()))?;
        }
        for op in &self.operations {
            writeln!(f, "  {op}")?;
        }
        for output in &self.outputs {
            writeln!(f, "  output {output}")?;
        }
        Ok(())
    }
}

/// [`ModelBuilder`] accumulating a [`Program`].
#[derive(Debug)]
pub struct ProgramBuilder {
    format: TargetFormat,
    names: HashSet<String>,
    operations: Vec<Operation>,
    skipped: BTreeSet<String>,
}

impl ProgramBuilder {
    /// Create an empty builder.
    pub fn new(format: TargetFormat) -> Self {
        Self {
            format,
            names: HashSet::new(),
            operations: Vec::new(),
            skipped: BTreeSet::new(),
        }
    }

    /// Create a builder for `graph`. Generated names never collide with the graph's tensor names.
    pub fn for_graph(graph: &OperatorGraph, format: TargetFormat) -> Self {
        let mut builder = Self::new(format);
        builder
            .names
            .extend(graph.tensor_names().into_iter().map(str::to_string));
        builder
    }

    /// Operations added so far.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Initializers marked as not needed.
    pub fn skipped_initializers(&self) -> &BTreeSet<String> {
        &self.skipped
    }

    /// Finish the program, keeping the initializers of `graph` that were not skipped.
    ///
    /// A skipped initializer that an operation still binds as a tensor is kept.
    pub fn finish(self, graph: &OperatorGraph) -> Program {
        let bound: HashSet<&str> = self
            .operations
            .iter()
            .flat_map(|op| op.inputs.iter())
            .filter_map(|input| match &input.binding {
                InputBinding::Tensor(name) => Some(name.as_str()),
                InputBinding::Constant { .. } => None,
            })
            .collect();

        let initializers = graph
            .initializers
            .iter()
            .filter(|init| {
                if !self.skipped.contains(&init.name) {
                    return true;
                }
                let used = bound.contains(init.name.as_str());
                if used {
                    log::debug!("Keeping skipped initializer {} still read as a tensor", init.name);
                }
                used
            })
            .map(|init| NamedTensor::new(init.name.clone(), init.data.clone()))
            .collect();

        Program {
            format: self.format,
            inputs: graph.inputs.iter().map(TensorSpec::from).collect(),
            outputs: graph.outputs.iter().map(TensorSpec::from).collect(),
            initializers,
            operations: self.operations,
        }
    }
}

impl ModelBuilder for ProgramBuilder {
    fn format(&self) -> TargetFormat {
        self.format
    }

    fn create_operation(&mut self, node: &OperatorNode, op_type: &str) -> Operation {
        let name = self.get_unique_name(&format!("{}_{op_type}", node.name));
        Operation::new(op_type.to_string(), name)
    }

    fn add_operation_input(&mut self, op: &mut Operation, param: &str, tensor: &str) {
        op.bind(param, InputBinding::Tensor(tensor.to_string()));
    }

    fn add_operation_output(&mut self, op: &mut Operation, output: &Argument) {
        self.names.insert(output.name.clone());
        op.outputs.push(TensorSpec::from(output));
    }

    fn add_constant_operation_input(&mut self, op: &mut Operation, param: &str, value: ConstValue) {
        let name = self.get_unique_name(&format!("{}_{param}", op.name));
        op.bind(param, InputBinding::Constant { name, value });
    }

    fn add_operation(&mut self, op: Operation) {
        log::trace!("Adding operation {} ({})", op.name, op.op_type);
        self.operations.push(op);
    }

    fn get_unique_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut suffix = 1;
        while self.names.contains(&name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.names.insert(name.clone());
        name
    }

    fn add_initializer_to_skip(&mut self, name: &str) {
        self.skipped.insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"{
        "inputs": [{ "name": "x", "elem_type": "float32", "shape": [1, 4] }],
        "outputs": [{ "name": "y", "elem_type": "float32", "shape": [1, 4] }],
        "initializers": [
            { "name": "lo", "elem_type": "float32", "values": [-1.0] },
            { "name": "hi", "elem_type": "float32", "values": [1.0] }
        ],
        "nodes": [
            { "op_type": "Clip", "name": "clip", "inputs": ["x", "lo", "hi"], "outputs": ["y"] }
        ]
    }"#;

    #[test]
    fn unique_names_get_numeric_suffixes() {
        let mut builder = ProgramBuilder::new(TargetFormat::Layers);

        assert_eq!(builder.get_unique_name("t"), "t");
        assert_eq!(builder.get_unique_name("t"), "t_1");
        assert_eq!(builder.get_unique_name("t"), "t_2");
        assert_eq!(builder.get_unique_name("u"), "u");
    }

    #[test]
    fn unique_names_avoid_graph_tensors() {
        let graph = OperatorGraph::from_json(GRAPH).unwrap();
        let mut builder = ProgramBuilder::for_graph(&graph, TargetFormat::Layers);

        assert_eq!(builder.get_unique_name("x"), "x_1");
        assert_eq!(builder.get_unique_name("lo"), "lo_1");
        assert_eq!(builder.get_unique_name("clip_min_output"), "clip_min_output");
    }

    #[test]
    fn constants_are_named_after_the_operation() {
        let graph = OperatorGraph::from_json(GRAPH).unwrap();
        let node = &graph.nodes[0];
        let mut builder = ProgramBuilder::for_graph(&graph, TargetFormat::Program);

        let mut first = builder.create_operation(node, "clip");
        builder.add_constant_operation_input(&mut first, "alpha", ConstValue::Float(-1.0));
        let mut second = builder.create_operation(node, "clip");
        builder.add_constant_operation_input(&mut second, "alpha", ConstValue::Float(-1.0));

        assert_eq!(first.name, "clip_clip");
        assert_eq!(second.name, "clip_clip_1");
        assert_eq!(
            second.input("alpha"),
            Some(&InputBinding::Constant {
                name: "clip_clip_1_alpha".to_string(),
                value: ConstValue::Float(-1.0),
            })
        );
    }

    #[test]
    fn finish_drops_skipped_initializers() {
        let graph = OperatorGraph::from_json(GRAPH).unwrap();
        let mut builder = ProgramBuilder::for_graph(&graph, TargetFormat::Layers);
        builder.add_initializer_to_skip("lo");
        builder.add_initializer_to_skip("lo");

        let program = builder.finish(&graph);
        let names: Vec<_> = program
            .initializers
            .iter()
            .map(|init| init.name.as_str())
            .collect();

        assert_eq!(names, vec!["hi"]);
        assert_eq!(program.inputs[0].shape, Some(vec![1, 4]));
        assert!(program.operations.is_empty());
    }

    #[test]
    fn finish_keeps_skipped_initializers_still_read() {
        let graph = OperatorGraph::from_json(GRAPH).unwrap();
        let node = &graph.nodes[0];
        let mut builder = ProgramBuilder::for_graph(&graph, TargetFormat::Layers);
        builder.add_initializer_to_skip("lo");
        builder.add_initializer_to_skip("hi");

        let mut add = builder.create_operation(node, "add");
        builder.add_operation_input(&mut add, "x", "x");
        builder.add_operation_input(&mut add, "y", "hi");
        builder.add_operation(add);

        let program = builder.finish(&graph);
        let names: Vec<_> = program
            .initializers
            .iter()
            .map(|init| init.name.as_str())
            .collect();

        assert_eq!(names, vec!["hi"]);
    }
}
