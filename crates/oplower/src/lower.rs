use std::collections::BTreeSet;

use oplower_ir::{OperatorGraph, OperatorNode};

use crate::builder::{InputParams, OpBuilder};
use crate::config::LoweringConfig;
use crate::error::LoweringError;
use crate::registry::OpBuilderRegistrations;
use crate::target::{ModelBuilder, Program, ProgramBuilder};

/// Summary of a successful lowering pass.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct LoweredGraph {
    /// Number of lowered nodes.
    pub lowered_nodes: usize,
    /// Initializers the target was told to skip.
    pub skipped_initializers: BTreeSet<String>,
}

/// Lower every node of `graph` into `target`.
///
/// All nodes are looked up and checked before the first call into `target`, so a graph with an
/// unsupported node leaves the target untouched.
pub fn lower_graph(
    graph: &OperatorGraph,
    registrations: &OpBuilderRegistrations,
    target: &mut dyn ModelBuilder,
) -> Result<LoweredGraph, LoweringError> {
    let params = InputParams::new(target.format());
    let builders = resolve_builders(&graph.nodes, registrations, &params)?;

    let skipped = skipped_initializers(&builders, &params);
    for name in &skipped {
        target.add_initializer_to_skip(name);
    }

    for (node, builder) in &builders {
        log::debug!("Lowering node {} ({})", node.name, node.op_type);
        builder
            .add_to_target(target, node)
            .map_err(|source| LoweringError::LoweringFailed {
                node: node.name.clone(),
                op_type: node.op_type.clone(),
                source,
            })?;
    }

    log::info!(
        "Lowered {} nodes, skipping {} initializers",
        builders.len(),
        skipped.len()
    );

    Ok(LoweredGraph::new(builders.len(), skipped))
}

/// Lower `graph` into a new [`Program`].
///
/// Nothing of the program is kept when lowering fails.
pub fn compile(
    graph: &OperatorGraph,
    registrations: &OpBuilderRegistrations,
    config: &LoweringConfig,
) -> Result<Program, LoweringError> {
    let mut builder = ProgramBuilder::for_graph(graph, config.format);
    lower_graph(graph, registrations, &mut builder)?;
    Ok(builder.finish(graph))
}

fn resolve_builders<'a>(
    nodes: &'a [OperatorNode],
    registrations: &'a OpBuilderRegistrations,
    params: &InputParams,
) -> Result<Vec<(&'a OperatorNode, &'a dyn OpBuilder)>, LoweringError> {
    nodes
        .iter()
        .map(|node| {
            let builder = registrations.get_op_builder(&node.op_type).ok_or_else(|| {
                LoweringError::UnsupportedOperator {
                    node: node.name.clone(),
                    op_type: node.op_type.clone(),
                }
            })?;

            builder
                .check_support(node, params)
                .map_err(|source| LoweringError::ValidationFailed {
                    node: node.name.clone(),
                    op_type: node.op_type.clone(),
                    source,
                })?;

            Ok((node, builder))
        })
        .collect()
}

/// Names of the constant inputs every builder reported as skippable.
fn skipped_initializers(
    builders: &[(&OperatorNode, &dyn OpBuilder)],
    params: &InputParams,
) -> BTreeSet<String> {
    builders
        .iter()
        .flat_map(|&(node, builder)| {
            builder
                .skippable_inputs(node, params)
                .into_iter()
                .filter_map(move |index| node.input(index))
                .filter(|arg| arg.is_constant())
                .map(|arg| arg.name.clone())
        })
        .collect()
}
