use std::path::PathBuf;

use insta::assert_snapshot;
use oplower::ir::OperatorGraph;
use oplower::target::InputBinding;
use oplower::{
    LoweringConfig, LoweringError, OpBuilderRegistrations, ProgramBuilder, TargetFormat, compile,
    lower_graph,
};

fn load(name: &str) -> OperatorGraph {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name);
    OperatorGraph::load(path).unwrap()
}

fn layers() -> LoweringConfig {
    LoweringConfig::default()
}

fn program() -> LoweringConfig {
    LoweringConfig::default().with_format(TargetFormat::Program)
}

#[test]
fn conv_clip_layers() {
    let graph = load("conv_clip.json");
    let program = compile(&graph, &OpBuilderRegistrations::new(), &layers()).unwrap();

    assert_snapshot!(program, @r#"
    program(layers)
      input x: float32[1, 1, 4, 4]
      c: float32[1, 2, 4, 4] = conv(x=x, weight=tensor<float32[2, 1, 1, 1]>, bias=tensor<float32[2]>, strides=[1, 1], dilations=[1, 1], groups=1, pad_type="custom", pad=[0, 0, 0, 0]) [conv_conv]
      clip_min_output: float32[1, 2, 4, 4] = threshold(x=c, alpha=-1) [clip_threshold]
      clip_threshold_output: float32[1, 2, 4, 4] = threshold(x=clip_min_output, alpha=-1, scale=-1) [clip_threshold_1]
      y: float32[1, 2, 4, 4] = linear(x=clip_threshold_output, alpha=-1) [clip_linear]
      z: float32[1, 2, 4, 4] = add(x=y, y=c) [add_add]
      output z: float32[1, 2, 4, 4]
    "#);
}

#[test]
fn conv_clip_program() {
    let graph = load("conv_clip.json");
    let program = compile(&graph, &OpBuilderRegistrations::new(), &program()).unwrap();

    assert_snapshot!(program, @r#"
    program(program)
      input x: float32[1, 1, 4, 4]
      const w = tensor<float32[2, 1, 1, 1]>
      const b = tensor<float32[2]>
      const lo = tensor<float32[]>
      const hi = tensor<float32[]>
      c: float32[1, 2, 4, 4] = conv(x=x, weight=w, bias=b, strides=[1, 1], dilations=[1, 1], groups=1, pad_type="custom", pad=[0, 0, 0, 0]) [conv_conv]
      y: float32[1, 2, 4, 4] = clip(x=c, alpha=-1, beta=1) [clip_clip]
      z: float32[1, 2, 4, 4] = add(x=y, y=c) [add_add]
      output z: float32[1, 2, 4, 4]
    "#);
}

#[test]
fn legacy_clip_attributes_fuse_to_relu6() {
    let graph = load("relu6_legacy.json");
    let program = compile(&graph, &OpBuilderRegistrations::new(), &layers()).unwrap();

    assert_eq!(graph.nodes[0].since_version, 9);
    assert_snapshot!(program, @r"
    program(layers)
      input x: float32[1, 8]
      y: float32[1, 8] = relu6(x=x) [clip1_relu6]
      output y: float32[1, 8]
    ");
}

#[test]
fn skipped_initializers_follow_the_format() {
    let graph = load("conv_clip.json");
    let registrations = OpBuilderRegistrations::new();

    let mut builder = ProgramBuilder::for_graph(&graph, TargetFormat::Layers);
    let lowered = lower_graph(&graph, &registrations, &mut builder).unwrap();
    let skipped: Vec<_> = lowered
        .skipped_initializers
        .iter()
        .map(String::as_str)
        .collect();

    assert_eq!(skipped, vec!["b", "hi", "lo", "w"]);
    assert_eq!(builder.skipped_initializers(), &lowered.skipped_initializers);
    assert_eq!(lowered.lowered_nodes, 3);

    let mut builder = ProgramBuilder::for_graph(&graph, TargetFormat::Program);
    let lowered = lower_graph(&graph, &registrations, &mut builder).unwrap();
    assert!(lowered.skipped_initializers.is_empty());
}

#[test]
fn folded_bound_read_by_another_node_is_kept() {
    let graph = OperatorGraph::from_json(
        r#"{
            "inputs": [{ "name": "x", "elem_type": "float32", "shape": [1, 4] }],
            "outputs": [{ "name": "z", "elem_type": "float32", "shape": [1, 4] }],
            "initializers": [
                { "name": "lo", "elem_type": "float32", "values": [-1.0] },
                { "name": "hi", "elem_type": "float32", "values": [1.0] }
            ],
            "nodes": [
                { "op_type": "Clip", "name": "clip", "inputs": ["x", "lo", "hi"], "outputs": ["y"] },
                { "op_type": "Add", "name": "add", "inputs": ["y", "hi"], "outputs": ["z"] }
            ]
        }"#,
    )
    .unwrap();

    let program = compile(&graph, &OpBuilderRegistrations::new(), &layers()).unwrap();
    let kept: Vec<_> = program
        .initializers
        .iter()
        .map(|init| init.name.as_str())
        .collect();

    assert_eq!(kept, vec!["hi"]);
    assert_eq!(
        program.operation("add_add").unwrap().input("y"),
        Some(&InputBinding::Tensor("hi".to_string()))
    );
}

#[test]
fn unsupported_operator_aborts_the_pass() {
    let graph = load("unsupported.json");
    let registrations = OpBuilderRegistrations::new();

    let mut builder = ProgramBuilder::for_graph(&graph, TargetFormat::Layers);
    let err = lower_graph(&graph, &registrations, &mut builder).unwrap_err();

    assert_eq!(
        err,
        LoweringError::UnsupportedOperator {
            node: "softmax1".to_string(),
            op_type: "Softmax".to_string(),
        }
    );
    assert!(builder.operations().is_empty());
    assert!(compile(&graph, &registrations, &layers()).is_err());
}

#[test]
fn program_serializes_to_json() {
    let graph = load("conv_clip.json");
    let program = compile(&graph, &OpBuilderRegistrations::new(), &layers()).unwrap();

    let json = serde_json::to_value(&program).unwrap();

    assert_eq!(json["format"], "layers");
    assert_eq!(json["operations"][1]["op_type"], "threshold");
    assert_eq!(json["operations"][1]["inputs"][0]["param"], "x");
    assert_eq!(json["operations"][1]["inputs"][0]["tensor"], "c");
    assert_eq!(
        json["operations"][1]["inputs"][1]["constant"]["value"]["float"],
        -1.0
    );
    assert_eq!(json["outputs"][0]["shape"], serde_json::json!([1, 2, 4, 4]));
}

#[test]
fn registrations_are_shared_between_threads() {
    let graph = load("conv_clip.json");
    let registrations = OpBuilderRegistrations::new();

    let programs: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = [layers(), program()]
            .into_iter()
            .map(|config| {
                let graph = &graph;
                let registrations = &registrations;
                scope.spawn(move || compile(graph, registrations, &config).unwrap())
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(programs[0].op_types().len(), 5);
    assert_eq!(programs[1].op_types(), vec!["conv", "clip", "add"]);
}
