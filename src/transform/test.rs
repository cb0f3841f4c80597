//! Tests for the block transformers.

crate::prelude!();

use conf::TransformConfig;
use env::Environment;
use model::DLModel;
use simulink::{Block, Model};

/// Translates a graph in schedule order.
fn translate(graph: &Model) -> (DLModel, Environment, Vec<BlockId>) {
    let conf = TransformConfig::default();
    let order = schedule::schedule(graph, &conf.stateful).order.clone();
    let mut env = Environment::default();
    let mut model = DLModel::new();
    let failed = transform::transform_blocks(graph, &order, &conf, &mut env, &mut model);
    (model, env, failed)
}

fn behavior(model: &DLModel) -> Vec<String> {
    model.behavior().iter().map(|p| p.to_string()).collect()
}
fn strings<T: fmt::Display>(items: &[T]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// `inputs` feed `block`, which feeds an outport.
fn around(inputs: &[&str], block: Block) -> Model {
    let mut graph = Model::new("test");
    for input in inputs {
        graph.add_block(Block::new(*input, "Inport").with_ports(0, 1));
    }
    let name = block.name.clone();
    let n_out = block.outputs.len();
    graph.add_block(block);
    for (idx, input) in inputs.iter().enumerate() {
        graph.connect((*input, 1), (name.as_str(), idx + 1)).unwrap();
    }
    for port in 1..=n_out {
        let out = format!("out{}", port);
        graph.add_block(Block::new(out.as_str(), "Outport").with_ports(1, 0));
        graph.connect((name.as_str(), port), (out.as_str(), 1)).unwrap();
    }
    graph
}

#[test]
fn gain_chain() {
    let graph = around(&["u"], Block::new("g", "Gain").with_ports(1, 1).with_param("Gain", "2"));
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert_eq!(behavior(&model), vec!["u := *;", "g := 2 * u;"]);
    assert_eq!(
        model.variables().iter().map(|v| v.name()).collect::<Vec<_>>(),
        vec!["u", "g"]
    );
    assert!(model.is_complete());
}

#[test]
fn constants_are_inlined() {
    let mut graph = Model::new("cst");
    graph.add_block(Block::new("k", "Constant").with_ports(0, 1).with_param("Value", "vmax"));
    graph.add_block(Block::new("g", "Gain").with_ports(1, 1).with_param("Gain", "3"));
    graph.add_block(Block::new("out", "Outport").with_ports(1, 0));
    graph.connect(("k", 1), ("g", 1)).unwrap();
    graph.connect(("g", 1), ("out", 1)).unwrap();
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert_eq!(behavior(&model), vec!["g := 3 * vmax();"]);
    assert!(model.constants().contains(&Constant::new("vmax")));
    assert_eq!(model.variables().len(), 1);
}

#[test]
fn sums_and_products() {
    let graph = around(
        &["a", "b"],
        Block::new("s", "Sum").with_ports(2, 1).with_param("Inputs", "|+-"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(behavior(&model)[2], "s := a - b;");

    let graph = around(
        &["a", "b"],
        Block::new("p", "Product").with_ports(2, 1).with_param("Inputs", "*/"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(behavior(&model)[2], "p := a / b;");

    let mut graph = around(
        &["v"],
        Block::new("s", "Sum").with_ports(1, 1).with_param("Inputs", "+"),
    );
    graph.block_mut(0).outputs[0].width = 3;
    graph.block_mut(1).inputs[0].width = 3;
    let (model, _, _) = translate(&graph);
    assert_eq!(behavior(&model)[3], "s := v1 + v2 + v3;");
}

#[test]
fn sign_mismatch_fails_the_block() {
    let graph = around(
        &["a", "b"],
        Block::new("s", "Sum").with_ports(2, 1).with_param("Inputs", "+++"),
    );
    let (model, env, failed) = translate(&graph);
    assert_eq!(failed, vec![graph.block_id("s").unwrap()]);
    assert!(!model.is_complete());
    assert_eq!(env.log.count(Level::Error), 1);
    // Nothing left behind: the output signal went away with the rollback.
    assert!(!model.variables().iter().any(|v| v.name() == "s"));
    assert_eq!(behavior(&model), vec!["a := *;", "b := *;"]);
}

#[test]
fn input_ranges() {
    let mut graph = Model::new("range");
    graph.add_block(
        Block::new("u", "Inport")
            .with_ports(0, 1)
            .with_param("Minimum", "0")
            .with_param("Maximum", "vmax"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(behavior(&model), vec!["u := *;", "?0 <= u & u <= vmax();"]);
}

#[test]
fn integrators() {
    let graph = around(
        &["u"],
        Block::new("x", "Integrator")
            .with_ports(1, 1)
            .with_param("InitialCondition", "1")
            .with_param("UpperSaturationLimit", "10")
            .with_param("LowerSaturationLimit", "-inf"),
    );
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert_eq!(strings(model.odes()), vec!["x' = u"]);
    assert_eq!(strings(model.init()), vec!["x = 1"]);
    let evolution = model.evolution().unwrap().to_evolution();
    assert_eq!(strings(&evolution.domain_conjuncts()), vec!["x <= 10"]);
}

#[test]
fn delays_update_their_state_last() {
    let mut graph = Model::new("loop");
    graph.add_block(Block::new("u", "Inport").with_ports(0, 1));
    graph.add_block(Block::new("s", "Sum").with_ports(2, 1));
    graph.add_block(
        Block::new("d", "UnitDelay")
            .with_ports(1, 1)
            .with_param("InitialCondition", "0.5"),
    );
    graph.connect(("u", 1), ("s", 1)).unwrap();
    graph.connect(("d", 1), ("s", 2)).unwrap();
    graph.connect(("s", 1), ("d", 1)).unwrap();
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert_eq!(
        behavior(&model),
        vec!["d := d_state;", "u := *;", "s := u + d;", "d_state := s;"]
    );
    assert_eq!(strings(model.init()), vec!["d_state = 0.5"]);
}

#[test]
fn saturations() {
    let graph = around(
        &["u"],
        Block::new("sat", "Saturate")
            .with_ports(1, 1)
            .with_param("UpperLimit", "1")
            .with_param("LowerLimit", "-1"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(
        behavior(&model)[1],
        "{ ?u > 1; sat := 1; ++ ?u < -1; sat := -1; ++ ?-1 <= u & u <= 1; sat := u; }"
    );
}

#[test]
fn switches() {
    let graph = around(
        &["a", "c", "b"],
        Block::new("sw", "Switch").with_ports(3, 1).with_param("Threshold", "0.5"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(
        behavior(&model)[3],
        "{ ?c >= 0.5; sw := a; ++ ?c < 0.5; sw := b; }"
    );

    let graph = around(
        &["a", "c", "b"],
        Block::new("sw", "Switch").with_ports(3, 1).with_param("Criteria", "u2 ~= 0"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(behavior(&model)[3], "{ ?c != 0; sw := a; ++ ?c = 0; sw := b; }");
}

#[test]
fn relational_operators() {
    let graph = around(
        &["a", "b"],
        Block::new("r", "RelationalOperator").with_ports(2, 1).with_param("Operator", "<"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(behavior(&model)[2], "{ ?a < b; r := 1; ++ ?a >= b; r := 0; }");

    let graph = around(
        &["a", "b"],
        Block::new("r", "RelationalOperator").with_ports(2, 1).with_param("Operator", "=~"),
    );
    let (_, _, failed) = translate(&graph);
    assert_eq!(failed.len(), 1);
}

#[test]
fn logic_operators() {
    let graph = around(
        &["a"],
        Block::new("n", "Logic").with_ports(1, 1).with_param("Operator", "NOT"),
    );
    let (model, _, _) = translate(&graph);
    assert_eq!(behavior(&model)[1], "{ ?a = 0; n := 1; ++ ?a != 0; n := 0; }");

    let graph = around(&["a", "b"], Block::new("l", "Logic").with_ports(2, 1));
    let (model, _, _) = translate(&graph);
    assert_eq!(
        behavior(&model)[2],
        "{ ?a != 0 & b != 0; l := 1; ++ ?!(a != 0 & b != 0); l := 0; }"
    );
}

#[test]
fn vector_signals() {
    let mut graph = around(
        &["v"],
        Block::new("g", "Gain")
            .with_ports(1, 1)
            .with_width(2)
            .with_param("Gain", "[2 3]"),
    );
    graph.block_mut(0).outputs[0].width = 2;
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert_eq!(
        behavior(&model),
        vec!["v1 := *;", "v2 := *;", "g1 := 2 * v1;", "g2 := 3 * v2;"]
    );
}

#[test]
fn unmapped_blocks_are_ignored() {
    let graph = around(&["u"], Block::new("mystery", "Lookup2D").with_ports(1, 1));
    let (model, env, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert_eq!(behavior(&model), vec!["u := *;"]);
    assert_eq!(env.log.count(Level::Warn), 1);
    let warning = env.log.at(Level::Warn).next().unwrap();
    assert!(warning.msg.contains("Lookup2D"));
}

#[test]
fn lag_contract() {
    let graph = around(
        &["u"],
        Block::new("lp", "S-Function")
            .with_ports(1, 1)
            .with_param("FunctionName", "lowpass_filter")
            .with_param("Tau", "tau"),
    );
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert_eq!(strings(model.init()), vec!["tau() > 0", "lp_x = 0"]);
    assert_eq!(behavior(&model), vec!["lp := lp_x;", "u := *;"]);
    assert_eq!(strings(model.odes()), vec!["lp_x' = (u - lp_x) / tau()"]);
    assert!(model.undeclared().is_empty());
}

#[test]
fn signals_named_like_placeholders() {
    // The input signal `lim_y` is also the name of the output placeholder.
    let graph = around(
        &["lim y"],
        Block::new("lim", "S-Function")
            .with_ports(1, 1)
            .with_param("FunctionName", "speed_limiter"),
    );
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert!(model.is_complete());
    let behavior = behavior(&model);
    assert_eq!(behavior.len(), 2);
    assert_eq!(behavior[0], "lim_y := *;");
    assert!(behavior[1].contains("?lim_y < -1; lim := -1;"));
    assert!(behavior[1].contains("?lim_y > 1; lim := 1;"));
    assert!(behavior[1].contains("lim := lim_y;"));
    assert!(!behavior[1].contains("lim := lim;"));
    assert_eq!(strings(model.safety()), vec!["-1 <= lim & lim <= 1"]);
    assert!(model.undeclared().is_empty());
}

#[test]
fn vector_limiter_contract() {
    let mut graph = around(
        &["u"],
        Block::new("lim", "S-Function")
            .with_ports(1, 1)
            .with_width(2)
            .with_param("FunctionName", "range_limiter"),
    );
    graph.block_mut(0).outputs[0].width = 2;
    graph.block_mut(2).inputs[0].width = 2;
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert!(model.is_complete());
    assert!(model.undeclared().is_empty());

    let behavior = behavior(&model);
    assert_eq!(&behavior[..2], &["u1 := *;", "u2 := *;"]);
    // One choice per component, each over its own component only.
    assert_eq!(behavior.len(), 4);
    assert!(behavior[2].contains("lim1 := u1;"));
    assert!(!behavior[2].contains("u2") && !behavior[2].contains("lim2"));
    assert!(behavior[3].contains("lim2 := u2;"));
    assert!(!behavior[3].contains("u1") && !behavior[3].contains("lim1"));
    assert_eq!(strings(model.init()), vec!["-1 <= 1"]);
    assert_eq!(
        strings(model.safety()),
        vec!["-1 <= lim1 & lim1 <= 1", "-1 <= lim2 & lim2 <= 1"]
    );
    assert!(model
        .render(false, false)
        .contains("-1 <= lim1 & lim1 <= 1 & -1 <= lim2 & lim2 <= 1"));
}

#[test]
fn vector_controller_contract() {
    let mut graph = around(
        &["u"],
        Block::new("pi", "S-Function")
            .with_ports(1, 1)
            .with_width(2)
            .with_param("FunctionName", "pi_controller")
            .with_param("Kp", "2")
            .with_param("Ki", "ki"),
    );
    graph.block_mut(0).outputs[0].width = 2;
    graph.block_mut(2).inputs[0].width = 2;
    let (model, _, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert!(model.is_complete());
    assert!(model.undeclared().is_empty());
    assert_eq!(
        model.variables().iter().map(|v| v.name()).collect::<Vec<_>>(),
        vec!["u1", "u2", "pi1", "pi2", "pi_i1", "pi_i2"]
    );
    assert_eq!(strings(model.init()), vec!["pi_i1 = 0", "pi_i2 = 0"]);
    assert_eq!(
        behavior(&model),
        vec![
            "u1 := *;",
            "u2 := *;",
            "pi1 := 2 * u1 + ki() * pi_i1;",
            "pi2 := 2 * u2 + ki() * pi_i2;",
        ]
    );
    assert_eq!(strings(model.odes()), vec!["pi_i1' = u1", "pi_i2' = u2"]);
    assert!(model.constants().contains(&Constant::new("ki")));
}

#[test]
fn scalar_signals_do_not_fill_vector_placeholders() {
    let graph = around(
        &["u"],
        Block::new("mon", "S-Function")
            .with_ports(1, 0)
            .with_param("FunctionName", "range_monitor")
            .with_param("Width", "3"),
    );
    let (model, env, failed) = translate(&graph);
    assert!(failed.is_empty());
    assert!(!model.is_complete());
    let error = env.log.at(Level::Error).next().unwrap();
    assert!(error.msg.contains("expected a vector of width 3, found width 1"));
    assert_eq!(strings(model.safety()), vec!["-1 <= mon_u & mon_u <= 1"]);
}

#[test]
fn unknown_services_fail_the_block() {
    let graph = around(
        &["u"],
        Block::new("mystery", "S-Function")
            .with_ports(1, 1)
            .with_param("FunctionName", "oracle"),
    );
    let (model, env, failed) = translate(&graph);
    assert_eq!(failed.len(), 1);
    assert!(!model.is_complete());
    let error = env.log.at(Level::Error).next().unwrap();
    assert!(error.msg.contains("oracle"));
}

#[test]
fn contract_size_mismatch() {
    let mut graph = around(
        &["u"],
        Block::new("mon", "S-Function")
            .with_ports(1, 0)
            .with_param("FunctionName", "range_monitor")
            .with_param("Width", "3"),
    );
    graph.block_mut(0).outputs[0].width = 2;
    graph.block_mut(1).inputs[0].width = 2;
    let (model, env, failed) = translate(&graph);
    // The block is translated, partially.
    assert!(failed.is_empty());
    assert!(!model.is_complete());
    assert!(env.log.count(Level::Error) >= 1);
    assert_eq!(strings(model.safety()), vec!["-1 <= mon_u & mon_u <= 1"]);
    assert_eq!(
        model.undeclared().iter().map(|v| v.name()).collect::<Vec<_>>(),
        vec!["mon_u"]
    );
}
