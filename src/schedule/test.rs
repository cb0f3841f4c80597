//! Tests for block scheduling.

crate::prelude!();

use simulink::{Block, Model};

fn stateful() -> Set<String> {
    conf::default_stateful()
}

#[test]
fn chain_follows_dependencies() {
    let mut model = Model::new("chain");
    // Declared in reverse order on purpose.
    model.add_block(Block::new("sink", "Outport").with_ports(1, 0));
    model.add_block(Block::new("integrator", "Integrator").with_ports(1, 1));
    model.add_block(Block::new("source", "Inport").with_ports(0, 1));
    model.connect(("source", 1), ("integrator", 1)).unwrap();
    model.connect(("integrator", 1), ("sink", 1)).unwrap();

    let schedule = schedule::schedule(&model, &stateful());
    assert_eq!(schedule.names(&model), vec!["source", "integrator", "sink"]);
    assert!(schedule.is_resolved());
}

#[test]
fn ties_follow_declaration_order() {
    let mut model = Model::new("fork");
    model.add_block(Block::new("b", "Gain").with_ports(1, 1));
    model.add_block(Block::new("src", "Constant").with_ports(0, 1));
    model.add_block(Block::new("a", "Gain").with_ports(1, 1));
    model.add_block(Block::new("other_src", "Constant").with_ports(0, 1));
    model.connect(("src", 1), ("a", 1)).unwrap();
    model.connect(("src", 1), ("b", 1)).unwrap();

    let schedule = schedule::schedule(&model, &stateful());
    assert_eq!(schedule.names(&model), vec!["src", "other_src", "b", "a"]);
}

#[test]
fn stateful_blocks_break_loops() {
    let mut model = Model::new("loop");
    model.add_block(Block::new("int", "Integrator").with_ports(1, 1));
    model.add_block(Block::new("gain", "Gain").with_ports(1, 1));
    model.add_block(Block::new("out", "Outport").with_ports(1, 0));
    model.connect(("int", 1), ("gain", 1)).unwrap();
    model.connect(("gain", 1), ("int", 1)).unwrap();
    model.connect(("int", 1), ("out", 1)).unwrap();

    let schedule = schedule::schedule(&model, &stateful());
    assert!(schedule.is_resolved());
    assert_eq!(schedule.names(&model), vec!["gain", "int", "out"]);
}

#[test]
fn algebraic_loops_are_unresolved() {
    let mut model = Model::new("algebraic");
    model.add_block(Block::new("src", "Constant").with_ports(0, 1));
    model.add_block(Block::new("sum", "Sum").with_ports(2, 1));
    model.add_block(Block::new("gain", "Gain").with_ports(1, 1));
    model.connect(("src", 1), ("sum", 1)).unwrap();
    model.connect(("gain", 1), ("sum", 2)).unwrap();
    model.connect(("sum", 1), ("gain", 1)).unwrap();

    let schedule = schedule::schedule(&model, &stateful());
    assert_eq!(schedule.unresolved, vec![1, 2]);
    assert_eq!(schedule.order, vec![0, 1, 2]);
}

#[test]
fn deterministic() {
    let mut model = Model::new("many");
    for idx in 0..20 {
        let ports = if idx % 3 == 0 { (0, 1) } else { (1, 1) };
        model.add_block(Block::new(format!("b{}", idx), "Gain").with_ports(ports.0, ports.1));
    }
    for idx in 0..20 {
        if idx % 3 != 0 {
            let src = format!("b{}", (idx * 7) % 20 / 3 * 3);
            let dst = format!("b{}", idx);
            model.connect((src.as_str(), 1), (dst.as_str(), 1)).unwrap();
        }
    }
    let first = schedule::schedule(&model, &stateful());
    for _ in 0..10 {
        assert_eq!(schedule::schedule(&model, &stateful()), first);
    }
    assert_eq!(first.order.len(), 20);
    assert!(first.is_resolved());
}
