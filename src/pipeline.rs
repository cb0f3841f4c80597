//! The whole transformation, from a Simulink graph to a dL model.
//!
//! A [`Transformation`] runs, in order:
//!
//! - the [consistency check](simulink::check), an inconsistent graph is rejected;
//! - the [scheduler](schedule), blocks stuck in algebraic loops are reported and scheduled last;
//! - the optional clock of the configuration's time bound;
//! - the [block transformers](transform), in schedule order;
//! - a final validation of the model: variables the problem mentions but that no block declared
//!   make it incomplete.
//!
//! # Examples
//!
//! ```rust
//! # use sldl::{conf::TransformConfig, pipeline::Transformation, simulink::{Block, Model}};
//! let mut graph = Model::new("demo");
//! graph.add_block(Block::new("u", "Inport").with_ports(0, 1));
//! graph.add_block(Block::new("x", "Integrator").with_ports(1, 1));
//! graph.add_block(Block::new("out", "Outport").with_ports(1, 0));
//! graph.connect(("u", 1), ("x", 1)).unwrap();
//! graph.connect(("x", 1), ("out", 1)).unwrap();
//!
//! let outcome = Transformation::new(TransformConfig::default()).run(&graph).unwrap();
//! assert!(outcome.is_complete());
//! assert!(outcome.render().contains("x' = u"));
//! ```

crate::prelude!();

use conf::TransformConfig;
use env::Environment;
use model::DLModel;
use schedule::Schedule;
use simulink::{check, Model};

/// Result of a transformation.
#[readonly::make]
#[derive(Debug)]
pub struct Outcome {
    /// The dL model.
    pub model: DLModel,
    /// Schedule the blocks were translated in.
    pub schedule: Schedule,
    /// Names of the blocks that could not be translated.
    pub failed: Vec<String>,
    /// Diagnostics.
    pub log: Log,
    multi_line_tests: bool,
    multi_line_domains: bool,
}
impl Outcome {
    /// True if all blocks were translated and the model is complete.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.model.is_complete()
    }
    /// Renders the model in KeYmaera X syntax, with the layout of the configuration.
    pub fn render(&self) -> String {
        self.model
            .render(self.multi_line_tests, self.multi_line_domains)
    }
}

/// Transformation, parameterized by a configuration.
#[derive(Debug, Clone, Default)]
pub struct Transformation {
    conf: TransformConfig,
}

impl Transformation {
    /// Constructor.
    pub fn new(conf: TransformConfig) -> Self {
        Self { conf }
    }

    /// Configuration accessor.
    pub fn conf(&self) -> &TransformConfig {
        &self.conf
    }

    /// Runs the transformation on a graph.
    ///
    /// Fails on inconsistent graphs only: block translation failures are reported in the
    /// [`Outcome`].
    pub fn run(&self, graph: &Model) -> Res<Outcome> {
        let mut log = Log::new();
        log.info(format!(
            "translating model `{}`: {} block(s), {} line(s)",
            graph.name,
            graph.blocks.len(),
            graph.lines.len()
        ));

        let consistency = check::check(graph, &mut log);
        if !consistency.is_consistent() {
            bail!(ErrorKind::Inconsistent(consistency.issues.len()))
        }

        let schedule = schedule::schedule(graph, &self.conf.stateful);
        for id in &schedule.unresolved {
            log.warn(format!(
                "block `{}` is part of an algebraic loop, scheduled last",
                graph.block(*id).name
            ))
        }

        let mut env = Environment::new(log);
        let mut model = DLModel::new();

        if let Some(bound) = &self.conf.time_bound {
            add_clock(bound, &mut env, &mut model)
                .chain_err(|| format!("illegal time bound `{}`", bound))?
        }

        let failed = transform::transform_blocks(
            graph,
            &schedule.order,
            &self.conf,
            &mut env,
            &mut model,
        );

        validate(&mut model, &mut env.log);

        let failed: Vec<String> = failed
            .into_iter()
            .map(|id| graph.block(id).name.clone())
            .collect();
        let mut log = env.log;
        if failed.is_empty() && model.is_complete() {
            log.info(format!(
                "model `{}` translated: {} variable(s), {} behavior element(s)",
                graph.name,
                model.variables().len(),
                model.behavior().len()
            ))
        } else {
            log.warn(format!(
                "model `{}` translated partially: {} block(s) failed, {} issue(s)",
                graph.name,
                failed.len(),
                model.incomplete().len()
            ))
        }

        Ok(Outcome {
            model,
            schedule,
            failed,
            log,
            multi_line_tests: self.conf.multi_line_tests,
            multi_line_domains: self.conf.multi_line_domains,
        })
    }
}

/// Adds a clock `t` reset at each iteration, bounding each continuous evolution.
fn add_clock(bound: &str, env: &mut Environment, model: &mut DLModel) -> Res<()> {
    let (bound, csts) = transform::param::scalar(bound)?;
    for cst in csts {
        model.add_constant(cst);
    }
    env.begin();
    let clock = env.fresh_var("t");
    for var in env.commit() {
        model.add_variable(var);
    }
    model.add_behavior_front(Program::assign(clock.clone(), 0));
    model.add_ode(Ode::new(clock.clone(), Term::int(1)));
    model.add_condition(Formula::rel(Term::var(clock), Cmp::Le, bound));
    env.log.debug("added clock for the time bound");
    Ok(())
}

/// Checks that the problem only mentions declared symbols.
fn validate(model: &mut DLModel, log: &mut Log) {
    for var in model.undeclared() {
        log.error(format!(
            "variable `{}` is not bound to any signal, the model is incomplete",
            var
        ));
        model.mark_incomplete(format!("unbound variable `{}`", var))
    }
    for cst in model.undeclared_constants() {
        log.warn(format!("declaring constant `{}` implicitly", cst.name()));
        model.add_constant(cst);
    }
}

/// Runs a transformation with some configuration.
pub fn transform(graph: &Model, conf: TransformConfig) -> Res<Outcome> {
    Transformation::new(conf).run(graph)
}
