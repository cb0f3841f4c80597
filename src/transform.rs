//! Block transformers.
//!
//! Each block type is mapped to a [`TransformerKind`] by the configuration. A transformer reads
//! the block and the shared [`Environment`](env::Environment), and returns a [`Contribution`]:
//! what the block adds to the [`DLModel`](model::DLModel). Contributions are merged in schedule
//! order, so the behavior of a block comes after the behavior of the blocks it reads from.
//!
//! A transformer that fails contributes nothing: its block is reported as failed and the model
//! is incomplete.

crate::prelude!();

pub use conf::TransformerKind;

use conf::TransformConfig;
use env::Environment;
use model::DLModel;
use simulink::{Block, Model};

pub mod blocks;
pub mod param;

#[cfg(test)]
mod test;

/// What a block adds to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contribution {
    /// Constants.
    pub constants: Vec<Constant>,
    /// Variables.
    pub variables: Vec<Var>,
    /// Initial conditions.
    pub init: Vec<Formula>,
    /// Behavior elements running before all the other ones.
    pub front: Vec<Program>,
    /// Behavior elements.
    pub behavior: Vec<Program>,
    /// Behavior elements running after all the other ones.
    pub back: Vec<Program>,
    /// ODEs.
    pub odes: Vec<Ode>,
    /// Evolution domain constraints.
    pub domain: Vec<Formula>,
    /// Safety conditions.
    pub safety: Vec<Formula>,
    /// Reasons why the contribution is partial.
    pub incomplete: Vec<String>,
}

impl Contribution {
    /// Empty contribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the contribution adds nothing.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
            && self.variables.is_empty()
            && self.init.is_empty()
            && self.front.is_empty()
            && self.behavior.is_empty()
            && self.back.is_empty()
            && self.odes.is_empty()
            && self.domain.is_empty()
            && self.safety.is_empty()
            && self.incomplete.is_empty()
    }

    /// Adds an evolution: its ODEs and its domain.
    pub fn add_evolution(&mut self, evolution: Evolution) {
        self.odes.extend(evolution.odes);
        self.domain
            .extend(evolution.domain.conjuncts().into_iter().cloned())
    }

    /// Merges the contribution into a model.
    ///
    /// Back elements are appended after the behavior elements of the contribution, callers
    /// merging several contributions take them out first, see [`transform_blocks`].
    pub fn merge_into(self, model: &mut DLModel) {
        for cst in self.constants {
            model.add_constant(cst);
        }
        for var in self.variables {
            model.add_variable(var);
        }
        for f in self.init {
            model.add_init(f)
        }
        for p in self.front {
            model.add_behavior_front(p)
        }
        for p in self.behavior.into_iter().chain(self.back) {
            model.add_behavior(p)
        }
        for ode in self.odes {
            model.add_ode(ode)
        }
        for f in self.domain {
            model.add_domain(f)
        }
        for f in self.safety {
            model.add_safety(f)
        }
        for reason in self.incomplete {
            model.mark_incomplete(reason)
        }
    }
}

/// Translation context of a block.
pub struct Ctx<'a> {
    /// The Simulink model.
    pub graph: &'a Model,
    /// Configuration.
    pub conf: &'a TransformConfig,
    /// Shared environment.
    pub env: &'a mut Environment,
    /// Block identifier.
    pub id: BlockId,
    /// The block.
    pub block: &'a Block,
}

impl<'a> Ctx<'a> {
    /// Constructor.
    pub fn new(
        graph: &'a Model,
        conf: &'a TransformConfig,
        env: &'a mut Environment,
        id: BlockId,
    ) -> Self {
        Self {
            graph,
            conf,
            env,
            id,
            block: graph.block(id),
        }
    }

    /// Signal driving an input port, `port` starts at `1`.
    pub fn input(&mut self, port: usize) -> Res<Term> {
        self.env.input(self.graph, self.id, port)
    }
    /// Signals driving all the input ports, in port order.
    pub fn inputs(&mut self) -> Res<Vec<Term>> {
        let ports: Vec<usize> = self.block.inputs.iter().map(|port| port.index).collect();
        ports.into_iter().map(|port| self.input(port)).collect()
    }
    /// Signal of an output port, `port` starts at `1`.
    pub fn output(&mut self, port: usize) -> Res<Term> {
        self.env.signal(self.graph, self.id, port)
    }
    /// Identifier of the block, used to name internal variables.
    pub fn name(&self) -> String {
        env::block_name(self.graph, self.id)
    }
    /// Parameter accessor.
    pub fn param(&self, key: &str) -> Option<&'a str> {
        self.block.param(key)
    }
}

impl TransformerKind {
    /// Translates a block.
    pub fn transform(self, ctx: &mut Ctx) -> Res<Contribution> {
        match self {
            Self::Empty => blocks::empty(ctx),
            Self::Skip => blocks::skip(ctx),
            Self::Sink => Ok(Contribution::new()),
            Self::Input => blocks::input(ctx),
            Self::Constant => blocks::constant(ctx),
            Self::Gain => blocks::gain(ctx),
            Self::Sum => blocks::sum(ctx),
            Self::Product => blocks::product(ctx),
            Self::Integrator => blocks::integrator(ctx),
            Self::UnitDelay => blocks::unit_delay(ctx),
            Self::ZeroOrderHold => blocks::zero_order_hold(ctx),
            Self::Saturation => blocks::saturation(ctx),
            Self::Switch => blocks::switch(ctx),
            Self::Relational => blocks::relational(ctx),
            Self::Logic => blocks::logic(ctx),
            Self::Contract => blocks::contract(ctx),
        }
    }
}

/// Translates some blocks, in order, into `model`.
///
/// Returns the blocks whose translation failed.
pub fn transform_blocks(
    graph: &Model,
    order: &[BlockId],
    conf: &TransformConfig,
    env: &mut Environment,
    model: &mut DLModel,
) -> Vec<BlockId> {
    let mut failed = vec![];
    let mut back = vec![];
    for &id in order {
        let block = graph.block(id);
        let kind = conf.transformer(&block.typ);
        env.log
            .debug(format!("block `{}` ({}): {}", block.name, block.typ, kind));

        env.begin();
        let res = {
            let mut ctx = Ctx::new(graph, conf, env, id);
            kind.transform(&mut ctx)
        };
        match res {
            Ok(mut contribution) => {
                contribution.variables.extend(env.commit());
                back.append(&mut contribution.back);
                contribution.merge_into(model)
            }
            Err(e) => {
                env.rollback();
                let e = Error::with_chain(
                    e,
                    format!("while translating block `{}` ({})", block.name, block.typ),
                );
                env.log.exception(&e);
                model.mark_incomplete(format!("block `{}` could not be translated", block.name));
                failed.push(id)
            }
        }
    }
    for p in back {
        model.add_behavior(p)
    }
    failed
}
