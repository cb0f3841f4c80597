//! Contracts for service blocks.
//!
//! A service block (an S-function, a library block...) has no structural translation. Instead its
//! *service name* selects a contract rule (see [`rules`]) which yields a [`Contract`]: template
//! fragments written over placeholder variables. Instantiating the contract binds each
//! placeholder to the actual signal, by substitution.
//!
//! Placeholders can be vectors. A fragment mentioning a vector placeholder is first expanded to
//! the placeholder's width, so that binding the placeholder to a vector signal specializes each
//! item to one component. Binding a vector placeholder to a signal of a different width, a
//! scalar signal included, is an error: the fragment keeps the placeholder and the model is
//! incomplete.

crate::prelude!();

use simulink::{Block, Model};

pub mod rules;

/// Where a fragment goes in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Initial condition.
    Init,
    /// Behavior element running before the others.
    Front,
    /// Behavior element.
    Body,
    /// ODEs and domain of the global evolution.
    Ode,
    /// Safety condition.
    Guarantee,
}

/// What a placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Signal driving an input port.
    Input(usize),
    /// Signal of an output port.
    Output(usize),
    /// Fresh internal state.
    State,
}

/// A placeholder variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Variable.
    pub var: Var,
    /// Declared width.
    pub width: usize,
    /// What it stands for.
    pub binding: Binding,
}

/// A template fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Destination in the model.
    pub role: Role,
    /// Template.
    pub term: Term,
}

/// A contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    /// Name of the rule that built the contract.
    pub rule: &'static str,
    /// Placeholders.
    pub placeholders: Vec<Placeholder>,
    /// Constants the fragments mention.
    pub constants: Vec<Constant>,
    /// Fragments.
    pub fragments: Vec<Fragment>,
}

/// Result of a contract instantiation.
#[derive(Debug, Default)]
pub struct Instance {
    /// Instantiated fragments.
    pub fragments: Vec<Fragment>,
    /// Binding errors.
    pub errors: Vec<Error>,
}

impl Contract {
    /// Constructor, no placeholders and no fragments.
    pub fn new(rule: &'static str) -> Self {
        Self {
            rule,
            placeholders: vec![],
            constants: vec![],
            fragments: vec![],
        }
    }

    /// Adds a fragment.
    pub fn add(&mut self, role: Role, term: impl Into<Term>) {
        self.fragments.push(Fragment {
            role,
            term: term.into(),
        })
    }

    /// Widest vector placeholder a term mentions.
    fn expansion_width(&self, term: &Term) -> Option<usize> {
        self.placeholders
            .iter()
            .filter(|ph| ph.width > 1 && term.contains_term(&Term::Var(ph.var.clone())))
            .map(|ph| ph.width)
            .max()
    }

    /// Binds the placeholders.
    ///
    /// `bindings` gives the actual signal of each placeholder, in the order of
    /// [`Self::placeholders`]. Substitution errors are collected, the fragments they occurred in
    /// keep the corresponding placeholder.
    ///
    /// All placeholders are bound at once: a signal named like a placeholder is never rewritten.
    pub fn instantiate(&self, bindings: &[Term]) -> Instance {
        // `$` never appears in signal names.
        let renamed: Vec<Term> = (0..self.placeholders.len())
            .map(|idx| Term::var(Var::real(format!("${}", idx))))
            .collect();
        let mut res = Instance::default();
        for fragment in &self.fragments {
            let mut term = match self.expansion_width(&fragment.term) {
                Some(width) => fragment.term.expand(width),
                None => fragment.term.clone(),
            };
            for (ph, tmp) in self.placeholders.iter().zip(&renamed) {
                let sub = term.replace_term_recursive(&Term::Var(ph.var.clone()), tmp);
                res.errors.extend(sub.errors);
            }
            for ((ph, tmp), by) in self.placeholders.iter().zip(&renamed).zip(bindings) {
                if !term.contains_term(tmp) {
                    continue;
                }
                // Expanded fragments catch width mismatches between vectors, not scalars.
                let mismatch = match (ph.width, by.width()) {
                    (1, found) if found != 1 => Some((1, found)),
                    (expected, 1) if expected != 1 => Some((expected, 1)),
                    _ => None,
                };
                if let Some((expected, found)) = mismatch {
                    res.errors.push(ErrorKind::SizeMismatch(expected, found).into());
                    continue;
                }
                let sub = term.replace_term_recursive(tmp, by);
                res.errors.extend(sub.errors);
            }
            for (ph, tmp) in self.placeholders.iter().zip(&renamed) {
                let sub = term.replace_term_recursive(tmp, &Term::Var(ph.var.clone()));
                res.errors.extend(sub.errors);
            }
            res.fragments.push(Fragment {
                role: fragment.role,
                term,
            })
        }
        res
    }
}

/// Flattens a fragment into programs.
pub fn programs(term: Term) -> Vec<Program> {
    match term {
        Term::Program(p) => vec![*p],
        Term::Vector(vec) => vec.into_items().into_iter().flat_map(programs).collect(),
        Term::Formula(f) => vec![Program::test(*f)],
        term => vec![Program::test(Formula::from_term(term))],
    }
}

/// Flattens a fragment into formulas.
pub fn formulas(term: Term) -> Vec<Formula> {
    match term {
        Term::Vector(vec) => vec.into_items().into_iter().flat_map(formulas).collect(),
        term => vec![Formula::from_term(term)],
    }
}

/// Flattens a fragment into ODEs and domain constraints.
pub fn evolutions(term: Term) -> Vec<Evolution> {
    match term {
        Term::Program(p) => match *p {
            Program::Evolution(e) => vec![e],
            Program::Container(c) => vec![c.to_evolution()],
            _ => vec![],
        },
        Term::Vector(vec) => vec.into_items().into_iter().flat_map(evolutions).collect(),
        _ => vec![],
    }
}

/// Service name of a block, `type:function`.
///
/// The function is the `FunctionName` parameter, or the `Service` parameter, or the block name.
pub fn service_name(block: &Block) -> String {
    let function = block
        .param("FunctionName")
        .or_else(|| block.param("Service"))
        .unwrap_or(&block.name);
    format!("{}:{}", block.typ, function)
}

/// Information a contract rule builds a contract from.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    /// Service name.
    pub service: String,
    /// Prefix of the placeholder names, derived from the block name.
    pub prefix: String,
    /// The block.
    pub block: &'a Block,
}

impl<'a> Request<'a> {
    /// Constructor.
    pub fn new(graph: &'a Model, block: BlockId) -> Self {
        Self {
            service: service_name(graph.block(block)),
            prefix: env::block_name(graph, block),
            block: graph.block(block),
        }
    }

    /// Signal width: the `Width` parameter, or the width of the first port.
    pub fn width(&self) -> Res<usize> {
        match self.block.param("Width") {
            Some(width) => width
                .trim()
                .parse()
                .chain_err(|| format!("illegal `Width` parameter `{}`", width)),
            None => Ok(self
                .block
                .inputs
                .first()
                .or_else(|| self.block.outputs.first())
                .map(|port| port.width)
                .unwrap_or(1)),
        }
    }

    /// Creates a placeholder variable, registered in `contract`.
    pub fn placeholder(
        &self,
        contract: &mut Contract,
        name: &str,
        width: usize,
        binding: Binding,
    ) -> Term {
        let var = Var::real(format!("{}_{}", self.prefix, name));
        contract.placeholders.push(Placeholder {
            var: var.clone(),
            width,
            binding,
        });
        Term::Var(var)
    }

    /// Numeric or symbolic parameter, `default` if absent.
    ///
    /// Symbols become constants registered in `contract`.
    pub fn param(&self, contract: &mut Contract, key: &str, default: i64) -> Res<Term> {
        match self.block.param(key) {
            None => Ok(Term::int(default)),
            Some(value) => {
                let (term, csts) = transform::param::scalar(value).chain_err(|| {
                    format!("in parameter `{}` of block `{}`", key, self.block.name)
                })?;
                contract.constants.extend(csts);
                Ok(term)
            }
        }
    }
}
