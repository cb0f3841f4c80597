//! Common imports throughout this project.

pub use std::{
    collections::{BTreeMap as Map, BTreeSet as Set},
    fmt,
    ops::{Deref, DerefMut},
    rc::Rc,
};

pub use error_chain::bail;
pub use indexmap::{IndexMap, IndexSet};
pub use num::{bigint::Sign, BigInt as Int, BigRational as Rat, One, Signed, Zero};

pub use crate::{
    conf, contract,
    diag::{self, Level, Log},
    env, formula, model, pipeline, program, render, schedule, simulink, term, transform,
};

pub use crate::{
    formula::{Cmp, Formula},
    program::{Evolution, EvolutionContainer, Ode, Program},
    term::{Constant, Node, Op, Substitution, Term, Typ, Var, VectorTerm},
};

/// Index of a block in [`simulink::Model::blocks`], *i.e.* its declaration order.
pub type BlockId = usize;

error_chain::error_chain! {
    types {
        Error, ErrorKind, ResExt, Res;
    }

    foreign_links {
        Io(std::io::Error)
        /// I/O error.
        ;
        Json(serde_json::Error)
        /// JSON (de)serialization error.
        ;
    }

    errors {
        /// Malformed configuration.
        ///
        /// **NB**: `line` starts at one.
        Config(line: usize, msg: String) {
            description("configuration error")
            display("configuration error @{}: {}", line, msg)
        }
        /// Transformer identifier with no known transformer.
        UnknownTransformer(id: String) {
            description("unknown transformer")
            display("unknown transformer identifier `{}`", id)
        }
        /// Service name no contract rule recognizes.
        UnknownService(service: String) {
            description("unknown service")
            display("no contract matches service `{}`", service)
        }
        /// Vector substitution between terms of different widths.
        SizeMismatch(expected: usize, found: usize) {
            description("size mismatch")
            display("size mismatch: expected a vector of width {}, found width {}", expected, found)
        }
        /// The Simulink graph failed the consistency check.
        Inconsistent(issues: usize) {
            description("inconsistent model")
            display("model is inconsistent ({} issue(s))", issues)
        }
        /// An input port no line drives.
        UndrivenInput(block: String, port: usize) {
            description("undriven input port")
            display("input port {} of block `{}` is not driven by any line", port, block)
        }
        /// A block name that does not exist in the graph.
        UnknownBlock(name: String) {
            description("unknown block")
            display("unknown block `{}`", name)
        }
    }
}
