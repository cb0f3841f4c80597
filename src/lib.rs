//! Translation of Simulink block graphs into differential dynamic logic (dL).
//!
//! The entry point is [`pipeline::Transformation`]: it checks a [Simulink graph](simulink),
//! [schedules](schedule) its blocks, runs the [block transformers](transform) in order and yields
//! a [dL model](model::DLModel) of the shape `init -> [{ body }*]safety`, which [`render`] writes
//! in KeYmaera X syntax.
//!
//! Terms, formulas and hybrid programs ([`term`], [`formula`], [`program`]) support structural
//! equality and recursive substitution, see [`term::Node`]. Service blocks (S-functions...) are
//! translated through [contracts](contract) instantiated by substitution.

#![forbid(missing_docs)]

mod macros;

pub mod prelude;

pub mod conf;
pub mod contract;
pub mod diag;
pub mod env;
pub mod formula;
pub mod model;
pub mod pipeline;
pub mod program;
pub mod render;
pub mod schedule;
pub mod simulink;
pub mod term;
pub mod transform;

/// A small demo model, in JSON: an input feeding an integrator through a gain.
pub const DEMO: &str = include_str!("../rsc/demo.json");
