//! Block execution order.
//!
//! A block runs after all the blocks driving its inputs, except when a driver is *stateful*:
//! stateful blocks (integrators, delays...) output a value computed from their state, not from
//! their current inputs, so the edges leaving them can be cut to break feedback loops.
//!
//! Scheduling is Kahn's algorithm with ties broken by declaration order. When no block is ready,
//! the first pending block whose pending predecessors are all stateful is released. Blocks left
//! after that are stuck in purely algebraic loops: they are appended in declaration order and
//! reported in [`Schedule::unresolved`].

crate::prelude!();

use std::{cmp::Reverse, collections::BinaryHeap};

#[cfg(test)]
mod test;

/// A block execution order.
#[readonly::make]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// All the blocks, in execution order.
    pub order: Vec<BlockId>,
    /// Blocks part of a dependency cycle with no stateful block, suffix of `order`.
    pub unresolved: Vec<BlockId>,
}
impl Schedule {
    /// True if all dependencies could be honored.
    pub fn is_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
    /// Block names, in execution order.
    pub fn names<'m>(&self, model: &'m simulink::Model) -> Vec<&'m str> {
        self.order
            .iter()
            .map(|id| model.block(*id).name.as_str())
            .collect()
    }
}

/// Dependency graph, built once.
struct Graph {
    preds: Vec<IndexSet<BlockId>>,
    succs: Vec<Vec<BlockId>>,
    stateful: Vec<bool>,
}
impl Graph {
    fn new(model: &simulink::Model, stateful: &Set<String>) -> Self {
        let len = model.blocks.len();
        let preds: Vec<IndexSet<BlockId>> = (0..len).map(|id| model.predecessors(id)).collect();
        let mut succs = vec![vec![]; len];
        for (id, preds) in preds.iter().enumerate() {
            for pred in preds {
                succs[*pred].push(id)
            }
        }
        let stateful = model
            .blocks
            .iter()
            .map(|block| stateful.contains(&block.typ))
            .collect();
        Self {
            preds,
            succs,
            stateful,
        }
    }
}

/// Computes the execution order of the blocks of a model.
///
/// `stateful` contains the block types whose outgoing edges can be cut. Deterministic: the same
/// model and `stateful` set always yield the same schedule.
pub fn schedule(model: &simulink::Model, stateful: &Set<String>) -> Schedule {
    let graph = Graph::new(model, stateful);
    let len = graph.preds.len();

    let mut placed = vec![false; len];
    let mut pending: Vec<usize> = graph.preds.iter().map(IndexSet::len).collect();
    let mut order = Vec::with_capacity(len);

    // Sources first, in declaration order.
    let mut ready: BinaryHeap<Reverse<BlockId>> = BinaryHeap::new();
    for id in 0..len {
        if model.block(id).inputs.is_empty() && pending[id] == 0 {
            placed[id] = true;
            order.push(id);
            release(&graph, id, &mut pending, &placed, &mut ready)
        }
    }
    for id in 0..len {
        if !placed[id] && pending[id] == 0 {
            ready.push(Reverse(id))
        }
    }

    loop {
        while let Some(Reverse(id)) = ready.pop() {
            if placed[id] {
                continue;
            }
            placed[id] = true;
            order.push(id);
            release(&graph, id, &mut pending, &placed, &mut ready)
        }
        if order.len() == len {
            break;
        }

        // Stuck: cut the edges leaving stateful blocks for the first eligible block.
        let next = (0..len).find(|id| {
            !placed[*id]
                && graph.preds[*id]
                    .iter()
                    .all(|pred| placed[*pred] || graph.stateful[*pred])
        });
        match next {
            Some(id) => ready.push(Reverse(id)),
            None => break,
        }
    }

    let unresolved: Vec<BlockId> = (0..len).filter(|id| !placed[*id]).collect();
    order.extend(unresolved.iter().cloned());
    Schedule { order, unresolved }
}

/// Updates the pending counts of the successors of a block that was just placed.
fn release(
    graph: &Graph,
    id: BlockId,
    pending: &mut [usize],
    placed: &[bool],
    ready: &mut BinaryHeap<Reverse<BlockId>>,
) {
    for succ in &graph.succs[id] {
        pending[*succ] -= 1;
        if pending[*succ] == 0 && !placed[*succ] {
            ready.push(Reverse(*succ))
        }
    }
}
