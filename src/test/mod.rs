//! Shared fixtures for unit tests.

use crate::{
    ir::{DataType, Op, OpKind, Tac, Vara},
    utils::graph::{NodeId, Predecessors, RootedGraph, Successors},
};

/// Shorthand for `NodeId::new(i)`.
pub(crate) fn n(i: usize) -> NodeId {
    NodeId::new(i)
}

/// A bare adjacency-list graph for exercising the generic graph algorithms.
pub(crate) struct AdjGraph {
    succs: Vec<Vec<NodeId>>,
    preds: Vec<Vec<NodeId>>,
    starts: Vec<NodeId>,
}

impl AdjGraph {
    /// Builds a graph with `count` nodes. Edge order is kept, so the first edge
    /// listed for a node is its fall-through edge.
    pub(crate) fn new(count: usize, edges: &[(usize, usize)], starts: &[usize]) -> Self {
        let mut succs = vec![Vec::new(); count];
        let mut preds = vec![Vec::new(); count];
        for &(from, to) in edges {
            succs[from].push(n(to));
            preds[to].push(n(from));
        }
        AdjGraph {
            succs,
            preds,
            starts: starts.iter().map(|&s| n(s)).collect(),
        }
    }
}

impl Successors for AdjGraph {
    fn capacity(&self) -> usize {
        self.succs.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        node.index() < self.succs.len()
    }

    fn successors(&self, node: NodeId) -> &[NodeId] {
        self.succs.get(node.index()).map_or(&[], Vec::as_slice)
    }
}

impl Predecessors for AdjGraph {
    fn predecessors(&self, node: NodeId) -> &[NodeId] {
        self.preds.get(node.index()).map_or(&[], Vec::as_slice)
    }
}

impl RootedGraph for AdjGraph {
    fn starts(&self) -> &[NodeId] {
        &self.starts
    }
}

fn v(id: u32) -> Vara {
    Vara::logical(id, DataType::I4)
}

/// `v0 = 5; v1 = 10; v2 = v0 + v1; ret v2`
pub(crate) fn straight_line() -> Vec<Tac> {
    vec![
        Tac::assign(v(0), Vara::i4(5)),
        Tac::assign(v(1), Vara::i4(10)),
        Tac::binary(Op::new(OpKind::Add, DataType::I4), v(2), v(0), v(1)),
        Tac::ret(v(2)),
    ]
}

/// Two assignments to `v1` that meet at label 2.
///
/// ```text
/// n0: bge_i4 v0, 0 -> 1
/// n1: v1 = 1
/// n2: v2 = v1
/// n3: br 2
/// n4: label 1
/// n5: v1 = 2
/// n6: label 2
/// n7: ret v1
/// ```
pub(crate) fn diamond() -> Vec<Tac> {
    vec![
        Tac::branch(Op::new(OpKind::Bge, DataType::I4), v(0), Vara::i4(0), 1),
        Tac::assign(v(1), Vara::i4(1)),
        Tac::assign(v(2), v(1)),
        Tac::br(2),
        Tac::label(1),
        Tac::assign(v(1), Vara::i4(2)),
        Tac::label(2),
        Tac::ret(v(1)),
    ]
}

/// A counter running from 0 to 10.
///
/// ```text
/// n0: v0 = 0
/// n1: label 1
/// n2: bge_i4 v0, 10 -> 2
/// n3: v0 = v0 + 1
/// n4: br 1
/// n5: label 2
/// n6: ret v0
/// ```
pub(crate) fn counting_loop() -> Vec<Tac> {
    vec![
        Tac::assign(v(0), Vara::i4(0)),
        Tac::label(1),
        Tac::branch(Op::new(OpKind::Bge, DataType::I4), v(0), Vara::i4(10), 2),
        Tac::binary(Op::new(OpKind::Add, DataType::I4), v(0), v(0), Vara::i4(1)),
        Tac::br(1),
        Tac::label(2),
        Tac::ret(v(0)),
    ]
}
