//! Dominator sets, dominator tree and dominance frontiers.
//!
//! A node `d` **dominates** a node `n` if every path from a start node to `n`
//! passes through `d`. The **immediate dominator** of `n` is the strict dominator
//! of `n` that every other strict dominator of `n` also dominates. Linking every
//! node to its immediate dominator yields the dominator tree; a graph with several
//! start nodes yields a forest, with one root per start (plus any join only
//! reachable through more than one start).
//!
//! # Algorithm
//!
//! Dominator sets are computed by the classical iterative fixpoint over the
//! linear stream:
//!
//! - `Dom[s] = {s}` for every start `s`
//! - `Dom[n] = {n} ∪ ⋂ { Dom[p] | p ∈ preds(n) }`, initialised to "all nodes"
//!
//! The sets are stored as [`BitSet`]s, so each intersection is a word-wise AND.
//! Because the dominators of a node form a chain, the immediate dominator of `n`
//! is the strict dominator whose own set is exactly one smaller than `Dom[n]`.
//!
//! Dominance frontiers follow the recursive formulation over the dominator tree,
//! evaluated bottom-up with an explicit stack:
//!
//! - `DF_local[n] = { y ∈ succ(n) | idom(y) ≠ n }`
//! - `DF_up[n] = { w ∈ DF[c] | c ∈ children(n), n does not strictly dominate w }`
//! - `DF[n] = DF_local[n] ∪ DF_up[n]`
//!
//! # Examples
//!
//! ```rust
//! use tacopt::prelude::*;
//!
//! let x = Vara::logical(0, DataType::I4);
//! let code = vec![
//!     Tac::branch(Op::new(OpKind::Bge, DataType::I4), x.clone(), Vara::i4(0), 1), // n0
//!     Tac::assign(x.clone(), Vara::i4(1)),                                          // n1
//!     Tac::label(1),                                                                // n2
//!     Tac::ret(x),                                                                  // n3
//! ];
//! let graph = TacGraph::build(&code)?;
//! let dom = DomTree::build(&graph);
//!
//! assert_eq!(dom.immediate_dominator(NodeId::new(2))?, Some(NodeId::new(0)));
//! assert_eq!(dom.frontier(NodeId::new(1))?, &[NodeId::new(2)]);
//! # Ok::<(), tacopt::Error>(())
//! ```

use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    utils::{
        graph::{algorithms::linear_stream, NodeId, RootedGraph},
        BitSet,
    },
    Error, Result,
};

/// Dominance information for every node reachable from the start nodes of a graph.
///
/// The tree is a snapshot: it describes the graph as it was when
/// [`DomTree::build`] ran. Queries for nodes that were not reachable at that time
/// fail with [`Error::MissingDataflow`].
#[derive(Debug, Clone)]
pub struct DomTree {
    /// Reachable nodes in linear-stream order.
    nodes: Vec<NodeId>,
    /// Membership of `nodes`, indexed by arena slot.
    present: BitSet,
    /// Dominator set per arena slot (`None` for absent nodes).
    doms: Vec<Option<BitSet>>,
    /// Immediate dominator per arena slot.
    idom: Vec<Option<NodeId>>,
    /// Dominator-tree children per arena slot, in linear-stream order.
    children: Vec<Vec<NodeId>>,
    /// Dominance frontier per arena slot, sorted by node id.
    frontiers: Vec<Vec<NodeId>>,
    /// Nodes without an immediate dominator.
    roots: Vec<NodeId>,
    /// Sweeps the dominator fixpoint needed to converge.
    iterations: usize,
}

impl DomTree {
    /// Computes dominators, the dominator tree and dominance frontiers of `graph`.
    ///
    /// # Arguments
    ///
    /// * `graph` - The graph to analyse. Only nodes reachable from its starts are covered.
    ///
    /// # Returns
    ///
    /// The complete dominance information for the reachable part of `graph`.
    #[must_use]
    pub fn build<G: RootedGraph + ?Sized>(graph: &G) -> Self {
        let capacity = graph.capacity();
        let nodes = linear_stream(graph);

        let mut present = BitSet::new(capacity);
        for node in &nodes {
            present.insert(node.index());
        }

        let mut is_start = BitSet::new(capacity);
        for start in graph.starts() {
            is_start.insert(start.index());
        }

        let mut doms: Vec<Option<BitSet>> = vec![None; capacity];
        for &node in &nodes {
            let set = if is_start.contains(node.index()) {
                let mut own = BitSet::new(capacity);
                own.insert(node.index());
                own
            } else {
                present.clone()
            };
            doms[node.index()] = Some(set);
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut changed = false;

            for &node in &nodes {
                if is_start.contains(node.index()) {
                    continue;
                }

                let mut set = present.clone();
                for pred in graph.predecessors(node) {
                    if let Some(pred_doms) = &doms[pred.index()] {
                        set.intersect_with(pred_doms);
                    }
                }
                set.insert(node.index());

                if doms[node.index()].as_ref() != Some(&set) {
                    doms[node.index()] = Some(set);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        let mut idom = vec![None; capacity];
        let mut children = vec![Vec::new(); capacity];
        let mut roots = Vec::new();
        for &node in &nodes {
            let Some(set) = &doms[node.index()] else {
                continue;
            };
            let depth = set.count();
            let parent = set.iter().map(NodeId::new).find(|&d| {
                d != node
                    && doms[d.index()]
                        .as_ref()
                        .is_some_and(|d_set| d_set.count() + 1 == depth)
            });

            match parent {
                Some(parent) => {
                    idom[node.index()] = Some(parent);
                    children[parent.index()].push(node);
                }
                None => roots.push(node),
            }
        }

        let mut tree = DomTree {
            nodes,
            present,
            doms,
            idom,
            children,
            frontiers: vec![Vec::new(); capacity],
            roots,
            iterations,
        };
        tree.compute_frontiers(graph);

        trace!(
            nodes = tree.nodes.len(),
            roots = tree.roots.len(),
            iterations,
            "dominator tree built"
        );
        tree
    }

    /// Fills `frontiers` by a post-order walk of the dominator tree.
    fn compute_frontiers<G: RootedGraph + ?Sized>(&mut self, graph: &G) {
        enum Visit {
            Enter(NodeId),
            Exit(NodeId),
        }

        let mut stack: Vec<Visit> = self.roots.iter().rev().map(|&r| Visit::Enter(r)).collect();
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node) => {
                    stack.push(Visit::Exit(node));
                    for &child in self.children[node.index()].iter().rev() {
                        stack.push(Visit::Enter(child));
                    }
                }
                Visit::Exit(node) => {
                    let mut frontier = BTreeSet::new();

                    for &succ in graph.successors(node) {
                        if self.present.contains(succ.index())
                            && self.idom[succ.index()] != Some(node)
                        {
                            frontier.insert(succ);
                        }
                    }

                    for &child in &self.children[node.index()] {
                        for &w in &self.frontiers[child.index()] {
                            if !self.strictly_dominates_unchecked(node, w) {
                                frontier.insert(w);
                            }
                        }
                    }

                    self.frontiers[node.index()] = frontier.into_iter().collect();
                }
            }
        }
    }

    fn strictly_dominates_unchecked(&self, a: NodeId, b: NodeId) -> bool {
        a != b
            && self.doms[b.index()]
                .as_ref()
                .is_some_and(|set| set.contains(a.index()))
    }

    fn check(&self, node: NodeId) -> Result<()> {
        if self.present.contains(node.index()) {
            Ok(())
        } else {
            Err(Error::MissingDataflow(node))
        }
    }

    /// Returns `true` if `node` was reachable when the tree was built.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.present.contains(node.index())
    }

    /// Returns the covered nodes in linear-stream order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Returns the roots of the dominator forest in linear-stream order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Returns the number of sweeps the dominator fixpoint needed.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the dominator set of `node` (including `node` itself).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` is not covered by this tree.
    pub fn dominator_set(&self, node: NodeId) -> Result<&BitSet> {
        self.doms
            .get(node.index())
            .and_then(Option::as_ref)
            .ok_or(Error::MissingDataflow(node))
    }

    /// Returns the dominators of `node` in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` is not covered by this tree.
    pub fn dominators(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.dominator_set(node)?.iter().map(NodeId::new).collect())
    }

    /// Returns the immediate dominator of `node`, or `None` for a root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` is not covered by this tree.
    pub fn immediate_dominator(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.check(node)?;
        Ok(self.idom[node.index()])
    }

    /// Returns the children of `node` in the dominator tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` is not covered by this tree.
    pub fn children(&self, node: NodeId) -> Result<&[NodeId]> {
        self.check(node)?;
        Ok(&self.children[node.index()])
    }

    /// Returns the dominance frontier of `node`, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` is not covered by this tree.
    pub fn frontier(&self, node: NodeId) -> Result<&[NodeId]> {
        self.check(node)?;
        Ok(&self.frontiers[node.index()])
    }

    /// Returns `true` if `a` dominates `b`. Every node dominates itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if either node is not covered by this tree.
    pub fn dominates(&self, a: NodeId, b: NodeId) -> Result<bool> {
        self.check(a)?;
        Ok(self.dominator_set(b)?.contains(a.index()))
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if either node is not covered by this tree.
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> Result<bool> {
        Ok(a != b && self.dominates(a, b)?)
    }

    /// Returns the depth of `node` in the dominator tree (roots have depth 0).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` is not covered by this tree.
    pub fn depth(&self, node: NodeId) -> Result<usize> {
        Ok(self.dominator_set(node)?.count() - 1)
    }
}
