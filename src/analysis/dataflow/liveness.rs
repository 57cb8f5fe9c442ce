//! Live variable analysis over the instruction graph.
//!
//! A variable is *live* at a program point if some path from that point reaches
//! a use of the variable without passing through a definition of it. Because
//! every node of a [`TacGraph`] is a single instruction, the per-node equations
//! are exact:
//!
//! - `OUT[n] = ∪ { IN[s] | s ∈ succ(n) }`
//! - `IN[n]  = USE[n] ∪ (OUT[n] − DEF[n])`
//!
//! A label uses the operands of its phis and defines their results, so phi
//! operands are live into the join point itself.
//!
//! Besides the live sets, the analysis records global def/use chains (which
//! nodes define and which nodes read a variable). The optimization passes keep
//! those chains current while they rewrite the graph through the incremental
//! methods on [`Liveness`]; the live sets themselves are only rebuilt by running
//! [`Liveness::analyze`] again.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::{
    analysis::TacGraph,
    ir::Var,
    utils::graph::NodeId,
    Error, Result,
};

static NO_NODES: BTreeSet<NodeId> = BTreeSet::new();

/// Live sets per node plus def/use chains per variable.
///
/// # Examples
///
/// ```rust
/// use tacopt::prelude::*;
///
/// let x = Vara::logical(0, DataType::I4);
/// let code = vec![
///     Tac::assign(x.clone(), Vara::i4(7)),
///     Tac::ret(x),
/// ];
/// let graph = TacGraph::build(&code)?;
/// let live = Liveness::analyze(&graph);
///
/// let x = Var::new(0, 0);
/// assert!(live.live_out(NodeId::new(0))?.contains(&x));
/// assert!(!live.live_in(NodeId::new(0))?.contains(&x));
/// # Ok::<(), tacopt::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Liveness {
    live_in: BTreeMap<NodeId, BTreeSet<Var>>,
    live_out: BTreeMap<NodeId, BTreeSet<Var>>,
    defs: BTreeMap<Var, BTreeSet<NodeId>>,
    uses: BTreeMap<Var, BTreeSet<NodeId>>,
    iterations: usize,
}

impl Liveness {
    /// Runs the backward liveness fixpoint over every node reachable in `graph`.
    ///
    /// The nodes are swept in reverse linear-stream order, which visits most
    /// successors before their predecessors, until no live set changes.
    #[must_use]
    pub fn analyze(graph: &TacGraph) -> Self {
        let order = graph.linear_stream();
        let mut live = Liveness::default();

        // Def and use sets of every node, gathered while the chains are built
        let mut local: Vec<(Vec<Var>, BTreeSet<Var>)> = Vec::with_capacity(order.len());
        for &node in &order {
            let uses = graph.uses(node);
            let defs = graph.defs(node);

            for &var in &uses {
                live.uses.entry(var).or_default().insert(node);
            }
            for &var in &defs {
                live.defs.entry(var).or_default().insert(node);
            }

            live.live_in.insert(node, BTreeSet::new());
            live.live_out.insert(node, BTreeSet::new());
            local.push((uses, defs.into_iter().collect()));
        }

        loop {
            live.iterations += 1;
            let mut changed = false;

            for (&node, (uses, defs)) in order.iter().zip(&local).rev() {
                let mut out = BTreeSet::new();
                for succ in graph.successors(node) {
                    if let Some(succ_in) = live.live_in.get(succ) {
                        out.extend(succ_in.iter().copied());
                    }
                }

                let mut inn: BTreeSet<Var> = out.difference(defs).copied().collect();
                inn.extend(uses.iter().copied());

                if live.live_out.get(&node) != Some(&out) {
                    live.live_out.insert(node, out);
                    changed = true;
                }
                if live.live_in.get(&node) != Some(&inn) {
                    live.live_in.insert(node, inn);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        debug!(
            nodes = order.len(),
            variables = live.defs.len(),
            iterations = live.iterations,
            "liveness converged"
        );
        live
    }

    /// Returns the variables live on entry to `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` was not part of the analysed graph
    /// or has since been removed.
    pub fn live_in(&self, node: NodeId) -> Result<&BTreeSet<Var>> {
        self.live_in.get(&node).ok_or(Error::MissingDataflow(node))
    }

    /// Returns the variables live on exit from `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDataflow`] if `node` was not part of the analysed graph
    /// or has since been removed.
    pub fn live_out(&self, node: NodeId) -> Result<&BTreeSet<Var>> {
        self.live_out.get(&node).ok_or(Error::MissingDataflow(node))
    }

    /// Returns the nodes that define `var`.
    #[must_use]
    pub fn defs(&self, var: Var) -> &BTreeSet<NodeId> {
        self.defs.get(&var).unwrap_or(&NO_NODES)
    }

    /// Returns the nodes that read `var`.
    #[must_use]
    pub fn uses(&self, var: Var) -> &BTreeSet<NodeId> {
        self.uses.get(&var).unwrap_or(&NO_NODES)
    }

    /// Returns every variable with a def chain entry, in ascending order.
    #[must_use]
    pub fn defined_vars(&self) -> Vec<Var> {
        self.defs.keys().copied().collect()
    }

    /// Returns every variable with a use chain entry, in ascending order.
    #[must_use]
    pub fn used_vars(&self) -> Vec<Var> {
        self.uses.keys().copied().collect()
    }

    /// Returns the nodes that carry live sets, in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.live_in.keys().copied()
    }

    /// Number of sweeps the fixpoint needed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Records that `node` reads `var`.
    pub fn add_use(&mut self, var: Var, node: NodeId) {
        self.uses.entry(var).or_default().insert(node);
    }

    /// Records that `node` defines `var`.
    pub fn add_def(&mut self, var: Var, node: NodeId) {
        self.defs.entry(var).or_default().insert(node);
    }

    /// Drops `node` from the use chain of `var`.
    ///
    /// Returns `true` if the chain contained it.
    pub fn remove_use(&mut self, var: Var, node: NodeId) -> bool {
        self.uses
            .get_mut(&var)
            .is_some_and(|nodes| nodes.remove(&node))
    }

    /// Drops `node` from the def chain of `var`.
    ///
    /// Returns `true` if the chain contained it.
    pub fn remove_def(&mut self, var: Var, node: NodeId) -> bool {
        self.defs
            .get_mut(&var)
            .is_some_and(|nodes| nodes.remove(&node))
    }

    /// Removes every trace of `node`: its live sets and its def/use chain entries.
    pub fn forget_node(&mut self, node: NodeId) {
        self.live_in.remove(&node);
        self.live_out.remove(&node);
        for nodes in self.defs.values_mut().chain(self.uses.values_mut()) {
            nodes.remove(&node);
        }
    }

    /// Drops def and use chains that no longer hold any node.
    pub fn trim_empty(&mut self) {
        self.defs.retain(|_, nodes| !nodes.is_empty());
        self.uses.retain(|_, nodes| !nodes.is_empty());
    }
}
