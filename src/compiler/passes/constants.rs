//! Sparse constant propagation with branch folding.
//!
//! Constants flow from their definitions to every use through the def/use chains
//! of the method, and compare-branches whose operands both became constant are
//! resolved, which in turn cuts off the blocks that can no longer execute.
//!
//! # Example
//!
//! Before:
//! ```text
//! v0.1 = assign_i4 5
//! v1.1 = assign_i4 10
//! v2.1 = add_i4 v0.1, v1.1
//! ret v2.1
//! ```
//!
//! After:
//! ```text
//! ret 15
//! ```
//!
//! # Algorithm
//!
//! A worklist of nodes, seeded with the linear stream, is drained:
//!
//! - **Dead blocks**: a node without predecessors that is not a start is removed
//!   and its successors are queued
//! - **Labels**: phi operands keyed by a node that is no longer a predecessor are
//!   dropped; a phi whose operands are all the same non-null constant is removed
//!   and its constant substituted into every use
//! - **Compare-branches**: with two constant operands the condition is evaluated,
//!   the edge to the target not taken is removed and the branch itself disappears
//! - **Other instructions**: an instruction that evaluates to a constant has that
//!   constant substituted into its uses and is removed once nothing reads it
//!
//! Every node whose operands changed is queued again. When the worklist is
//! empty, unreachable cycles are pruned and labels that only connect a single
//! predecessor to a single successor are removed. The procedure repeats until a
//! round changes nothing, so running the pass twice in a row is a no-op the
//! second time.
//!
//! # Limitations
//!
//! - Values are only tracked through constants written in the code; there is no
//!   lattice over unknown values, so a loop-carried variable is never folded
//! - Uses through `&v` or `[v]` block the removal of the defining instruction

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, trace};

use crate::{
    analysis::{Liveness, TacGraph},
    compiler::{pass::SsaPass, EventKind, EventLog, MethodContext},
    ir::{evaluate, evaluate_branch, ConstValue, Op, Tac, Var, Vara},
    utils::graph::NodeId,
    Result,
};

/// Nodes waiting to be visited, without duplicates.
#[derive(Default)]
struct Worklist {
    queue: VecDeque<NodeId>,
    queued: BTreeSet<NodeId>,
}

impl Worklist {
    fn push(&mut self, node: NodeId) {
        if self.queued.insert(node) {
            self.queue.push_back(node);
        }
    }

    fn pop(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        self.queued.remove(&node);
        Some(node)
    }
}

impl Extend<NodeId> for Worklist {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, iter: I) {
        for node in iter {
            self.push(node);
        }
    }
}

/// What a worklist visit does with a node.
enum Visit {
    /// Remove the node, nothing reaches it.
    DeadBlock,
    /// Prune and fold the phis of a label.
    Label,
    /// Resolve a compare-branch whose condition is known.
    Branch(bool),
    /// Propagate the constant value of an instruction.
    Fold(Var, ConstValue),
    /// Nothing to do.
    Skip,
}

/// The graph being rewritten, its def/use chains and the local change log.
struct Propagator<'a> {
    graph: &'a mut TacGraph,
    liveness: &'a mut Liveness,
    changes: &'a mut EventLog,
    worklist: Worklist,
}

impl Propagator<'_> {
    /// Drains the worklist once.
    ///
    /// Returns the number of rewrites performed.
    fn propagate(&mut self) -> Result<usize> {
        self.worklist.extend(self.graph.linear_stream());
        let mut rewrites = 0;

        while let Some(node) = self.worklist.pop() {
            let Some(tac) = self.graph.tac(node) else {
                continue;
            };

            let visit = if self.graph.predecessors(node).is_empty() && !self.graph.is_start(node) {
                Visit::DeadBlock
            } else {
                match tac {
                    Tac::Label(_) => Visit::Label,
                    Tac::Branch { op, o1, o2, .. } => {
                        evaluate_branch(*op, o1, o2).map_or(Visit::Skip, Visit::Branch)
                    }
                    Tac::Simple { op, r, o1, o2 } => match (r.logical_var(), evaluate(*op, o1, o2)) {
                        (Some(var), Some(value)) => Visit::Fold(var, value),
                        _ => Visit::Skip,
                    },
                    Tac::Call { .. } => Visit::Skip,
                }
            };

            rewrites += match visit {
                Visit::DeadBlock => self.remove_dead_block(node)?,
                Visit::Label => self.visit_label(node),
                Visit::Branch(taken) => self.fold_branch(node, taken)?,
                Visit::Fold(var, value) => self.fold_instruction(node, var, value)?,
                Visit::Skip => 0,
            };
        }

        Ok(rewrites)
    }

    /// Removes a node no path reaches any more.
    fn remove_dead_block(&mut self, node: NodeId) -> Result<usize> {
        let succs = self.graph.successors(node).to_vec();
        let text = self.graph.tac(node).map(ToString::to_string).unwrap_or_default();

        self.graph.remove_node(node, self.liveness)?;
        self.worklist.extend(succs);

        trace!(%node, "removed dead block");
        self.changes
            .record(EventKind::BlockRemoved)
            .at(node)
            .message(text);
        Ok(1)
    }

    /// Prunes stale phi operands and folds constant phis.
    fn visit_label(&mut self, node: NodeId) -> usize {
        let mut rewrites = self.prune_phi_operands(node);

        while let Some((var, value)) = self.take_constant_phi(node) {
            self.liveness.remove_def(var, node);
            let sites = self.substitute(var, value);

            trace!(%node, %var, %value, "folded phi");
            self.changes
                .record(EventKind::PhiFolded)
                .at(node)
                .message(format!("{var} = {value}"));
            self.worklist.extend(sites);
            rewrites += 1;
        }

        rewrites
    }

    /// Drops phi operands whose key is no longer a predecessor of `node`.
    fn prune_phi_operands(&mut self, node: NodeId) -> usize {
        let preds = self.graph.predecessors(node).to_vec();
        let Some(label) = self.graph.tac_mut(node).and_then(Tac::as_label_mut) else {
            return 0;
        };

        let mut stripped = Vec::new();
        for phi in &mut label.phis {
            let stale: Vec<NodeId> = phi
                .args
                .keys()
                .copied()
                .filter(|key| !preds.contains(key))
                .collect();
            for key in stale {
                if let Some(arg) = phi.args.remove(&key) {
                    stripped.push((key, arg));
                }
            }
        }

        for (key, arg) in &stripped {
            if let Some(var) = arg.var() {
                if !self.graph.reads(node, var) {
                    self.liveness.remove_use(var, node);
                }
            }
            self.changes
                .record(EventKind::PhiOperandPruned)
                .at(node)
                .message(format!("{arg} from {key}"));
        }
        stripped.len()
    }

    /// Removes the first phi of `node` whose operands are all the same non-null
    /// constant and returns the variable it defined together with that constant.
    fn take_constant_phi(&mut self, node: NodeId) -> Option<(Var, ConstValue)> {
        let label = self.graph.tac_mut(node).and_then(Tac::as_label_mut)?;

        let (position, var, value) = label.phis.iter().enumerate().find_map(|(i, phi)| {
            let var = phi.defined_var()?;
            let mut args = phi.args.values();
            let value = *args.next()?.as_const()?;
            if value.is_null() {
                return None;
            }
            args.all(|arg| arg.as_const() == Some(&value))
                .then_some((i, var, value))
        })?;

        label.phis.remove(position);
        Some((var, value))
    }

    /// Resolves the compare-branch at `node` whose condition is known to be `taken`.
    fn fold_branch(&mut self, node: NodeId, taken: bool) -> Result<usize> {
        let succs = self.graph.successors(node).to_vec();
        if let &[fall, target] = succs.as_slice() {
            let dead = if taken { fall } else { target };
            self.graph.remove_edge(node, dead, self.liveness)?;
        }

        let text = self.graph.tac(node).map(ToString::to_string).unwrap_or_default();
        self.graph.retire_node(node, self.liveness)?;
        self.worklist.extend(succs);

        trace!(%node, taken, "folded branch");
        self.changes
            .record(EventKind::BranchFolded)
            .at(node)
            .message(format!("{text} is {}", if taken { "taken" } else { "not taken" }));
        Ok(1)
    }

    /// Propagates the constant result of the instruction at `node`.
    fn fold_instruction(&mut self, node: NodeId, var: Var, value: ConstValue) -> Result<usize> {
        let sites = self.substitute(var, value);
        let mut rewrites = sites.len();
        self.worklist.extend(sites);

        if self.liveness.uses(var).is_empty() {
            let text = self.graph.tac(node).map(ToString::to_string).unwrap_or_default();
            self.graph.retire_node(node, self.liveness)?;

            trace!(%node, %var, %value, "folded instruction");
            self.changes
                .record(EventKind::ConstantFolded)
                .at(node)
                .message(format!("{text} => {value}"));
            return Ok(rewrites + 1);
        }

        // Still read through `&v` or `[v]`; keep the definition as a plain assignment
        let Some(tac) = self.graph.tac_mut(node) else {
            return Ok(rewrites);
        };
        let folded = Tac::Simple {
            op: Op::assign(value.data_type()),
            r: tac.result().cloned().unwrap_or(Vara::Void),
            o1: Vara::constant(value, value.data_type()),
            o2: Vara::Void,
        };
        if *tac == folded {
            return Ok(rewrites);
        }

        let old = std::mem::replace(tac, folded);
        for used in old.uses() {
            if !self.graph.reads(node, used) {
                self.liveness.remove_use(used, node);
            }
        }
        self.changes
            .record(EventKind::ConstantFolded)
            .at(node)
            .message(format!("{old} => {value}"));
        rewrites += 1;
        Ok(rewrites)
    }

    /// Replaces every plain use of `var` by `value`.
    ///
    /// A site stays in the use chain of `var` only if it still reads the variable
    /// through `&v` or `[v]`. Returns the sites where an operand was replaced.
    fn substitute(&mut self, var: Var, value: ConstValue) -> Vec<NodeId> {
        let sites: Vec<NodeId> = self.liveness.uses(var).iter().copied().collect();
        let mut changed = Vec::new();

        for site in sites {
            let Some(tac) = self.graph.tac_mut(site) else {
                self.liveness.remove_use(var, site);
                continue;
            };

            let mut replaced = false;
            let mut replace = |slot: &mut Vara| {
                if slot.logical_var() == Some(var) {
                    *slot = Vara::constant(value, slot.data_type());
                    replaced = true;
                }
            };
            match tac {
                Tac::Label(label) => {
                    for phi in &mut label.phis {
                        phi.args.values_mut().for_each(&mut replace);
                    }
                }
                Tac::Simple { o1, o2, .. } | Tac::Branch { o1, o2, .. } => {
                    replace(o1);
                    replace(o2);
                }
                Tac::Call { target, args, .. } => {
                    replace(target);
                    args.iter_mut().for_each(&mut replace);
                }
            }

            if !self.graph.reads(site, var) {
                self.liveness.remove_use(var, site);
            }
            if replaced {
                self.changes
                    .record(EventKind::ConstantSubstituted)
                    .at(site)
                    .message(format!("{var} -> {value}"));
                changed.push(site);
            }
        }

        changed
    }

    /// Removes unreachable cycles and labels that only link one node to another.
    ///
    /// Returns the number of nodes removed.
    fn sweep(&mut self) -> Result<usize> {
        let before = self.graph.node_count();
        let affected = self.graph.prune_unreachable(self.liveness)?;
        let pruned = before - self.graph.node_count();
        if pruned > 0 {
            self.changes
                .record(EventKind::BlockRemoved)
                .message(format!("{pruned} unreachable nodes"));
            self.worklist.extend(affected);
        }

        let mut labels = 0;
        for node in self.graph.linear_stream() {
            if !self.is_redundant_label(node) {
                continue;
            }
            let text = self.graph.tac(node).map(ToString::to_string).unwrap_or_default();
            self.graph.remove_node(node, self.liveness)?;
            self.changes
                .record(EventKind::LabelRemoved)
                .at(node)
                .message(text);
            labels += 1;
        }

        Ok(pruned + labels)
    }

    /// A non-start label without phis between exactly one predecessor and one successor.
    fn is_redundant_label(&self, node: NodeId) -> bool {
        let Some(label) = self.graph.tac(node).and_then(Tac::as_label) else {
            return false;
        };
        let preds = self.graph.predecessors(node);
        let succs = self.graph.successors(node);

        label.phis.is_empty()
            && !self.graph.is_start(node)
            && preds.len() == 1
            && succs.len() == 1
            && preds[0] != node
            && succs[0] != node
            && self.graph.is_removable(node)
    }
}

/// Constant propagation and branch folding pass.
///
/// Substitutes constants for the variables they are assigned to, evaluates
/// instructions and compare-branches whose operands are all constant, and
/// removes the code that becomes unreachable as a result.
pub struct ConstantPropagationPass;

impl Default for ConstantPropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPropagationPass {
    /// Creates a new constant propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs constant propagation on a graph in SSA form until nothing changes.
    ///
    /// Returns the number of rewrites performed.
    fn run_propagation(
        graph: &mut TacGraph,
        liveness: &mut Liveness,
        changes: &mut EventLog,
    ) -> Result<usize> {
        let mut propagator = Propagator {
            graph,
            liveness,
            changes,
            worklist: Worklist::default(),
        };

        let mut total = 0;
        let mut rounds = 0;
        loop {
            rounds += 1;
            let round = propagator.propagate()? + propagator.sweep()?;
            if round == 0 {
                break;
            }
            total += round;
        }

        debug!(rewrites = total, rounds, "constant propagation finished");
        Ok(total)
    }
}

impl SsaPass for ConstantPropagationPass {
    fn name(&self) -> &'static str {
        "constant-propagation"
    }

    fn description(&self) -> &'static str {
        "Propagates constants, folds constant instructions and branches, removes dead blocks"
    }

    fn run_on_method(&self, ctx: &mut MethodContext) -> Result<bool> {
        let mut changes = EventLog::new();

        Self::run_propagation(&mut ctx.graph, &mut ctx.liveness, &mut changes)?;

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(changes);
        }
        Ok(changed)
    }
}
