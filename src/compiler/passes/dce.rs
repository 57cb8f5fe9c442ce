//! Dead Code Elimination (DCE) pass.
//!
//! Removes definitions whose value is never read. In SSA form every variable
//! version has exactly one definition, so a version with an empty use chain can
//! be dropped together with its definition. Dropping it may empty the use
//! chains of its operands in turn, which are then examined again.
//!
//! # Example
//!
//! Before:
//! ```text
//! v0.1 = assign_i4 7     // never read
//! v1.1 = call f()
//! ret v1.1
//! ```
//!
//! After:
//! ```text
//! v1.1 = call f()
//! ret v1.1
//! ```
//!
//! Calls are never removed, even when their result is unused, and neither are
//! returns, throws and branches, which define nothing.

use tracing::{debug, trace};

use crate::{
    analysis::{Liveness, TacGraph},
    compiler::{pass::SsaPass, EventKind, EventLog, MethodContext},
    ir::{OpFlags, Phi, Tac, Var},
    utils::graph::NodeId,
    Result,
};

/// Dead code elimination pass.
///
/// Works through a worklist of variables, seeded with every defined variable.
/// A variable nobody reads loses its definition: a phi is deleted from its
/// label, an instruction is taken out of the graph.
pub struct DeadCodeEliminationPass;

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeEliminationPass {
    /// Creates a new DCE pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs DCE on a graph in SSA form.
    ///
    /// Returns the number of definitions removed.
    fn run_dce(
        graph: &mut TacGraph,
        liveness: &mut Liveness,
        changes: &mut EventLog,
    ) -> Result<usize> {
        let mut worklist: Vec<Var> = liveness.defined_vars();
        worklist.reverse();
        let mut removed = 0;

        while let Some(var) = worklist.pop() {
            if !liveness.uses(var).is_empty() {
                continue;
            }

            let defs: Vec<NodeId> = liveness.defs(var).iter().copied().collect();
            for node in defs {
                match graph.tac(node) {
                    None => {
                        liveness.remove_def(var, node);
                    }
                    Some(Tac::Label(_)) => {
                        let Some(phi) = Self::take_phi(graph, node, var) else {
                            liveness.remove_def(var, node);
                            continue;
                        };
                        liveness.remove_def(var, node);
                        for arg in phi.args.values().filter_map(|arg| arg.var()) {
                            if !graph.reads(node, arg) {
                                liveness.remove_use(arg, node);
                            }
                            worklist.push(arg);
                        }

                        trace!(%node, %var, "removed dead phi");
                        changes
                            .record(EventKind::PhiRemoved)
                            .at(node)
                            .message(phi.to_string());
                        removed += 1;
                    }
                    Some(tac) if Self::has_side_effects(tac) => {}
                    Some(tac) => {
                        let reads = tac.uses();
                        let text = tac.to_string();
                        graph.retire_node(node, liveness)?;
                        worklist.extend(reads);

                        trace!(%node, %var, "removed dead instruction");
                        changes
                            .record(EventKind::InstructionRemoved)
                            .at(node)
                            .message(text);
                        removed += 1;
                    }
                }
            }
        }

        debug!(removed, "dead code elimination finished");
        Ok(removed)
    }

    /// Removes the phi defining `var` from the label at `node`.
    fn take_phi(graph: &mut TacGraph, node: NodeId, var: Var) -> Option<Phi> {
        let label = graph.tac_mut(node).and_then(Tac::as_label_mut)?;
        let position = label
            .phis
            .iter()
            .position(|phi| phi.defined_var() == Some(var))?;
        Some(label.phis.remove(position))
    }

    fn has_side_effects(tac: &Tac) -> bool {
        tac.op()
            .is_some_and(|op| op.kind.flags().contains(OpFlags::SIDE_EFFECTS))
    }
}

impl SsaPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes definitions whose values are never used"
    }

    fn run_on_method(&self, ctx: &mut MethodContext) -> Result<bool> {
        let mut changes = EventLog::new();

        Self::run_dce(&mut ctx.graph, &mut ctx.liveness, &mut changes)?;

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(changes);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::construct,
        ir::{DataType, Label, Op, OpKind, Vara},
        test::{counting_loop, diamond, n},
        utils::graph::algorithms::DomTree,
    };

    fn ssa_context(code: &[Tac]) -> Result<MethodContext> {
        let graph = TacGraph::build(code)?;
        let dom = DomTree::build(&graph);
        let live = Liveness::analyze(&graph);
        let ssa = construct(&graph, &dom, &live)?;
        let liveness = Liveness::analyze(&ssa.graph);
        Ok(MethodContext::new(ssa.graph, liveness))
    }

    #[test]
    fn test_dead_assignment_removed() -> Result<()> {
        let x = Vara::logical(0, DataType::I4);
        let y = Vara::logical(1, DataType::I4);
        let code = vec![
            Tac::assign(x, Vara::i4(7)),
            Tac::assign(y.clone(), Vara::i4(1)),
            Tac::ret(y),
        ];
        let mut ctx = ssa_context(&code)?;

        assert!(DeadCodeEliminationPass::new().run_on_method(&mut ctx)?);
        // The start stays behind as an empty entry label
        assert_eq!(ctx.graph.tac(n(0)), Some(&Tac::Label(Label::default())));
        assert_eq!(ctx.graph.starts(), &[n(0)]);
        assert_eq!(ctx.graph.successors(n(0)), &[n(1)]);
        assert_eq!(ctx.events.count(EventKind::InstructionRemoved), 1);
        Ok(())
    }

    #[test]
    fn test_chains_are_removed_transitively() -> Result<()> {
        let a = Vara::logical(0, DataType::I4);
        let b = Vara::logical(1, DataType::I4);
        let code = vec![
            Tac::assign(a.clone(), Vara::i4(1)),
            Tac::binary(Op::new(OpKind::Mul, DataType::I4), b, a, Vara::i4(2)),
            Tac::ret_void(),
        ];
        let mut ctx = ssa_context(&code)?;
        DeadCodeEliminationPass::new().run_on_method(&mut ctx)?;

        assert_eq!(ctx.graph.node_count(), 2);
        assert!(!ctx.graph.contains(n(1)));
        assert!(ctx.liveness.used_vars().iter().all(|&var| ctx.liveness.uses(var).is_empty()));
        Ok(())
    }

    #[test]
    fn test_calls_are_kept() -> Result<()> {
        let r = Vara::logical(0, DataType::I4);
        let code = vec![
            Tac::call(r, Vara::logical(1, DataType::I), vec![]),
            Tac::ret_void(),
        ];
        let mut ctx = ssa_context(&code)?;

        assert!(!DeadCodeEliminationPass::new().run_on_method(&mut ctx)?);
        assert!(ctx.graph.tac(n(0)).is_some_and(Tac::is_call));
        Ok(())
    }

    #[test]
    fn test_dead_phi_and_its_operands_removed() -> Result<()> {
        // v2 = v1 on one arm is dead; v1 is still returned
        let mut ctx = ssa_context(&diamond())?;
        DeadCodeEliminationPass::new().run_on_method(&mut ctx)?;

        assert!(!ctx.graph.contains(n(2)));
        assert!(ctx.graph.contains(n(1)));
        assert!(ctx.graph.contains(n(5)));
        ctx.graph.check_phi_operands()?;
        ctx.graph.check_edge_symmetry()
    }

    #[test]
    fn test_live_loop_is_untouched() -> Result<()> {
        let mut ctx = ssa_context(&counting_loop())?;
        let before = ctx.graph.clone();

        assert!(!DeadCodeEliminationPass::new().run_on_method(&mut ctx)?);
        assert_eq!(ctx.graph, before);
        Ok(())
    }
}
