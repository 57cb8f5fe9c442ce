//! SSA destruction.
//!
//! Every phi-function is replaced by copies on the incoming edges of its label.
//! For a predecessor `p` of the label, the copies `result = operand[p]` of all
//! phis of that label form one chain of assignments:
//!
//! - if `p` is a branch, a fresh chain is spliced in front of `p` on every edge
//!   into `p` (and becomes a start if `p` was one), so the copies run before the
//!   branch whichever way it goes
//! - otherwise the chain is spliced onto the edge `p → label`
//!
//! Splicing replaces the old successor in place, so fall-through edges remain
//! fall-through edges.

use tracing::debug;

use crate::{
    analysis::{NodeMap, TacGraph},
    ir::{Op, Phi, Tac, Vara},
    utils::graph::NodeId,
    Result,
};

/// Converts a graph out of SSA form.
///
/// The input graph is cloned first and never modified. SSA versions stay part of
/// the variable names in the result; only the phis disappear.
///
/// # Returns
///
/// The phi-free graph and the map from the nodes of `graph` to their clones.
///
/// # Errors
///
/// Returns [`Error::Invariant`](crate::Error::Invariant) if a phi has no operand for
/// one of its label's predecessors.
pub fn convert_from_ssa(graph: &TacGraph) -> Result<(TacGraph, NodeMap)> {
    let (mut out, map) = graph.build_parent_graph();

    let labels: Vec<NodeId> = out
        .linear_stream()
        .into_iter()
        .filter(|&node| {
            out.tac(node)
                .and_then(Tac::as_label)
                .is_some_and(|label| !label.phis.is_empty())
        })
        .collect();

    let mut copies_inserted = 0;
    for label in labels {
        let phis = match out.tac_mut(label).and_then(Tac::as_label_mut) {
            Some(l) => std::mem::take(&mut l.phis),
            None => continue,
        };

        for pred in out.predecessors(label).to_vec() {
            let copies = copies_for(&phis, label, pred)?;
            copies_inserted += copies.len();

            if out.tac(pred).is_some_and(Tac::is_branch) {
                for before in out.predecessors(pred).to_vec() {
                    let (head, tail) = append_chain(&mut out, &copies, pred)?;
                    out.add_edge(tail, pred)?;
                    out.replace_successor(before, pred, head)?;
                }
                if out.is_start(pred) {
                    let (head, tail) = append_chain(&mut out, &copies, pred)?;
                    out.add_edge(tail, pred)?;
                    out.replace_start(pred, head)?;
                }
            } else {
                let (head, tail) = append_chain(&mut out, &copies, label)?;
                out.add_edge(tail, label)?;
                out.replace_successor(pred, label, head)?;
            }
        }
    }

    debug!(copies = copies_inserted, "converted out of SSA form");
    Ok((out, map))
}

/// Builds the copies that resolve `phis` along the edge from `pred`.
fn copies_for(phis: &[Phi], label: NodeId, pred: NodeId) -> Result<Vec<Tac>> {
    phis.iter()
        .map(|phi| {
            let operand = phi.args.get(&pred).ok_or_else(|| {
                invariant_error!("phi {} at {} has no operand for {}", phi.result, label, pred)
            })?;
            Ok(Tac::Simple {
                op: Op::assign(phi.ty),
                r: phi.result.clone(),
                o1: operand.clone(),
                o2: Vara::Void,
            })
        })
        .collect()
}

/// Adds `copies` as a chain of new nodes derived from `origin`.
///
/// Returns the first and last node of the chain. The chain is not yet connected
/// to the rest of the graph.
fn append_chain(graph: &mut TacGraph, copies: &[Tac], origin: NodeId) -> Result<(NodeId, NodeId)> {
    let mut nodes = copies
        .iter()
        .map(|copy| graph.add_node(copy.clone(), Some(origin)));
    let head = nodes
        .next()
        .ok_or_else(|| invariant_error!("empty copy chain for {}", origin))?;
    let rest: Vec<NodeId> = nodes.collect();

    let mut tail = head;
    for node in rest {
        graph.add_edge(tail, node)?;
        tail = node;
    }
    Ok((head, tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{construct, Liveness},
        ir::{DataType, OpKind},
        test::{counting_loop, diamond, n},
        utils::graph::algorithms::DomTree,
    };

    fn to_ssa(code: &[Tac]) -> Result<TacGraph> {
        let graph = TacGraph::build(code)?;
        let dom = DomTree::build(&graph);
        let live = Liveness::analyze(&graph);
        Ok(construct(&graph, &dom, &live)?.graph)
    }

    fn has_phis(graph: &TacGraph) -> bool {
        graph.node_ids().any(|node| {
            graph
                .tac(node)
                .and_then(Tac::as_label)
                .is_some_and(|label| !label.phis.is_empty())
        })
    }

    #[test]
    fn test_diamond_copies_on_edges() -> Result<()> {
        let ssa = to_ssa(&diamond())?;
        let (out, map) = convert_from_ssa(&ssa)?;

        assert!(!has_phis(&out));
        assert_eq!(map.len(), ssa.node_count());
        out.check_edge_symmetry()?;

        // The `br` into the join gets its copy in front of it
        let before_br = out.predecessors(n(3));
        assert_eq!(before_br.len(), 1);
        let copy = out.tac(before_br[0]).unwrap();
        assert_eq!(copy.op(), Some(Op::assign(DataType::I4)));
        assert_eq!(out.node(before_br[0]).and_then(|node| node.inner()), Some(n(3)));

        // The fall-through edge n5 -> n6 gets its copy spliced in
        let after_n5 = out.successors(n(5));
        assert_eq!(after_n5.len(), 1);
        assert_ne!(after_n5[0], n(6));
        assert_eq!(out.successors(after_n5[0]), &[n(6)]);
        Ok(())
    }

    #[test]
    fn test_loop_copies() -> Result<()> {
        let ssa = to_ssa(&counting_loop())?;
        let (out, _) = convert_from_ssa(&ssa)?;

        assert!(!has_phis(&out));
        assert_eq!(out.node_count(), ssa.node_count() + 2);
        out.check_edge_symmetry()
    }

    #[test]
    fn test_branch_start_gets_new_start() -> Result<()> {
        // The start itself is a branch into a join with a phi
        let x = Vara::logical(0, DataType::I4);
        let y = Vara::logical(1, DataType::I4);
        let code = vec![
            Tac::branch(Op::new(OpKind::Beq, DataType::I4), x, Vara::i4(0), 1), // n0
            Tac::assign(y.clone(), Vara::i4(4)),                                // n1
            Tac::label(1),                                                      // n2
            Tac::ret(y),                                                        // n3
        ];
        let ssa = to_ssa(&code)?;
        let (out, _) = convert_from_ssa(&ssa)?;

        assert_eq!(out.starts().len(), 1);
        let start = out.starts()[0];
        assert_ne!(start, n(0));
        assert_eq!(out.successors(start), &[n(0)]);
        assert!(out.predecessors(n(0)).contains(&start));
        out.check_edge_symmetry()
    }

    #[test]
    fn test_copy_before_compare_branch_runs_on_both_outcomes() -> Result<()> {
        let x = Vara::logical(0, DataType::I4);
        let y = Vara::logical(1, DataType::I4);
        let code = vec![
            Tac::assign(y.clone(), Vara::i4(7)),                                 // n0
            Tac::branch(Op::new(OpKind::Beq, DataType::I4), x, Vara::i4(0), 1), // n1
            Tac::assign(y.clone(), Vara::i4(4)),                                 // n2
            Tac::label(1),                                                       // n3
            Tac::ret(y.clone()),                                                 // n4
        ];
        let ssa = to_ssa(&code)?;
        let (out, _) = convert_from_ssa(&ssa)?;

        // The copy for the edge n1 -> n3 sits in front of the branch
        let copy = out.successors(n(0))[0];
        assert_eq!(out.tac(copy), Some(&Tac::assign(y.with_version(3), y.with_version(1))));
        assert_eq!(out.successors(copy), &[n(1)]);
        assert_eq!(out.successors(n(1)), &[n(2), n(3)]);

        // The fall-through outcome runs it too, then overwrites it on its own edge
        let other = out.successors(n(2))[0];
        assert_eq!(out.tac(other), Some(&Tac::assign(y.with_version(3), y.with_version(2))));
        assert_eq!(out.successors(other), &[n(3)]);
        out.check_edge_symmetry()
    }

    #[test]
    fn test_missing_operand_is_invariant_error() -> Result<()> {
        let mut ssa = to_ssa(&diamond())?;
        if let Some(label) = ssa.tac_mut(n(6)).and_then(Tac::as_label_mut) {
            label.phis[0].args.remove(&n(5));
        }
        assert!(matches!(
            convert_from_ssa(&ssa),
            Err(crate::Error::Invariant { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_construct_then_destruct_without_phis_is_identity() -> Result<()> {
        let graph = TacGraph::build(&crate::test::straight_line())?;
        let dom = DomTree::build(&graph);
        let live = Liveness::analyze(&graph);
        let ssa = construct(&graph, &dom, &live)?;
        let (out, _) = convert_from_ssa(&ssa.graph)?;

        assert_eq!(out.node_count(), graph.node_count());
        assert_eq!(out.linear_stream(), graph.linear_stream());
        Ok(())
    }
}
