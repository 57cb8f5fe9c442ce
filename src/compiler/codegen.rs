//! Emission of a flat instruction list from an instruction graph.
//!
//! The graph carries control flow in its edges; the flat list carries it in
//! block ids and fall-through order. Emission walks a node order (normally the
//! linear stream) and re-establishes the flat encoding:
//!
//! - every branch targets the block id of the successor it actually jumps to
//! - a fall-through successor that is not emitted next is reached by an explicit `br`
//! - a jump target that is not a numbered label gets a fresh label in front of
//!   it, numbered above every block id in use
//! - anonymous labels that nothing jumps to are not emitted
//!
//! Phi-functions cannot be expressed in the flat list, so the graph must be out
//! of SSA form.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    analysis::TacGraph,
    ir::{Label, Tac},
    utils::graph::NodeId,
    Result,
};

/// Turns a phi-free [`TacGraph`] into a flat instruction list.
pub struct CodeGenerator<'a> {
    graph: &'a TacGraph,
    order: &'a [NodeId],
    /// Block id for every node that is jumped to.
    block_ids: BTreeMap<NodeId, u32>,
    /// Next fresh block id.
    next_block_id: u32,
}

impl<'a> CodeGenerator<'a> {
    /// Creates a generator emitting the nodes of `graph` in `order`.
    ///
    /// # Arguments
    ///
    /// * `graph` - A graph without phi-functions
    /// * `order` - The emission order, normally [`TacGraph::linear_stream`]
    /// * `first_fresh_block_id` - Lowest block id fresh labels may use; raised
    ///   above every block id of `graph` if necessary
    #[must_use]
    pub fn new(graph: &'a TacGraph, order: &'a [NodeId], first_fresh_block_id: u32) -> Self {
        let above_graph = graph.max_block_id().map_or(0, |id| id.saturating_add(1));
        CodeGenerator {
            graph,
            order,
            block_ids: BTreeMap::new(),
            next_block_id: first_fresh_block_id.max(above_graph),
        }
    }

    /// Emits the instruction list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`](crate::Error::Invariant) if a label still has
    /// phis, a branch has no successor, or `order` names a node that is not part
    /// of the graph.
    pub fn generate(mut self) -> Result<Vec<Tac>> {
        self.assign_block_ids()?;

        let mut code = Vec::with_capacity(self.order.len());
        let mut jumps = 0;
        for (position, &node) in self.order.iter().enumerate() {
            let tac = self
                .graph
                .tac(node)
                .ok_or_else(|| invariant_error!("{} is not part of the graph", node))?;

            match tac {
                Tac::Label(label) => {
                    if !label.phis.is_empty() {
                        return Err(invariant_error!("{} still has phi-functions", node));
                    }
                    if let Some(&id) = self.block_ids.get(&node) {
                        code.push(Tac::label(id));
                    } else if let Some(id) = label.block_id {
                        code.push(Tac::label(id));
                    }
                }
                Tac::Branch { .. } => {
                    if let Some(&id) = self.fresh_label(node) {
                        code.push(Tac::label(id));
                    }
                    let mut branch = tac.clone();
                    if let Tac::Branch { target, .. } = &mut branch {
                        *target = self.block_id(self.taken_successor(node)?)?;
                    }
                    code.push(branch);
                }
                _ => {
                    if let Some(&id) = self.fresh_label(node) {
                        code.push(Tac::label(id));
                    }
                    code.push(tac.clone());
                }
            }

            if let Some(fall) = self.fall_through_successor(node) {
                if self.order.get(position + 1) != Some(&fall) {
                    code.push(Tac::br(self.block_id(fall)?));
                    jumps += 1;
                }
            }
        }

        debug!(
            nodes = self.order.len(),
            instructions = code.len(),
            jumps,
            fresh_labels = self.block_ids.len(),
            "emitted instructions"
        );
        Ok(code)
    }

    /// Gives every jump target without a block id a fresh one.
    fn assign_block_ids(&mut self) -> Result<()> {
        for (position, &node) in self.order.iter().enumerate() {
            if self.graph.tac(node).is_some_and(Tac::is_branch) {
                let target = self.taken_successor(node)?;
                self.ensure_block_id(target);
            }
            if let Some(fall) = self.fall_through_successor(node) {
                if self.order.get(position + 1) != Some(&fall) {
                    self.ensure_block_id(fall);
                }
            }
        }
        Ok(())
    }

    fn ensure_block_id(&mut self, node: NodeId) {
        let numbered = matches!(
            self.graph.tac(node),
            Some(Tac::Label(Label {
                block_id: Some(_),
                ..
            }))
        );
        if !numbered && !self.block_ids.contains_key(&node) {
            self.block_ids.insert(node, self.next_block_id);
            self.next_block_id += 1;
        }
    }

    /// Returns the fresh label to emit in front of a non-label node.
    fn fresh_label(&self, node: NodeId) -> Option<&u32> {
        self.block_ids.get(&node)
    }

    /// Returns the block id a jump to `node` uses.
    fn block_id(&self, node: NodeId) -> Result<u32> {
        if let Some(&id) = self.block_ids.get(&node) {
            return Ok(id);
        }
        self.graph
            .tac(node)
            .and_then(Tac::as_label)
            .and_then(|label| label.block_id)
            .ok_or_else(|| invariant_error!("{} has no block id", node))
    }

    /// The successor a branch jumps to: the second edge of a compare-branch, or
    /// the only edge when both outcomes lead to the same node.
    fn taken_successor(&self, node: NodeId) -> Result<NodeId> {
        let succs = self.graph.successors(node);
        let falls = self.graph.tac(node).is_some_and(Tac::falls_through);
        let taken = if falls && succs.len() > 1 {
            succs.get(1)
        } else {
            succs.first()
        };
        taken
            .copied()
            .ok_or_else(|| invariant_error!("branch {} has no successor", node))
    }

    /// The successor control reaches when `node` does not jump.
    fn fall_through_successor(&self, node: NodeId) -> Option<NodeId> {
        let tac = self.graph.tac(node)?;
        if !tac.falls_through() {
            return None;
        }
        self.graph.successors(node).first().copied()
    }
}

/// Emits `graph` in linear-stream order.
///
/// # Errors
///
/// See [`CodeGenerator::generate`].
pub fn emit(graph: &TacGraph, first_fresh_block_id: u32) -> Result<Vec<Tac>> {
    let order = graph.linear_stream();
    CodeGenerator::new(graph, &order, first_fresh_block_id).generate()
}
