//! The instruction graph.
//!
//! This module provides [`TacGraph`], an arena of single-instruction nodes with
//! symmetric predecessor and successor lists. Every analysis and optimization
//! stage of the pipeline works on it.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Write},
};

use tracing::{debug, trace};

use crate::{
    analysis::Liveness,
    ir::{DataType, Label, Tac, Var},
    utils::{
        escape_dot,
        graph::{algorithms, NodeId, Predecessors, RootedGraph, Successors},
    },
    Error, Result,
};

/// Maps the nodes of a graph to their clones in a graph derived from it.
pub type NodeMap = BTreeMap<NodeId, NodeId>;

/// One instruction together with its incident edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    tac: Tac,
    preds: Vec<NodeId>,
    succs: Vec<NodeId>,
    inner: Option<NodeId>,
}

impl Node {
    fn new(tac: Tac, inner: Option<NodeId>) -> Self {
        Node {
            tac,
            preds: Vec::new(),
            succs: Vec::new(),
            inner,
        }
    }

    /// Returns the instruction held by this node.
    #[must_use]
    pub fn tac(&self) -> &Tac {
        &self.tac
    }

    /// Returns the instruction held by this node, mutably.
    ///
    /// Rewriting operands through this reference does not update any [`Liveness`]
    /// chains; the caller is responsible for that.
    pub fn tac_mut(&mut self) -> &mut Tac {
        &mut self.tac
    }

    /// Returns the predecessors of this node.
    #[must_use]
    pub fn predecessors(&self) -> &[NodeId] {
        &self.preds
    }

    /// Returns the successors of this node. The fall-through successor comes first.
    #[must_use]
    pub fn successors(&self) -> &[NodeId] {
        &self.succs
    }

    /// Returns the node of the graph this node was cloned from, if any.
    #[must_use]
    pub fn inner(&self) -> Option<NodeId> {
        self.inner
    }
}

/// A control flow graph with one instruction per node.
///
/// Nodes live in an arena indexed by [`NodeId`]. The graph built from an
/// instruction list gives every instruction the id of its position in that list,
/// and clones keep the ids of the nodes they copy. Nodes created later are
/// appended, and removed nodes leave a hole behind.
///
/// Edges are stored on both endpoints: `b` is in `succs(a)` exactly when `a` is in
/// `preds(b)`. The first successor of a node that falls through is its
/// fall-through target; a compare-branch lists its taken target second.
///
/// # Examples
///
/// ```rust
/// use tacopt::prelude::*;
///
/// let x = Vara::logical(0, DataType::I4);
/// let code = vec![
///     Tac::assign(x.clone(), Vara::i4(1)),                                         // n0
///     Tac::branch(Op::new(OpKind::Beq, DataType::I4), x.clone(), Vara::i4(0), 7), // n1
///     Tac::ret(x.clone()),                                                         // n2
///     Tac::label(7),                                                               // n3
///     Tac::ret_void(),                                                             // n4
/// ];
/// let graph = TacGraph::build(&code)?;
///
/// assert_eq!(graph.successors(NodeId::new(1)), &[NodeId::new(2), NodeId::new(3)]);
/// assert_eq!(graph.ends(), &[NodeId::new(2), NodeId::new(4)]);
/// # Ok::<(), tacopt::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TacGraph {
    nodes: Vec<Option<Node>>,
    starts: Vec<NodeId>,
    ends: Vec<NodeId>,
    var_types: BTreeMap<u32, DataType>,
}

impl TacGraph {
    /// Builds the graph of an instruction list.
    ///
    /// The first instruction is the start node. Edges are discovered depth-first:
    /// the fall-through edge of an instruction is added before its branch edge,
    /// and a branch to the very next instruction yields a single edge. Instructions
    /// that cannot be reached from the start never enter the graph.
    ///
    /// # Arguments
    ///
    /// * `code` - The instructions of one method
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for an empty list and [`Error::UnknownBlockTarget`]
    /// when a branch names a block id no label carries.
    pub fn build(code: &[Tac]) -> Result<Self> {
        if code.is_empty() {
            return Err(Error::Empty);
        }

        let mut labels = BTreeMap::new();
        for (index, tac) in code.iter().enumerate() {
            if let Some(Label {
                block_id: Some(id), ..
            }) = tac.as_label()
            {
                labels.entry(*id).or_insert(index);
            }
        }

        let mut targets = vec![None; code.len()];
        for (index, tac) in code.iter().enumerate() {
            if let Tac::Branch { target, .. } = tac {
                let resolved = labels
                    .get(target)
                    .ok_or(Error::UnknownBlockTarget(*target))?;
                targets[index] = Some(*resolved);
            }
        }

        let mut graph = TacGraph {
            nodes: vec![None; code.len()],
            ..TacGraph::default()
        };
        for tac in code {
            graph.record_types(tac);
        }

        graph.nodes[0] = Some(Node::new(code[0].clone(), None));
        graph.starts.push(NodeId::new(0));

        let mut stack = vec![0_usize];
        while let Some(index) = stack.pop() {
            let fall = (code[index].falls_through() && index + 1 < code.len()).then_some(index + 1);
            let taken = targets[index].filter(|&target| Some(target) != fall);

            for next in fall.into_iter().chain(taken) {
                if graph.nodes[next].is_none() {
                    graph.nodes[next] = Some(Node::new(code[next].clone(), None));
                    stack.push(next);
                }
                graph.link(NodeId::new(index), NodeId::new(next));
            }
        }
        graph.ends = graph
            .node_ids()
            .filter(|&node| graph.successors(node).is_empty())
            .collect();

        debug!(
            instructions = code.len(),
            nodes = graph.node_count(),
            "built instruction graph"
        );
        Ok(graph)
    }

    /// Records the types of the variables `tac` defines.
    fn record_types(&mut self, tac: &Tac) {
        if let Some(r) = tac.result() {
            if let Some(var) = r.logical_var() {
                self.var_types.entry(var.id).or_insert(r.data_type());
            }
        }
        if let Some(label) = tac.as_label() {
            for phi in &label.phis {
                if let Some(var) = phi.defined_var() {
                    self.var_types.entry(var.id).or_insert(phi.ty);
                }
            }
        }
    }

    /// Returns the node with id `node`, if it is part of the graph.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.index()).and_then(Option::as_ref)
    }

    /// Returns the node with id `node` mutably, if it is part of the graph.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node.index()).and_then(Option::as_mut)
    }

    /// Returns the instruction of `node`.
    #[must_use]
    pub fn tac(&self, node: NodeId) -> Option<&Tac> {
        self.node(node).map(Node::tac)
    }

    /// Returns the instruction of `node`, mutably.
    pub fn tac_mut(&mut self, node: NodeId) -> Option<&mut Tac> {
        self.node_mut(node).map(Node::tac_mut)
    }

    fn slot(&self, node: NodeId) -> Result<&Node> {
        self.node(node)
            .ok_or_else(|| invariant_error!("{} is not part of the graph", node))
    }

    fn slot_mut(&mut self, node: NodeId) -> Result<&mut Node> {
        self.node_mut(node)
            .ok_or_else(|| invariant_error!("{} is not part of the graph", node))
    }

    fn label_mut(&mut self, node: NodeId) -> Option<&mut Label> {
        self.tac_mut(node).and_then(Tac::as_label_mut)
    }

    /// Returns `true` if `node` is part of the graph.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    /// Returns the successors of `node`, fall-through target first.
    #[must_use]
    pub fn successors(&self, node: NodeId) -> &[NodeId] {
        match self.node(node) {
            Some(n) => &n.succs,
            None => &[],
        }
    }

    /// Returns the predecessors of `node`.
    #[must_use]
    pub fn predecessors(&self, node: NodeId) -> &[NodeId] {
        match self.node(node) {
            Some(n) => &n.preds,
            None => &[],
        }
    }

    /// Returns the start nodes.
    #[must_use]
    pub fn starts(&self) -> &[NodeId] {
        &self.starts
    }

    /// Returns the nodes without successors.
    #[must_use]
    pub fn ends(&self) -> &[NodeId] {
        &self.ends
    }

    /// Returns `true` if `node` is a start node.
    #[must_use]
    pub fn is_start(&self, node: NodeId) -> bool {
        self.starts.contains(&node)
    }

    /// Returns `true` if `node` holds a label.
    #[must_use]
    pub fn is_label(&self, node: NodeId) -> bool {
        self.tac(node).is_some_and(Tac::is_label)
    }

    /// Returns the size of the node arena, including holes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of nodes currently in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Returns the ids of all nodes in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(index, _)| NodeId::new(index))
    }

    /// Returns the type of every variable defined in the graph, keyed by variable id.
    #[must_use]
    pub fn var_types(&self) -> &BTreeMap<u32, DataType> {
        &self.var_types
    }

    /// Returns the type of variable `id`.
    #[must_use]
    pub fn var_type(&self, id: u32) -> Option<DataType> {
        self.var_types.get(&id).copied()
    }

    /// Returns the variables `node` reads.
    #[must_use]
    pub fn uses(&self, node: NodeId) -> Vec<Var> {
        self.tac(node).map(Tac::uses).unwrap_or_default()
    }

    /// Returns the variables `node` defines.
    #[must_use]
    pub fn defs(&self, node: NodeId) -> Vec<Var> {
        self.tac(node).map(Tac::defs).unwrap_or_default()
    }

    /// Returns `true` if `node` reads `var`.
    #[must_use]
    pub fn reads(&self, node: NodeId, var: Var) -> bool {
        self.tac(node).is_some_and(|tac| tac.reads(var))
    }

    /// Returns the largest block id carried by a label, if any.
    #[must_use]
    pub fn max_block_id(&self) -> Option<u32> {
        self.nodes
            .iter()
            .flatten()
            .filter_map(|node| node.tac.as_label().and_then(|label| label.block_id))
            .max()
    }

    /// Returns the reachable nodes in linear-stream (reverse postorder) order.
    #[must_use]
    pub fn linear_stream(&self) -> Vec<NodeId> {
        algorithms::linear_stream(self)
    }

    /// Appends a new node without edges and returns its id.
    ///
    /// # Arguments
    ///
    /// * `tac` - The instruction of the node
    /// * `inner` - The node this one derives from, if any
    pub fn add_node(&mut self, tac: Tac, inner: Option<NodeId>) -> NodeId {
        self.record_types(&tac);
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Some(Node::new(tac, inner)));
        id
    }

    /// Marks `node` as an additional start node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] if `node` is not part of the graph.
    pub fn add_start(&mut self, node: NodeId) -> Result<()> {
        self.slot(node)?;
        if !self.starts.contains(&node) {
            self.starts.push(node);
        }
        Ok(())
    }

    /// Replaces the start node `old` by `new`, keeping its position in the start list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] if `old` is not a start or `new` is not part of
    /// the graph.
    pub fn replace_start(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        self.slot(new)?;
        let Some(position) = self.starts.iter().position(|&s| s == old) else {
            return Err(invariant_error!("{} is not a start", old));
        };
        self.starts[position] = new;
        self.starts.dedup();
        Ok(())
    }

    /// Adds the edge `from → to`.
    ///
    /// The edge is appended to the successor list of `from`, so the first edge
    /// added to a node is its fall-through edge. Adding an existing edge is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] if either endpoint is not part of the graph.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.slot(from)?;
        self.slot(to)?;
        self.link(from, to);
        Ok(())
    }

    /// Adds `from → to` between nodes known to exist.
    fn link(&mut self, from: NodeId, to: NodeId) {
        if let Some(node) = self.node_mut(from) {
            if !node.succs.contains(&to) {
                node.succs.push(to);
            }
        }
        if let Some(node) = self.node_mut(to) {
            if !node.preds.contains(&from) {
                node.preds.push(from);
            }
        }
        self.refresh_end(from);
        self.refresh_end(to);
    }

    /// Removes `from → to` from both adjacency lists.
    fn unlink(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let node = self.slot_mut(from)?;
        let Some(position) = node.succs.iter().position(|&s| s == to) else {
            return Err(invariant_error!("no edge {} -> {}", from, to));
        };
        node.succs.remove(position);
        if let Some(node) = self.node_mut(to) {
            node.preds.retain(|&p| p != from);
        }
        self.refresh_end(from);
        Ok(())
    }

    /// Keeps `ends` in sync with the successor list of `node`.
    fn refresh_end(&mut self, node: NodeId) {
        let is_end = self.node(node).is_some_and(|n| n.succs.is_empty());
        let listed = self.ends.contains(&node);
        if is_end && !listed {
            self.ends.push(node);
        } else if !is_end && listed {
            self.ends.retain(|&e| e != node);
        }
    }

    /// Removes the edge `from → to`.
    ///
    /// Phi operands of `to` that flowed in along the edge are dropped, and `to`
    /// leaves the use chain of every variable it no longer reads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] if the edge does not exist.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId, liveness: &mut Liveness) -> Result<()> {
        self.unlink(from, to)?;

        let mut stripped = Vec::new();
        if let Some(label) = self.label_mut(to) {
            for phi in &mut label.phis {
                if let Some(arg) = phi.args.remove(&from) {
                    stripped.extend(arg.var());
                }
            }
        }
        for var in stripped {
            if !self.reads(to, var) {
                liveness.remove_use(var, to);
            }
        }

        trace!(%from, %to, "removed edge");
        Ok(())
    }

    /// Redirects the edge `from → old` to `from → new`.
    ///
    /// `new` takes the position `old` had in the successor list of `from`, so a
    /// fall-through edge stays a fall-through edge. Phi operands are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] if the edge `from → old` does not exist or `new`
    /// is not part of the graph.
    pub fn replace_successor(&mut self, from: NodeId, old: NodeId, new: NodeId) -> Result<()> {
        self.slot(new)?;
        let node = self.slot_mut(from)?;
        if !node.succs.contains(&old) {
            return Err(invariant_error!("no edge {} -> {}", from, old));
        }
        splice(&mut node.succs, old, &[new]);

        if let Some(node) = self.node_mut(old) {
            node.preds.retain(|&p| p != from);
        }
        if let Some(node) = self.node_mut(new) {
            if !node.preds.contains(&from) {
                node.preds.push(from);
            }
        }
        self.refresh_end(new);
        Ok(())
    }

    /// Returns `true` if [`remove_node`](Self::remove_node) can take out `node`
    /// without merging control flow paths that carry different values.
    ///
    /// Start nodes are never removable. Neither is a node with predecessors and
    /// more than one successor, or a node one of whose predecessors also reaches
    /// a successor label directly while a phi of that label takes different
    /// operands along the two paths.
    ///
    /// A node between a predecessor with several successors and a label with
    /// phis is kept as well. Without it the predecessor would be a
    /// compare-branch directly in front of the label, and SSA destruction would
    /// run the label's copies on both outcomes of the branch.
    #[must_use]
    pub fn is_removable(&self, node: NodeId) -> bool {
        let Some(n) = self.node(node) else {
            return false;
        };
        if self.is_start(node) {
            return false;
        }
        if n.succs.len() > 1 && !n.preds.is_empty() {
            return false;
        }

        let after_fork = n.preds.iter().any(|&pred| self.successors(pred).len() > 1);
        let before_phis = n.succs.iter().any(|&succ| {
            self.tac(succ)
                .and_then(Tac::as_label)
                .is_some_and(|label| !label.phis.is_empty())
        });
        if after_fork && before_phis {
            return false;
        }

        n.succs.iter().all(|&succ| {
            let Some(label) = self.tac(succ).and_then(Tac::as_label) else {
                return true;
            };
            let succ_preds = self.predecessors(succ);
            n.preds
                .iter()
                .filter(|&&pred| succ_preds.contains(&pred))
                .all(|&pred| {
                    label
                        .phis
                        .iter()
                        .all(|phi| phi.args.get(&pred) == phi.args.get(&node))
                })
        })
    }

    /// Removes `node` and reconnects its predecessors to its successors.
    ///
    /// In every predecessor's successor list, `node` is replaced in place by the
    /// successors of `node`. Phi operands that successor labels received from
    /// `node` are re-keyed to each predecessor of `node`; a node without
    /// predecessors is unreachable, so its operands are dropped. All def/use chain
    /// entries and live sets of `node` are dropped from `liveness`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousRemoval`] if `node` has more than one predecessor
    /// and more than one successor, and [`Error::Invariant`] if it is a start or
    /// not part of the graph.
    pub fn remove_node(&mut self, node: NodeId, liveness: &mut Liveness) -> Result<()> {
        if self.is_start(node) {
            return Err(invariant_error!("start {} cannot be removed", node));
        }
        let (preds, succs) = {
            let n = self.slot(node)?;
            let preds: Vec<NodeId> = n.preds.iter().copied().filter(|&p| p != node).collect();
            let succs: Vec<NodeId> = n.succs.iter().copied().filter(|&s| s != node).collect();
            (preds, succs)
        };
        if preds.len() > 1 && succs.len() > 1 {
            return Err(Error::AmbiguousRemoval(node));
        }

        for &succ in &succs {
            let mut orphaned = Vec::new();
            if let Some(label) = self.label_mut(succ) {
                for phi in &mut label.phis {
                    let Some(arg) = phi.args.remove(&node) else {
                        continue;
                    };
                    if preds.is_empty() {
                        orphaned.extend(arg.var());
                    }
                    for &pred in &preds {
                        phi.args.entry(pred).or_insert_with(|| arg.clone());
                    }
                }
            }
            for var in orphaned {
                if !self.reads(succ, var) {
                    liveness.remove_use(var, succ);
                }
            }
        }

        for &pred in &preds {
            if let Some(p) = self.node_mut(pred) {
                splice(&mut p.succs, node, &succs);
            }
        }
        for &succ in &succs {
            if let Some(s) = self.node_mut(succ) {
                splice(&mut s.preds, node, &preds);
            }
        }

        self.nodes[node.index()] = None;
        self.ends.retain(|&e| e != node);
        for &pred in &preds {
            self.refresh_end(pred);
        }
        liveness.forget_node(node);

        trace!(%node, "removed node");
        Ok(())
    }

    /// Takes `node` out of the program.
    ///
    /// Removes it with [`remove_node`](Self::remove_node) if it
    /// [is removable](Self::is_removable). Otherwise the node stays in place as
    /// an anonymous label without phis. A start stays the entry point and keeps
    /// keying the phi operands it feeds; any other node keeps the control flow
    /// edge it sits on distinct. Def/use chains are updated either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] if `node` is not part of the graph.
    pub fn retire_node(&mut self, node: NodeId, liveness: &mut Liveness) -> Result<()> {
        if self.is_removable(node) {
            return self.remove_node(node, liveness);
        }

        let old = std::mem::replace(self.slot_mut(node)?.tac_mut(), Tac::Label(Label::default()));
        for var in old.uses() {
            liveness.remove_use(var, node);
        }
        for var in old.defs() {
            liveness.remove_def(var, node);
        }

        trace!(%node, "replaced node with an empty label");
        Ok(())
    }

    /// Deletes every node that cannot be reached from a start node.
    ///
    /// Edges from deleted nodes into live nodes are removed with
    /// [`remove_edge`](Self::remove_edge), so phi operands stay consistent.
    ///
    /// # Returns
    ///
    /// The live nodes that lost a predecessor, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] if the adjacency lists are inconsistent.
    pub fn prune_unreachable(&mut self, liveness: &mut Liveness) -> Result<Vec<NodeId>> {
        let reachable: BTreeSet<NodeId> = self.linear_stream().into_iter().collect();
        let dead: Vec<NodeId> = self
            .node_ids()
            .filter(|node| !reachable.contains(node))
            .collect();
        if dead.is_empty() {
            return Ok(Vec::new());
        }

        let mut affected = Vec::new();
        for &node in &dead {
            for succ in self.successors(node).to_vec() {
                if reachable.contains(&succ) {
                    self.remove_edge(node, succ, liveness)?;
                    if !affected.contains(&succ) {
                        affected.push(succ);
                    }
                }
            }
        }

        for &node in &dead {
            self.nodes[node.index()] = None;
            liveness.forget_node(node);
        }
        self.starts.retain(|node| reachable.contains(node));
        self.ends.retain(|node| reachable.contains(node));

        debug!(removed = dead.len(), "pruned unreachable nodes");
        Ok(affected)
    }

    /// Clones every reachable node into a new graph.
    ///
    /// Each clone keeps the id of its original and records it as its inner node.
    /// Edges are rebuilt depth-first from the starts with the successor order of
    /// the original.
    ///
    /// # Returns
    ///
    /// The new graph and the map from the nodes of `self` to their clones.
    #[must_use]
    pub fn build_parent_graph(&self) -> (TacGraph, NodeMap) {
        let order = self.linear_stream();
        let mut parent = TacGraph {
            nodes: vec![None; self.nodes.len()],
            starts: self
                .starts
                .iter()
                .copied()
                .filter(|&s| self.contains(s))
                .collect(),
            ends: Vec::new(),
            var_types: self.var_types.clone(),
        };

        let mut map = NodeMap::new();
        for &id in &order {
            if let Some(node) = self.node(id) {
                parent.nodes[id.index()] = Some(Node::new(node.tac.clone(), Some(id)));
                map.insert(id, id);
            }
        }

        let mut visited = BTreeSet::new();
        for &start in &parent.starts.clone() {
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if !visited.insert(node) {
                    continue;
                }
                for &succ in self.successors(node) {
                    parent.link(node, succ);
                    if !visited.contains(&succ) {
                        stack.push(succ);
                    }
                }
            }
        }
        for &start in &parent.starts.clone() {
            parent.refresh_end(start);
        }

        (parent, map)
    }

    /// Verifies that every edge is recorded on both endpoints exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] naming the first asymmetric edge found.
    pub fn check_edge_symmetry(&self) -> Result<()> {
        for node in self.node_ids() {
            let succs = self.successors(node);
            let preds = self.predecessors(node);

            for (i, &succ) in succs.iter().enumerate() {
                if succs[..i].contains(&succ) {
                    return Err(invariant_error!("duplicate edge {} -> {}", node, succ));
                }
                if !self.predecessors(succ).contains(&node) {
                    return Err(invariant_error!("edge {} -> {} missing from predecessors", node, succ));
                }
            }
            for (i, &pred) in preds.iter().enumerate() {
                if preds[..i].contains(&pred) {
                    return Err(invariant_error!("duplicate edge {} -> {}", pred, node));
                }
                if !self.successors(pred).contains(&node) {
                    return Err(invariant_error!("edge {} -> {} missing from successors", pred, node));
                }
            }
        }
        for &start in &self.starts {
            if !self.contains(start) {
                return Err(invariant_error!("start {} is not part of the graph", start));
            }
        }
        Ok(())
    }

    /// Verifies that every phi has exactly one operand per predecessor of its label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] naming the first label whose phi operands do not
    /// match its predecessors.
    pub fn check_phi_operands(&self) -> Result<()> {
        for node in self.node_ids() {
            let Some(label) = self.tac(node).and_then(Tac::as_label) else {
                continue;
            };
            let preds: BTreeSet<NodeId> = self.predecessors(node).iter().copied().collect();
            for phi in &label.phis {
                let keys: BTreeSet<NodeId> = phi.args.keys().copied().collect();
                if keys != preds {
                    return Err(invariant_error!(
                        "phi {} at {} has operands for {:?} but predecessors {:?}",
                        phi.result,
                        node,
                        keys,
                        preds
                    ));
                }
            }
        }
        Ok(())
    }

    /// Generates a DOT representation of the graph for visualization.
    ///
    /// Nodes are listed in linear-stream order; starts are filled green and ends
    /// red. Fall-through edges are solid and taken branch edges dashed.
    ///
    /// # Arguments
    ///
    /// * `title` - Optional graph title
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph TAC {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"{}\";", escape_dot(name));
            dot.push_str("    labelloc=t;\n");
        }
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for node in self.linear_stream() {
            let Some(tac) = self.tac(node) else {
                continue;
            };
            let style = if self.is_start(node) {
                ", style=filled, fillcolor=lightgreen"
            } else if self.ends.contains(&node) {
                ", style=filled, fillcolor=lightcoral"
            } else {
                ""
            };
            let label = escape_dot(&format!("{node}: {tac}"));
            let _ = writeln!(dot, "    {node} [label=\"{label}\"{style}];");
        }

        dot.push('\n');
        for node in self.linear_stream() {
            for (i, succ) in self.successors(node).iter().enumerate() {
                let style = if i == 0 { "" } else { " [style=dashed]" };
                let _ = writeln!(dot, "    {node} -> {succ}{style};");
            }
        }

        dot.push_str("}\n");
        dot
    }
}

/// Replaces `old` in `list` by `new` at the same position, keeping the first
/// occurrence of every entry.
fn splice(list: &mut Vec<NodeId>, old: NodeId, new: &[NodeId]) {
    let mut result = Vec::with_capacity(list.len() + new.len());
    for &entry in list.iter() {
        let replacement = if entry == old {
            new
        } else {
            std::slice::from_ref(&entry)
        };
        for &id in replacement {
            if !result.contains(&id) {
                result.push(id);
            }
        }
    }
    *list = result;
}

impl Successors for TacGraph {
    fn capacity(&self) -> usize {
        TacGraph::capacity(self)
    }

    fn contains(&self, node: NodeId) -> bool {
        TacGraph::contains(self, node)
    }

    fn successors(&self, node: NodeId) -> &[NodeId] {
        TacGraph::successors(self, node)
    }
}

impl Predecessors for TacGraph {
    fn predecessors(&self, node: NodeId) -> &[NodeId] {
        TacGraph::predecessors(self, node)
    }
}

impl RootedGraph for TacGraph {
    fn starts(&self) -> &[NodeId] {
        TacGraph::starts(self)
    }
}

impl fmt::Display for TacGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.linear_stream() {
            let Some(tac) = self.tac(node) else {
                continue;
            };
            write!(f, "{node}: {tac}")?;
            let succs = self.successors(node);
            if !succs.is_empty() {
                write!(f, "  ->")?;
                for succ in succs {
                    write!(f, " {succ}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
