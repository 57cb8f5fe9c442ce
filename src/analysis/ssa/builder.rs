//! SSA construction (Cytron et al.).
//!
//! Construction runs in three phases:
//!
//! 1. **Phi placement**: for every variable, the iterated dominance frontier of its
//!    definition sites receives a phi-function
//! 2. **Cloning**: the input graph is cloned with
//!    [`build_parent_graph`](crate::analysis::TacGraph::build_parent_graph), and the
//!    phis are attached to the labels of the clone. A start label that received
//!    phis and is also jumped to gets an anonymous entry label in front of it, so
//!    the edge into the method has a phi operand of its own
//! 3. **Renaming**: a walk of the dominator tree rewrites every use to the version on
//!    top of its variable's stack, and pushes a fresh version for every definition
//!
//! The input graph is never modified.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::{
    analysis::{Liveness, NodeMap, TacGraph},
    ir::{DataType, Label, Phi, Tac, Vara},
    utils::graph::{algorithms::DomTree, NodeId},
    Error, Result,
};

/// A graph in SSA form together with how it was derived.
#[derive(Debug, Clone)]
pub struct SsaForm {
    /// The renamed graph with phi-functions.
    pub graph: TacGraph,
    /// Maps every node of the input graph to its clone in `graph`.
    pub map: NodeMap,
    /// Variable ids that received a phi, per label node.
    pub phi_sites: BTreeMap<NodeId, Vec<u32>>,
}

/// Builds SSA form from an instruction graph.
///
/// # Arguments
///
/// * `graph` - The graph to transform; it must not contain phis yet
/// * `dom` - The dominator tree of `graph`
/// * `liveness` - The liveness of `graph`, whose def chains give the definition sites
///
/// # Errors
///
/// Returns [`Error::MisplacedPhi`] if a phi would be needed at a node that is not a
/// label, and [`Error::MissingDataflow`] if `dom` does not cover a definition site.
pub fn construct(graph: &TacGraph, dom: &DomTree, liveness: &Liveness) -> Result<SsaForm> {
    let mut builder = SsaBuilder::new(graph);

    let sites = builder.place_phis(dom, liveness)?;
    builder.add_entry_labels()?;
    builder.rename(dom)?;

    debug!(
        phis = sites.values().map(Vec::len).sum::<usize>(),
        labels = sites.len(),
        variables = builder.next_version.len(),
        "constructed SSA form"
    );
    Ok(SsaForm {
        graph: builder.graph,
        map: builder.map,
        phi_sites: sites,
    })
}

/// Work item of the dominator-tree walk.
enum Frame {
    /// Rename a node, then schedule its children.
    Enter(NodeId),
    /// Pop the versions the node pushed.
    Exit(Vec<u32>),
}

struct SsaBuilder {
    /// The clone being renamed.
    graph: TacGraph,
    /// Input node -> clone.
    map: NodeMap,
    /// Version stack per variable id; the bottom entry 0 means "undefined".
    version_stacks: BTreeMap<u32, Vec<u32>>,
    /// Last version handed out per variable id.
    next_version: BTreeMap<u32, u32>,
    /// Entry labels added in front of start labels with phis.
    entries: Vec<NodeId>,
}

impl SsaBuilder {
    fn new(graph: &TacGraph) -> Self {
        let (graph, map) = graph.build_parent_graph();
        SsaBuilder {
            graph,
            map,
            version_stacks: BTreeMap::new(),
            next_version: BTreeMap::new(),
            entries: Vec::new(),
        }
    }

    /// Places one phi per variable at every node of the iterated dominance
    /// frontier of its definition sites.
    fn place_phis(
        &mut self,
        dom: &DomTree,
        liveness: &Liveness,
    ) -> Result<BTreeMap<NodeId, Vec<u32>>> {
        let mut def_sites: BTreeMap<u32, BTreeSet<NodeId>> = BTreeMap::new();
        for var in liveness.defined_vars() {
            def_sites
                .entry(var.id)
                .or_default()
                .extend(liveness.defs(var).iter().copied());
        }

        let mut sites: BTreeMap<NodeId, Vec<u32>> = BTreeMap::new();
        for (&id, defs) in &def_sites {
            let mut placed = BTreeSet::new();
            let mut worklist: Vec<NodeId> = defs.iter().copied().collect();

            while let Some(node) = worklist.pop() {
                for &frontier in dom.frontier(node)? {
                    if placed.insert(frontier) {
                        worklist.push(frontier);
                    }
                }
            }

            let ty = self.graph.var_type(id).unwrap_or(DataType::Void);
            for node in placed {
                let outer = *self.map.get(&node).ok_or(Error::MisplacedPhi(node))?;
                let label = self
                    .graph
                    .tac_mut(outer)
                    .and_then(Tac::as_label_mut)
                    .ok_or(Error::MisplacedPhi(node))?;
                label.phis.push(Phi::new(Vara::logical(id, ty)));
                sites.entry(outer).or_default().push(id);
            }
        }

        Ok(sites)
    }

    /// Puts an anonymous label in front of every start that has phis and
    /// predecessors, and makes it the start.
    fn add_entry_labels(&mut self) -> Result<()> {
        let headers: Vec<NodeId> = self
            .graph
            .starts()
            .iter()
            .copied()
            .filter(|&start| {
                !self.graph.predecessors(start).is_empty()
                    && self
                        .graph
                        .tac(start)
                        .and_then(Tac::as_label)
                        .is_some_and(|label| !label.phis.is_empty())
            })
            .collect();

        for start in headers {
            let entry = self.graph.add_node(Tac::Label(Label::default()), None);
            self.graph.add_edge(entry, start)?;
            self.graph.replace_start(start, entry)?;
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Returns the version on top of the stack of `id`, 0 if there is none.
    fn current(&self, id: u32) -> u32 {
        self.version_stacks
            .get(&id)
            .and_then(|stack| stack.last())
            .copied()
            .unwrap_or(0)
    }

    /// Hands out the next version of `id` and pushes it.
    fn fresh(&mut self, id: u32) -> u32 {
        let version = self.next_version.entry(id).or_insert(0);
        *version += 1;
        let version = *version;
        self.version_stacks.entry(id).or_default().push(version);
        version
    }

    /// Renames every node by walking the dominator tree from its roots.
    fn rename(&mut self, dom: &DomTree) -> Result<()> {
        // Nothing is defined yet on the way into the method
        for entry in self.entries.clone() {
            self.fill_successor_phis(entry);
        }

        let mut stack: Vec<Frame> = dom
            .roots()
            .iter()
            .rev()
            .map(|&root| Frame::Enter(root))
            .collect();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(inner) => {
                    let node = *self
                        .map
                        .get(&inner)
                        .ok_or_else(|| invariant_error!("{} has no clone", inner))?;
                    let pushed = self.rename_node(node)?;
                    self.fill_successor_phis(node);

                    stack.push(Frame::Exit(pushed));
                    for &child in dom.children(inner)?.iter().rev() {
                        stack.push(Frame::Enter(child));
                    }
                }
                Frame::Exit(pushed) => {
                    for id in pushed {
                        if let Some(versions) = self.version_stacks.get_mut(&id) {
                            versions.pop();
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Rewrites the uses of `node` and gives its definitions fresh versions.
    ///
    /// Returns the variable ids whose stacks were pushed.
    fn rename_node(&mut self, node: NodeId) -> Result<Vec<u32>> {
        let mut tac = self
            .graph
            .tac(node)
            .cloned()
            .ok_or_else(|| invariant_error!("{} is not part of the SSA graph", node))?;
        let mut pushed = Vec::new();

        if let Tac::Label(label) = &mut tac {
            for phi in &mut label.phis {
                if let Some(var) = phi.defined_var() {
                    let version = self.fresh(var.id);
                    phi.result = phi.result.with_version(version);
                    pushed.push(var.id);
                }
            }
        } else {
            for slot in tac.sources_mut() {
                if let Some(var) = slot.var() {
                    *slot = slot.with_version(self.current(var.id));
                }
            }
            if let Some(result) = tac.result_mut() {
                if let Some(var) = result.logical_var() {
                    let version = self.fresh(var.id);
                    *result = result.with_version(version);
                    pushed.push(var.id);
                }
            }
        }

        if let Some(slot) = self.graph.tac_mut(node) {
            *slot = tac;
        }
        Ok(pushed)
    }

    /// Fills the operand for the edge from `node` into every phi of its successors.
    fn fill_successor_phis(&mut self, node: NodeId) {
        for succ in self.graph.successors(node).to_vec() {
            let operands: Vec<Vara> = match self.graph.tac(succ).and_then(Tac::as_label) {
                Some(label) => label
                    .phis
                    .iter()
                    .map(|phi| match phi.defined_var() {
                        Some(var) => match self.current(var.id) {
                            0 => Vara::null(phi.ty),
                            version => phi.result.with_version(version),
                        },
                        None => Vara::null(phi.ty),
                    })
                    .collect(),
                None => continue,
            };

            if let Some(label) = self.graph.tac_mut(succ).and_then(Tac::as_label_mut) {
                for (phi, operand) in label.phis.iter_mut().zip(operands) {
                    phi.args.insert(node, operand);
                }
            }
        }
    }
}
