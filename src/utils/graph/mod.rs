//! Graph abstractions shared by the instruction graph and its analyses.
//!
//! Nodes live in an arena owned by the graph, and every edge is a plain [`NodeId`]
//! stored in both endpoints' adjacency lists. Cycles (loop back-edges) therefore
//! never create ownership cycles.
//!
//! The traits in this module describe just enough of a graph for the generic
//! algorithms in [`algorithms`] (linear stream ordering and dominators) to run on
//! any arena-backed graph.

pub mod algorithms;
mod node;

pub use node::NodeId;

/// A graph whose nodes expose ordered successor lists.
pub trait Successors {
    /// Returns the size of the node arena.
    ///
    /// Every valid [`NodeId`] of the graph has an index below this value, so it can
    /// be used to size per-node tables. Removed nodes leave holes behind.
    fn capacity(&self) -> usize;

    /// Returns `true` if `node` is currently part of the graph.
    fn contains(&self, node: NodeId) -> bool;

    /// Returns the successors of `node` in edge order.
    ///
    /// The first successor of a fall-through instruction is its fall-through target.
    /// Absent nodes have no successors.
    fn successors(&self, node: NodeId) -> &[NodeId];
}

/// A graph whose nodes expose predecessor lists.
pub trait Predecessors {
    /// Returns the predecessors of `node`. Absent nodes have no predecessors.
    fn predecessors(&self, node: NodeId) -> &[NodeId];
}

/// A graph with a designated list of entry nodes.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the start nodes in insertion order.
    fn starts(&self) -> &[NodeId];
}
