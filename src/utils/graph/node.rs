//! Node identifier for instruction graphs.
//!
//! This module provides the [`NodeId`] type, a strongly-typed index into the node
//! arena of a [`TacGraph`](crate::analysis::TacGraph). Edges, phi operands, liveness
//! tables and dominator data all refer to nodes through it.

use std::fmt;

/// A strongly-typed identifier for a node within an instruction graph.
///
/// `NodeId` wraps a `usize` arena index. When a graph is built from a linear
/// instruction list, the node for instruction `i` gets `NodeId(i)`. Structural
/// clones keep the ids of the nodes they copy, and nodes created later (for
/// example the copies inserted when leaving SSA form) are appended after them.
/// An id therefore names "the same instruction" across every stage of the
/// pipeline, as long as that instruction survives.
///
/// # Examples
///
/// ```rust
/// use tacopt::utils::graph::NodeId;
/// use std::collections::BTreeMap;
///
/// let a = NodeId::new(0);
/// let b = NodeId::new(3);
/// assert!(a < b);
///
/// let mut args: BTreeMap<NodeId, i32> = BTreeMap::new();
/// args.insert(b, 42);
/// assert_eq!(args[&b], 42);
/// assert_eq!(b.to_string(), "n3");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw arena index.
    ///
    /// Intended for tests and for callers that correlate output nodes with the
    /// position of an instruction in the input list.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw arena index of this node.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    fn from(node: NodeId) -> Self {
        node.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_roundtrip() {
        let node = NodeId::from(7usize);
        assert_eq!(node.index(), 7);
        assert_eq!(usize::from(node), 7);
    }

    #[test]
    fn test_node_id_formatting() {
        let node = NodeId::new(12);
        assert_eq!(format!("{node:?}"), "NodeId(12)");
        assert_eq!(format!("{node}"), "n12");
    }
}
