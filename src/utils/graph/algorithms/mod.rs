//! Graph algorithms for program analysis.
//!
//! # Available Algorithms
//!
//! ## Traversal
//!
//! - [`postorder`] - depth-first postorder from every start, last successor first
//! - [`linear_stream`] - reverse of [`postorder`], the order every dataflow pass iterates in
//!
//! ## Dominator Analysis
//!
//! - [`DomTree`] - dominator sets, immediate dominators, the dominator tree and
//!   dominance frontiers, computed by the classical iterative fixpoint
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | Linear stream | O(V + E) | Liveness, constant propagation worklists |
//! | Dominator sets | O(V² · passes / 64) | SSA construction |
//! | Frontiers | O(V + E + Σ\|DF\|) | Phi placement |

mod dominators;
mod traversal;

pub use dominators::DomTree;
pub use traversal::{linear_stream, postorder};
