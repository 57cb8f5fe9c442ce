//! Utility data structures used across the crate.
//!
//! - [`BitSet`] - compact set of node indices, used for dominator sets
//! - [`graph`] - node identifiers, graph traits and generic graph algorithms
//! - [`escape_dot`] - label escaping for the DOT dumps of instruction graphs

mod bitset;
mod dot;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
pub use dot::escape_dot;
