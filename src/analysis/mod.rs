//! Program analysis infrastructure for three-address code.
//!
//! This module provides the analyses every optimization stage builds on. It uses
//! the generic graph infrastructure in [`crate::utils::graph`] for traversal
//! orders and dominators.
//!
//! # Architecture
//!
//! - [`cfg`] - The instruction graph: one node per instruction, symmetric edges
//! - [`dataflow`] - Live variable analysis and def/use chains
//! - [`ssa`] - Conversion into and out of Static Single Assignment form
//!
//! # Usage
//!
//! ```rust
//! use tacopt::prelude::*;
//! use tacopt::analysis::{construct, convert_from_ssa};
//!
//! let code = vec![
//!     Tac::assign(Vara::logical(0, DataType::I4), Vara::i4(1)),
//!     Tac::ret(Vara::logical(0, DataType::I4)),
//! ];
//! let graph = TacGraph::build(&code)?;
//! let dom = DomTree::build(&graph);
//! let live = Liveness::analyze(&graph);
//!
//! let ssa = construct(&graph, &dom, &live)?;
//! let (plain, _map) = convert_from_ssa(&ssa.graph)?;
//! assert_eq!(plain.node_count(), 2);
//! # Ok::<(), tacopt::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;
pub mod ssa;

pub use cfg::{Node, NodeMap, TacGraph};
pub use dataflow::Liveness;
pub use ssa::{construct, convert_from_ssa, SsaForm};
