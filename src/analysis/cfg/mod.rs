//! Control flow graph of single instructions.
//!
//! [`TacGraph`] is built from the linear instruction list of one method and is
//! the representation every later stage reads and rewrites:
//!
//! - [`TacGraph::build`] - edges from fall-through and branch targets
//! - [`TacGraph::linear_stream`] - reverse postorder, fall-through successors first
//! - [`TacGraph::build_parent_graph`] - structural clone plus a [`NodeMap`]
//! - [`TacGraph::remove_node`] / [`TacGraph::remove_edge`] - edits that keep edges
//!   symmetric and phi operands consistent
//!
//! # Examples
//!
//! ```rust
//! use tacopt::prelude::*;
//!
//! let i = Vara::logical(0, DataType::I4);
//! let code = vec![
//!     Tac::assign(i.clone(), Vara::i4(0)),                                       // n0
//!     Tac::label(1),                                                             // n1
//!     Tac::branch(Op::new(OpKind::Bge, DataType::I4), i.clone(), Vara::i4(8), 2), // n2
//!     Tac::binary(Op::new(OpKind::Add, DataType::I4), i.clone(), i.clone(), Vara::i4(1)),
//!     Tac::br(1),                                                                // n4
//!     Tac::label(2),                                                             // n5
//!     Tac::ret(i),                                                               // n6
//! ];
//! let graph = TacGraph::build(&code)?;
//!
//! assert_eq!(graph.predecessors(NodeId::new(1)), &[NodeId::new(0), NodeId::new(4)]);
//! assert_eq!(graph.linear_stream().len(), 7);
//! # Ok::<(), tacopt::Error>(())
//! ```

mod graph;

pub use graph::{Node, NodeMap, TacGraph};
