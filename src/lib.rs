// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # tacopt
//!
//! The optimizing middle-end of an ahead-of-time compiler. `tacopt` takes the
//! three-address code (TAC) of one method as a flat instruction list, optimizes
//! it in Static Single Assignment form and hands back a flat instruction list
//! together with the liveness information a register allocator needs.
//!
//! ## Features
//!
//! - **Instruction graph** - One node per instruction, symmetric edges, stable node ids
//! - **Dominators** - Iterative dominator sets, dominator tree and dominance frontiers
//! - **SSA form** - Phi placement at iterated dominance frontiers, renaming, destruction
//! - **Liveness** - Per-node live sets and def/use chains
//! - **Dead code elimination** and **constant propagation** with branch folding
//! - **Parallel batches** - Independent methods are optimized on a rayon pool
//!
//! ## Quick Start
//!
//! ```rust
//! use tacopt::prelude::*;
//!
//! let v = |id| Vara::logical(id, DataType::I4);
//! let code = vec![
//!     Tac::assign(v(0), Vara::i4(5)),                                     // a = 5
//!     Tac::assign(v(1), Vara::i4(10)),                                    // b = 10
//!     Tac::binary(Op::new(OpKind::Add, DataType::I4), v(2), v(0), v(1)), // c = a + b
//!     Tac::call(Vara::Void, Vara::logical(9, DataType::I), vec![v(2)]),   // print(c)
//!     Tac::ret_void(),
//! ];
//!
//! let method = Optimizer::default().optimize(&code)?;
//! for tac in method.instructions() {
//!     println!("{tac}");
//! }
//! # Ok::<(), tacopt::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`ir`] - Instructions, operands, opcodes and constant evaluation
//! - [`analysis`] - Instruction graph, liveness, SSA construction and destruction
//! - [`compiler`] - Optimization passes, scheduling, emission and the [`Optimizer`]
//! - [`utils`] - Graph traits and algorithms, bit sets
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Pipeline
//!
//! ```text
//! &[Tac] → TacGraph → DomTree + Liveness → SSA → DCE → ConstantProp → DCE
//!        → convert_from_ssa → Liveness → Vec<Tac>
//! ```
//!
//! Each method is processed by a single thread and owns all of its data.
//! [`Optimizer::optimize_all`] spreads a batch of methods over threads.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Every error is fatal for
//! the method being optimized:
//!
//! ```rust
//! use tacopt::{Error, Optimizer};
//!
//! match Optimizer::default().optimize(&[]) {
//!     Ok(_) => println!("optimized"),
//!     Err(Error::Empty) => println!("nothing to optimize"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use tacopt::prelude::*;
///
/// let graph = TacGraph::build(&[Tac::ret_void()])?;
/// assert_eq!(graph.starts(), &[NodeId::new(0)]);
/// # Ok::<(), tacopt::Error>(())
/// ```
pub mod prelude;

pub mod analysis;
pub mod compiler;
pub mod ir;
pub mod utils;

/// `tacopt` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use tacopt::{analysis::TacGraph, ir::Tac, Result};
///
/// fn node_count(code: &[Tac]) -> Result<usize> {
///     Ok(TacGraph::build(code)?.node_count())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `tacopt` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Main entry point for optimizing methods.
///
/// See [`compiler::Optimizer`].
pub use compiler::{OptimizedMethod, Optimizer, OptimizerConfig};
