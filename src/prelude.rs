//! # tacopt Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the tacopt library. Import this module to get quick access to the essential
//! types for building, analysing and optimizing three-address code.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all tacopt operations
pub use crate::Error;

/// The result type used throughout tacopt
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The optimization pipeline and its configuration
pub use crate::compiler::{OptimizedMethod, Optimizer, OptimizerConfig};

/// Passes and the events they record
pub use crate::compiler::{
    ConstantPropagationPass, DeadCodeEliminationPass, EventKind, EventLog, MethodContext,
    PassScheduler, SsaPass,
};

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// Instructions, labels and phi-functions
pub use crate::ir::{Label, Phi, Tac};

/// Operands and literal values
pub use crate::ir::{ConstValue, Var, Vara};

/// Opcodes and operand types
pub use crate::ir::{DataType, Op, OpCategory, OpFlags, OpKind};

/// Constant evaluation
pub use crate::ir::{evaluate, evaluate_branch};

// ================================================================================================
// Analysis
// ================================================================================================

/// The instruction graph
pub use crate::analysis::{Node, NodeMap, TacGraph};

/// Liveness and def/use chains
pub use crate::analysis::Liveness;

/// SSA construction and destruction
pub use crate::analysis::{construct, convert_from_ssa, SsaForm};

// ================================================================================================
// Graph Infrastructure
// ================================================================================================

/// Node identifiers and the traits generic graph algorithms run on
pub use crate::utils::graph::{NodeId, Predecessors, RootedGraph, Successors};

/// Dominators and traversal orders
pub use crate::utils::graph::algorithms::{linear_stream, postorder, DomTree};
