//! SSA optimization passes.
//!
//! Every pass implements [`SsaPass`](crate::compiler::SsaPass) and rewrites a
//! [`MethodContext`](crate::compiler::MethodContext) in place.
//!
//! - [`DeadCodeEliminationPass`] - removes definitions nothing reads
//! - [`ConstantPropagationPass`] - propagates and folds constants, resolves
//!   constant branches and removes the code they cut off

mod constants;
mod dce;

pub use constants::ConstantPropagationPass;
pub use dce::DeadCodeEliminationPass;
