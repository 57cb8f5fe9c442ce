//! The interface implemented by every optimization pass.

use crate::{compiler::context::MethodContext, Result};

/// An optimization pass over a method in SSA form.
///
/// Implementations must be `Send + Sync` so that a scheduler can be shared
/// between the threads of [`Optimizer::optimize_all`](crate::Optimizer::optimize_all).
pub trait SsaPass: Send + Sync {
    /// Short, unique, kebab-case name of the pass.
    fn name(&self) -> &'static str;

    /// One-line description of what the pass does.
    fn description(&self) -> &'static str;

    /// Runs the pass on one method.
    ///
    /// # Returns
    ///
    /// `true` if the graph was changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a graph invariant is violated while rewriting.
    fn run_on_method(&self, ctx: &mut MethodContext) -> Result<bool>;
}
