//! Per-method state shared by the optimization passes.

use crate::{
    analysis::{Liveness, TacGraph},
    compiler::events::EventLog,
};

/// The SSA graph of one method together with its def/use chains and change log.
///
/// Passes receive the context mutably and rewrite `graph` in place. Every edit
/// must keep the def/use chains in `liveness` current, using the graph methods
/// that take a [`Liveness`] or its incremental update methods.
#[derive(Debug, Clone, Default)]
pub struct MethodContext {
    /// The graph in SSA form.
    pub graph: TacGraph,
    /// Def/use chains of `graph`.
    pub liveness: Liveness,
    /// Every change made so far.
    pub events: EventLog,
}

impl MethodContext {
    /// Creates a context with an empty event log.
    #[must_use]
    pub fn new(graph: TacGraph, liveness: Liveness) -> Self {
        MethodContext {
            graph,
            liveness,
            events: EventLog::new(),
        }
    }
}
