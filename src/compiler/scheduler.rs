//! Pass scheduler for orchestrating SSA pass execution.
//!
//! The `PassScheduler` runs an ordered list of SSA passes over one method. The
//! default pipeline is dead-code elimination, constant propagation and a final
//! dead-code elimination that sweeps up the definitions constant propagation
//! left without uses.

use tracing::{debug, trace};

use crate::{
    compiler::{
        config::OptimizerConfig,
        context::MethodContext,
        pass::SsaPass,
        passes::{ConstantPropagationPass, DeadCodeEliminationPass},
    },
    Result,
};

/// Orchestrates SSA pass execution.
///
/// The passes run in order. The whole list is repeated while a round still
/// changes the graph, up to `max_iterations` rounds.
pub struct PassScheduler {
    /// Maximum number of rounds over the pass list.
    max_iterations: usize,
    /// The passes in execution order.
    pub passes: Vec<Box<dyn SsaPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::from_config(&OptimizerConfig::default())
    }
}

impl PassScheduler {
    /// Creates a scheduler without passes.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum number of rounds over the pass list.
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            passes: Vec::new(),
        }
    }

    /// Creates the scheduler for the passes `config` enables.
    ///
    /// With both passes enabled the order is DCE, constant propagation, DCE.
    #[must_use]
    pub fn from_config(config: &OptimizerConfig) -> Self {
        let mut scheduler = Self::new(config.max_iterations);
        if !config.ssa {
            return scheduler;
        }

        if config.dead_code_elimination {
            scheduler.add(DeadCodeEliminationPass::new());
        }
        if config.constant_propagation {
            scheduler.add(ConstantPropagationPass::new());
            if config.dead_code_elimination {
                scheduler.add(DeadCodeEliminationPass::new());
            }
        }
        scheduler
    }

    /// Appends a pass to the pipeline.
    pub fn add<P: SsaPass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    /// Returns the names of the scheduled passes in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Runs the pipeline on one method.
    ///
    /// # Returns
    ///
    /// `true` if any pass changed the graph.
    ///
    /// # Errors
    ///
    /// Propagates the first error a pass returns.
    pub fn run(&self, ctx: &mut MethodContext) -> Result<bool> {
        let mut any_changed = false;

        for iteration in 0..self.max_iterations {
            let changed = self.run_passes_once(ctx)?;
            debug!(iteration, changed, "pass pipeline round finished");

            if !changed {
                break;
            }
            any_changed = true;
        }

        Ok(any_changed)
    }

    /// Runs every pass once.
    ///
    /// Returns `true` if any pass made changes, `false` otherwise.
    fn run_passes_once(&self, ctx: &mut MethodContext) -> Result<bool> {
        let mut any_changed = false;

        for pass in &self.passes {
            let before = ctx.events.len();
            let changed = pass.run_on_method(ctx)?;
            trace!(
                pass = pass.name(),
                changed,
                events = ctx.events.len() - before,
                "ran pass"
            );
            any_changed |= changed;
        }

        Ok(any_changed)
    }
}
