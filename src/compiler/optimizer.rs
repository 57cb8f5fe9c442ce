//! The optimization pipeline.
//!
//! [`Optimizer`] drives one method through every stage:
//!
//! 1. Build the instruction graph
//! 2. Compute dominators and liveness
//! 3. Construct SSA form and recompute liveness on it
//! 4. Run the scheduled passes (DCE, constant propagation, DCE)
//! 5. Drop empty def/use chains and convert out of SSA form
//! 6. Compute the final liveness
//! 7. Emit the flat instruction list
//!
//! Methods are independent of each other, so [`Optimizer::optimize_all`] runs a
//! batch of them in parallel. Each method is still processed by one thread.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    analysis::{construct, convert_from_ssa, Liveness, TacGraph},
    compiler::{
        codegen::CodeGenerator, config::OptimizerConfig, context::MethodContext,
        events::EventLog, scheduler::PassScheduler,
    },
    ir::Tac,
    utils::graph::{algorithms::DomTree, NodeId},
    Result,
};

/// The result of optimizing one method.
#[derive(Debug, Clone)]
pub struct OptimizedMethod {
    /// The final, phi-free instruction graph.
    pub graph: TacGraph,
    /// The final linear stream of `graph`, in emission order.
    pub code: Vec<NodeId>,
    /// Liveness of `graph`, covering exactly the nodes in `code`.
    ///
    /// It is keyed by graph node, not by position in
    /// [`instructions`](Self::instructions). The `br` jumps and fresh labels
    /// emission adds have no node and no entry here; anonymous labels that are
    /// not emitted still have one. Both kinds only pass control along, so the
    /// live set after an emitted instruction is the `live_out` of its node.
    pub liveness: Liveness,
    /// Every change the passes made.
    pub events: EventLog,
    /// Wall-clock time the pipeline took.
    pub elapsed: Duration,
    instructions: Vec<Tac>,
}

impl OptimizedMethod {
    /// Returns the flat instruction list, ready for instruction selection.
    ///
    /// Branch targets name block ids of labels in the list, and no label carries
    /// phi-functions.
    #[must_use]
    pub fn instructions(&self) -> &[Tac] {
        &self.instructions
    }

    /// Consumes the result and returns the flat instruction list.
    #[must_use]
    pub fn into_instructions(self) -> Vec<Tac> {
        self.instructions
    }
}

/// Runs the optimization pipeline on methods.
///
/// # Example
///
/// ```rust
/// use tacopt::prelude::*;
///
/// let v = |id| Vara::logical(id, DataType::I4);
/// let code = vec![
///     Tac::assign(v(0), Vara::i4(5)),
///     Tac::assign(v(1), Vara::i4(10)),
///     Tac::binary(Op::new(OpKind::Add, DataType::I4), v(2), v(0), v(1)),
///     Tac::ret(v(2)),
/// ];
///
/// let method = Optimizer::default().optimize(&code)?;
/// assert_eq!(method.instructions(), &[Tac::ret(Vara::i4(15))]);
/// # Ok::<(), tacopt::Error>(())
/// ```
pub struct Optimizer {
    config: OptimizerConfig,
    scheduler: PassScheduler,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl Optimizer {
    /// Creates an optimizer with the given configuration.
    #[must_use]
    pub fn new(config: OptimizerConfig) -> Self {
        let scheduler = PassScheduler::from_config(&config);
        Self { config, scheduler }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Returns the pass scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &PassScheduler {
        &self.scheduler
    }

    /// Optimizes one method.
    ///
    /// # Arguments
    ///
    /// * `code` - The method's instructions, in TAC form without phis
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`](crate::Error::Empty) for an empty list,
    /// [`Error::UnknownBlockTarget`](crate::Error::UnknownBlockTarget) for a branch to
    /// a missing label, and any error a stage reports on an internal inconsistency.
    pub fn optimize(&self, code: &[Tac]) -> Result<OptimizedMethod> {
        let start = Instant::now();

        let graph = TacGraph::build(code)?;
        self.verify(&graph, "build")?;

        let (graph, events) = if self.config.ssa {
            self.run_ssa(&graph)?
        } else {
            (graph, EventLog::new())
        };

        let liveness = Liveness::analyze(&graph);
        let order = graph.linear_stream();
        let first_fresh = code
            .iter()
            .filter_map(|tac| tac.as_label().and_then(|label| label.block_id))
            .max()
            .map_or(0, |id| id.saturating_add(1));
        let instructions = CodeGenerator::new(&graph, &order, first_fresh).generate()?;

        debug!(
            input = code.len(),
            output = instructions.len(),
            events = events.len(),
            "optimized method"
        );
        Ok(OptimizedMethod {
            graph,
            code: order,
            liveness,
            events,
            elapsed: start.elapsed(),
            instructions,
        })
    }

    /// Optimizes a batch of methods in parallel.
    ///
    /// The results are in the order of `methods`. A failing method does not
    /// affect the others.
    #[must_use]
    pub fn optimize_all(&self, methods: &[Vec<Tac>]) -> Vec<Result<OptimizedMethod>> {
        methods.par_iter().map(|code| self.optimize(code)).collect()
    }

    /// SSA construction, passes and SSA destruction.
    fn run_ssa(&self, graph: &TacGraph) -> Result<(TacGraph, EventLog)> {
        let dom = DomTree::build(graph);
        let liveness = Liveness::analyze(graph);
        debug!(
            nodes = graph.node_count(),
            dominator_iterations = dom.iterations(),
            liveness_iterations = liveness.iterations(),
            "analysed instruction graph"
        );

        let ssa = construct(graph, &dom, &liveness)?;
        self.verify(&ssa.graph, "SSA construction")?;

        let liveness = Liveness::analyze(&ssa.graph);
        let mut ctx = MethodContext::new(ssa.graph, liveness);
        self.scheduler.run(&mut ctx)?;
        ctx.liveness.trim_empty();
        self.verify(&ctx.graph, "passes")?;

        let (graph, _map) = convert_from_ssa(&ctx.graph)?;
        self.verify(&graph, "SSA destruction")?;

        Ok((graph, ctx.events))
    }

    fn verify(&self, graph: &TacGraph, stage: &str) -> Result<()> {
        if !self.config.verify {
            return Ok(());
        }
        graph.check_edge_symmetry()?;
        graph.check_phi_operands()?;
        debug!(stage, "graph invariants hold");
        Ok(())
    }
}
