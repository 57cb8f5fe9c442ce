//! Configuration for the optimizer.
//!
//! This module provides [`OptimizerConfig`], which selects the stages and passes
//! the pipeline runs and how often the pass pipeline may repeat.

/// Configuration for the optimization pipeline.
///
/// The defaults run the complete pipeline: SSA construction, dead-code
/// elimination, constant propagation, dead-code elimination again, and SSA
/// destruction. Graph invariant checks are enabled in debug builds only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Convert to SSA form and run the passes (default: true).
    ///
    /// When disabled, the pipeline only builds the graph, computes liveness and
    /// emits the instructions again.
    pub ssa: bool,

    /// Enable the dead-code elimination pass (default: true).
    pub dead_code_elimination: bool,

    /// Enable the constant propagation pass (default: true).
    pub constant_propagation: bool,

    /// Check edge symmetry and phi operands after every stage (default: debug builds).
    pub verify: bool,

    /// Maximum number of times the pass pipeline is repeated (default: 1).
    ///
    /// The pipeline runs once by default. Higher values rerun it while the
    /// previous round still changed the graph.
    pub max_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            ssa: true,
            dead_code_elimination: true,
            constant_propagation: true,
            verify: cfg!(debug_assertions),
            max_iterations: 1,
        }
    }
}

impl OptimizerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that only rebuilds and re-emits the code.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            ssa: false,
            dead_code_elimination: false,
            constant_propagation: false,
            ..Self::default()
        }
    }

    /// Enables or disables SSA conversion and all passes.
    #[must_use]
    pub fn with_ssa(mut self, enabled: bool) -> Self {
        self.ssa = enabled;
        self
    }

    /// Enables or disables dead-code elimination.
    #[must_use]
    pub fn with_dead_code_elimination(mut self, enabled: bool) -> Self {
        self.dead_code_elimination = enabled;
        self
    }

    /// Enables or disables constant propagation.
    #[must_use]
    pub fn with_constant_propagation(mut self, enabled: bool) -> Self {
        self.constant_propagation = enabled;
        self
    }

    /// Enables or disables the graph invariant checks.
    #[must_use]
    pub fn with_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }

    /// Sets how often the pass pipeline may repeat.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Returns true if any pass is enabled.
    #[must_use]
    pub fn any_pass_enabled(&self) -> bool {
        self.ssa && (self.dead_code_elimination || self.constant_propagation)
    }
}
