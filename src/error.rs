use thiserror::Error;

use crate::{ir::Op, utils::graph::NodeId};

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Invariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Invariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant describes an internal invariant violation of the optimization pipeline. None of
/// them are recoverable for the method being compiled: the pipeline aborts instead of handing out
/// a partially optimized, unverified result. A correctly driven pipeline never produces any of
/// them on well-formed input.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Empty`] - No instructions were provided
/// - [`Error::UnknownBlockTarget`] - A branch names a block id no label carries
///
/// ## Structural Errors
/// - [`Error::AmbiguousRemoval`] - Node removal would require a many-to-many edge collapse
/// - [`Error::MisplacedPhi`] - A phi-function would live outside a label node
/// - [`Error::UnsupportedBranchInversion`] - Inversion of an opcode outside the known set
/// - [`Error::MissingDataflow`] - Dataflow query on a node absent from the analysed graph
/// - [`Error::Invariant`] - Any other internal consistency check
///
/// # Examples
///
/// ```rust
/// use tacopt::{Error, Optimizer};
///
/// match Optimizer::default().optimize(&[]) {
///     Ok(method) => println!("{} instructions", method.instructions().len()),
///     Err(Error::Empty) => eprintln!("nothing to optimize"),
///     Err(Error::Invariant { message, file, line }) => {
///         eprintln!("invariant violated: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("optimization failed: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Provided instruction list was empty.
    #[error("Provided instruction list was empty")]
    Empty,

    /// A branch refers to a block id that no label instruction carries.
    ///
    /// The associated value is the unresolved block id.
    #[error("Branch target block {0} has no matching label")]
    UnknownBlockTarget(u32),

    /// Attempted to remove a node with multiple predecessors and multiple successors.
    ///
    /// Reconnecting such a node would need a many-to-many edge collapse, which has no
    /// single correct answer. The associated [`NodeId`] is the node that was to be removed.
    #[error("Cannot remove {0}: it has multiple predecessors and multiple successors")]
    AmbiguousRemoval(NodeId),

    /// A phi-function was required at a node that is not a label.
    ///
    /// This also covers a label that has no counterpart in the cloned SSA graph. Both cases
    /// indicate a construction bug upstream in the same pipeline.
    #[error("Phi-function required at {0}, which is not a label in the SSA graph")]
    MisplacedPhi(NodeId),

    /// Branch inversion was requested for an opcode outside the compare-branch set.
    #[error("Branch inversion is not supported for {0}")]
    UnsupportedBranchInversion(Op),

    /// A dataflow query was made for a node absent from the analysed graph.
    ///
    /// Signals a stage ordering bug, e.g. querying the dominator tree of a graph that was
    /// mutated after the tree was built.
    #[error("No dataflow information for {0}")]
    MissingDataflow(NodeId),

    /// An internal consistency check failed.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violated - {file}:{line}: {message}")]
    Invariant {
        /// The message to be printed for the Invariant error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
