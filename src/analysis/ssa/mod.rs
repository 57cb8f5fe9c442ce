//! Static Single Assignment (SSA) form for instruction graphs.
//!
//! In SSA form every variable version is defined exactly once. Versions are
//! carried in the `ssa` field of each variable operand, and values merging at a
//! join point are selected by phi-functions owned by the join's label.
//!
//! - [`construct`] - phi placement at iterated dominance frontiers, then renaming
//!   along the dominator tree
//! - [`convert_from_ssa`] - replaces phis by copies on the incoming edges
//!
//! Both are pure functions: they clone their input graph and return the clone
//! together with the map from input nodes to cloned nodes.
//!
//! # References
//!
//! - Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//!   Control Dependence Graph", ACM TOPLAS 1991

mod builder;
mod destruct;

pub use builder::{construct, SsaForm};
pub use destruct::convert_from_ssa;
