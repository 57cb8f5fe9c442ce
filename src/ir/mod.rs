//! The three-address code the optimizer consumes and produces.
//!
//! Instructions ([`Tac`]) reference operands ([`Vara`]) and are tagged with a
//! width-suffixed opcode ([`Op`]). Constant folding rules live in [`evaluate`] and
//! [`evaluate_branch`].

mod fold;
mod op;
mod tac;
mod vara;

pub use fold::{evaluate, evaluate_branch};
pub use op::{DataType, Op, OpCategory, OpFlags, OpKind};
pub use tac::{Label, Phi, Tac};
pub use vara::{ConstValue, Var, Vara};
