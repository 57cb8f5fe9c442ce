//! Three-address code instructions.
//!
//! [`Tac`] is a closed sum type over the instruction shapes the optimizer
//! distinguishes. Each variant carries only the fields that shape needs, and
//! only [`Tac::Label`] owns phi-functions. A phi outside a join point is
//! therefore unrepresentable.

use std::{collections::BTreeMap, fmt};

use crate::{
    ir::{DataType, Op, OpKind, Var, Vara},
    utils::graph::NodeId,
};

/// A phi-function owned by a label.
///
/// Maps each predecessor node of the owning label to the operand flowing in
/// along that edge. After SSA construction the key set of `args` always equals
/// the label's predecessor set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phi {
    /// The variable the phi defines.
    pub result: Vara,
    /// Type of the merged value.
    pub ty: DataType,
    /// Incoming operand per predecessor.
    pub args: BTreeMap<NodeId, Vara>,
}

impl Phi {
    /// Creates a phi for `result` with no operands yet.
    #[must_use]
    pub fn new(result: Vara) -> Self {
        let ty = result.data_type();
        Phi {
            result,
            ty,
            args: BTreeMap::new(),
        }
    }

    /// Returns the variable this phi defines.
    #[must_use]
    pub fn defined_var(&self) -> Option<Var> {
        self.result.logical_var()
    }

    /// Returns `true` if some operand of this phi reads `var`.
    #[must_use]
    pub fn reads(&self, var: Var) -> bool {
        self.args.values().any(|arg| arg.var() == Some(var))
    }
}

/// A join point: optional block id plus the phi-functions placed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    /// Numeric block id branches refer to, `None` for anonymous labels.
    pub block_id: Option<u32>,
    /// Phi-functions, empty outside SSA form.
    pub phis: Vec<Phi>,
}

/// One three-address code instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tac {
    /// Assignment, arithmetic, comparison, conversion, return, throw or nop.
    Simple {
        /// The operation.
        op: Op,
        /// Result operand, [`Vara::Void`] if none.
        r: Vara,
        /// First source operand.
        o1: Vara,
        /// Second source operand.
        o2: Vara,
    },
    /// Compare-branch or unconditional branch to a block id.
    ///
    /// A compare-branch jumps to `target` when the comparison of `o1` with `o2`
    /// holds and falls through otherwise.
    Branch {
        /// The operation.
        op: Op,
        /// Left comparison operand.
        o1: Vara,
        /// Right comparison operand.
        o2: Vara,
        /// Block id of the label jumped to.
        target: u32,
    },
    /// Call of `target` with `args`.
    Call {
        /// The operation, typed with the result type.
        op: Op,
        /// Result operand, [`Vara::Void`] if the result is discarded.
        r: Vara,
        /// Callee.
        target: Vara,
        /// Arguments.
        args: Vec<Vara>,
    },
    /// Join point.
    Label(Label),
}

impl Tac {
    /// `r = assign_<ty> o1`, typed after `r`.
    #[must_use]
    pub fn assign(r: Vara, o1: Vara) -> Self {
        Tac::Simple {
            op: Op::assign(r.data_type()),
            r,
            o1,
            o2: Vara::Void,
        }
    }

    /// `r = op o1, o2`.
    #[must_use]
    pub fn binary(op: Op, r: Vara, o1: Vara, o2: Vara) -> Self {
        Tac::Simple { op, r, o1, o2 }
    }

    /// `r = op o1`.
    #[must_use]
    pub fn unary(op: Op, r: Vara, o1: Vara) -> Self {
        Tac::Simple {
            op,
            r,
            o1,
            o2: Vara::Void,
        }
    }

    /// Compare-branch to block `target`.
    #[must_use]
    pub fn branch(op: Op, o1: Vara, o2: Vara, target: u32) -> Self {
        Tac::Branch { op, o1, o2, target }
    }

    /// Unconditional branch to block `target`.
    #[must_use]
    pub fn br(target: u32) -> Self {
        Tac::Branch {
            op: Op::br(),
            o1: Vara::Void,
            o2: Vara::Void,
            target,
        }
    }

    /// Call of `target` storing the result in `r` (which may be void).
    #[must_use]
    pub fn call(r: Vara, target: Vara, args: Vec<Vara>) -> Self {
        Tac::Call {
            op: Op::new(OpKind::Call, r.data_type()),
            r,
            target,
            args,
        }
    }

    /// Return of `value`.
    #[must_use]
    pub fn ret(value: Vara) -> Self {
        Tac::Simple {
            op: Op::new(OpKind::Ret, value.data_type()),
            r: Vara::Void,
            o1: value,
            o2: Vara::Void,
        }
    }

    /// Return without a value.
    #[must_use]
    pub fn ret_void() -> Self {
        Tac::ret(Vara::Void)
    }

    /// Label carrying block id `block_id`.
    #[must_use]
    pub fn label(block_id: u32) -> Self {
        Tac::Label(Label {
            block_id: Some(block_id),
            phis: Vec::new(),
        })
    }

    /// Returns the opcode, `None` for labels.
    #[must_use]
    pub fn op(&self) -> Option<Op> {
        match self {
            Tac::Simple { op, .. } | Tac::Branch { op, .. } | Tac::Call { op, .. } => Some(*op),
            Tac::Label(_) => None,
        }
    }

    /// Returns `true` if execution may continue with the next instruction.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        self.op().is_none_or(Op::falls_through)
    }

    /// Returns the label of a join point.
    #[must_use]
    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Tac::Label(label) => Some(label),
            _ => None,
        }
    }

    /// Returns the label of a join point, mutably.
    pub fn as_label_mut(&mut self) -> Option<&mut Label> {
        match self {
            Tac::Label(label) => Some(label),
            _ => None,
        }
    }

    /// Returns `true` for labels.
    #[must_use]
    pub fn is_label(&self) -> bool {
        matches!(self, Tac::Label(_))
    }

    /// Returns `true` for calls.
    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(self, Tac::Call { .. })
    }

    /// Returns `true` for compare-branches and unconditional branches.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, Tac::Branch { .. })
    }

    /// Returns the result operand of simple instructions and calls.
    #[must_use]
    pub fn result(&self) -> Option<&Vara> {
        match self {
            Tac::Simple { r, .. } | Tac::Call { r, .. } => Some(r),
            Tac::Branch { .. } | Tac::Label(_) => None,
        }
    }

    /// Returns the result operand of simple instructions and calls, mutably.
    pub fn result_mut(&mut self) -> Option<&mut Vara> {
        match self {
            Tac::Simple { r, .. } | Tac::Call { r, .. } => Some(r),
            Tac::Branch { .. } | Tac::Label(_) => None,
        }
    }

    /// Returns the operand slots this instruction reads from.
    ///
    /// These are the source operands plus a contents-of result. Phi operands are
    /// not included.
    pub fn sources_mut(&mut self) -> Vec<&mut Vara> {
        match self {
            Tac::Simple { r, o1, o2, .. } => {
                let mut slots = vec![o1, o2];
                if matches!(r, Vara::ContentsOf { .. }) {
                    slots.push(r);
                }
                slots
            }
            Tac::Branch { o1, o2, .. } => vec![o1, o2],
            Tac::Call {
                r, target, args, ..
            } => {
                let mut slots = vec![target];
                slots.extend(args.iter_mut());
                if matches!(r, Vara::ContentsOf { .. }) {
                    slots.push(r);
                }
                slots
            }
            Tac::Label(_) => Vec::new(),
        }
    }

    /// Returns the variables this instruction reads.
    ///
    /// Source operands count in all variable forms. A contents-of result counts
    /// as a read of the pointer variable. Labels read the non-constant operands
    /// of their phis.
    #[must_use]
    pub fn uses(&self) -> Vec<Var> {
        let mut uses = Vec::new();
        let mut push = |v: &Vara| {
            if let Some(var) = v.var() {
                if !uses.contains(&var) {
                    uses.push(var);
                }
            }
        };

        match self {
            Tac::Simple { r, o1, o2, .. } => {
                if matches!(r, Vara::ContentsOf { .. }) {
                    push(r);
                }
                push(o1);
                push(o2);
            }
            Tac::Branch { o1, o2, .. } => {
                push(o1);
                push(o2);
            }
            Tac::Call {
                r, target, args, ..
            } => {
                if matches!(r, Vara::ContentsOf { .. }) {
                    push(r);
                }
                push(target);
                args.iter().for_each(&mut push);
            }
            Tac::Label(label) => {
                for phi in &label.phis {
                    phi.args.values().for_each(&mut push);
                }
            }
        }
        uses
    }

    /// Returns the variables this instruction defines.
    #[must_use]
    pub fn defs(&self) -> Vec<Var> {
        match self {
            Tac::Simple { r, .. } | Tac::Call { r, .. } => r.logical_var().into_iter().collect(),
            Tac::Branch { .. } => Vec::new(),
            Tac::Label(label) => label.phis.iter().filter_map(Phi::defined_var).collect(),
        }
    }

    /// Returns `true` if this instruction reads `var`.
    #[must_use]
    pub fn reads(&self, var: Var) -> bool {
        self.uses().contains(&var)
    }
}

impl fmt::Display for Phi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = phi(", self.result)?;
        for (i, (pred, arg)) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{pred}: {arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Tac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tac::Simple { op, r, o1, o2 } => {
                if !r.is_void() {
                    write!(f, "{r} = ")?;
                }
                write!(f, "{op}")?;
                if !o1.is_void() {
                    write!(f, " {o1}")?;
                }
                if !o2.is_void() {
                    write!(f, ", {o2}")?;
                }
                Ok(())
            }
            Tac::Branch { op, o1, o2, target } => {
                write!(f, "{op}")?;
                if !o1.is_void() {
                    write!(f, " {o1}, {o2}")?;
                }
                write!(f, " -> L{target}")
            }
            Tac::Call {
                op,
                r,
                target,
                args,
            } => {
                if !r.is_void() {
                    write!(f, "{r} = ")?;
                }
                write!(f, "{op} {target}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Tac::Label(label) => {
                match label.block_id {
                    Some(id) => write!(f, "L{id}:")?,
                    None => write!(f, "L?:")?,
                }
                for phi in &label.phis {
                    write!(f, " {phi};")?;
                }
                Ok(())
            }
        }
    }
}
