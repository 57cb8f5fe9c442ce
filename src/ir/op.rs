//! Opcodes of the three-address code.
//!
//! An [`Op`] pairs an [`OpKind`] with the [`DataType`] it operates on, mirroring the
//! width-suffixed mnemonics of the front end (`add_i4`, `assign_r8`, `bge_i8`).
//! Everything the optimizer needs to know about an opcode, such as whether it
//! falls through, whether it may be removed and how it folds, is derived from
//! the kind.

use std::{fmt, str::FromStr};

use bitflags::bitflags;
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

/// The data type an operand carries or an opcode operates on.
///
/// Displays as the opcode suffix used in mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString)]
pub enum DataType {
    /// No value.
    #[strum(serialize = "void")]
    Void,
    /// 32-bit integer.
    #[strum(serialize = "i4")]
    I4,
    /// 64-bit integer.
    #[strum(serialize = "i8")]
    I8,
    /// Native-width integer (treated as 64 bits when folding).
    #[strum(serialize = "i")]
    I,
    /// 32-bit float.
    #[strum(serialize = "r4")]
    R4,
    /// 64-bit float.
    #[strum(serialize = "r8")]
    R8,
    /// Object reference.
    #[strum(serialize = "obj")]
    Object,
    /// Value type held by value.
    #[strum(serialize = "vt")]
    ValueType,
}

impl DataType {
    /// Returns `true` for the integer types `I4`, `I8` and `I`.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, DataType::I4 | DataType::I8 | DataType::I)
    }

    /// Returns `true` for the floating point types `R4` and `R8`.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, DataType::R4 | DataType::R8)
    }
}

/// The operation an instruction performs, independent of operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OpKind {
    /// `r = o1`
    Assign,
    /// `r = o1 + o2`
    Add,
    /// `r = o1 - o2`
    Sub,
    /// `r = o1 * o2`
    Mul,
    /// `r = o1 / o2` (signed)
    Div,
    /// `r = o1 % o2` (signed)
    Rem,
    /// `r = o1 & o2`
    And,
    /// `r = o1 | o2`
    Or,
    /// `r = o1 ^ o2`
    Xor,
    /// `r = o1 << o2`
    Shl,
    /// `r = o1 >> o2` (arithmetic)
    Shr,
    /// `r = o1 >> o2` (logical)
    ShrUn,
    /// `r = -o1`
    Neg,
    /// `r = !o1`
    Not,
    /// `r = (o1 == o2) ? 1 : 0`
    Ceq,
    /// `r = (o1 > o2) ? 1 : 0`
    Cgt,
    /// `r = (o1 < o2) ? 1 : 0`
    Clt,
    /// `r = o1` converted to the opcode's type
    Conv,
    /// Branch if equal.
    Beq,
    /// Branch if not equal.
    Bne,
    /// Branch if greater (signed).
    Bg,
    /// Branch if greater or equal (signed).
    Bge,
    /// Branch if less (signed).
    Bl,
    /// Branch if less or equal (signed).
    Ble,
    /// Branch if above (unsigned greater).
    Ba,
    /// Branch if above or equal (unsigned).
    Bae,
    /// Branch if below (unsigned less).
    Bb,
    /// Branch if below or equal (unsigned).
    Bbe,
    /// Unconditional branch.
    Br,
    /// Call `target(args...)`, optionally storing the result.
    Call,
    /// Return, optionally with a value in `o1`.
    Ret,
    /// Throw the object in `o1`.
    Throw,
    /// No operation.
    Nop,
}

/// Coarse classification of opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OpCategory {
    /// Plain assignment.
    Assign,
    /// Binary arithmetic or logic.
    BinaryNumeric,
    /// Unary arithmetic or logic.
    UnaryNumeric,
    /// Comparison producing a value.
    Compare,
    /// Type conversion.
    Conversion,
    /// Comparison fused with a conditional branch.
    CompareBranch,
    /// Unconditional branch.
    Branch,
    /// Call.
    Call,
    /// Return from the method.
    Return,
    /// Anything else.
    Other,
}

bitflags! {
    /// Control-flow and effect properties of an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpFlags: u8 {
        /// Execution may continue with the next instruction in the list.
        const FALLS_THROUGH = 0x01;
        /// The instruction names a branch target.
        const BRANCH = 0x02;
        /// The branch is taken only when its condition holds.
        const CONDITIONAL = 0x04;
        /// The instruction must be kept even if its result is unused.
        const SIDE_EFFECTS = 0x08;
        /// Operands may be swapped without changing the result.
        const COMMUTATIVE = 0x10;
    }
}

impl OpKind {
    /// Returns the category of this opcode.
    #[must_use]
    pub const fn category(self) -> OpCategory {
        match self {
            OpKind::Assign => OpCategory::Assign,
            OpKind::Add
            | OpKind::Sub
            | OpKind::Mul
            | OpKind::Div
            | OpKind::Rem
            | OpKind::And
            | OpKind::Or
            | OpKind::Xor
            | OpKind::Shl
            | OpKind::Shr
            | OpKind::ShrUn => OpCategory::BinaryNumeric,
            OpKind::Neg | OpKind::Not => OpCategory::UnaryNumeric,
            OpKind::Ceq | OpKind::Cgt | OpKind::Clt => OpCategory::Compare,
            OpKind::Conv => OpCategory::Conversion,
            OpKind::Beq
            | OpKind::Bne
            | OpKind::Bg
            | OpKind::Bge
            | OpKind::Bl
            | OpKind::Ble
            | OpKind::Ba
            | OpKind::Bae
            | OpKind::Bb
            | OpKind::Bbe => OpCategory::CompareBranch,
            OpKind::Br => OpCategory::Branch,
            OpKind::Call => OpCategory::Call,
            OpKind::Ret => OpCategory::Return,
            OpKind::Throw | OpKind::Nop => OpCategory::Other,
        }
    }

    /// Returns the control-flow and effect flags of this opcode.
    #[must_use]
    pub fn flags(self) -> OpFlags {
        match self.category() {
            OpCategory::CompareBranch => {
                OpFlags::FALLS_THROUGH | OpFlags::BRANCH | OpFlags::CONDITIONAL
            }
            OpCategory::Branch => OpFlags::BRANCH,
            OpCategory::Call => OpFlags::FALLS_THROUGH | OpFlags::SIDE_EFFECTS,
            OpCategory::Return => OpFlags::SIDE_EFFECTS,
            OpCategory::Other if self == OpKind::Throw => OpFlags::SIDE_EFFECTS,
            _ => match self {
                OpKind::Add
                | OpKind::Mul
                | OpKind::And
                | OpKind::Or
                | OpKind::Xor
                | OpKind::Ceq => OpFlags::FALLS_THROUGH | OpFlags::COMMUTATIVE,
                _ => OpFlags::FALLS_THROUGH,
            },
        }
    }

    /// Returns `true` if control may continue with the next instruction.
    ///
    /// This is `false` only for `br`, `ret` and `throw`.
    #[must_use]
    pub fn falls_through(self) -> bool {
        self.flags().contains(OpFlags::FALLS_THROUGH)
    }

    /// Returns `true` for the compare-branch opcodes.
    #[must_use]
    pub const fn is_compare_branch(self) -> bool {
        matches!(self.category(), OpCategory::CompareBranch)
    }

    /// Returns the compare-branch whose condition is the negation of this one.
    #[must_use]
    pub const fn inverted(self) -> Option<OpKind> {
        Some(match self {
            OpKind::Ba => OpKind::Bbe,
            OpKind::Bae => OpKind::Bb,
            OpKind::Bb => OpKind::Bae,
            OpKind::Bbe => OpKind::Ba,
            OpKind::Beq => OpKind::Bne,
            OpKind::Bg => OpKind::Ble,
            OpKind::Bge => OpKind::Bl,
            OpKind::Bl => OpKind::Bge,
            OpKind::Ble => OpKind::Bg,
            OpKind::Bne => OpKind::Beq,
            _ => return None,
        })
    }
}

/// A width-tagged opcode such as `add_i4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Op {
    /// The operation.
    pub kind: OpKind,
    /// The operand type the operation works on.
    pub ty: DataType,
}

impl Op {
    /// Creates a new opcode.
    #[must_use]
    pub const fn new(kind: OpKind, ty: DataType) -> Self {
        Op { kind, ty }
    }

    /// Returns the `assign_<ty>` opcode for values of type `ty`.
    #[must_use]
    pub const fn assign(ty: DataType) -> Self {
        Op::new(OpKind::Assign, ty)
    }

    /// Returns the unconditional `br` opcode.
    #[must_use]
    pub const fn br() -> Self {
        Op::new(OpKind::Br, DataType::Void)
    }

    /// Returns the category of this opcode.
    #[must_use]
    pub const fn category(self) -> OpCategory {
        self.kind.category()
    }

    /// Returns `true` if control may continue with the next instruction.
    #[must_use]
    pub fn falls_through(self) -> bool {
        self.kind.falls_through()
    }

    /// Returns the compare-branch with the negated condition and the same width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBranchInversion`] if this is not a compare-branch.
    pub fn invert_branch(self) -> Result<Op> {
        self.kind
            .inverted()
            .map(|kind| Op::new(kind, self.ty))
            .ok_or(Error::UnsupportedBranchInversion(self))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ty == DataType::Void {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}_{}", self.kind, self.ty)
        }
    }
}

impl FromStr for Op {
    type Err = strum::ParseError;

    /// Parses mnemonics such as `add_i4`, `shr_un_i8` or `br`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some((kind, ty)) = s.rsplit_once('_') {
            if let (Ok(kind), Ok(ty)) = (kind.parse::<OpKind>(), ty.parse::<DataType>()) {
                return Ok(Op::new(kind, ty));
            }
        }
        Ok(Op::new(s.parse::<OpKind>()?, DataType::Void))
    }
}
