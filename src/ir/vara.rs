//! Operands: variable references and constants.
//!
//! Every operand slot of an instruction holds a [`Vara`]. Logical variables are
//! identified by a numeric id plus an SSA version (0 before renaming). The
//! address-of and contents-of forms reference the same variable with different
//! access semantics, and they count as uses of it for liveness. Constants carry
//! a literal [`ConstValue`] and never take part in renaming or liveness.

use std::fmt;

use crate::ir::DataType;

/// A variable identity together with its SSA version.
///
/// This is the key of every liveness table and def/use chain. Before SSA
/// construction all versions are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var {
    /// Numeric identity of the variable, as assigned by the front end.
    pub id: u32,
    /// SSA version, 0 if the variable has not been renamed.
    pub version: u32,
}

impl Var {
    /// Creates a new variable key.
    #[must_use]
    pub const fn new(id: u32, version: u32) -> Self {
        Var { id, version }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.id, self.version)
    }
}

/// A literal value.
///
/// Floats compare bitwise, so `0.0` and `-0.0` are distinct constants and a NaN
/// equals an identically encoded NaN. That makes equality safe to use for
/// deciding whether two incoming values are interchangeable.
#[derive(Debug, Clone, Copy)]
pub enum ConstValue {
    /// The null reference, also used for "no definition reaches here".
    Null,
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Native-width integer.
    NativeInt(i64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
}

impl ConstValue {
    /// Returns the data type this literal naturally has.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            ConstValue::Null => DataType::Object,
            ConstValue::Int32(_) => DataType::I4,
            ConstValue::Int64(_) => DataType::I8,
            ConstValue::NativeInt(_) => DataType::I,
            ConstValue::Float32(_) => DataType::R4,
            ConstValue::Float64(_) => DataType::R8,
        }
    }

    /// Returns `true` for [`ConstValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, ConstValue::Null)
    }
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::Null, ConstValue::Null) => true,
            (ConstValue::Int32(a), ConstValue::Int32(b)) => a == b,
            (ConstValue::Int64(a), ConstValue::Int64(b))
            | (ConstValue::NativeInt(a), ConstValue::NativeInt(b)) => a == b,
            (ConstValue::Float32(a), ConstValue::Float32(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Float64(a), ConstValue::Float64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Int32(v) => write!(f, "{v}"),
            ConstValue::Int64(v) => write!(f, "{v}L"),
            ConstValue::NativeInt(v) => write!(f, "{v}n"),
            ConstValue::Float32(v) => write!(f, "{v}f"),
            ConstValue::Float64(v) => write!(f, "{v}d"),
        }
    }
}

/// A variable reference or constant operand.
///
/// Logical references compare equal iff their identity and SSA version match;
/// the type tag does not take part in the comparison.
#[derive(Debug, Clone)]
pub enum Vara {
    /// No operand.
    Void,
    /// A literal value tagged with the type of the slot it occupies.
    Const {
        /// The literal.
        value: ConstValue,
        /// Declared type of the operand.
        ty: DataType,
    },
    /// A plain variable.
    Logical {
        /// Variable identity.
        var: u32,
        /// SSA version.
        ssa: u32,
        /// Declared type of the variable.
        ty: DataType,
    },
    /// The address of a variable plus a byte offset.
    AddrOf {
        /// Variable identity.
        var: u32,
        /// SSA version.
        ssa: u32,
        /// Byte offset into the variable.
        offset: i32,
    },
    /// The memory a variable points to, at a byte offset.
    ContentsOf {
        /// Variable identity.
        var: u32,
        /// SSA version.
        ssa: u32,
        /// Byte offset from the pointer.
        offset: i32,
        /// Type of the value read or written.
        ty: DataType,
    },
}

impl Vara {
    /// A logical variable reference with SSA version 0.
    #[must_use]
    pub const fn logical(var: u32, ty: DataType) -> Self {
        Vara::Logical { var, ssa: 0, ty }
    }

    /// An address-of reference with SSA version 0.
    #[must_use]
    pub const fn addr_of(var: u32, offset: i32) -> Self {
        Vara::AddrOf { var, ssa: 0, offset }
    }

    /// A contents-of reference with SSA version 0.
    #[must_use]
    pub const fn contents_of(var: u32, offset: i32, ty: DataType) -> Self {
        Vara::ContentsOf {
            var,
            ssa: 0,
            offset,
            ty,
        }
    }

    /// A constant operand.
    #[must_use]
    pub const fn constant(value: ConstValue, ty: DataType) -> Self {
        Vara::Const { value, ty }
    }

    /// A 32-bit integer constant.
    #[must_use]
    pub const fn i4(value: i32) -> Self {
        Vara::constant(ConstValue::Int32(value), DataType::I4)
    }

    /// A 64-bit integer constant.
    #[must_use]
    pub const fn i8(value: i64) -> Self {
        Vara::constant(ConstValue::Int64(value), DataType::I8)
    }

    /// A native integer constant.
    #[must_use]
    pub const fn native(value: i64) -> Self {
        Vara::constant(ConstValue::NativeInt(value), DataType::I)
    }

    /// A 32-bit float constant.
    #[must_use]
    pub const fn r4(value: f32) -> Self {
        Vara::constant(ConstValue::Float32(value), DataType::R4)
    }

    /// A 64-bit float constant.
    #[must_use]
    pub const fn r8(value: f64) -> Self {
        Vara::constant(ConstValue::Float64(value), DataType::R8)
    }

    /// A null constant of the given type.
    #[must_use]
    pub const fn null(ty: DataType) -> Self {
        Vara::constant(ConstValue::Null, ty)
    }

    /// Returns `true` for [`Vara::Void`].
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Vara::Void)
    }

    /// Returns `true` for constants.
    #[must_use]
    pub const fn is_const(&self) -> bool {
        matches!(self, Vara::Const { .. })
    }

    /// Returns `true` for plain logical variables.
    #[must_use]
    pub const fn is_logical(&self) -> bool {
        matches!(self, Vara::Logical { .. })
    }

    /// Returns the literal of a constant operand.
    #[must_use]
    pub const fn as_const(&self) -> Option<&ConstValue> {
        match self {
            Vara::Const { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns the variable this operand mentions, for all variable forms.
    ///
    /// This is the projection used for use sets: address-of and contents-of
    /// operands read the variable they name.
    #[must_use]
    pub const fn var(&self) -> Option<Var> {
        match *self {
            Vara::Logical { var, ssa, .. }
            | Vara::AddrOf { var, ssa, .. }
            | Vara::ContentsOf { var, ssa, .. } => Some(Var::new(var, ssa)),
            Vara::Void | Vara::Const { .. } => None,
        }
    }

    /// Returns the variable only if this is a plain logical reference.
    #[must_use]
    pub const fn logical_var(&self) -> Option<Var> {
        match *self {
            Vara::Logical { var, ssa, .. } => Some(Var::new(var, ssa)),
            _ => None,
        }
    }

    /// Returns the declared type of this operand.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Vara::Void => DataType::Void,
            Vara::AddrOf { .. } => DataType::I,
            Vara::Const { ty, .. } | Vara::Logical { ty, .. } | Vara::ContentsOf { ty, .. } => *ty,
        }
    }

    /// Returns a copy of this variable reference carrying SSA version `version`.
    ///
    /// Constants and void operands are returned unchanged.
    #[must_use]
    pub fn with_version(&self, version: u32) -> Self {
        let mut renamed = self.clone();
        match &mut renamed {
            Vara::Logical { ssa, .. } | Vara::AddrOf { ssa, .. } | Vara::ContentsOf { ssa, .. } => {
                *ssa = version;
            }
            Vara::Void | Vara::Const { .. } => {}
        }
        renamed
    }
}

impl PartialEq for Vara {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Vara::Void, Vara::Void) => true,
            (Vara::Const { value: a, ty: ta }, Vara::Const { value: b, ty: tb }) => {
                a == b && ta == tb
            }
            (
                Vara::Logical { var: a, ssa: sa, .. },
                Vara::Logical { var: b, ssa: sb, .. },
            ) => a == b && sa == sb,
            (
                Vara::AddrOf {
                    var: a,
                    ssa: sa,
                    offset: oa,
                },
                Vara::AddrOf {
                    var: b,
                    ssa: sb,
                    offset: ob,
                },
            ) => a == b && sa == sb && oa == ob,
            (
                Vara::ContentsOf {
                    var: a,
                    ssa: sa,
                    offset: oa,
                    ..
                },
                Vara::ContentsOf {
                    var: b,
                    ssa: sb,
                    offset: ob,
                    ..
                },
            ) => a == b && sa == sb && oa == ob,
            _ => false,
        }
    }
}

impl Eq for Vara {}

impl fmt::Display for Vara {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vara::Void => write!(f, "_"),
            Vara::Const { value, .. } => write!(f, "{value}"),
            Vara::Logical { var, ssa, .. } => write!(f, "{}", Var::new(*var, *ssa)),
            Vara::AddrOf { var, ssa, offset } => {
                write!(f, "&{}", Var::new(*var, *ssa))?;
                if *offset != 0 {
                    write!(f, "{offset:+}")?;
                }
                Ok(())
            }
            Vara::ContentsOf {
                var, ssa, offset, ..
            } => {
                write!(f, "[{}", Var::new(*var, *ssa))?;
                if *offset != 0 {
                    write!(f, "{offset:+}")?;
                }
                write!(f, "]")
            }
        }
    }
}
