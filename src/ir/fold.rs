//! Compile-time evaluation of instructions with constant operands.
//!
//! Folding only fires when every operand is a non-null constant of the width the
//! opcode names (`add_i4` folds two `Int32`s, never an `Int32` and an `Int64`).
//! Anything else declines with `None` and the instruction stays as written.
//!
//! Integer arithmetic wraps, shift amounts are masked to the operand width, and
//! division declines on a zero divisor or on `MIN / -1`. `I` is evaluated with
//! 64 bits. Unsigned compare-branches (`ba`, `bae`, `bb`, `bbe`) reinterpret the
//! operands as unsigned and are never folded on floats; signed compare-branches
//! on floats fold only when neither operand is NaN.

use crate::ir::{ConstValue, DataType, Op, OpCategory, OpKind, Vara};

#[derive(Clone, Copy)]
enum Num {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Num {
    /// Reads `v` as a constant of width `ty`.
    fn of(v: &Vara, ty: DataType) -> Option<Num> {
        match (v.as_const()?, ty) {
            (ConstValue::Int32(x), DataType::I4) => Some(Num::I32(*x)),
            (ConstValue::Int64(x), DataType::I8) | (ConstValue::NativeInt(x), DataType::I) => {
                Some(Num::I64(*x))
            }
            (ConstValue::Float32(x), DataType::R4) => Some(Num::F32(*x)),
            (ConstValue::Float64(x), DataType::R8) => Some(Num::F64(*x)),
            _ => None,
        }
    }

    /// Reads any integer constant as a shift amount.
    fn shift_amount(v: &Vara) -> Option<u32> {
        match v.as_const()? {
            ConstValue::Int32(x) => Some(*x as u32),
            ConstValue::Int64(x) | ConstValue::NativeInt(x) => Some(*x as u32),
            _ => None,
        }
    }

    fn into_const(self, ty: DataType) -> ConstValue {
        match self {
            Num::I32(x) => ConstValue::Int32(x),
            Num::I64(x) if ty == DataType::I => ConstValue::NativeInt(x),
            Num::I64(x) => ConstValue::Int64(x),
            Num::F32(x) => ConstValue::Float32(x),
            Num::F64(x) => ConstValue::Float64(x),
        }
    }
}

/// Evaluates a simple instruction `op o1, o2` with constant operands.
///
/// Handles assignment, binary and unary arithmetic, value comparisons and
/// conversions.
///
/// # Returns
///
/// The folded value, or `None` if the operands are not constants of the right
/// width or the operation has no defined constant result.
#[must_use]
pub fn evaluate(op: Op, o1: &Vara, o2: &Vara) -> Option<ConstValue> {
    match op.category() {
        OpCategory::Assign => o1.as_const().filter(|c| !c.is_null()).copied(),
        OpCategory::BinaryNumeric => binary(op, o1, o2),
        OpCategory::UnaryNumeric => unary(op, o1),
        OpCategory::Compare => compare(op, o1, o2),
        OpCategory::Conversion => convert(op.ty, o1),
        _ => None,
    }
}

fn binary(op: Op, o1: &Vara, o2: &Vara) -> Option<ConstValue> {
    let a = Num::of(o1, op.ty)?;

    if matches!(op.kind, OpKind::Shl | OpKind::Shr | OpKind::ShrUn) {
        let s = Num::shift_amount(o2)?;
        let result = match a {
            Num::I32(x) => Num::I32(match op.kind {
                OpKind::Shl => x.wrapping_shl(s),
                OpKind::Shr => x.wrapping_shr(s),
                _ => (x as u32).wrapping_shr(s) as i32,
            }),
            Num::I64(x) => Num::I64(match op.kind {
                OpKind::Shl => x.wrapping_shl(s),
                OpKind::Shr => x.wrapping_shr(s),
                _ => (x as u64).wrapping_shr(s) as i64,
            }),
            Num::F32(_) | Num::F64(_) => return None,
        };
        return Some(result.into_const(op.ty));
    }

    let b = Num::of(o2, op.ty)?;
    let result = match (a, b) {
        (Num::I32(x), Num::I32(y)) => Num::I32(match op.kind {
            OpKind::Add => x.wrapping_add(y),
            OpKind::Sub => x.wrapping_sub(y),
            OpKind::Mul => x.wrapping_mul(y),
            OpKind::Div => x.checked_div(y)?,
            OpKind::Rem => x.checked_rem(y)?,
            OpKind::And => x & y,
            OpKind::Or => x | y,
            OpKind::Xor => x ^ y,
            _ => return None,
        }),
        (Num::I64(x), Num::I64(y)) => Num::I64(match op.kind {
            OpKind::Add => x.wrapping_add(y),
            OpKind::Sub => x.wrapping_sub(y),
            OpKind::Mul => x.wrapping_mul(y),
            OpKind::Div => x.checked_div(y)?,
            OpKind::Rem => x.checked_rem(y)?,
            OpKind::And => x & y,
            OpKind::Or => x | y,
            OpKind::Xor => x ^ y,
            _ => return None,
        }),
        (Num::F32(x), Num::F32(y)) => Num::F32(match op.kind {
            OpKind::Add => x + y,
            OpKind::Sub => x - y,
            OpKind::Mul => x * y,
            OpKind::Div => x / y,
            OpKind::Rem => x % y,
            _ => return None,
        }),
        (Num::F64(x), Num::F64(y)) => Num::F64(match op.kind {
            OpKind::Add => x + y,
            OpKind::Sub => x - y,
            OpKind::Mul => x * y,
            OpKind::Div => x / y,
            OpKind::Rem => x % y,
            _ => return None,
        }),
        _ => return None,
    };
    Some(result.into_const(op.ty))
}

fn unary(op: Op, o1: &Vara) -> Option<ConstValue> {
    let result = match (Num::of(o1, op.ty)?, op.kind) {
        (Num::I32(x), OpKind::Neg) => Num::I32(x.wrapping_neg()),
        (Num::I32(x), OpKind::Not) => Num::I32(!x),
        (Num::I64(x), OpKind::Neg) => Num::I64(x.wrapping_neg()),
        (Num::I64(x), OpKind::Not) => Num::I64(!x),
        (Num::F32(x), OpKind::Neg) => Num::F32(-x),
        (Num::F64(x), OpKind::Neg) => Num::F64(-x),
        _ => return None,
    };
    Some(result.into_const(op.ty))
}

fn compare(op: Op, o1: &Vara, o2: &Vara) -> Option<ConstValue> {
    let ordering = match (Num::of(o1, op.ty)?, Num::of(o2, op.ty)?) {
        (Num::I32(x), Num::I32(y)) => x.partial_cmp(&y),
        (Num::I64(x), Num::I64(y)) => x.partial_cmp(&y),
        (Num::F32(x), Num::F32(y)) => x.partial_cmp(&y),
        (Num::F64(x), Num::F64(y)) => x.partial_cmp(&y),
        _ => return None,
    };
    let holds = match (op.kind, ordering) {
        (OpKind::Ceq, Some(o)) => o.is_eq(),
        (OpKind::Cgt, Some(o)) => o.is_gt(),
        (OpKind::Clt, Some(o)) => o.is_lt(),
        // Any comparison involving NaN is false
        (_, None) => false,
        _ => return None,
    };
    Some(ConstValue::Int32(i32::from(holds)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn convert(to: DataType, o1: &Vara) -> Option<ConstValue> {
    let value = *o1.as_const()?;
    let int = match value {
        ConstValue::Int32(x) => Some(i64::from(x)),
        ConstValue::Int64(x) | ConstValue::NativeInt(x) => Some(x),
        _ => None,
    };
    let float = match value {
        ConstValue::Float32(x) => Some(f64::from(x)),
        ConstValue::Float64(x) => Some(x),
        _ => None,
    };

    match to {
        DataType::I4 => match (int, float) {
            (Some(x), _) => Some(ConstValue::Int32(x as i32)),
            (None, Some(f)) => float_to_int(f, f64::from(i32::MIN), f64::from(i32::MAX))
                .map(|x| ConstValue::Int32(x as i32)),
            _ => None,
        },
        DataType::I8 | DataType::I => {
            let x = match (int, float) {
                (Some(x), _) => x,
                (None, Some(f)) => float_to_int(f, -9.223_372_036_854_776e18, 9.223_372_036_854_775e18)?,
                _ => return None,
            };
            Some(if to == DataType::I {
                ConstValue::NativeInt(x)
            } else {
                ConstValue::Int64(x)
            })
        }
        DataType::R4 => match (int, float) {
            (Some(x), _) => Some(ConstValue::Float32(x as f32)),
            (None, Some(f)) => Some(ConstValue::Float32(f as f32)),
            _ => None,
        },
        DataType::R8 => match (int, float) {
            (Some(x), _) => Some(ConstValue::Float64(x as f64)),
            (None, Some(f)) => Some(ConstValue::Float64(f)),
            _ => None,
        },
        _ => None,
    }
}

/// Truncates `f` toward zero if the result lies within `[min, max]`.
#[allow(clippy::cast_possible_truncation)]
fn float_to_int(f: f64, min: f64, max: f64) -> Option<i64> {
    let t = f.trunc();
    (t.is_finite() && t >= min && t <= max).then_some(t as i64)
}

/// Evaluates the condition of a compare-branch `op o1, o2`.
///
/// # Returns
///
/// `Some(true)` if the branch is taken, `Some(false)` if it falls through, or
/// `None` if the outcome cannot be decided at compile time.
#[must_use]
pub fn evaluate_branch(op: Op, o1: &Vara, o2: &Vara) -> Option<bool> {
    if !op.kind.is_compare_branch() {
        return None;
    }

    let unsigned = matches!(op.kind, OpKind::Ba | OpKind::Bae | OpKind::Bb | OpKind::Bbe);
    let ordering = match (Num::of(o1, op.ty)?, Num::of(o2, op.ty)?) {
        (Num::I32(x), Num::I32(y)) if unsigned => (x as u32).cmp(&(y as u32)),
        (Num::I64(x), Num::I64(y)) if unsigned => (x as u64).cmp(&(y as u64)),
        (Num::I32(x), Num::I32(y)) => x.cmp(&y),
        (Num::I64(x), Num::I64(y)) => x.cmp(&y),
        (Num::F32(x), Num::F32(y)) if !unsigned => x.partial_cmp(&y)?,
        (Num::F64(x), Num::F64(y)) if !unsigned => x.partial_cmp(&y)?,
        _ => return None,
    };

    Some(match op.kind {
        OpKind::Beq => ordering.is_eq(),
        OpKind::Bne => ordering.is_ne(),
        OpKind::Bg | OpKind::Ba => ordering.is_gt(),
        OpKind::Bge | OpKind::Bae => ordering.is_ge(),
        OpKind::Bl | OpKind::Bb => ordering.is_lt(),
        OpKind::Ble | OpKind::Bbe => ordering.is_le(),
        _ => return None,
    })
}
