//! A reference interpreter for flat instruction lists.
//!
//! Integration tests run a method before and after optimization and compare
//! what the two runs observably do: the value returned and the arguments of
//! every call.

use std::collections::BTreeMap;

use tacopt::prelude::*;

/// The observable result of running a method.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// The returned value, `None` for a return without a value.
    pub value: Option<ConstValue>,
    /// The arguments of every call, in call order.
    pub calls: Vec<Vec<ConstValue>>,
}

/// Runs `code` from its first instruction for at most `fuel` steps.
///
/// Variables nothing assigned read as 0, and so does null. The n-th call
/// returns n.
///
/// # Returns
///
/// `None` if the run does not return within `fuel` steps, falls off the end,
/// or meets an instruction it cannot evaluate.
pub fn interpret(code: &[Tac], fuel: usize) -> Option<Run> {
    let labels: BTreeMap<u32, usize> = code
        .iter()
        .enumerate()
        .filter_map(|(at, tac)| Some((tac.as_label()?.block_id?, at)))
        .collect();
    let mut vars: BTreeMap<Var, ConstValue> = BTreeMap::new();
    let mut calls: Vec<Vec<ConstValue>> = Vec::new();
    let mut pc = 0;

    for _ in 0..fuel {
        let tac = code.get(pc)?;
        pc += 1;

        match tac {
            Tac::Label(label) => {
                if !label.phis.is_empty() {
                    return None;
                }
            }
            Tac::Simple { op, r, o1, o2 } => match op.kind {
                OpKind::Ret => {
                    let value = load(&vars, o1)?.as_const().copied();
                    return Some(Run { value, calls });
                }
                OpKind::Nop => {}
                _ => {
                    let value = evaluate(*op, &load(&vars, o1)?, &load(&vars, o2)?)?;
                    vars.insert(r.logical_var()?, value);
                }
            },
            Tac::Branch { op, o1, o2, target } => {
                let taken = op.kind == OpKind::Br
                    || evaluate_branch(*op, &load(&vars, o1)?, &load(&vars, o2)?)?;
                if taken {
                    pc = *labels.get(target)?;
                }
            }
            Tac::Call { r, args, .. } => {
                let values = args
                    .iter()
                    .map(|arg| load(&vars, arg).and_then(|v| v.as_const().copied()))
                    .collect::<Option<Vec<_>>>()?;
                calls.push(values);
                if let Some(var) = r.logical_var() {
                    vars.insert(var, ConstValue::Int32(calls.len() as i32));
                }
            }
        }
    }

    None
}

/// Replaces a variable operand by its current value.
fn load(vars: &BTreeMap<Var, ConstValue>, operand: &Vara) -> Option<Vara> {
    if operand.is_void() {
        return Some(Vara::Void);
    }
    if let Some(value) = operand.as_const() {
        return Some(if value.is_null() { Vara::i4(0) } else { operand.clone() });
    }
    let var = operand.logical_var()?;
    let value = vars.get(&var).copied().unwrap_or(ConstValue::Int32(0));
    Some(Vara::constant(value, operand.data_type()))
}
