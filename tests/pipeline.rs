//! Optimizer pipeline integration tests.
//!
//! These tests drive whole methods through the public API:
//! 1. Build a flat instruction list
//! 2. Run it through `Optimizer::optimize`
//! 3. Check the emitted instructions, the liveness and the recorded events

mod common;

use common::interpret;
use tacopt::prelude::*;

const FUEL: usize = 1_000;

fn i4(id: u32) -> Vara {
    Vara::logical(id, DataType::I4)
}

/// Variable `id` at SSA version `version`.
fn ver(id: u32, version: u32) -> Vara {
    i4(id).with_version(version)
}

fn op(kind: OpKind) -> Op {
    Op::new(kind, DataType::I4)
}

/// Returns `true` if some instruction writes variable `id`.
fn defines(code: &[Tac], id: u32) -> bool {
    code.iter()
        .filter_map(Tac::result)
        .any(|r| r.var().is_some_and(|var| var.id == id))
}

/// Every branch target names a label that is part of the list.
fn assert_targets_resolve(code: &[Tac]) {
    let labels: Vec<u32> = code
        .iter()
        .filter_map(Tac::as_label)
        .filter_map(|label| label.block_id)
        .collect();
    for tac in code {
        if let Tac::Branch { target, .. } = tac {
            assert!(labels.contains(target), "dangling target {target} in {code:?}");
        }
    }
}

#[test]
fn test_constant_arguments_reach_call() -> Result<()> {
    // a = 5; b = 10; c = a + b; print(c)
    let print = Vara::logical(9, DataType::I);
    let code = vec![
        Tac::assign(i4(0), Vara::i4(5)),
        Tac::assign(i4(1), Vara::i4(10)),
        Tac::binary(op(OpKind::Add), i4(2), i4(0), i4(1)),
        Tac::call(Vara::Void, print, vec![i4(2)]),
        Tac::ret_void(),
    ];

    let method = Optimizer::default().optimize(&code)?;
    let out = method.instructions();

    assert_eq!(out.len(), 2);
    match &out[0] {
        Tac::Call { args, .. } => assert_eq!(args, &[Vara::i4(15)]),
        other => panic!("expected the call, got {other}"),
    }
    assert_eq!(out[1], Tac::ret_void());
    assert_eq!(method.events.count(EventKind::ConstantFolded), 3);
    Ok(())
}

#[test]
fn test_equal_phi_operands_fold() -> Result<()> {
    // if (v0 < 0) x = 3 else x = 3; return x
    let code = vec![
        Tac::branch(op(OpKind::Bge), i4(0), Vara::i4(0), 1),
        Tac::assign(i4(1), Vara::i4(3)),
        Tac::br(2),
        Tac::label(1),
        Tac::assign(i4(1), Vara::i4(3)),
        Tac::label(2),
        Tac::ret(i4(1)),
    ];

    let method = Optimizer::default().optimize(&code)?;
    let out = method.instructions();

    assert!(out.contains(&Tac::ret(Vara::i4(3))));
    assert!(!defines(out, 1));
    assert!(method.events.count(EventKind::PhiFolded) >= 1);
    assert_targets_resolve(out);
    Ok(())
}

#[test]
fn test_constant_branch_folds() -> Result<()> {
    // if (5 >= 3) return 2 else return 1
    let code = vec![
        Tac::branch(op(OpKind::Bge), Vara::i4(5), Vara::i4(3), 1),
        Tac::assign(i4(0), Vara::i4(1)),
        Tac::ret(i4(0)),
        Tac::label(1),
        Tac::assign(i4(0), Vara::i4(2)),
        Tac::ret(i4(0)),
    ];

    let method = Optimizer::default().optimize(&code)?;
    let out = method.instructions();

    assert!(out.contains(&Tac::ret(Vara::i4(2))));
    assert!(!out.contains(&Tac::ret(Vara::i4(1))));
    assert!(!out.iter().any(Tac::is_branch));
    assert_eq!(method.events.count(EventKind::BranchFolded), 1);
    Ok(())
}

#[test]
fn test_constant_branch_not_taken() -> Result<()> {
    // if (1 >= 3) return 2 else return 1
    let code = vec![
        Tac::branch(op(OpKind::Bge), Vara::i4(1), Vara::i4(3), 1),
        Tac::assign(i4(0), Vara::i4(1)),
        Tac::ret(i4(0)),
        Tac::label(1),
        Tac::assign(i4(0), Vara::i4(2)),
        Tac::ret(i4(0)),
    ];

    let out = Optimizer::default().optimize(&code)?.into_instructions();

    assert_eq!(out, vec![Tac::ret(Vara::i4(1))]);
    Ok(())
}

#[test]
fn test_dead_assignment_is_removed() -> Result<()> {
    // x = 7; y = f(); return y
    let code = vec![
        Tac::assign(i4(0), Vara::i4(7)),
        Tac::call(i4(1), Vara::logical(9, DataType::I), vec![]),
        Tac::ret(i4(1)),
    ];

    let method = Optimizer::default().optimize(&code)?;

    assert!(!defines(method.instructions(), 0));
    assert!(method.instructions().iter().any(Tac::is_call));
    assert_eq!(method.events.count(EventKind::InstructionRemoved), 1);
    Ok(())
}

#[test]
fn test_unknown_loop_is_preserved() -> Result<()> {
    // i = 0; while (i < n) i = i + 1; return i
    let code = vec![
        Tac::assign(i4(0), Vara::i4(0)),
        Tac::label(1),
        Tac::branch(op(OpKind::Bge), i4(0), i4(1), 2),
        Tac::binary(op(OpKind::Add), i4(0), i4(0), Vara::i4(1)),
        Tac::br(1),
        Tac::label(2),
        Tac::ret(i4(0)),
    ];

    let method = Optimizer::default().optimize(&code)?;
    let out = method.instructions();

    // The exit label only linked the branch to the return, so the return
    // gets a fresh label
    assert_eq!(
        out,
        &[
            Tac::assign(ver(0, 2), Vara::i4(0)),
            Tac::label(1),
            Tac::branch(op(OpKind::Bge), ver(0, 2), i4(1), 3),
            Tac::binary(op(OpKind::Add), ver(0, 3), ver(0, 2), Vara::i4(1)),
            Tac::assign(ver(0, 2), ver(0, 3)),
            Tac::br(1),
            Tac::label(3),
            Tac::ret(ver(0, 2)),
        ]
    );
    assert_targets_resolve(out);
    Ok(())
}

#[test]
fn test_loop_keeps_folded_entry_value() -> Result<()> {
    // i = 0; do i = i + 1 while (i < 3); return i
    let code = vec![
        Tac::assign(i4(0), Vara::i4(0)),
        Tac::label(1),
        Tac::binary(op(OpKind::Add), i4(0), i4(0), Vara::i4(1)),
        Tac::branch(op(OpKind::Bl), i4(0), Vara::i4(3), 1),
        Tac::ret(i4(0)),
    ];

    let method = Optimizer::new(OptimizerConfig::new().with_verify(true)).optimize(&code)?;
    let out = method.instructions();

    // The folded `i = 0` still feeds the loop header through the entry node
    assert_eq!(
        out,
        &[
            Tac::assign(ver(0, 2), Vara::i4(0)),
            Tac::label(1),
            Tac::binary(op(OpKind::Add), ver(0, 3), ver(0, 2), Vara::i4(1)),
            Tac::assign(ver(0, 2), ver(0, 3)),
            Tac::branch(op(OpKind::Bl), ver(0, 3), Vara::i4(3), 1),
            Tac::ret(ver(0, 3)),
        ]
    );
    let run = interpret(out, FUEL).map(|run| run.value);
    assert_eq!(run, Some(Some(ConstValue::Int32(3))));
    assert_eq!(interpret(&code, FUEL).map(|run| run.value), run);
    Ok(())
}

#[test]
fn test_folded_entry_branch_keeps_join_value() -> Result<()> {
    // x = 0; y = 0; x = x + 1; if (y == y) goto join; x = x; join: return x
    let code = vec![
        Tac::assign(i4(0), Vara::i4(0)),
        Tac::assign(i4(1), Vara::i4(0)),
        Tac::binary(op(OpKind::Add), i4(0), i4(0), Vara::i4(1)),
        Tac::branch(op(OpKind::Beq), i4(1), i4(1), 0),
        Tac::assign(i4(0), i4(0)),
        Tac::label(0),
        Tac::ret(i4(0)),
    ];

    let method = Optimizer::new(OptimizerConfig::new().with_verify(true)).optimize(&code)?;

    assert_eq!(method.instructions(), &[Tac::ret(Vara::i4(1))]);
    assert_eq!(method.events.count(EventKind::BranchFolded), 1);
    Ok(())
}

#[test]
fn test_loop_at_entry_keeps_branch_operands() -> Result<()> {
    // L0: if (x == x) goto L1; x = 4; if (0 < x) goto L0; L1: return x
    let code = vec![
        Tac::label(0),
        Tac::branch(op(OpKind::Beq), i4(0), i4(0), 1),
        Tac::assign(i4(0), Vara::i4(4)),
        Tac::branch(op(OpKind::Bl), Vara::i4(0), i4(0), 0),
        Tac::label(1),
        Tac::ret(i4(0)),
    ];

    let method = Optimizer::new(OptimizerConfig::new().with_verify(true)).optimize(&code)?;
    let out = method.instructions();

    // The back edge value 4 reaches L0 on its own edge, not in front of the
    // first branch
    assert_eq!(
        out,
        &[
            Tac::assign(ver(0, 1), Vara::null(DataType::I4)),
            Tac::label(0),
            Tac::assign(ver(0, 3), ver(0, 1)),
            Tac::branch(op(OpKind::Beq), ver(0, 1), ver(0, 1), 1),
            Tac::assign(ver(0, 1), Vara::i4(4)),
            Tac::br(0),
            Tac::label(1),
            Tac::ret(ver(0, 3)),
        ]
    );
    let expected = interpret(&code, FUEL);
    assert_eq!(expected.as_ref().map(|run| run.value), Some(Some(ConstValue::Int32(0))));
    assert_eq!(interpret(out, FUEL), expected);
    Ok(())
}

#[test]
fn test_ssa_round_trip_without_passes() -> Result<()> {
    let code = vec![
        Tac::branch(op(OpKind::Bge), i4(0), Vara::i4(0), 1),
        Tac::assign(i4(1), Vara::i4(1)),
        Tac::br(2),
        Tac::label(1),
        Tac::assign(i4(1), Vara::i4(2)),
        Tac::label(2),
        Tac::ret(i4(1)),
    ];
    let config = OptimizerConfig::new()
        .with_dead_code_elimination(false)
        .with_constant_propagation(false)
        .with_verify(true);

    let method = Optimizer::new(config).optimize(&code)?;

    assert!(method.events.is_empty());
    assert_targets_resolve(method.instructions());
    let covered: Vec<NodeId> = method.liveness.nodes().collect();
    let mut order = method.code.clone();
    order.sort();
    assert_eq!(covered, order);
    Ok(())
}

#[test]
fn test_empty_method_is_rejected() {
    assert!(matches!(Optimizer::default().optimize(&[]), Err(Error::Empty)));
}

#[test]
fn test_branch_to_missing_label_is_rejected() {
    let code = vec![
        Tac::branch(op(OpKind::Beq), i4(0), Vara::i4(0), 4),
        Tac::ret_void(),
    ];
    assert!(matches!(
        Optimizer::default().optimize(&code),
        Err(Error::UnknownBlockTarget(4))
    ));
}

#[test]
fn test_batch_results_are_independent() {
    let good = vec![
        Tac::assign(i4(0), Vara::i4(2)),
        Tac::binary(op(OpKind::Mul), i4(1), i4(0), Vara::i4(21)),
        Tac::ret(i4(1)),
    ];
    let bad = vec![Tac::br(3)];
    let methods = vec![good.clone(), bad, good];

    let results = Optimizer::default().optimize_all(&methods);

    assert_eq!(results.len(), 3);
    for index in [0, 2] {
        assert!(matches!(
            &results[index],
            Ok(method) if method.instructions() == [Tac::ret(Vara::i4(42))]
        ));
    }
    assert!(matches!(results[1], Err(Error::UnknownBlockTarget(3))));
}
