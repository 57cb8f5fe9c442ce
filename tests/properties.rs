//! Property tests over randomly generated methods.
//!
//! The generator produces small structured-but-arbitrary methods: assignments,
//! arithmetic, calls, compare-branches and jumps between a handful of labels.
//! Every generated method is valid input, though it may contain unreachable
//! code, loops without exits and variables read before they are written.

mod common;

use std::collections::BTreeSet;

use common::interpret;
use proptest::prelude::*;
use tacopt::prelude::*;

const VARS: u32 = 4;
const CALLEE: u32 = 9;
const FUEL: usize = 400;

#[derive(Debug, Clone)]
enum Src {
    Var(u32),
    Const(i32),
}

impl Src {
    fn lower(&self) -> Vara {
        match self {
            Src::Var(id) => Vara::logical(*id, DataType::I4),
            Src::Const(value) => Vara::i4(*value),
        }
    }
}

#[derive(Debug, Clone)]
enum Item {
    Assign(u32, Src),
    Binary(OpKind, u32, Src, Src),
    Call(u32, Src),
    Branch(OpKind, Src, Src, u32),
    Jump(u32),
    Label(u32),
    Ret(Src),
}

fn src() -> impl Strategy<Value = Src> {
    prop_oneof![
        3 => (0..VARS).prop_map(Src::Var),
        2 => (-4..5i32).prop_map(Src::Const),
    ]
}

fn item(labels: u32) -> impl Strategy<Value = Item> {
    let arith = prop_oneof![
        Just(OpKind::Add),
        Just(OpKind::Sub),
        Just(OpKind::Mul),
        Just(OpKind::And),
        Just(OpKind::Xor),
    ];
    let cmp = prop_oneof![
        Just(OpKind::Beq),
        Just(OpKind::Bne),
        Just(OpKind::Bge),
        Just(OpKind::Bl),
    ];
    prop_oneof![
        4 => (0..VARS, src()).prop_map(|(r, a)| Item::Assign(r, a)),
        4 => (arith, 0..VARS, src(), src()).prop_map(|(k, r, a, b)| Item::Binary(k, r, a, b)),
        1 => (0..VARS, src()).prop_map(|(r, a)| Item::Call(r, a)),
        2 => (cmp, src(), src(), 0..labels).prop_map(|(k, a, b, t)| Item::Branch(k, a, b, t)),
        1 => (0..labels).prop_map(Item::Jump),
        3 => (0..labels).prop_map(Item::Label),
        1 => src().prop_map(Item::Ret),
    ]
}

/// Lowers items to instructions. Each label is placed once; labels the items
/// did not place are appended before a final `ret v0`.
fn lower(labels: u32, items: &[Item]) -> Vec<Tac> {
    let i4 = |id: u32| Vara::logical(id, DataType::I4);
    let mut placed = BTreeSet::new();
    let mut code = Vec::with_capacity(items.len() + labels as usize + 1);

    for item in items {
        match item {
            Item::Assign(r, a) => code.push(Tac::assign(i4(*r), a.lower())),
            Item::Binary(kind, r, a, b) => code.push(Tac::binary(
                Op::new(*kind, DataType::I4),
                i4(*r),
                a.lower(),
                b.lower(),
            )),
            Item::Call(r, a) => code.push(Tac::call(
                i4(*r),
                Vara::logical(CALLEE, DataType::I),
                vec![a.lower()],
            )),
            Item::Branch(kind, a, b, target) => code.push(Tac::branch(
                Op::new(*kind, DataType::I4),
                a.lower(),
                b.lower(),
                *target,
            )),
            Item::Jump(target) => code.push(Tac::br(*target)),
            Item::Label(id) => {
                if placed.insert(*id) {
                    code.push(Tac::label(*id));
                }
            }
            Item::Ret(a) => code.push(Tac::ret(a.lower())),
        }
    }
    for id in 0..labels {
        if placed.insert(id) {
            code.push(Tac::label(id));
        }
    }
    code.push(Tac::ret(i4(0)));
    code
}

fn method() -> impl Strategy<Value = Vec<Tac>> {
    (1..4u32).prop_flat_map(|labels| {
        prop::collection::vec(item(labels), 1..24).prop_map(move |items| lower(labels, &items))
    })
}

fn ssa_of(code: &[Tac]) -> Result<SsaForm> {
    let graph = TacGraph::build(code)?;
    let dom = DomTree::build(&graph);
    construct(&graph, &dom, &Liveness::analyze(&graph))
}

fn context_of(code: &[Tac]) -> Result<MethodContext> {
    let ssa = ssa_of(code)?;
    let liveness = Liveness::analyze(&ssa.graph);
    Ok(MethodContext::new(ssa.graph, liveness))
}

fn count_calls(graph: &TacGraph) -> usize {
    graph
        .node_ids()
        .filter(|&node| graph.tac(node).is_some_and(Tac::is_call))
        .count()
}

/// Every variable version read in `graph` is defined somewhere in it.
fn reads_are_defined(graph: &TacGraph) -> bool {
    let defined: BTreeSet<Var> = graph.node_ids().flat_map(|node| graph.defs(node)).collect();
    graph
        .node_ids()
        .flat_map(|node| graph.uses(node))
        .filter(|var| var.version > 0)
        .all(|var| defined.contains(&var))
}

/// Prepends an assignment to every variable, so no read sees an undefined value.
fn defined_at_entry(code: Vec<Tac>) -> Vec<Tac> {
    (0..VARS)
        .map(|id| Tac::assign(Vara::logical(id, DataType::I4), Vara::i4(0)))
        .chain(code)
        .collect()
}

/// Returns `true` if `var` is read on a path that starts with the edge
/// `from -> to`, before anything defines it. A phi reads an operand only on the
/// edge the operand belongs to.
fn read_after(graph: &TacGraph, var: Var, from: NodeId, to: NodeId) -> bool {
    let mut seen = BTreeSet::new();
    let mut edges = vec![(from, to)];

    while let Some((from, node)) = edges.pop() {
        if !seen.insert((from, node)) {
            continue;
        }
        let Some(tac) = graph.tac(node) else {
            continue;
        };
        let read = match tac.as_label() {
            Some(label) => label
                .phis
                .iter()
                .any(|phi| phi.args.get(&from).and_then(Vara::var) == Some(var)),
            None => tac.uses().contains(&var),
        };
        if read {
            return true;
        }
        if !graph.defs(node).contains(&var) {
            edges.extend(graph.successors(node).iter().map(|&succ| (node, succ)));
        }
    }
    false
}

/// Returns `true` if SSA destruction would put a phi copy that changes a value
/// in front of a compare-branch that reads the value, or whose other outcome
/// still needs it.
fn copies_leak_past_branch(graph: &TacGraph) -> bool {
    graph.node_ids().any(|label| {
        let Some(phis) = graph.tac(label).and_then(Tac::as_label).map(|l| &l.phis) else {
            return false;
        };

        graph.predecessors(label).iter().any(|&branch| {
            if !graph.tac(branch).is_some_and(|tac| tac.is_branch() && tac.falls_through()) {
                return false;
            }
            let written: Vec<Var> = phis
                .iter()
                .filter(|phi| phi.args.get(&branch) != Some(&phi.result))
                .filter_map(Phi::defined_var)
                .collect();
            let uses = graph.uses(branch);

            written.iter().any(|&var| {
                uses.contains(&var)
                    || graph
                        .successors(branch)
                        .iter()
                        .filter(|&&other| other != label)
                        .any(|&other| read_after(graph, var, branch, other))
            })
        })
    })
}

/// Projects a live set onto variable ids, dropping SSA versions.
fn ids(live: &BTreeSet<Var>) -> BTreeSet<u32> {
    live.iter().map(|var| var.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_edges_stay_symmetric(code in method()) {
        let graph = TacGraph::build(&code)?;
        graph.check_edge_symmetry()?;

        let ssa = ssa_of(&code)?;
        ssa.graph.check_edge_symmetry()?;

        let (plain, _) = convert_from_ssa(&ssa.graph)?;
        plain.check_edge_symmetry()?;
    }

    #[test]
    fn prop_phis_cover_all_predecessors(code in method()) {
        let ssa = ssa_of(&code)?;
        ssa.graph.check_phi_operands()?;

        for label in ssa.phi_sites.keys() {
            prop_assert!(ssa.graph.is_label(*label));
        }
    }

    #[test]
    fn prop_every_version_is_assigned_once(code in method()) {
        let ssa = ssa_of(&code)?;
        let mut seen = BTreeSet::new();

        for node in ssa.graph.node_ids() {
            for var in ssa.graph.defs(node) {
                prop_assert!(var.version > 0, "{} defines unversioned {}", node, var);
                prop_assert!(seen.insert(var), "{} is defined twice", var);
            }
        }
        prop_assert!(reads_are_defined(&ssa.graph));
    }

    #[test]
    fn prop_liveness_is_idempotent(code in method()) {
        let ssa = ssa_of(&code)?;
        let first = Liveness::analyze(&ssa.graph);
        let second = Liveness::analyze(&ssa.graph);
        prop_assert_eq!(&first, &second);

        let mut order = ssa.graph.linear_stream();
        order.sort();
        prop_assert_eq!(first.nodes().collect::<Vec<_>>(), order);
    }

    #[test]
    fn prop_round_trip_keeps_live_variables(code in method()) {
        let code = defined_at_entry(code);
        let graph = TacGraph::build(&code)?;
        let before = Liveness::analyze(&graph);

        let ssa = ssa_of(&code)?;
        let (plain, destructed) = convert_from_ssa(&ssa.graph)?;
        let after = Liveness::analyze(&plain);

        for node in before.nodes() {
            let outer = ssa.map.get(&node).and_then(|n| destructed.get(n));
            prop_assert!(outer.is_some(), "{} was lost", node);
            let Some(&outer) = outer else { continue };

            prop_assert!(ids(before.live_in(node)?).is_subset(&ids(after.live_in(outer)?)));
            prop_assert!(ids(before.live_out(node)?).is_subset(&ids(after.live_out(outer)?)));

            // Without phis nothing extra is live
            if ssa.phi_sites.is_empty() {
                prop_assert_eq!(ids(before.live_in(node)?), ids(after.live_in(outer)?));
                prop_assert_eq!(ids(before.live_out(node)?), ids(after.live_out(outer)?));
            }
        }
    }

    #[test]
    fn prop_round_trip_without_joins_keeps_liveness(
        items in prop::collection::vec(item(1), 1..24)
    ) {
        // Straight-line code: drop every jump, branch and label
        let items: Vec<Item> = items
            .into_iter()
            .filter(|item| !matches!(item, Item::Branch(..) | Item::Jump(_) | Item::Label(_)))
            .collect();
        let code = defined_at_entry(lower(0, &items));
        let graph = TacGraph::build(&code)?;
        let before = Liveness::analyze(&graph);

        let ssa = ssa_of(&code)?;
        prop_assert!(ssa.phi_sites.is_empty());
        let (plain, destructed) = convert_from_ssa(&ssa.graph)?;
        let after = Liveness::analyze(&plain);

        for node in before.nodes() {
            let outer = ssa.map.get(&node).and_then(|n| destructed.get(n));
            prop_assert!(outer.is_some(), "{} was lost", node);
            let Some(&outer) = outer else { continue };

            prop_assert_eq!(ids(before.live_in(node)?), ids(after.live_in(outer)?));
            prop_assert_eq!(ids(before.live_out(node)?), ids(after.live_out(outer)?));
        }
    }

    #[test]
    fn prop_dce_keeps_side_effects_and_reads(code in method()) {
        let mut ctx = context_of(&code)?;
        let calls = count_calls(&ctx.graph);

        DeadCodeEliminationPass::new().run_on_method(&mut ctx)?;

        prop_assert_eq!(count_calls(&ctx.graph), calls);
        prop_assert!(reads_are_defined(&ctx.graph));
        ctx.graph.check_edge_symmetry()?;
        ctx.graph.check_phi_operands()?;

        // Only call results may go unread
        for var in ctx.liveness.defined_vars() {
            let defs = ctx.liveness.defs(var);
            if defs.is_empty() || !ctx.liveness.uses(var).is_empty() {
                continue;
            }
            let by_call = defs
                .iter()
                .all(|&node| ctx.graph.tac(node).is_some_and(Tac::is_call));
            prop_assert!(by_call, "{} is defined but never read", var);
        }

        // Nothing left to remove
        prop_assert!(!DeadCodeEliminationPass::new().run_on_method(&mut ctx)?);
    }

    #[test]
    fn prop_constant_propagation_reaches_fixpoint(code in method()) {
        let mut ctx = context_of(&code)?;
        let pass = ConstantPropagationPass::new();

        pass.run_on_method(&mut ctx)?;
        ctx.graph.check_edge_symmetry()?;
        ctx.graph.check_phi_operands()?;
        prop_assert!(reads_are_defined(&ctx.graph));

        let after_first = ctx.graph.clone();
        prop_assert!(!pass.run_on_method(&mut ctx)?);
        prop_assert_eq!(&ctx.graph, &after_first);
    }

    #[test]
    fn prop_optimized_code_is_well_formed(code in method()) {
        let optimizer = Optimizer::new(OptimizerConfig::new().with_verify(true));
        let method = optimizer.optimize(&code)?;

        prop_assert!(method
            .instructions()
            .iter()
            .filter_map(Tac::as_label)
            .all(|label| label.phis.is_empty()));

        let mut order = method.code.clone();
        order.sort();
        prop_assert_eq!(method.liveness.nodes().collect::<Vec<_>>(), order);

        // The output is valid input again
        if !method.instructions().is_empty() {
            optimizer.optimize(method.instructions())?;
        }
    }

    #[test]
    fn prop_passes_keep_phi_copies_on_their_edge(code in method()) {
        let mut ctx = context_of(&code)?;
        prop_assert!(!copies_leak_past_branch(&ctx.graph));

        PassScheduler::from_config(&OptimizerConfig::new()).run(&mut ctx)?;
        prop_assert!(!copies_leak_past_branch(&ctx.graph));
    }

    #[test]
    fn prop_optimized_code_computes_the_same(code in method()) {
        let code = defined_at_entry(code);
        let Some(expected) = interpret(&code, FUEL) else {
            return Ok(());
        };

        let optimizer = Optimizer::new(OptimizerConfig::new().with_verify(true));
        let method = optimizer.optimize(&code)?;
        prop_assert_eq!(interpret(method.instructions(), FUEL * 16), Some(expected));
    }
}
