//! Builder, dominance, and loop-analysis tests.

use novac_hir::{generate_hir, HirFunction, HirModule};
use novac_lex::Lexer;
use novac_par::Parser;
use novac_util::Symbol;

use crate::analysis::{cfg::ControlFlowGraph, loops};
use crate::builder::MirBuilder;
use crate::mir::*;

fn lower_hir(source: &str) -> HirModule {
    let lexer = Lexer::from_source(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    assert!(!parser.has_errors(), "parse errors: {:?}", parser.errors());
    let (module, _) = generate_hir(&program, "test");
    module
}

fn hir_fn<'m>(module: &'m HirModule, name: &str) -> &'m HirFunction {
    module.function(Symbol::intern(name)).expect("function")
}

fn hir_block(func: &HirFunction, prefix: &str) -> novac_hir::BlockId {
    func.blocks
        .iter_enumerated()
        .find(|(_, b)| b.label.as_str().starts_with(prefix))
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no block labeled {}*", prefix))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[test]
fn builder_numbers_places_globally() {
    let args = [
        (Symbol::intern("a"), MirType::I64),
        (Symbol::intern("b"), MirType::I64),
    ];
    let mut builder = MirBuilder::new(Symbol::intern("f"), MirType::I64, &args);

    assert_eq!(builder.func.return_place().index, 0);
    assert_eq!(builder.func.arg_place(0).index, 1);
    assert_eq!(builder.func.arg_place(1).index, 2);

    let local = builder.new_local(MirType::I64, Symbol::intern("x"));
    assert_eq!(local.index, 3);
    assert_eq!(local.kind, PlaceKind::Local);
    let temp = builder.new_temp(MirType::I1);
    assert_eq!(temp.index, 4);
    assert_eq!(temp.kind, PlaceKind::Temp);
}

#[test]
fn builder_first_terminator_wins() {
    let mut builder = MirBuilder::new(Symbol::intern("f"), MirType::I64, &[]);
    let b0 = builder.new_block();
    let b1 = builder.new_block();
    builder.set_current_block(b0);
    builder.set_terminator(Terminator::Goto { target: b1 });
    // A later install on the same block is dead control flow and dropped.
    builder.set_terminator(Terminator::Return);
    let func = builder.build();
    assert_eq!(func.blocks[b0].terminator, Terminator::Goto { target: b1 });
}

#[test]
fn statements_after_terminator_are_dropped() {
    let mut builder = MirBuilder::new(Symbol::intern("f"), MirType::I64, &[]);
    let b0 = builder.new_block();
    builder.set_current_block(b0);
    builder.set_terminator(Terminator::Return);
    builder.push_statement(Statement::Nop);
    let func = builder.build();
    assert!(func.blocks[b0].statements.is_empty());
}

// ---------------------------------------------------------------------------
// Dominance
// ---------------------------------------------------------------------------

#[test]
fn dominance_invariants() {
    let module = lower_hir(
        "function f(n) { let s = 0; for (let i = 0; i < n; i++) { if (i > 2) { s = s + i; } } return s; }",
    );
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let entry = f.entry();

    for block in f.blocks.indices() {
        if !cfg.reaches(entry, block) {
            continue; // orphaned end blocks are out of scope for the law
        }
        assert!(cfg.dominates(block, block), "b in dom(b) fails");
        assert!(cfg.dominates(entry, block), "entry in dom(b) fails");
    }
}

#[test]
fn dominance_is_deterministic() {
    let module = lower_hir(
        "function f(n) { while (n > 0) { if (n == 3) { n = n - 2; } n--; } return n; }",
    );
    let f = hir_fn(&module, "f");
    let a = ControlFlowGraph::new(f);
    let b = ControlFlowGraph::new(f);
    for block in f.blocks.indices() {
        assert_eq!(a.dominators[&block], b.dominators[&block]);
    }
}

// ---------------------------------------------------------------------------
// Loop analysis
// ---------------------------------------------------------------------------

#[test]
fn while_loop_context_targets_condition() {
    let module = lower_hir("function f(c) { while (c) { c = c - 1; } return c; }");
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let analysis = loops::analyze(f, &cfg);

    assert_eq!(analysis.contexts.len(), 1);
    let ctx = &analysis.contexts[0];
    assert!(!ctx.is_switch);
    assert_eq!(ctx.header, hir_block(f, "while.cond"));
    assert_eq!(ctx.update, None, "while loops have no update block");
    assert_eq!(ctx.continue_target, ctx.header);
    assert_eq!(ctx.break_target, hir_block(f, "while.end"));
}

#[test]
fn for_loop_context_targets_update() {
    let module = lower_hir("function f() { for (let i = 0; i < 10; i++) { } }");
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let analysis = loops::analyze(f, &cfg);

    assert_eq!(analysis.contexts.len(), 1);
    let ctx = &analysis.contexts[0];
    assert_eq!(ctx.header, hir_block(f, "for.cond"));
    assert_eq!(ctx.update, Some(hir_block(f, "for.update")));
    assert_eq!(ctx.continue_target, hir_block(f, "for.update"));
    assert_eq!(ctx.break_target, hir_block(f, "for.end"));
}

#[test]
fn do_while_loop_is_identified() {
    let module = lower_hir("function f(c) { do { c = c - 1; } while (c > 0); return c; }");
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let analysis = loops::analyze(f, &cfg);

    assert_eq!(analysis.contexts.len(), 1);
    let ctx = &analysis.contexts[0];
    assert_eq!(ctx.header, hir_block(f, "do-while.cond"));
    // continue in a do-while targets the condition.
    assert_eq!(ctx.continue_target, ctx.header);
    // The body is inside the context even though the condition block does
    // not dominate it.
    let body = hir_block(f, "do-while.body");
    assert_eq!(
        analysis.block_to_context.get(&body),
        Some(&0),
        "do-while body must map to its loop"
    );
}

#[test]
fn inner_loop_mapping_overwrites_outer() {
    let module = lower_hir(
        "function f() { for (let i = 0; i < 3; i++) { for (let j = 0; j < 3; j++) { } } }",
    );
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let analysis = loops::analyze(f, &cfg);
    assert_eq!(analysis.contexts.len(), 2);

    // Outermost first in context order.
    let outer = &analysis.contexts[0];
    let inner = &analysis.contexts[1];
    assert!(cfg.dominates(outer.header, inner.header));
    assert_eq!(inner.parent, Some(0));

    // The inner body maps to the inner loop; the outer update block to the
    // outer loop.
    let inner_body = analysis.block_to_context[&inner.body];
    assert_eq!(inner_body, 1);
    let outer_update = outer.update.expect("outer for has an update block");
    assert_eq!(analysis.block_to_context[&outer_update], 0);
}

#[test]
fn labeled_header_registers_in_label_table() {
    let module = lower_hir(
        "function f() { outer: for (let i = 0; i < 3; i++) { for (let j = 0; j < 3; j++) { break outer; } } }",
    );
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let analysis = loops::analyze(f, &cfg);

    let ctx = analysis
        .labeled(Symbol::intern("outer"))
        .expect("label 'outer' must resolve");
    assert_eq!(ctx.header, hir_block(f, "for.cond"));
}

#[test]
fn switch_context_inside_loop() {
    let module = lower_hir(
        "function f(c, x) { while (c) { switch (x) { case 1: break; default: x = 0; } c = c - 1; } }",
    );
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let analysis = loops::analyze(f, &cfg);

    let switch_ctx = analysis
        .contexts
        .iter()
        .position(|c| c.is_switch)
        .expect("switch context exists");
    let loop_ctx = analysis
        .contexts
        .iter()
        .position(|c| !c.is_switch)
        .expect("loop context exists");

    // The case body belongs to the switch; the switch's parent is the loop.
    let case_block = hir_block(f, "switch.case_0");
    assert_eq!(analysis.block_to_context[&case_block], switch_ctx);
    assert_eq!(analysis.contexts[switch_ctx].parent, Some(loop_ctx));
    assert_eq!(
        analysis.contexts[switch_ctx].break_target,
        hir_block(f, "switch.end")
    );

    // Continue resolution from inside the switch walks to the loop.
    let ctx = analysis.loop_context_of(case_block).unwrap();
    assert!(!ctx.is_switch);
}

#[test]
fn loop_analysis_is_idempotent() {
    let module = lower_hir(
        "function f(n) { for (let i = 0; i < n; i++) { while (n > i) { n--; } } return n; }",
    );
    let f = hir_fn(&module, "f");
    let cfg = ControlFlowGraph::new(f);
    let a = loops::analyze(f, &cfg);
    let b = loops::analyze(f, &cfg);

    assert_eq!(a.contexts.len(), b.contexts.len());
    for (x, y) in a.contexts.iter().zip(b.contexts.iter()) {
        assert_eq!(x.header, y.header);
        assert_eq!(x.break_target, y.break_target);
        assert_eq!(x.continue_target, y.continue_target);
        assert_eq!(x.update, y.update);
    }
    assert_eq!(a.block_to_context, b.block_to_context);
}
