//! HIR lowering tests: block naming, fall-through policy, pseudo-instruction
//! emission, and closure side-tables.

use novac_lex::Lexer;
use novac_par::Parser;
use novac_util::Symbol;

use crate::hir::{ConstKind, HirFunction, HirModule, HirValue, Opcode};
use crate::lower::generate_hir;

fn lower(source: &str) -> HirModule {
    let lexer = Lexer::from_source(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    assert!(!parser.has_errors(), "parse errors: {:?}", parser.errors());
    let (module, _diags) = generate_hir(&program, "test");
    module
}

fn function<'m>(module: &'m HirModule, name: &str) -> &'m HirFunction {
    module
        .function(Symbol::intern(name))
        .unwrap_or_else(|| panic!("function '{}' not in module", name))
}

fn opcodes(func: &HirFunction) -> Vec<Opcode> {
    func.blocks
        .iter()
        .flat_map(|b| b.insts.iter())
        .filter_map(|&id| func.inst(id))
        .map(|i| i.opcode)
        .collect()
}

fn block_labels(func: &HirFunction) -> Vec<String> {
    func.blocks.iter().map(|b| b.label.to_string()).collect()
}

#[test]
fn let_with_initializer_emits_alloca_and_store() {
    let module = lower("let x = 1 + 2;");
    let main = function(&module, "main");
    let ops = opcodes(main);

    let allocas = ops.iter().filter(|&&op| op == Opcode::Alloca).count();
    assert_eq!(allocas, 1);
    assert!(ops.contains(&Opcode::Add));
    assert!(ops.contains(&Opcode::Store));

    // The add's operands are the integer constants 1 and 2.
    let add = main
        .blocks
        .iter()
        .flat_map(|b| b.insts.iter())
        .filter_map(|&id| main.inst(id))
        .find(|i| i.opcode == Opcode::Add)
        .unwrap();
    let consts: Vec<_> = add
        .operands
        .iter()
        .filter_map(|&op| main.value(op).as_const())
        .map(|c| c.kind.clone())
        .collect();
    assert_eq!(consts, vec![ConstKind::Int(1), ConstKind::Int(2)]);
}

#[test]
fn function_declaration_becomes_module_function() {
    let module = lower("function add(a, b) { return a + b; }");
    let add = function(&module, "add");
    assert_eq!(add.params.len(), 2);
    let ops = opcodes(add);
    assert!(ops.contains(&Opcode::Add));
    assert!(ops.contains(&Opcode::Return));
}

#[test]
fn if_else_block_naming_and_structure() {
    let module = lower("function f(x) { if (x > 0) { return 1; } else { return 2; } }");
    let f = function(&module, "f");
    let labels = block_labels(f);
    assert!(labels.iter().any(|l| l.starts_with("if.then")));
    assert!(labels.iter().any(|l| l.starts_with("if.else")));
    assert!(labels.iter().any(|l| l.starts_with("if.end")));

    // Both arms return, so neither branches to if.end; the orphaned end
    // block receives a synthetic return-zero.
    let end = f
        .blocks
        .iter_enumerated()
        .find(|(_, b)| b.label.as_str().starts_with("if.end"))
        .map(|(id, _)| id)
        .unwrap();
    let term = f.terminator_of(end).expect("if.end must be terminated");
    assert_eq!(term.opcode, Opcode::Return);
}

#[test]
fn if_arm_falls_through_to_end() {
    let module = lower("function f(x) { if (x > 0) { x = 1; } return x; }");
    let f = function(&module, "f");
    let then = f
        .blocks
        .iter_enumerated()
        .find(|(_, b)| b.label.as_str().starts_with("if.then"))
        .map(|(id, _)| id)
        .unwrap();
    let succs = f.successors(then);
    assert_eq!(succs.len(), 1);
    assert!(f.blocks[succs[0]].label.as_str().starts_with("if.end"));
}

#[test]
fn while_loop_shape() {
    let module = lower("function f(c) { while (c) { c = c - 1; } return c; }");
    let f = function(&module, "f");
    let labels = block_labels(f);
    assert!(labels.iter().any(|l| l.starts_with("while.cond")));
    assert!(labels.iter().any(|l| l.starts_with("while.body")));
    assert!(labels.iter().any(|l| l.starts_with("while.end")));

    // Back edge: the body branches back to the condition.
    let cond = f
        .blocks
        .iter_enumerated()
        .find(|(_, b)| b.label.as_str().starts_with("while.cond"))
        .map(|(id, _)| id)
        .unwrap();
    let body = f
        .blocks
        .iter_enumerated()
        .find(|(_, b)| b.label.as_str().starts_with("while.body"))
        .map(|(id, _)| id)
        .unwrap();
    assert!(f.successors(body).contains(&cond));
    // The condition branches into the body and out to the end.
    assert_eq!(f.successors(cond).len(), 2);
}

#[test]
fn for_loop_has_init_cond_body_update_end() {
    let module = lower("function f() { for (let i = 0; i < 10; i++) { } return 0; }");
    let f = function(&module, "f");
    let labels = block_labels(f);
    for base in ["for.init", "for.cond", "for.body", "for.update", "for.end"] {
        assert!(
            labels.iter().any(|l| l.starts_with(base)),
            "missing {} in {:?}",
            base,
            labels
        );
    }

    // body -> update -> cond closes the loop.
    let find = |base: &str| {
        f.blocks
            .iter_enumerated()
            .find(|(_, b)| b.label.as_str().starts_with(base))
            .map(|(id, _)| id)
            .unwrap()
    };
    assert!(f.successors(find("for.body")).contains(&find("for.update")));
    assert!(f.successors(find("for.update")).contains(&find("for.cond")));
}

#[test]
fn labeled_loop_header_carries_label() {
    let module = lower("function f() { outer: for (let i = 0; i < 3; i++) { break outer; } }");
    let f = function(&module, "f");
    assert!(
        block_labels(f)
            .iter()
            .any(|l| l.starts_with("for.cond") && l.ends_with("#outer")),
        "labels: {:?}",
        block_labels(f)
    );
}

#[test]
fn break_and_continue_stay_pseudo_instructions() {
    let module = lower(
        "function f(c, x, y) { while (c) { if (x) { continue; } if (y) { break; } c = c - 1; } }",
    );
    let f = function(&module, "f");
    let ops = opcodes(f);
    assert!(ops.contains(&Opcode::Break));
    assert!(ops.contains(&Opcode::Continue));

    // Blocks containing them are flagged for the lowering heuristics.
    let flagged = f.blocks.iter().filter(|b| b.has_break_or_continue).count();
    assert_eq!(flagged, 2);

    // The loop still closes: the body tail branches back to the condition.
    let cond = f
        .blocks
        .iter_enumerated()
        .find(|(_, b)| b.label.as_str().starts_with("while.cond"))
        .map(|(id, _)| id)
        .unwrap();
    let preds = f.predecessors();
    assert!(preds[cond].len() >= 2, "loop back edge is missing");

    // Labeled break carries its label.
    let module = lower("function g() { outer: for (;;) { break outer; } }");
    let g = function(&module, "g");
    let break_inst = g
        .blocks
        .iter()
        .flat_map(|b| b.insts.iter())
        .filter_map(|&id| g.inst(id))
        .find(|i| i.opcode == Opcode::Break)
        .unwrap();
    assert_eq!(break_inst.label.map(|l| l.to_string()), Some("outer".into()));
}

#[test]
fn switch_block_label_conventions() {
    let module = lower(
        "function f(x) { switch (x) { case 1: a(); break; case 2: b(); default: c(); } return 0; }",
    );
    let f = function(&module, "f");
    let labels = block_labels(f);
    assert!(labels.iter().any(|l| l.starts_with("switch.case_0")));
    assert!(labels.iter().any(|l| l.starts_with("switch.case_1")));
    assert!(labels.iter().any(|l| l.starts_with("switch.default")));
    assert!(labels.iter().any(|l| l.starts_with("switch.end")));
    assert!(labels.iter().any(|l| l.starts_with("case.else")));
}

#[test]
fn closure_side_tables_for_returned_counter() {
    let module = lower(
        "function makeCounter() { let n = 0; return function inc() { n++; return n; }; }",
    );

    let inc = Symbol::intern("inc");
    let captured = module
        .closure_captured_vars
        .get(&inc)
        .expect("inc must have captured vars");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].as_str(), "n");

    let env = module
        .closure_environments
        .get(&inc)
        .expect("inc must have an environment struct");
    assert_eq!(env.fields.len(), 1);
    assert_eq!(env.fields[0].0.as_str(), "n");

    assert_eq!(
        module
            .closure_returned_by
            .get(&Symbol::intern("makeCounter"))
            .copied(),
        Some(inc)
    );

    // Captured values point into makeCounter's arena at n's alloca.
    let values = module.closure_captured_values.get(&inc).unwrap();
    let outer = function(&module, "makeCounter");
    let alloca = outer.inst(values[0]).expect("captured value is an alloca");
    assert_eq!(alloca.opcode, Opcode::Alloca);

    // The inner function gained the trailing __env parameter and an entry
    // alloca named after the captured variable.
    let inner = function(&module, "inc");
    assert!(inner.env_param().is_some());
    let entry = inner.entry();
    let has_named_alloca = inner.blocks[entry].insts.iter().any(|&id| {
        inner
            .inst(id)
            .map(|i| i.opcode == Opcode::Alloca && i.name.as_str() == "n")
            .unwrap_or(false)
    });
    assert!(has_named_alloca);
}

#[test]
fn arrow_closure_is_detected() {
    let module = lower("function outer() { let a = 1; return () => a; }");
    let returned = module
        .closure_returned_by
        .get(&Symbol::intern("outer"))
        .copied()
        .expect("outer returns a closure");
    let captured = module.closure_captured_vars.get(&returned).unwrap();
    assert_eq!(captured[0].as_str(), "a");
}

#[test]
fn typeof_undeclared_is_undefined_string() {
    let module = lower("let t = typeof missing;");
    let main = function(&module, "main");
    let has_undefined_str = main.values.iter().any(|v| match v {
        HirValue::Constant(c) => matches!(&c.kind, ConstKind::Str(s) if s.as_str() == "undefined"),
        _ => false,
    });
    assert!(has_undefined_str);
}

#[test]
fn number_literals_split_int_and_float() {
    let module = lower("let a = 42; let b = 0.5;");
    let main = function(&module, "main");
    let mut has_int = false;
    let mut has_float = false;
    for v in main.values.iter() {
        if let HirValue::Constant(c) = v {
            match c.kind {
                ConstKind::Int(42) => has_int = true,
                ConstKind::Float(f) if f == 0.5 => has_float = true,
                _ => {}
            }
        }
    }
    assert!(has_int && has_float);
}

#[test]
fn entry_block_is_first_and_has_no_predecessors() {
    let module = lower("function f(x) { if (x) { return 1; } return 2; }");
    for func in &module.functions {
        let preds = func.predecessors();
        assert!(preds[func.entry()].is_empty(), "entry of {} has preds", func.name);
    }
}

#[test]
fn unsupported_nodes_keep_pipeline_total() {
    let lexer = Lexer::from_source("let a = <div/>; debugger; with (a) {} let b = /re/;");
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    let (module, diags) = generate_hir(&program, "test");
    // Lowering completed and produced a structurally valid main.
    let main = function(&module, "main");
    assert!(main.blocks.len() >= 1);
    assert!(!diags.is_empty());
}
