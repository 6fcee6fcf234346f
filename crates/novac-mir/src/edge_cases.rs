//! End-to-end lowering scenarios: source → HIR → MIR, checking the shapes
//! the rest of the backend depends on.

use novac_hir::{generate_hir, HirModule};
use novac_lex::Lexer;
use novac_par::Parser;
use novac_util::Symbol;

use crate::lower::generate_mir;
use crate::mir::*;

fn lower(source: &str) -> (HirModule, MirModule) {
    let lexer = Lexer::from_source(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    assert!(!parser.has_errors(), "parse errors: {:?}", parser.errors());
    let (hir, _) = generate_hir(&program, "test");
    let (mir, _) = generate_mir(&hir, "test");
    (hir, mir)
}

fn mir_fn<'m>(module: &'m MirModule, name: &str) -> &'m MirFunction {
    module
        .function(Symbol::intern(name))
        .unwrap_or_else(|| panic!("function '{}' missing from MIR", name))
}

/// The MIR block pre-created for a HIR block shares its index; continuation
/// blocks are appended after all of them.
fn mir_block_of(hir: &novac_hir::HirFunction, prefix: &str) -> BlockId {
    let (id, _) = hir
        .blocks
        .iter_enumerated()
        .find(|(_, b)| b.label.as_str().starts_with(prefix))
        .unwrap_or_else(|| panic!("no HIR block labeled {}*", prefix));
    BlockId(id.0)
}

fn all_statements(func: &MirFunction) -> Vec<&Statement> {
    func.blocks.iter().flat_map(|b| b.statements.iter()).collect()
}

#[test]
fn scenario_simple_addition() {
    let (_, mir) = lower("let x = 1 + 2;");
    let main = mir_fn(&mir, "main");

    let has_add = all_statements(main).iter().any(|s| {
        matches!(
            s,
            Statement::Assign(
                _,
                Rvalue::BinaryOp(
                    BinOp::Add,
                    Operand::Constant(Constant {
                        value: ConstValue::Int(1),
                        ..
                    }),
                    Operand::Constant(Constant {
                        value: ConstValue::Int(2),
                        ..
                    }),
                )
            )
        )
    });
    assert!(has_add, "expected _n = Add(const 1, const 2)");

    // One I64 local for x, StorageLive before its assignment.
    let x_local = main
        .local_decls
        .iter()
        .find(|d| d.name.map(|n| n.as_str().starts_with("x")).unwrap_or(false))
        .expect("local for x");
    assert_eq!(x_local.place.ty, MirType::I64);

    let entry_stmts = &main.blocks[main.entry()].statements;
    let live_at = entry_stmts
        .iter()
        .position(|s| matches!(s, Statement::StorageLive(p) if p.index == x_local.place.index));
    let assign_at = entry_stmts
        .iter()
        .position(|s| matches!(s, Statement::Assign(p, _) if p.index == x_local.place.index));
    assert!(live_at.unwrap() < assign_at.unwrap(), "StorageLive precedes assignment");
}

#[test]
fn scenario_two_argument_function() {
    let (_, mir) = lower("function add(a, b) { return a + b; }");
    let add = mir_fn(&mir, "add");

    assert_eq!(add.arg_count, 2);
    assert_eq!(add.blocks.len(), 1, "no calls, no branches: one block");

    // The add reads both argument places.
    let uses_args = all_statements(add).iter().any(|s| {
        matches!(
            s,
            Statement::Assign(
                _,
                Rvalue::BinaryOp(BinOp::Add, Operand::Copy(l), Operand::Copy(r))
            ) if l.index == 1 && r.index == 2
        )
    });
    assert!(uses_args, "expected Add(copy _1, copy _2)");

    // _0 receives the result and the block returns.
    let assigns_ret = all_statements(add)
        .iter()
        .any(|s| matches!(s, Statement::Assign(p, _) if p.index == 0));
    assert!(assigns_ret);
    assert_eq!(add.blocks[add.entry()].terminator, Terminator::Return);
}

#[test]
fn scenario_if_else_with_returns() {
    let (hir, mir) = lower("function f(x) { if (x > 0) { return 1; } else { return 2; } }");
    let f = mir_fn(&mir, "f");

    // Entry ends in a two-way SwitchInt on the comparison.
    match &f.blocks[f.entry()].terminator {
        Terminator::SwitchInt { targets, .. } => {
            assert_eq!(targets.len(), 1);
            assert_eq!(targets[0].0, 1);
        }
        other => panic!("expected SwitchInt, got {:?}", other),
    }

    // Each arm assigns _0 its constant and returns.
    let hir_f = hir.function(Symbol::intern("f")).unwrap();
    for (prefix, value) in [("if.then", 1i64), ("if.else", 2i64)] {
        let block = &f.blocks[mir_block_of(hir_f, prefix)];
        let assigns = block.statements.iter().any(|s| {
            matches!(
                s,
                Statement::Assign(
                    p,
                    Rvalue::Use(Operand::Constant(Constant {
                        value: ConstValue::Int(v),
                        ..
                    }))
                ) if p.index == 0 && *v == value
            )
        });
        assert!(assigns, "{} must assign _0 = const {}", prefix, value);
        assert_eq!(block.terminator, Terminator::Return);
    }
}

#[test]
fn scenario_counter_closure() {
    let source = "function makeCounter() { let n = 0; return function inc() { n++; return n; }; }\n\
                  function use() { const c = makeCounter(); return c(); }";
    let (_, mir) = lower(source);

    // Outer: allocates the environment, populates field 0, returns the
    // pointer through _0.
    let outer = mir_fn(&mir, "makeCounter");
    let stmts = all_statements(outer);
    let env_place = stmts
        .iter()
        .find_map(|s| match s {
            Statement::Assign(p, Rvalue::Aggregate(AggregateKind::Struct, zeros)) => {
                assert_eq!(zeros.len(), 1, "one captured field, zero-initialized");
                Some(*p)
            }
            _ => None,
        })
        .expect("environment struct allocation");
    let populates = stmts.iter().any(|s| {
        matches!(
            s,
            Statement::Assign(_, Rvalue::Aggregate(AggregateKind::SetField, elems))
                if elems.first() == Some(&Operand::Copy(env_place))
        )
    });
    assert!(populates, "environment field must be populated via SetField");
    let returns_env = stmts.iter().any(|s| {
        matches!(
            s,
            Statement::Assign(p, Rvalue::Use(Operand::Copy(src)))
                if p.index == 0 && src.index == env_place.index
        )
    });
    assert!(returns_env, "_0 receives the environment pointer");

    // Inner: Copy-In at entry from __env (the last argument), Copy-Out
    // before the return.
    let inner = mir_fn(&mir, "inc");
    assert_eq!(inner.arg_count, 1, "inc has only the __env parameter");
    let env_arg = inner.arg_place(0);
    let entry = &inner.blocks[inner.entry()];
    let copy_in = entry.statements.iter().find_map(|s| match s {
        Statement::Assign(
            p,
            Rvalue::GetElement {
                array: Operand::Copy(base),
                is_field: true,
                ..
            },
        ) if base.index == env_arg.index => Some(*p),
        _ => None,
    });
    let copy_in = copy_in.expect("Copy-In from __env at entry");

    let copy_out = all_statements(inner).iter().any(|s| {
        matches!(
            s,
            Statement::Assign(_, Rvalue::Aggregate(AggregateKind::SetField, elems))
                if elems.first() == Some(&Operand::Copy(env_arg))
                    && elems.get(2) == Some(&Operand::Copy(copy_in))
        )
    });
    assert!(copy_out, "Copy-Out to __env before return");

    // Caller: the call through c substitutes the inner name and prepends
    // the environment pointer.
    let caller = mir_fn(&mir, "use");
    let closure_call = caller
        .blocks
        .iter()
        .find_map(|b| match &b.terminator {
            Terminator::Call { func, args, .. } => match func {
                Operand::Constant(Constant {
                    value: ConstValue::Str(name),
                    ..
                }) if name.as_str() == "inc" => Some(args.clone()),
                _ => None,
            },
            _ => None,
        })
        .expect("call to inc through the closure place");
    assert!(
        matches!(closure_call.first(), Some(Operand::Copy(_))),
        "first argument is a copy of the environment place"
    );
}

#[test]
fn scenario_labeled_break_targets_outer_exit() {
    let source = "function f() { outer: for (let i = 0; i < 3; i++) { \
                  for (let j = 0; j < 3; j++) { if (j == 1) { break outer; } } } }";
    let (hir, mir) = lower(source);
    let hir_f = hir.function(Symbol::intern("f")).unwrap();
    let f = mir_fn(&mir, "f");

    // The first for.end belongs to the outer loop (created before the inner
    // loop's blocks).
    let outer_end = mir_block_of(hir_f, "for.end");
    let then_block = mir_block_of(hir_f, "if.then");

    assert_eq!(
        f.blocks[then_block].terminator,
        Terminator::Goto { target: outer_end },
        "labeled break must exit the outer loop"
    );
}

#[test]
fn scenario_continue_targets() {
    // In a for loop, continue targets the update block.
    let (hir, mir) = lower("function f(x) { for (let i = 0; i < 10; i++) { if (x) { continue; } } }");
    let hir_f = hir.function(Symbol::intern("f")).unwrap();
    let f = mir_fn(&mir, "f");
    assert_eq!(
        f.blocks[mir_block_of(hir_f, "if.then")].terminator,
        Terminator::Goto {
            target: mir_block_of(hir_f, "for.update")
        },
        "continue in for must target for.update, not the condition"
    );

    // In a while loop, continue targets the condition.
    let (hir, mir) = lower("function g(c, x) { while (c) { if (x) { continue; } c = c - 1; } }");
    let hir_g = hir.function(Symbol::intern("g")).unwrap();
    let g = mir_fn(&mir, "g");
    assert_eq!(
        g.blocks[mir_block_of(hir_g, "if.then")].terminator,
        Terminator::Goto {
            target: mir_block_of(hir_g, "while.cond")
        },
        "continue in while must target while.cond"
    );
}

#[test]
fn scenario_switch_break_inside_loop_exits_switch() {
    let source = "function f(c, x) { while (c) { switch (x) { case 1: break; default: x = 0; } c = c - 1; } }";
    let (hir, mir) = lower(source);
    let hir_f = hir.function(Symbol::intern("f")).unwrap();
    let f = mir_fn(&mir, "f");

    assert_eq!(
        f.blocks[mir_block_of(hir_f, "switch.case_0")].terminator,
        Terminator::Goto {
            target: mir_block_of(hir_f, "switch.end")
        },
        "break must exit the switch, not the loop"
    );
}

#[test]
fn call_splits_block_with_continuation() {
    let (_, mir) = lower("function id(x) { return x; }\nfunction f() { let a = id(1); return a; }");
    let f = mir_fn(&mir, "f");

    let (caller_block, target) = f
        .blocks
        .iter_enumerated()
        .find_map(|(id, b)| match &b.terminator {
            Terminator::Call { target, .. } => Some((id, *target)),
            _ => None,
        })
        .expect("call terminator");
    assert_ne!(caller_block, target);
    // The continuation carries the rest of the function, ending in Return.
    assert_eq!(f.blocks[target].terminator, Terminator::Return);
}

#[test]
fn every_block_has_exactly_one_terminator() {
    let (_, mir) = lower(
        "function f(n) { let s = 0; for (let i = 0; i < n; i++) { if (i == 2) { continue; } s = s + i; } return s; }",
    );
    for func in &mir.functions {
        for block in func.blocks.iter() {
            // Structurally guaranteed: the terminator field is exactly one
            // terminator. Check that no statement is itself control flow.
            for stmt in &block.statements {
                assert!(matches!(
                    stmt,
                    Statement::Assign(..)
                        | Statement::StorageLive(_)
                        | Statement::StorageDead(_)
                        | Statement::Nop
                ));
            }
            // Successors derive from the terminator without panicking.
            let _ = block.terminator.successors();
        }
    }
}

#[test]
fn for_of_lowers_through_runtime_length() {
    let (_, mir) = lower("function f(arr) { let s = 0; for (x of arr) { s = s + x; } return s; }");
    let f = mir_fn(&mir, "f");
    let calls_length = f.blocks.iter().any(|b| {
        matches!(
            &b.terminator,
            Terminator::Call { func: Operand::Constant(Constant { value: ConstValue::Str(s), .. }), .. }
                if s.as_str() == "nova_value_array_length"
        )
    });
    assert!(calls_length);
}

#[test]
fn undefined_identifier_still_produces_valid_mir() {
    let lexer = Lexer::from_source("function f() { return missing + 1; }");
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    let (hir, hir_diags) = generate_hir(&program, "test");
    let (mir, _) = generate_mir(&hir, "test");
    assert!(!hir_diags.is_empty(), "unresolved identifier warns");
    let f = mir_fn(&mir, "f");
    assert!(!f.blocks.is_empty());
}
