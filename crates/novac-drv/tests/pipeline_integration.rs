//! End-to-end pipeline tests through the driver's library surface.

use novac_drv::{compile_to_mir, Compiler, Config, EmitKind};
use novac_mir::{ConstValue, Constant, Operand, Terminator};
use novac_util::Symbol;

#[test]
fn clean_program_produces_all_stages() {
    let source = "function add(a: number, b: number): number { return a + b; }\n\
                  let total = add(1, 2);";
    let compilation = compile_to_mir("app.ts", source);

    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
    assert!(!compilation.tokens.is_empty());
    assert!(!compilation.program.body.is_empty());
    assert!(compilation.hir.function(Symbol::intern("add")).is_some());
    assert!(compilation.mir.function(Symbol::intern("add")).is_some());
    assert!(compilation.mir.function(Symbol::intern("main")).is_some());
}

#[test]
fn diagnostics_carry_file_line_column() {
    let compilation = compile_to_mir("bad.ts", "let = 5;");
    assert!(compilation.has_errors());
    assert!(
        compilation
            .diagnostics
            .iter()
            .any(|d| d.starts_with("bad.ts:1:") && d.contains("error:")),
        "diagnostics: {:?}",
        compilation.diagnostics
    );
}

#[test]
fn lexer_errors_precede_parser_errors() {
    let source = "\"unterminated\nlet = 2;";
    let compilation = compile_to_mir("order.ts", source);
    let first_error = compilation
        .diagnostics
        .iter()
        .position(|d| d.contains("Unterminated string"));
    let second_error = compilation
        .diagnostics
        .iter()
        .position(|d| d.contains("expected binding pattern"));
    assert!(first_error.is_some(), "{:?}", compilation.diagnostics);
    if let (Some(a), Some(b)) = (first_error, second_error) {
        assert!(a < b, "lexer diagnostics come first");
    }
}

#[test]
fn partial_input_still_yields_structurally_valid_mir() {
    // Errors accumulate but every stage hands a usable structure onward.
    let compilation = compile_to_mir("partial.ts", "let = 1; function ok() { return 2; }");
    assert!(compilation.has_errors());
    let ok = compilation
        .mir
        .function(Symbol::intern("ok"))
        .expect("the valid function still lowers");
    for block in ok.blocks.iter() {
        let _ = block.terminator.successors();
    }
}

#[test]
fn counter_scenario_reaches_mir_intact() {
    let source = "function makeCounter() { let n = 0; return function inc() { n++; return n; }; }\n\
                  const c = makeCounter();";
    let compilation = compile_to_mir("counter.ts", source);
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);

    // HIR side-tables survived to drive MIR closure materialization.
    let inc = Symbol::intern("inc");
    assert!(compilation.hir.closure_environments.contains_key(&inc));

    // The top-level call records the closure and the env is materialized in
    // makeCounter's return path.
    let make = compilation
        .mir
        .function(Symbol::intern("makeCounter"))
        .unwrap();
    let has_env_return = make.blocks.iter().any(|b| {
        b.statements.iter().any(|s| {
            matches!(
                s,
                novac_mir::Statement::Assign(p, _) if p.index == 0
            )
        }) && b.terminator == Terminator::Return
    });
    assert!(has_env_return);
}

#[test]
fn module_imports_parse_and_lower_quietly() {
    let source = "import { readFile } from \"nova:fs\";\n\
                  import * as path from \"nova:path\";\n\
                  export const name = \"app\";";
    let compilation = compile_to_mir("mod.ts", source);
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
}

#[test]
fn emit_llvm_ir_writes_a_module_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("prog.ts");
    let output = dir.path().join("prog.ll");
    std::fs::write(&input, "function add(a, b) { return a + b; }\n").unwrap();

    let config = Config {
        input: input.clone(),
        output: Some(output.clone()),
        opt_level: 0,
        emit: EmitKind::LlvmIr,
        verbose: false,
        run: false,
    };
    let exit = Compiler::new(config).run().expect("driver run");
    assert_eq!(exit, 0);

    let ir = std::fs::read_to_string(&output).expect("IR file written");
    assert!(ir.contains("define i64 @add"), "ir:\n{}", ir);
}

#[test]
fn jit_run_returns_program_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("answer.ts");
    std::fs::write(&input, "return 40 + 2;\n").unwrap();

    let config = Config {
        input,
        output: None,
        opt_level: 0,
        emit: EmitKind::Executable,
        verbose: false,
        run: true,
    };
    let exit = Compiler::new(config).run().expect("driver run");
    assert_eq!(exit, 42);
}

#[test]
fn runtime_method_calls_resolve_to_nova_names() {
    let source = "function f(arr) { arr.push(1); return Object.keys(arr); }";
    let compilation = compile_to_mir("runtime.ts", source);
    let f = compilation.mir.function(Symbol::intern("f")).unwrap();

    let called: Vec<String> = f
        .blocks
        .iter()
        .filter_map(|b| match &b.terminator {
            Terminator::Call {
                func:
                    Operand::Constant(Constant {
                        value: ConstValue::Str(s),
                        ..
                    }),
                ..
            } => Some(s.to_string()),
            _ => None,
        })
        .collect();
    assert!(called.contains(&"nova_value_array_push".to_string()), "{:?}", called);
    assert!(called.contains(&"nova_object_keys".to_string()), "{:?}", called);
}
