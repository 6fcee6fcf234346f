//! Code generation tests: IR shape via the textual module, verifier
//! acceptance, and one JIT round trip.

use inkwell::context::Context;

use novac_hir::generate_hir;
use novac_lex::Lexer;
use novac_mir::{generate_mir, MirModule, MirType};
use novac_par::Parser;

use crate::llvm::LlvmCodeGen;
use crate::types::TypeMapper;

fn lower_to_mir(source: &str) -> MirModule {
    let lexer = Lexer::from_source(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    assert!(!parser.has_errors(), "parse errors: {:?}", parser.errors());
    let (hir, _) = generate_hir(&program, "test");
    let (mir, _) = generate_mir(&hir, "test");
    mir
}

fn build_ir(source: &str) -> String {
    let mir = lower_to_mir(source);
    let context = Context::create();
    let mut codegen = LlvmCodeGen::new(&context, "test");
    codegen.generate(&mir).expect("codegen must verify");
    codegen.print_ir()
}

#[test]
fn type_mapping_basics() {
    let context = Context::create();
    let mut mapper = TypeMapper::new(&context);

    assert!(mapper.map(MirType::I64).is_int_type());
    assert!(mapper.map(MirType::I1).is_int_type());
    assert!(mapper.map(MirType::F64).is_float_type());
    assert!(mapper.map(MirType::Pointer).is_pointer_type());
    // Aggregate markers and void all lower to opaque pointer / widened i64.
    assert!(mapper.map(MirType::Array).is_pointer_type());
    assert!(mapper.map(MirType::Struct).is_pointer_type());
    assert!(mapper.map(MirType::Void).is_int_type());
    // Signedness lives in the operations: shared integer types.
    assert_eq!(mapper.map(MirType::U64), mapper.map(MirType::I64));
}

#[test]
fn add_function_emits_integer_add() {
    let ir = build_ir("function add(a, b) { return a + b; }");
    assert!(ir.contains("define i64 @add(i64"), "ir:\n{}", ir);
    assert!(ir.contains("add i64"), "ir:\n{}", ir);
    assert!(ir.contains("define i64 @main"), "synthetic main exists");
}

#[test]
fn signed_division_and_shifts() {
    let ir = build_ir("function f(a, b) { return (a / b) + (a >> b) + (a >>> b); }");
    assert!(ir.contains("sdiv i64"), "ir:\n{}", ir);
    assert!(ir.contains("ashr i64"), "ir:\n{}", ir);
    assert!(ir.contains("lshr i64"), "ir:\n{}", ir);
}

#[test]
fn comparisons_use_signed_predicates() {
    let ir = build_ir("function f(a, b) { if (a < b) { return 1; } return 2; }");
    assert!(ir.contains("icmp slt i64"), "ir:\n{}", ir);
    // CondBr lowers through a two-way switch on the boolean.
    assert!(ir.contains("switch i1"), "ir:\n{}", ir);
}

#[test]
fn float_operands_promote_to_fadd() {
    // A non-constant operand keeps the fadd from being folded away.
    let ir = build_ir("function f(a) { return a + 0.5; }");
    assert!(ir.contains("sitofp"), "integer side promotes: \n{}", ir);
    assert!(ir.contains("fadd double"), "ir:\n{}", ir);
}

#[test]
fn runtime_functions_declared_lazily() {
    let ir = build_ir("function f(arr) { arr.push(1); console.log(arr.length); }");
    assert!(ir.contains("declare i64 @nova_value_array_push"), "ir:\n{}", ir);
    assert!(ir.contains("declare i64 @nova_value_array_length"), "ir:\n{}", ir);
    assert!(ir.contains("declare i32 @printf"), "ir:\n{}", ir);
}

#[test]
fn array_literal_allocates_through_runtime() {
    let ir = build_ir("let xs = [1, 2, 3];");
    assert!(
        ir.contains("declare ptr @nova_create_value_array"),
        "ir:\n{}",
        ir
    );
    assert!(ir.contains("getelementptr"), "ir:\n{}", ir);
}

#[test]
fn closure_calls_resolve_to_inner_function() {
    let ir = build_ir(
        "function makeCounter() { let n = 0; return function inc() { n++; return n; }; }\n\
         function use() { const c = makeCounter(); return c(); }",
    );
    assert!(ir.contains("define i64 @makeCounter"), "ir:\n{}", ir);
    assert!(ir.contains("define i64 @inc(i64"), "inc takes the env parameter");
    assert!(ir.contains("call i64 @inc"), "closure call resolves by name:\n{}", ir);
}

#[test]
fn whole_pipeline_verifies_on_control_flow() {
    // Loops, switch, labeled break: the verifier accepting the module is
    // the contract here.
    let ir = build_ir(
        "function f(n) {\n\
           let s = 0;\n\
           outer: for (let i = 0; i < n; i++) {\n\
             for (let j = 0; j < n; j++) {\n\
               if (j == 1) { break outer; }\n\
               s = s + j;\n\
             }\n\
           }\n\
           switch (s) { case 0: s = 1; break; default: s = 2; }\n\
           while (s > 0) { s--; }\n\
           return s;\n\
         }",
    );
    assert!(ir.contains("define i64 @f(i64"), "ir:\n{}", ir);
}

#[test]
fn jit_executes_main() {
    let mir = lower_to_mir("return 6 * 7;");
    let context = Context::create();
    let mut codegen = LlvmCodeGen::new(&context, "jit_test");
    codegen.generate(&mir).expect("codegen must verify");
    let exit = codegen.execute_main().expect("jit");
    assert_eq!(exit, 42);
}
