//! Parser edge cases: disambiguation boundaries, recovery, and grammar
//! coverage over the arena AST.

use novac_lex::Lexer;

use crate::ast::*;
use crate::{Parser, Program};

fn parse(source: &str) -> (Program, Vec<String>) {
    let lexer = Lexer::from_source(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    (program, parser.errors())
}

fn parse_ok(source: &str) -> Program {
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    program
}

fn only_expr(program: &Program) -> &Expr {
    assert_eq!(program.body.len(), 1);
    match program.ast.stmt(program.body[0]) {
        Stmt::Expr(id) => program.ast.expr(*id),
        other => panic!("expected expression statement, got {:?}", other),
    }
}

#[test]
fn arrow_vs_sequence() {
    // Parameter list followed by '=>' parses as an arrow function.
    let program = parse_ok("(a, b) => a + b;");
    match only_expr(&program) {
        Expr::Arrow { params, body, .. } => {
            assert_eq!(params.len(), 2);
            assert!(matches!(body, ArrowBody::Expr(_)));
        }
        other => panic!("expected arrow, got {:?}", other),
    }

    // The same head without '=>' is a parenthesized sequence expression.
    let program = parse_ok("(a, b);");
    match only_expr(&program) {
        Expr::Paren(inner) => match program.ast.expr(*inner) {
            Expr::Sequence(exprs) => assert_eq!(exprs.len(), 2),
            other => panic!("expected sequence, got {:?}", other),
        },
        other => panic!("expected paren, got {:?}", other),
    }
}

#[test]
fn arrow_forms() {
    parse_ok("x => x * 2;");
    parse_ok("async x => x;");
    parse_ok("async (a, b) => a + b;");
    parse_ok("(a: number, b = 1, ...rest) => a;");
    parse_ok("(a): number => a;");
}

#[test]
fn template_interpolation_basic() {
    let program = parse_ok("`hello ${name}!`;");
    match only_expr(&program) {
        Expr::Template { quasis, exprs } => {
            assert_eq!(quasis.len(), 2);
            assert_eq!(quasis[0].as_str(), "hello ");
            assert_eq!(quasis[1].as_str(), "!");
            assert_eq!(exprs.len(), 1);
            assert!(matches!(program.ast.expr(exprs[0]), Expr::Ident(n) if n.as_str() == "name"));
        }
        other => panic!("expected template, got {:?}", other),
    }
}

#[test]
fn template_nested_braces() {
    // The interpolation contains an object literal; brace balancing must
    // find the right closing brace.
    let program = parse_ok("`${ {a:1}.a }`;");
    match only_expr(&program) {
        Expr::Template { quasis, exprs } => {
            assert_eq!(quasis.len(), 2);
            assert_eq!(exprs.len(), 1);
            assert!(matches!(program.ast.expr(exprs[0]), Expr::Member { .. }));
        }
        other => panic!("expected template, got {:?}", other),
    }
}

#[test]
fn tagged_template() {
    let program = parse_ok("tag`a ${b} c`;");
    assert!(matches!(
        only_expr(&program),
        Expr::TaggedTemplate { .. }
    ));
}

#[test]
fn precedence_shapes() {
    // 1 + 2 * 3 parses as 1 + (2 * 3).
    let program = parse_ok("1 + 2 * 3;");
    match only_expr(&program) {
        Expr::Binary {
            op: BinOp::Add,
            right,
            ..
        } => {
            assert!(matches!(
                program.ast.expr(*right),
                Expr::Binary { op: BinOp::Mul, .. }
            ));
        }
        other => panic!("expected additive at the root, got {:?}", other),
    }

    // Exponentiation is right-associative: a ** b ** c = a ** (b ** c).
    let program = parse_ok("a ** b ** c;");
    match only_expr(&program) {
        Expr::Binary {
            op: BinOp::Exp,
            right,
            ..
        } => {
            assert!(matches!(
                program.ast.expr(*right),
                Expr::Binary { op: BinOp::Exp, .. }
            ));
        }
        other => panic!("expected exponentiation, got {:?}", other),
    }

    // Assignment is right-associative.
    let program = parse_ok("a = b = c;");
    match only_expr(&program) {
        Expr::Assignment { value, .. } => {
            assert!(matches!(
                program.ast.expr(*value),
                Expr::Assignment { .. }
            ));
        }
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn nullish_and_optional_chain() {
    let program = parse_ok("a?.b?.[c] ?? d;");
    match only_expr(&program) {
        Expr::Binary {
            op: BinOp::Nullish,
            left,
            ..
        } => {
            assert!(matches!(
                program.ast.expr(*left),
                Expr::Index { optional: true, .. }
            ));
        }
        other => panic!("expected nullish at the root, got {:?}", other),
    }
}

#[test]
fn compound_assignment_operators() {
    for (source, op) in [
        ("a ||= b;", AssignOp::LogicalOr),
        ("a &&= b;", AssignOp::LogicalAnd),
        ("a ??= b;", AssignOp::Nullish),
        ("a >>>= b;", AssignOp::UShr),
        ("a **= b;", AssignOp::Exp),
    ] {
        let program = parse_ok(source);
        match only_expr(&program) {
            Expr::Assignment { op: found, .. } => assert_eq!(*found, op),
            other => panic!("expected assignment, got {:?}", other),
        }
    }
}

#[test]
fn as_satisfies_nonnull() {
    // `as` and `satisfies` bind at the postfix level, tighter than `+`.
    let program = parse_ok("(x as number) + y!.z satisfies unknown;");
    match only_expr(&program) {
        Expr::Binary {
            op: BinOp::Add,
            left,
            right,
        } => {
            assert!(matches!(program.ast.expr(*left), Expr::Paren(_)));
            assert!(matches!(program.ast.expr(*right), Expr::Satisfies { .. }));
        }
        other => panic!("expected additive at the root, got {:?}", other),
    }
}

#[test]
fn for_header_routing() {
    let program = parse_ok("for (let i = 0; i < 10; i++) {}");
    assert!(matches!(
        program.ast.stmt(program.body[0]),
        Stmt::For { init: Some(_), test: Some(_), update: Some(_), .. }
    ));

    let program = parse_ok("for (const k in obj) {}");
    assert!(matches!(
        program.ast.stmt(program.body[0]),
        Stmt::ForIn { decl_kind: Some(VarKind::Const), .. }
    ));

    let program = parse_ok("for (let v of items) {}");
    assert!(matches!(
        program.ast.stmt(program.body[0]),
        Stmt::ForOf { decl_kind: Some(VarKind::Let), .. }
    ));

    let program = parse_ok("for (x of items) {}");
    assert!(matches!(
        program.ast.stmt(program.body[0]),
        Stmt::ForOf { decl_kind: None, .. }
    ));

    let program = parse_ok("for (;;) {}");
    assert!(matches!(
        program.ast.stmt(program.body[0]),
        Stmt::For { init: None, test: None, update: None, .. }
    ));
}

#[test]
fn labeled_statement_and_labeled_break() {
    let program = parse_ok("outer: for (;;) { break outer; }");
    match program.ast.stmt(program.body[0]) {
        Stmt::Labeled { label, .. } => assert_eq!(label.as_str(), "outer"),
        other => panic!("expected labeled statement, got {:?}", other),
    }
}

#[test]
fn switch_with_default() {
    let program = parse_ok("switch (x) { case 1: a(); break; default: b(); }");
    match program.ast.stmt(program.body[0]) {
        Stmt::Switch { cases, .. } => {
            assert_eq!(cases.len(), 2);
            assert!(cases[0].test.is_some());
            assert!(cases[1].test.is_none());
        }
        other => panic!("expected switch, got {:?}", other),
    }
}

#[test]
fn try_catch_finally() {
    let program = parse_ok("try { f(); } catch (e) { g(); } finally { h(); }");
    assert!(matches!(
        program.ast.stmt(program.body[0]),
        Stmt::Try { handler: Some(_), finalizer: Some(_), .. }
    ));

    // Binding-less catch.
    parse_ok("try { f(); } catch { g(); }");
}

#[test]
fn destructuring_declarations() {
    let program = parse_ok("const { a, b: c, d = 1, ...rest } = obj;");
    match program.ast.stmt(program.body[0]) {
        Stmt::VarDecl { declarators, .. } => {
            match program.ast.pat(declarators[0].pattern) {
                Pattern::Object { props, rest } => {
                    assert_eq!(props.len(), 3);
                    assert!(rest.is_some());
                }
                other => panic!("expected object pattern, got {:?}", other),
            }
        }
        other => panic!("expected var decl, got {:?}", other),
    }

    parse_ok("let [x, , y, ...zs] = arr;");
}

#[test]
fn class_members_and_modifiers() {
    let program = parse_ok(
        "@sealed class Point extends Base implements Comparable {\n\
         private static readonly origin: object = null;\n\
         #secret = 1;\n\
         constructor(public x: number, y: number) { }\n\
         get magnitude(): number { return 0; }\n\
         set magnitude(v: number) { }\n\
         static of(x: number): object { return null; }\n\
         abstract area(): number { return 0; }\n\
        }",
    );
    match program.ast.stmt(program.body[0]) {
        Stmt::ClassDecl(def) => {
            assert_eq!(def.name.map(|n| n.as_str()), Some("Point"));
            assert_eq!(def.decorators.len(), 1);
            assert!(def.superclass.is_some());
            assert_eq!(def.implements.len(), 1);

            let kinds: Vec<_> = def.members.iter().map(|m| m.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    MemberKind::Field,
                    MemberKind::Field,
                    MemberKind::Constructor,
                    MemberKind::Getter,
                    MemberKind::Setter,
                    MemberKind::Method,
                    MemberKind::Method,
                ]
            );
            assert!(def.members[0].is_static && def.members[0].is_readonly);
            assert_eq!(def.members[0].accessibility, Some(Accessibility::Private));
            assert!(def.members[1].is_private_name);
            assert!(def.members[5].is_static);
            assert!(def.members[6].is_abstract);
        }
        other => panic!("expected class decl, got {:?}", other),
    }
}

#[test]
fn interface_enum_type_alias_import_export() {
    let program = parse_ok(
        "import fs, { readFile as rf } from \"nova:fs\";\n\
         import * as path from \"nova:path\";\n\
         interface Shape { area(): number; }\n\
         type Alias = string | number;\n\
         enum Color { Red, Green = 2, Blue }\n\
         export { rf as readFile };\n\
         export default 42;\n\
         export const tau = 6.28;",
    );
    let kinds: Vec<_> = program
        .body
        .iter()
        .map(|&id| std::mem::discriminant(program.ast.stmt(id)))
        .collect();
    assert_eq!(kinds.len(), 8);

    match program.ast.stmt(program.body[2]) {
        Stmt::InterfaceDecl { name } => assert_eq!(name.as_str(), "Shape"),
        other => panic!("expected interface, got {:?}", other),
    }
    match program.ast.stmt(program.body[4]) {
        Stmt::EnumDecl { members, .. } => {
            assert_eq!(members.len(), 3);
            assert!(members[1].init.is_some());
        }
        other => panic!("expected enum, got {:?}", other),
    }
}

#[test]
fn jsx_element_attributes_and_children() {
    let program = parse_ok("<div id=\"a\" on={handler} {...rest}>text {x} <br/></div>;");
    match only_expr(&program) {
        Expr::JsxElement(el) => {
            assert_eq!(el.name.as_str(), "div");
            assert_eq!(el.attrs.len(), 3);
            assert!(!el.self_closing);
            // Text run, expression container, nested self-closing element.
            // The text run slices the raw source up to the '{' token, so the
            // trailing space survives.
            assert_eq!(el.children.len(), 3);
            match &el.children[0] {
                JsxChild::Text(text) => assert_eq!(text.as_str(), "text "),
                other => panic!("expected text child, got {:?}", other),
            }
            assert!(matches!(el.children[1], JsxChild::Expr(_)));
            assert!(matches!(el.children[2], JsxChild::Element(_)));
        }
        other => panic!("expected JSX element, got {:?}", other),
    }
}

#[test]
fn jsx_fragment() {
    let program = parse_ok("<>{a}{b}</>;");
    match only_expr(&program) {
        Expr::JsxFragment(children) => assert_eq!(children.len(), 2),
        other => panic!("expected JSX fragment, got {:?}", other),
    }
}

#[test]
fn jsx_mismatched_closing_tag_reports() {
    let (_, errors) = parse("<div>text</span>;");
    assert!(errors.iter().any(|e| e.contains("mismatched JSX closing tag")));
}

#[test]
fn jsx_text_preserves_whitespace() {
    let program = parse_ok("<p>  spaced  </p>;");
    match only_expr(&program) {
        Expr::JsxElement(el) => match &el.children[0] {
            JsxChild::Text(text) => assert_eq!(text.as_str(), "  spaced  "),
            other => panic!("expected text child, got {:?}", other),
        },
        other => panic!("expected JSX element, got {:?}", other),
    }
}

#[test]
fn regex_fallback_in_statement_position() {
    // The lexer sees ')' before '/', so it produces a division token; the
    // parser's expression-position fallback re-lexes it as a regex.
    let program = parse_ok("if (x) /ab/.test(y);");
    match program.ast.stmt(program.body[0]) {
        Stmt::If { consequent, .. } => match program.ast.stmt(*consequent) {
            Stmt::Expr(id) => match program.ast.expr(*id) {
                Expr::Call { callee, .. } => match program.ast.expr(*callee) {
                    Expr::Member { object, .. } => {
                        assert!(matches!(program.ast.expr(*object), Expr::Regex(_)));
                    }
                    other => panic!("expected member, got {:?}", other),
                },
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        },
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn recovery_reports_multiple_errors() {
    let (program, errors) = parse("let = 5;\nlet y = 1;\nconst = 2;\nlet z = 3;");
    assert!(errors.len() >= 2);
    // The valid statements still parsed.
    let valid = program
        .body
        .iter()
        .filter(|&&id| matches!(program.ast.stmt(id), Stmt::VarDecl { .. }))
        .count();
    assert!(valid >= 2);
}

#[test]
fn new_expressions() {
    let program = parse_ok("new a.b.C(1, 2);");
    match only_expr(&program) {
        Expr::New { callee, args } => {
            assert_eq!(args.len(), 2);
            assert!(matches!(program.ast.expr(*callee), Expr::Member { .. }));
        }
        other => panic!("expected new, got {:?}", other),
    }

    let program = parse_ok("new.target;");
    assert!(matches!(only_expr(&program), Expr::MetaProperty { .. }));
}

#[test]
fn sequence_operator() {
    let program = parse_ok("a, b, c;");
    match only_expr(&program) {
        Expr::Sequence(exprs) => assert_eq!(exprs.len(), 3),
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn using_declaration_parses_like_const() {
    let program = parse_ok("using handle = open();");
    assert!(matches!(
        program.ast.stmt(program.body[0]),
        Stmt::VarDecl { kind: VarKind::Using, .. }
    ));
}
