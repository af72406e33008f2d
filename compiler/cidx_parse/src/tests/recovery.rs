//! Problem nodes and resynchronization.

use cidx_ir::ast::{DeclKind, ExprKind, Initializer, StmtKind};
use pretty_assertions::assert_eq;

use super::parse_text;

#[test]
fn missing_initializer_keeps_declaration() {
    let p = parse_text("int x = ; int y;");
    assert_eq!(p.codes(), vec!["E2002"]);
    assert_eq!(p.decls().len(), 2);
    let DeclKind::Variable(x) = p.top(0) else {
        panic!("expected variable");
    };
    let Some(Initializer::Assign(init)) = x.init else {
        panic!("expected initializer");
    };
    let ExprKind::Problem(id) = p.expr(init).kind else {
        panic!("expected problem expression");
    };
    assert_eq!(p.result.problem(id).unwrap().code.as_str(), "E2002");
}

#[test]
fn bad_declaration_resynchronizes_at_semicolon() {
    let p = parse_text("int = 3; int ok;");
    assert_eq!(p.codes(), vec!["E2005"]);
    assert!(matches!(p.top(0), DeclKind::Problem(_)));
    let DeclKind::Variable(ok) = p.top(1) else {
        panic!("expected variable after recovery");
    };
    assert_eq!(p.name(ok.name), "ok");
}

#[test]
fn stray_closing_brace() {
    let p = parse_text("} int a;");
    assert_eq!(p.codes(), vec!["E2003"]);
    assert_eq!(p.decls().len(), 1);
    assert!(matches!(p.top(0), DeclKind::Variable(_)));
}

#[test]
fn unclosed_namespace_at_end_of_file() {
    let p = parse_text("namespace n { int a;");
    assert_eq!(p.codes(), vec!["E2004"]);
    let DeclKind::Namespace(ns) = p.top(0) else {
        panic!("expected namespace");
    };
    assert_eq!(ns.body.len(), 1);
    let problem = &p.result.problems[0];
    assert_eq!(problem.message, "unclosed `{`");
    assert_eq!(problem.primary_span().map(|s| s.start), Some(12));
}

#[test]
fn bad_statement_becomes_problem() {
    let p = parse_text("void f() { int = 1; g(); }");
    assert_eq!(p.codes(), vec!["E2005"]);
    let body = p.body(0);
    assert_eq!(body.len(), 2);
    assert!(matches!(p.stmt(body[0]).kind, StmtKind::Problem(_)));
    assert!(matches!(p.expr_of(body[1]).kind, ExprKind::Call { .. }));
}

#[test]
fn missing_semicolon_in_block() {
    let p = parse_text("void f() { a = 1 b = 2; c(); }");
    assert_eq!(p.codes(), vec!["E2001"]);
    let body = p.body(0);
    assert!(matches!(p.stmt(body[0]).kind, StmtKind::Problem(_)));
    assert!(matches!(p.stmt(*body.last().unwrap()).kind, StmtKind::Expr(_)));
}

#[test]
fn errors_inside_class_stay_inside() {
    let p = parse_text("class A { int = 0; void f(); }; int after;");
    assert_eq!(p.codes(), vec!["E2005"]);
    let DeclKind::Class(class) = p.top(0) else {
        panic!("expected class");
    };
    assert_eq!(class.members.len(), 2);
    assert!(matches!(p.top(1), DeclKind::Variable(_)));
}

#[test]
fn has_errors_reflects_problems() {
    assert!(parse_text("int = ;").result.has_errors());
    assert!(!parse_text("int a;").result.has_errors());
}
