//! Expressions: precedence, casts, template-ids, allocation.

use cidx_ir::ast::{BaseType, BinaryOp, BuiltinType, ExprKind, TypeOp, UnaryOp};
use pretty_assertions::assert_eq;

use super::{parse_clean, parse_text, Parsed};

/// Parse `text` as the single expression statement of a function body.
fn expr(text: &str) -> (Parsed, ExprKind) {
    let p = parse_clean(&format!("void f() {{ {text}; }}"));
    let body = p.body(0);
    assert_eq!(body.len(), 1, "expected one statement in {text:?}");
    let kind = p.expr_of(body[0]).kind.clone();
    (p, kind)
}

#[test]
fn multiplication_binds_tighter() {
    let (p, kind) = expr("x = 1 + 2 * 3");
    let ExprKind::Assign { op: None, rhs, .. } = kind else {
        panic!("expected assignment");
    };
    let ExprKind::Binary { op: BinaryOp::Add, rhs: product, .. } = p.expr(rhs).kind else {
        panic!("expected addition");
    };
    assert!(matches!(p.expr(product).kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn left_associative_subtraction() {
    let (p, kind) = expr("a - b - c");
    let ExprKind::Binary { op: BinaryOp::Sub, lhs, .. } = kind else {
        panic!("expected subtraction");
    };
    assert!(matches!(p.expr(lhs).kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
}

#[test]
fn compound_assignment_and_logic() {
    let (p, kind) = expr("total += a && !b || c");
    let ExprKind::Assign { op: Some(BinaryOp::Add), rhs, .. } = kind else {
        panic!("expected compound assignment");
    };
    let ExprKind::Binary { op: BinaryOp::Or, lhs, .. } = p.expr(rhs).kind else {
        panic!("expected ||");
    };
    let ExprKind::Binary { op: BinaryOp::And, rhs: not, .. } = p.expr(lhs).kind else {
        panic!("expected &&");
    };
    assert!(matches!(p.expr(not).kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
}

#[test]
fn conditional() {
    let (_, kind) = expr("ok ? a : b");
    assert!(matches!(kind, ExprKind::Conditional { .. }));
}

#[test]
fn c_style_casts() {
    let (_, kind) = expr("(int)x");
    let ExprKind::Cast { ty, .. } = kind else {
        panic!("expected cast");
    };
    assert_eq!(ty.base, BaseType::Builtin(BuiltinType::Int));

    let (_, kind) = expr("(Node*)p");
    let ExprKind::Cast { ty, .. } = kind else {
        panic!("expected cast");
    };
    assert!(matches!(ty.ops.as_slice(), [TypeOp::Pointer(_)]));

    // A parenthesized name followed by a binary operator is arithmetic.
    let (_, kind) = expr("(count) * scale");
    assert!(matches!(kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn named_cast() {
    let (_, kind) = expr("static_cast<const char*>(buffer)");
    let ExprKind::Cast { ty, .. } = kind else {
        panic!("expected cast");
    };
    assert!(ty.cv.is_const);
    assert_eq!(ty.base, BaseType::Builtin(BuiltinType::Char));
}

#[test]
fn template_id_call() {
    let (p, kind) = expr("make<int, 3>(value)");
    let ExprKind::Call { callee, args } = kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    let ExprKind::Name(name) = p.expr(callee).kind else {
        panic!("expected name callee");
    };
    let node = p.result.unit.arena.name(name);
    assert_eq!(node.last.template_args.as_ref().map(Vec::len), Some(2));
}

#[test]
fn nested_template_arguments_split_shift() {
    let (p, kind) = expr("convert<vector<int>>(items)");
    let ExprKind::Call { callee, .. } = kind else {
        panic!("expected call");
    };
    let ExprKind::Name(name) = p.expr(callee).kind else {
        panic!("expected name callee");
    };
    assert!(p.result.unit.arena.name(name).last.is_template_id());
}

#[test]
fn comparisons_in_arguments_are_not_template_ids() {
    let (_, kind) = expr("check(a < b, c > d)");
    let ExprKind::Call { args, .. } = kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 2);
}

#[test]
fn member_access_chain() {
    let (p, kind) = expr("node->next.value()");
    let ExprKind::Call { callee, .. } = kind else {
        panic!("expected call");
    };
    let ExprKind::Member { object, arrow: false, member } = p.expr(callee).kind else {
        panic!("expected `.` access");
    };
    assert_eq!(p.name(member), "value");
    assert!(matches!(p.expr(object).kind, ExprKind::Member { arrow: true, .. }));
}

#[test]
fn postfix_and_index() {
    let (p, kind) = expr("table[i++]");
    let ExprKind::Index { index, .. } = kind else {
        panic!("expected index");
    };
    assert!(matches!(p.expr(index).kind, ExprKind::Unary { op: UnaryOp::PostInc, .. }));
}

#[test]
fn new_and_delete() {
    let (_, kind) = expr("p = new Widget(1, 2)");
    assert!(matches!(kind, ExprKind::Assign { .. }));

    let (p, kind) = expr("q = new int[n]");
    let ExprKind::Assign { rhs, .. } = kind else {
        panic!("expected assignment");
    };
    let ExprKind::New { ty, args } = &p.expr(rhs).kind else {
        panic!("expected new");
    };
    assert!(args.is_empty());
    assert!(matches!(ty.ops.as_slice(), [TypeOp::Array(Some(_))]));

    let (_, kind) = expr("delete[] q");
    assert!(matches!(kind, ExprKind::Delete { array: true, .. }));
}

#[test]
fn sizeof_forms() {
    let (_, kind) = expr("sizeof(int)");
    assert!(matches!(kind, ExprKind::SizeofType(_)));
    let (_, kind) = expr("sizeof x");
    assert!(matches!(kind, ExprKind::SizeofExpr(_)));
    // A bare name is read as a type.
    let (_, kind) = expr("sizeof(value)");
    let ExprKind::SizeofType(ty) = kind else {
        panic!("expected sizeof(type)");
    };
    assert!(matches!(ty.base, BaseType::Named(_)));
}

#[test]
fn literals() {
    let (p, kind) = expr("puts(\"a\" \"b\")");
    let ExprKind::Call { args, .. } = kind else {
        panic!("expected call");
    };
    assert!(matches!(p.expr(args[0]).kind, ExprKind::StringLit(_)));
    let (_, kind) = expr("flag = true");
    assert!(matches!(kind, ExprKind::Assign { .. }));
    let (_, kind) = expr("this");
    assert_eq!(kind, ExprKind::This);
    let (_, kind) = expr("nullptr");
    assert_eq!(kind, ExprKind::Nullptr);
}

#[test]
fn functional_casts_and_temporaries() {
    let (_, kind) = expr("Point{1, 2}");
    let ExprKind::Construct { args, .. } = kind else {
        panic!("expected construct");
    };
    assert_eq!(args.len(), 2);
    let (_, kind) = expr("x = int(3.5)");
    assert!(matches!(kind, ExprKind::Assign { .. }));
}

#[test]
fn throw_expression() {
    let (_, kind) = expr("throw Error(\"bad\")");
    assert!(matches!(kind, ExprKind::Throw(Some(_))));
}

#[test]
fn comma_operator() {
    let (_, kind) = expr("a = 1, b = 2");
    assert!(matches!(kind, ExprKind::Binary { op: BinaryOp::Comma, .. }));
}

#[test]
fn lambda_is_reported() {
    let p = parse_text("void f() { auto g = [&](int x) { return x; }; g(1); }");
    assert_eq!(p.codes(), vec!["E2002"]);
    // Parsing continues after the lambda.
    assert_eq!(p.body(0).len(), 2);
}

#[test]
fn designated_initializers() {
    let p = parse_clean("struct P p = { .x = 1, .y = 2 };\nint a[4] = { [0] = 1, [3] = 2 };");
    assert_eq!(p.decls().len(), 2);
}
