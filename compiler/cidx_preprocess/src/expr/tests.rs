use std::path::PathBuf;

use cidx_ir::{Dialect, FileId, Span, StringInterner};

use super::{evaluate, ExprError};
use crate::lexer::FileLexer;

fn eval_in(dialect: Dialect, text: &str) -> Result<bool, ExprError> {
    let interner = StringInterner::new();
    let mut lexer = FileLexer::new(FileId::MAIN, PathBuf::from("expr.c"), text);
    let mut problems = Vec::new();
    let (tokens, _) = lexer.read_line(&interner, &mut problems, false);
    assert!(problems.is_empty(), "{problems:?}");
    evaluate(&tokens, &interner, dialect, Span::DUMMY)
}

fn eval(text: &str) -> Result<bool, ExprError> {
    eval_in(Dialect::Cpp, text)
}

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(eval("1 + 2 * 3 == 7"), Ok(true));
    assert_eq!(eval("(1 + 2) * 3 == 7"), Ok(false));
    assert_eq!(eval("10 / 3 == 3 && 10 % 3 == 1"), Ok(true));
    assert_eq!(eval("1 << 4 == 16 && 256 >> 4 == 16"), Ok(true));
    assert_eq!(eval("(6 & 3) == 2 && (6 | 1) == 7 && (6 ^ 2) == 4"), Ok(true));
    assert_eq!(eval("-1 < 0 && ~0 == -1 && !0"), Ok(true));
}

#[test]
fn conditional_operator() {
    assert_eq!(eval("1 ? 2 : 0"), Ok(true));
    assert_eq!(eval("0 ? 2 : 0"), Ok(false));
    assert_eq!(eval("0 ? 1 : 0 ? 1 : 3"), Ok(true));
}

#[test]
fn literals_with_suffixes_and_radixes() {
    assert_eq!(eval("0x10 == 16 && 010 == 8 && 0b101 == 5"), Ok(true));
    assert_eq!(eval("201703L > 199711L"), Ok(true));
    assert_eq!(eval("1'000'000 == 1000000"), Ok(true));
    assert_eq!(eval("'A' == 65 && '\\n' == 10 && '\\x41' == 65 && '\\101' == 65"), Ok(true));
}

#[test]
fn unsigned_comparison() {
    assert_eq!(eval("-1 > 0u"), Ok(true));
    assert_eq!(eval("-1 > 0"), Ok(false));
    assert_eq!(eval("0xFFFFFFFFFFFFFFFF > 0"), Ok(true));
}

#[test]
fn identifiers_are_zero_and_booleans_depend_on_dialect() {
    assert_eq!(eval("UNDEFINED_THING"), Ok(false));
    assert_eq!(eval("UNDEFINED_THING + 1"), Ok(true));
    assert_eq!(eval("true"), Ok(true));
    assert_eq!(eval_in(Dialect::C, "true"), Ok(false));
    assert_eq!(eval("false || 0"), Ok(false));
}

#[test]
fn division_by_zero_is_reported_only_when_evaluated() {
    assert!(matches!(eval("1 / 0"), Err(ExprError::DivisionByZero(_))));
    assert!(matches!(eval("1 % (2 - 2)"), Err(ExprError::DivisionByZero(_))));
    assert_eq!(eval("0 && 1 / 0"), Ok(false));
    assert_eq!(eval("1 || 1 / 0"), Ok(true));
    assert_eq!(eval("1 ? 1 : 1 / 0"), Ok(true));
}

#[test]
fn malformed_expressions() {
    assert!(matches!(eval(""), Err(ExprError::Malformed(..))));
    assert!(matches!(eval("1 +"), Err(ExprError::Malformed(..))));
    assert!(matches!(eval("(1"), Err(ExprError::Malformed(..))));
    assert!(matches!(eval("1 2"), Err(ExprError::Malformed(..))));
    assert!(matches!(eval("1.5"), Err(ExprError::Malformed(..))));
    assert!(matches!(eval("09"), Err(ExprError::Malformed(..))));
    assert!(matches!(eval("\"str\""), Err(ExprError::Malformed(..))));
}
