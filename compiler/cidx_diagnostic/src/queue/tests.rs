use super::*;
use crate::ErrorCode;
use cidx_ir::Span;
use pretty_assertions::assert_eq;

fn problem(code: ErrorCode, msg: &str, start: u32) -> Diagnostic {
    Diagnostic::error(code)
        .with_message(msg)
        .with_label(Span::new(start, start + 1), "here")
}

#[test]
fn duplicates_on_same_line_are_dropped() {
    let mut queue = DiagnosticQueue::new();
    assert!(queue.add(problem(ErrorCode::E2001, "unexpected `)`", 4), 2, 5));
    assert!(!queue.add(problem(ErrorCode::E2001, "unexpected `)`", 4), 2, 5));
    assert!(queue.add(problem(ErrorCode::E2001, "unexpected `)`", 40), 3, 1));
    assert_eq!(queue.error_count(), 2);
}

#[test]
fn limit_counts_errors_only() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
        error_limit: 1,
        deduplicate: false,
    });
    assert!(queue.add(problem(ErrorCode::S3001, "a", 0), 1, 1));
    assert!(!queue.add(problem(ErrorCode::S3001, "b", 2), 1, 3));
    assert!(queue.add(problem(ErrorCode::P1013, "warning", 4), 1, 5));
    assert_eq!(queue.suppressed_count(), 1);
}

#[test]
fn flush_sorts_by_position() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
    let _ = queue.add(problem(ErrorCode::E2002, "second", 20), 3, 1);
    let _ = queue.add(problem(ErrorCode::E2001, "first", 0), 1, 1);
    let messages: Vec<String> = queue.flush().into_iter().map(|d| d.message).collect();
    assert_eq!(messages, vec!["first".to_string(), "second".to_string()]);
    assert!(queue.is_empty());
}
