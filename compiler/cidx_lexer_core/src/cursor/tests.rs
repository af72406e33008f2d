use crate::SourceBuffer;

#[test]
fn advance_stops_at_end() {
    let buf = SourceBuffer::new("ab");
    let mut c = buf.cursor();
    c.advance_n(10);
    assert_eq!(c.pos(), 2);
    assert!(c.is_eof());
    assert_eq!(c.current(), 0);
}

#[test]
fn eat_while_ident() {
    let buf = SourceBuffer::new("foo_1 bar");
    let mut c = buf.cursor();
    c.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');
    assert_eq!(c.pos(), 5);
}

#[test]
fn quote_delims() {
    let buf = SourceBuffer::new(r#"abc\"d" x"#);
    let mut c = buf.cursor();
    assert_eq!(c.skip_to_quote_delim(b'"'), b'\\');
    assert_eq!(c.pos(), 3);
    c.advance_n(2);
    assert_eq!(c.skip_to_quote_delim(b'"'), b'"');
    assert_eq!(c.pos(), 6);
}

#[test]
fn block_comment_end() {
    let buf = SourceBuffer::new("a * b */ c");
    let mut c = buf.cursor();
    assert!(c.skip_block_comment_body());
    assert_eq!(c.pos(), 8);
    let mut open = buf.cursor_at(9);
    assert!(!open.skip_block_comment_body());
    assert!(open.is_eof());
}

#[test]
fn line_splice_detection() {
    let buf = SourceBuffer::new("\\\nx\\\r\ny\\z");
    assert!(buf.cursor().at_line_splice());
    assert!(buf.cursor_at(3).at_line_splice());
    assert!(!buf.cursor_at(7).at_line_splice());
}
