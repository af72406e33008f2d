//! Per-file token reader.
//!
//! Wraps the raw scanner for one source file: folds trivia into token flags,
//! interns spellings, reports lexical problems, and offers the line-oriented
//! reads that directive processing needs.

use std::path::PathBuf;

use cidx_diagnostic::{Diagnostic, ErrorCode};
use cidx_ir::{FileId, Punct, Span, StringInterner, Token, TokenFlags, TokenKind};
use cidx_lexer_core::{RawScanner, RawTag, RawToken, SourceBuffer};

/// Include-guard detection state for one file.
///
/// A file is guarded when its first significant line is `#ifndef G` (or
/// `#if !defined G`) whose matching `#endif` is its last significant line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum GuardState {
    /// Nothing significant seen yet.
    Start,
    /// Inside the candidate guard conditional opened at conditional depth
    /// `depth`.
    Open { name: cidx_ir::Name, depth: usize },
    /// The guard conditional closed; any further token disqualifies it.
    Closed(cidx_ir::Name),
    NotGuarded,
}

pub(crate) struct FileLexer {
    pub(crate) file: FileId,
    pub(crate) path: PathBuf,
    buffer: SourceBuffer,
    pos: u32,
    at_line_start: bool,
    /// Conditional stack depth when the file was entered.
    pub(crate) cond_base: usize,
    /// Index into the combined search path the file was found through.
    pub(crate) found_in: Option<usize>,
    pub(crate) guard: GuardState,
    /// `#include` directive that entered this file.
    pub(crate) included_from: Option<(FileId, Span)>,
    /// Presumed line minus physical line, set by `#line`.
    pub(crate) line_delta: i64,
}

impl FileLexer {
    pub(crate) fn new(file: FileId, path: PathBuf, source: &str) -> Self {
        FileLexer {
            file,
            path,
            buffer: SourceBuffer::new(source),
            pos: 0,
            at_line_start: true,
            cond_base: 0,
            found_in: None,
            guard: GuardState::Start,
            included_from: None,
            line_delta: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> u32 {
        self.buffer.len()
    }

    fn raw(&mut self) -> (RawToken, u32) {
        let start = self.pos;
        let raw = RawScanner::new(self.buffer.cursor_at(start)).next_token();
        self.pos = start + raw.len;
        (raw, start)
    }

    fn raw_header(&mut self) -> (RawToken, u32) {
        let start = self.pos;
        let raw = RawScanner::new(self.buffer.cursor_at(start)).header_name();
        self.pos = start + raw.len;
        (raw, start)
    }

    fn text(&self, start: u32, len: u32) -> &str {
        self.buffer.slice(start, start + len)
    }

    /// Next significant token. At end of file returns `Eof` positioned at the
    /// end of the text, marked as a line start.
    pub(crate) fn next(&mut self, interner: &StringInterner, problems: &mut Vec<Diagnostic>) -> Token {
        let mut flags = TokenFlags::EMPTY;
        loop {
            let (raw, start) = self.raw();
            match raw.tag {
                RawTag::Eof => {
                    self.at_line_start = true;
                    let mut tok = Token::eof(self.file, self.len());
                    tok.flags.set(TokenFlags::LINE_START);
                    return tok;
                }
                RawTag::Newline => {
                    self.at_line_start = true;
                    flags.set(TokenFlags::LEADING_SPACE);
                }
                RawTag::UnterminatedComment => {
                    problems.push(self.problem(ErrorCode::L0003, start, raw.len, "unterminated comment"));
                    flags.set(TokenFlags::LEADING_SPACE);
                }
                tag if tag.is_trivia() => flags.set(TokenFlags::LEADING_SPACE),
                _ => {
                    if self.at_line_start {
                        flags.set(TokenFlags::LINE_START);
                        self.at_line_start = false;
                    }
                    let mut tok = self.make_token(raw, start, interner, problems);
                    tok.flags = flags;
                    return tok;
                }
            }
        }
    }

    /// Significant tokens up to the end of the current line; the newline is
    /// consumed. Returns the tokens and the offset where the line ends.
    /// With `header`, a leading `<...>` is read as one header-name token.
    pub(crate) fn read_line(
        &mut self,
        interner: &StringInterner,
        problems: &mut Vec<Diagnostic>,
        header: bool,
    ) -> (Vec<Token>, u32) {
        let mut tokens = Vec::new();
        let mut flags = TokenFlags::EMPTY;
        loop {
            let (raw, start) = if header && tokens.is_empty() {
                self.raw_header()
            } else {
                self.raw()
            };
            match raw.tag {
                RawTag::Eof => {
                    self.at_line_start = true;
                    return (tokens, start);
                }
                RawTag::Newline => {
                    self.at_line_start = true;
                    return (tokens, start);
                }
                RawTag::UnterminatedComment => {
                    problems.push(self.problem(ErrorCode::L0003, start, raw.len, "unterminated comment"));
                    self.at_line_start = true;
                    return (tokens, start + raw.len);
                }
                tag if tag.is_trivia() => flags.set(TokenFlags::LEADING_SPACE),
                _ => {
                    let mut tok = self.make_token(raw, start, interner, problems);
                    tok.flags = flags;
                    flags = TokenFlags::EMPTY;
                    tokens.push(tok);
                }
            }
        }
    }

    /// First significant token of a directive line, or `None` for a null
    /// directive (whose newline is then consumed).
    pub(crate) fn directive_name(
        &mut self,
        interner: &StringInterner,
        problems: &mut Vec<Diagnostic>,
    ) -> Option<Token> {
        loop {
            let (raw, start) = self.raw();
            match raw.tag {
                RawTag::Eof | RawTag::Newline => {
                    self.at_line_start = true;
                    return None;
                }
                tag if tag.is_trivia() => {}
                _ => return Some(self.make_token(raw, start, interner, problems)),
            }
        }
    }

    /// Discard the rest of the current line. Returns the offset where it ends.
    pub(crate) fn skip_line(&mut self) -> u32 {
        loop {
            let (raw, start) = self.raw();
            if matches!(raw.tag, RawTag::Eof | RawTag::Newline) {
                self.at_line_start = true;
                return start;
            }
        }
    }

    /// Skip text until a `#` that begins a line. Returns its offset, with the
    /// lexer positioned just after it, or `None` at end of file.
    pub(crate) fn skip_to_directive(&mut self) -> Option<u32> {
        let mut line_start = self.at_line_start;
        loop {
            let (raw, start) = self.raw();
            match raw.tag {
                RawTag::Eof => {
                    self.at_line_start = true;
                    return None;
                }
                RawTag::Newline => line_start = true,
                tag if tag.is_trivia() => {}
                RawTag::Punct if line_start && self.text(start, raw.len) == "#" => {
                    self.at_line_start = false;
                    return Some(start);
                }
                _ => line_start = false,
            }
        }
    }

    /// Current byte offset.
    #[inline]
    pub(crate) fn pos(&self) -> u32 {
        self.pos
    }

    fn make_token(
        &self,
        raw: RawToken,
        start: u32,
        interner: &StringInterner,
        problems: &mut Vec<Diagnostic>,
    ) -> Token {
        let text = self.text(start, raw.len);
        let kind = match raw.tag {
            RawTag::UnterminatedString => {
                problems.push(self.problem(ErrorCode::L0001, start, raw.len, "missing terminating `\"`"));
                TokenKind::StringLiteral
            }
            RawTag::UnterminatedChar => {
                problems.push(self.problem(ErrorCode::L0002, start, raw.len, "missing terminating `'`"));
                TokenKind::CharLiteral
            }
            RawTag::Other => {
                problems.push(self.problem(
                    ErrorCode::L0004,
                    start,
                    raw.len,
                    format!("stray `{text}` in program"),
                ));
                TokenKind::Other
            }
            tag => classify(tag, text),
        };
        Token::new(kind, interner.intern(text), Span::new(start, start + raw.len), self.file)
    }

    fn problem(&self, code: ErrorCode, start: u32, len: u32, message: impl Into<String>) -> Diagnostic {
        let message = message.into();
        Diagnostic::error(code)
            .with_message(message.clone())
            .in_file(self.file)
            .with_label(Span::new(start, start + len), message)
    }
}

/// Token kind of a raw token with spelling `text`.
pub(crate) fn classify(tag: RawTag, text: &str) -> TokenKind {
    match tag {
        RawTag::Ident => TokenKind::Ident,
        RawTag::Number => classify_number(text),
        RawTag::CharLit | RawTag::UnterminatedChar => TokenKind::CharLiteral,
        RawTag::StringLit | RawTag::UnterminatedString | RawTag::HeaderName => {
            TokenKind::StringLiteral
        }
        RawTag::Punct => Punct::from_spelling(text).map_or(TokenKind::Other, TokenKind::Punct),
        RawTag::Other
        | RawTag::Whitespace
        | RawTag::Newline
        | RawTag::LineComment
        | RawTag::BlockComment
        | RawTag::UnterminatedComment
        | RawTag::Eof => TokenKind::Other,
    }
}

/// Integer or floating literal, decided by the pp-number's spelling.
pub(crate) fn classify_number(text: &str) -> TokenKind {
    let bytes = text.as_bytes();
    let hex = bytes.len() > 1 && bytes[0] == b'0' && matches!(bytes[1], b'x' | b'X');
    let float = if hex {
        bytes.iter().any(|&b| matches!(b, b'.' | b'p' | b'P'))
    } else {
        bytes.iter().any(|&b| matches!(b, b'.' | b'e' | b'E'))
    };
    if float {
        TokenKind::FloatLiteral
    } else {
        TokenKind::IntLiteral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex_all(source: &str) -> (Vec<(TokenKind, String, u8)>, Vec<Diagnostic>) {
        let interner = StringInterner::new();
        let mut lexer = FileLexer::new(FileId::MAIN, PathBuf::from("t.c"), source);
        let mut problems = Vec::new();
        let mut out = Vec::new();
        loop {
            let tok = lexer.next(&interner, &mut problems);
            if tok.is_eof() {
                break;
            }
            out.push((tok.kind, interner.lookup(tok.text).to_owned(), tok.flags.bits()));
        }
        (out, problems)
    }

    #[test]
    fn flags_track_lines_and_spaces() {
        let (tokens, problems) = lex_all("a b\n  c");
        let ls = TokenFlags::LEADING_SPACE;
        let start = TokenFlags::LINE_START;
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Ident, "a".to_owned(), start),
                (TokenKind::Ident, "b".to_owned(), ls),
                (TokenKind::Ident, "c".to_owned(), ls | start),
            ]
        );
        assert!(problems.is_empty());
    }

    #[test]
    fn numbers_are_classified() {
        assert_eq!(classify_number("42u"), TokenKind::IntLiteral);
        assert_eq!(classify_number("0xE"), TokenKind::IntLiteral);
        assert_eq!(classify_number("0x1p3"), TokenKind::FloatLiteral);
        assert_eq!(classify_number("1e5"), TokenKind::FloatLiteral);
        assert_eq!(classify_number(".5f"), TokenKind::FloatLiteral);
    }

    #[test]
    fn lexical_problems_are_reported() {
        let (tokens, problems) = lex_all("\"abc\n'x\n@");
        assert_eq!(tokens.len(), 3);
        let codes: Vec<_> = problems.iter().map(|p| p.code).collect();
        assert_eq!(codes, vec![ErrorCode::L0001, ErrorCode::L0002, ErrorCode::L0004]);
    }

    #[test]
    fn read_line_stops_at_newline() {
        let interner = StringInterner::new();
        let mut problems = Vec::new();
        let mut lexer = FileLexer::new(FileId::MAIN, PathBuf::from("t.c"), "#include <a/b.h> // x\nnext");
        let hash = lexer.next(&interner, &mut problems);
        assert!(hash.is_punct(Punct::Hash));
        assert!(hash.flags.is_line_start());
        let (toks, _) = lexer.read_line(&interner, &mut problems, false);
        assert_eq!(interner.lookup(toks[0].text), "include");
        assert_eq!(toks.len(), 8);

        let mut lexer = FileLexer::new(FileId::MAIN, PathBuf::from("t.c"), " <a/b.h> // x\nnext");
        let (toks, end) = lexer.read_line(&interner, &mut problems, true);
        assert_eq!(toks.len(), 1);
        assert_eq!(interner.lookup(toks[0].text), "<a/b.h>");
        assert_eq!(end, 13);
        let next = lexer.next(&interner, &mut problems);
        assert!(next.flags.is_line_start());
    }

    #[test]
    fn skip_to_directive_ignores_inner_hashes() {
        let mut lexer = FileLexer::new(
            FileId::MAIN,
            PathBuf::from("t.c"),
            "a # b\n\"#x\"\n  # endif\n",
        );
        let at = lexer.skip_to_directive();
        assert_eq!(at, Some(13));
        assert_eq!(lexer.skip_to_directive(), None);
    }
}
