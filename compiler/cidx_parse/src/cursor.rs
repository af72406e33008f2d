//! Token cursor over a pull-based token source.
//!
//! Tokens are pulled lazily and kept in a buffer for the whole parse, so the
//! parser can look ahead arbitrarily and snapshots are plain positions. The
//! cursor also owns two pieces of stream surgery:
//!
//! - splitting `>>` into two `>` when it closes nested template argument
//!   lists (undone when a snapshot is restored)
//! - cutting the stream at the completion caret

use cidx_ir::{CancellationToken, FileId, Keyword, Punct, SharedInterner, Span, Token, TokenKind};
use tracing::trace;

use crate::TokenSource;
use cidx_preprocess::SourceElementRequestor;

/// Where a completion parse reached the caret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CaretHit {
    /// Buffer index of the synthetic end-of-file placed at the caret.
    pub index: usize,
    pub prefix: String,
    pub offset: u32,
}

pub(crate) struct Cursor<'s> {
    source: &'s mut dyn TokenSource,
    interner: SharedInterner,
    cancel: CancellationToken,
    tokens: Vec<Token>,
    pos: usize,
    /// An end-of-file token is the last buffered token.
    exhausted: bool,
    canceled: bool,
    caret: Option<u32>,
    hit: Option<CaretHit>,
    /// `>>` tokens split in place: buffer index and original token.
    splits: Vec<(usize, Token)>,
}

impl<'s> Cursor<'s> {
    pub fn new(source: &'s mut dyn TokenSource, cancel: CancellationToken, caret: Option<u32>) -> Self {
        let interner = source.interner();
        Cursor {
            source,
            interner,
            cancel,
            tokens: Vec::new(),
            pos: 0,
            exhausted: false,
            canceled: false,
            caret,
            hit: None,
            splits: Vec::new(),
        }
    }

    #[inline]
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Spelling of a token.
    #[inline]
    pub fn text(&self, token: &Token) -> &'static str {
        self.interner.lookup(token.text)
    }

    pub fn requestor(&mut self) -> Option<&mut (dyn SourceElementRequestor + 'static)> {
        self.source.requestor()
    }

    /// True once cancellation has been observed. Sticky.
    pub fn is_canceled(&mut self) -> bool {
        if !self.canceled && self.cancel.is_canceled() {
            self.canceled = true;
        }
        self.canceled
    }

    pub fn caret_hit(&self) -> Option<&CaretHit> {
        self.hit.as_ref()
    }

    /// Buffered tokens up to (not including) `end`.
    pub fn buffered(&self, end: usize) -> &[Token] {
        &self.tokens[..end.min(self.tokens.len())]
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn split_count(&self) -> usize {
        self.splits.len()
    }

    /// Move back to `pos` and undo `>>` splits made after the snapshot.
    pub fn rewind(&mut self, pos: usize, splits: usize) {
        debug_assert!(pos <= self.tokens.len(), "cursor rewound past buffered tokens");
        while self.splits.len() > splits {
            if let Some((index, original)) = self.splits.pop() {
                self.tokens[index] = original;
            }
        }
        self.pos = pos;
    }

    fn pull(&mut self) {
        if self.exhausted {
            return;
        }
        let next = if self.cancel.is_canceled() {
            None
        } else {
            self.source.next_token().ok()
        };
        let token = match next {
            Some(token) => token,
            None => {
                self.canceled = true;
                let offset = self.tokens.last().map_or(0, |t| t.span.end);
                Token::eof(FileId::MAIN, offset)
            }
        };
        let token = self.check_caret(token);
        if token.is_eof() {
            self.exhausted = true;
        }
        self.tokens.push(token);
    }

    /// Replace the first main-file token at or past the caret with an
    /// end-of-file, remembering the identifier prefix it cut through.
    fn check_caret(&mut self, token: Token) -> Token {
        let Some(offset) = self.caret else {
            return token;
        };
        if self.hit.is_some() {
            return token;
        }
        let in_main = token.file == FileId::MAIN;
        let cuts_ident = in_main
            && token.kind == TokenKind::Ident
            && token.span.start < offset
            && offset <= token.span.end;
        if !(token.is_eof() || cuts_ident || (in_main && token.span.start >= offset)) {
            return token;
        }
        let prefix = if cuts_ident {
            let text = self.interner.lookup(token.text);
            let len = (offset - token.span.start) as usize;
            text.get(..len).unwrap_or(text).to_owned()
        } else {
            String::new()
        };
        trace!(offset, prefix = %prefix, "completion caret reached");
        self.hit = Some(CaretHit {
            index: self.tokens.len(),
            prefix,
            offset,
        });
        Token::eof(FileId::MAIN, offset)
    }

    fn fill(&mut self, index: usize) {
        while self.tokens.len() <= index && !self.exhausted {
            self.pull();
        }
    }

    /// Token `n` positions ahead; the end-of-file token repeats forever.
    pub fn peek(&mut self, n: usize) -> Token {
        let index = self.pos + n;
        self.fill(index);
        self.tokens
            .get(index)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or_else(|| Token::eof(FileId::MAIN, 0))
    }

    #[inline]
    pub fn current(&mut self) -> Token {
        self.peek(0)
    }

    /// Consume the current token. End-of-file is never consumed.
    pub fn advance(&mut self) -> Token {
        let token = self.current();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    pub fn previous(&self) -> Option<Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).copied()
    }

    /// Span of the last consumed token, or an empty span at the current one.
    pub fn previous_span(&mut self) -> Span {
        match self.previous() {
            Some(t) => t.span,
            None => Span::point(self.current().span.start),
        }
    }

    #[inline]
    pub fn check(&mut self, p: Punct) -> bool {
        self.current().is_punct(p)
    }

    #[inline]
    pub fn check_keyword(&mut self, kw: Keyword) -> bool {
        self.current().is_keyword(kw)
    }

    #[inline]
    pub fn check_ident(&mut self) -> bool {
        self.current().kind == TokenKind::Ident
    }

    /// Current token is an identifier spelled `text`.
    pub fn check_ident_text(&mut self, text: &str) -> bool {
        let token = self.current();
        token.kind == TokenKind::Ident && self.text(&token) == text
    }

    #[inline]
    pub fn is_at_end(&mut self) -> bool {
        self.current().is_eof()
    }

    pub fn eat(&mut self, p: Punct) -> bool {
        if self.check(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume one `>` closing a template argument list, splitting `>>`.
    pub fn eat_closing_angle(&mut self) -> bool {
        let token = self.current();
        if token.is_punct(Punct::Gt) {
            self.advance();
            return true;
        }
        if token.is_punct(Punct::Shr) {
            let rest_text = self.interner.intern(">");
            let mut rest = token;
            rest.kind = TokenKind::Punct(Punct::Gt);
            rest.text = rest_text;
            if !token.is_expanded() {
                rest.span = Span::new(token.span.start.saturating_add(1), token.span.end);
            }
            self.splits.push((self.pos, token));
            self.tokens[self.pos] = rest;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::tests::VecSource;

    #[test]
    fn peek_repeats_eof() {
        let mut source = VecSource::new("a b");
        let mut cursor = Cursor::new(&mut source, CancellationToken::new(), None);
        assert_eq!(cursor.peek(1).kind, TokenKind::Ident);
        assert!(cursor.peek(2).is_eof());
        assert!(cursor.peek(7).is_eof());
        cursor.advance();
        cursor.advance();
        assert!(cursor.advance().is_eof());
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn split_is_undone_on_rewind() {
        let mut source = VecSource::new("a >> b");
        let mut cursor = Cursor::new(&mut source, CancellationToken::new(), None);
        cursor.advance();
        let (pos, splits) = (cursor.position(), cursor.split_count());
        assert!(cursor.eat_closing_angle());
        assert!(cursor.current().is_punct(Punct::Gt));
        assert_eq!(cursor.current().span, Span::new(3, 4));
        assert!(cursor.eat_closing_angle());
        assert_eq!(cursor.current().kind, TokenKind::Ident);
        cursor.rewind(pos, splits);
        assert!(cursor.current().is_punct(Punct::Shr));
    }

    #[test]
    fn caret_cuts_identifier() {
        let mut source = VecSource::new("foo.barbaz x");
        let mut cursor = Cursor::new(&mut source, CancellationToken::new(), Some(7));
        assert_eq!(cursor.peek(0).kind, TokenKind::Ident);
        assert!(cursor.peek(1).is_punct(Punct::Dot));
        assert!(cursor.peek(2).is_eof());
        let hit = cursor.caret_hit().unwrap();
        assert_eq!(hit.prefix, "bar");
        assert_eq!(hit.index, 2);
    }

    #[test]
    fn cancellation_ends_the_stream() {
        let cancel = CancellationToken::new();
        let mut source = VecSource::new("a b c");
        let mut cursor = Cursor::new(&mut source, cancel.clone(), None);
        cursor.advance();
        cancel.cancel();
        assert!(cursor.peek(1).is_eof());
        assert!(cursor.is_canceled());
    }
}
