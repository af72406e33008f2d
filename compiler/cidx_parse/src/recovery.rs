//! Error recovery for the parser.
//!
//! After a syntax error the parser skips to the next declaration or
//! statement boundary. Skipping keeps bracket depth so that a `;` inside a
//! skipped `( ... )` or `{ ... }` does not end recovery early, and it never
//! consumes the `}` that closes the enclosing body.

use cidx_ir::{Punct, TokenKind};

use crate::cursor::Cursor;

/// A set of punctuators as a bitset, for O(1) membership tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PunctSet(u64);

impl PunctSet {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn with(self, p: Punct) -> Self {
        Self(self.0 | (1u64 << (p as u8)))
    }

    #[inline]
    pub const fn contains(self, p: Punct) -> bool {
        (self.0 & (1u64 << (p as u8))) != 0
    }

    pub fn contains_kind(self, kind: TokenKind) -> bool {
        matches!(kind, TokenKind::Punct(p) if self.contains(p))
    }
}

/// Tokens that may follow a complete expression; an expression missing
/// before one of these is reported without consuming anything.
pub const EXPR_FOLLOW: PunctSet = PunctSet::new()
    .with(Punct::Semi)
    .with(Punct::RParen)
    .with(Punct::RBracket)
    .with(Punct::RBrace)
    .with(Punct::Comma)
    .with(Punct::Colon);

/// Tokens after a `>` that confirm a template-id in expression context.
pub const TEMPLATE_ID_FOLLOW: PunctSet = PunctSet::new()
    .with(Punct::LParen)
    .with(Punct::ColonColon)
    .with(Punct::Semi)
    .with(Punct::Comma)
    .with(Punct::RParen)
    .with(Punct::RBracket)
    .with(Punct::RBrace)
    .with(Punct::LBrace)
    .with(Punct::Dot)
    .with(Punct::Arrow)
    .with(Punct::Assign)
    .with(Punct::Gt)
    .with(Punct::Shr)
    .with(Punct::EqEq)
    .with(Punct::Ne)
    .with(Punct::AmpAmp)
    .with(Punct::PipePipe)
    .with(Punct::Question)
    .with(Punct::Colon);

/// Skip to just past the next `;` at bracket depth zero, or to just past a
/// `{ ... }` group that closes at depth zero, or to the `}` that closes the
/// enclosing body (not consumed).
///
/// Returns the number of tokens skipped.
pub fn synchronize(cursor: &mut Cursor<'_>) -> usize {
    let mut depth = 0usize;
    let mut skipped = 0;
    loop {
        let token = cursor.current();
        match token.kind {
            TokenKind::Eof => return skipped,
            TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
            TokenKind::Punct(Punct::RParen | Punct::RBracket) => depth = depth.saturating_sub(1),
            TokenKind::Punct(Punct::RBrace) => {
                if depth == 0 {
                    return skipped;
                }
                depth -= 1;
                if depth == 0 {
                    cursor.advance();
                    return skipped + 1;
                }
            }
            TokenKind::Punct(Punct::Semi) if depth == 0 => {
                cursor.advance();
                return skipped + 1;
            }
            _ => {}
        }
        cursor.advance();
        skipped += 1;
    }
}

/// Skip a balanced bracket group starting at the current opener. Returns
/// false when end of file came first.
pub fn skip_balanced(cursor: &mut Cursor<'_>) -> bool {
    let mut depth = 0usize;
    loop {
        let token = cursor.advance();
        match token.kind {
            TokenKind::Eof => return false,
            TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
            TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::tests::VecSource;
    use cidx_ir::CancellationToken;

    fn skip_from(text: &str) -> (usize, String) {
        let mut source = VecSource::new(text);
        let mut cursor = Cursor::new(&mut source, CancellationToken::new(), None);
        let skipped = synchronize(&mut cursor);
        let rest = cursor.current();
        (skipped, cursor.text(&rest).to_owned())
    }

    #[test]
    fn punct_set_membership() {
        assert!(EXPR_FOLLOW.contains(Punct::Semi));
        assert!(!EXPR_FOLLOW.contains(Punct::Plus));
        let set = PunctSet::new().with(Punct::Plus).with(Punct::Comma);
        assert!(set.contains(Punct::Plus));
        assert!(!set.contains(Punct::Semi));
        assert!(set.contains_kind(TokenKind::Punct(Punct::Comma)));
        assert!(!set.contains_kind(TokenKind::Ident));
    }

    #[test]
    fn stops_after_semicolon_outside_brackets() {
        assert_eq!(skip_from("a ( ; ) b ; next"), (6, "next".to_owned()));
    }

    #[test]
    fn stops_after_closed_brace_group() {
        assert_eq!(skip_from("x { a ; } next"), (5, "next".to_owned()));
    }

    #[test]
    fn leaves_enclosing_brace() {
        assert_eq!(skip_from("x y } z"), (2, "}".to_owned()));
    }

    #[test]
    fn balanced_group() {
        let mut source = VecSource::new("( a [ b ] ) c");
        let mut cursor = Cursor::new(&mut source, CancellationToken::new(), None);
        assert!(skip_balanced(&mut cursor));
        assert_eq!(cursor.position(), 6);
        let mut source = VecSource::new("( a");
        let mut cursor = Cursor::new(&mut source, CancellationToken::new(), None);
        assert!(!skip_balanced(&mut cursor));
    }
}
