//! Completion context at the caret.
//!
//! The cursor cuts the token stream at the caret; what precedes the cut
//! decides whether the user is completing a member access, a qualified name
//! or a plain identifier.

use cidx_ir::ast::{CompletionContext, CompletionNode};
use cidx_ir::{Name, Punct, Token, TokenKind};

use crate::Parser;

/// Classify the tokens immediately before the caret.
pub(crate) fn completion_context(before: &[Token]) -> CompletionContext {
    let Some(last) = before.last() else {
        return CompletionContext::Unqualified;
    };
    if last.is_punct(Punct::Dot) || last.is_punct(Punct::Arrow) {
        let object = before
            .len()
            .checked_sub(2)
            .map(|i| before[i])
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text);
        return CompletionContext::MemberAccess {
            object,
            arrow: last.is_punct(Punct::Arrow),
        };
    }
    if !last.is_punct(Punct::ColonColon) {
        return CompletionContext::Unqualified;
    }
    let mut qualifier: Vec<Name> = Vec::new();
    let mut global = false;
    let mut end = before.len();
    while end >= 1 && before[end - 1].is_punct(Punct::ColonColon) {
        match end.checked_sub(2).map(|i| before[i]) {
            Some(t) if t.kind == TokenKind::Ident => {
                qualifier.push(t.text);
                end -= 2;
            }
            _ => {
                global = true;
                break;
            }
        }
    }
    qualifier.reverse();
    CompletionContext::Qualified { global, qualifier }
}

impl Parser<'_> {
    pub(crate) fn completion_node(&self) -> Option<CompletionNode> {
        let hit = self.cursor.caret_hit()?;
        let before = self.cursor.buffered(hit.index);
        Some(CompletionNode {
            prefix: hit.prefix.clone(),
            offset: hit.offset,
            context: completion_context(before),
        })
    }
}
