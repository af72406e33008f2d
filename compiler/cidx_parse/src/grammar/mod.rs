//! Grammar productions, one file per area.
//!
//! Every production is an `impl Parser` block. Productions return
//! [`PResult`](crate::error::PResult); the declaration and statement loops
//! are the only places that turn errors into problem nodes.

mod class;
mod decl;
mod expr;
mod name;
mod stmt;
mod template;
mod ty;

pub(crate) use decl::DeclScope;

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{Decl, DeclId, DeclKind, Expr, ExprId, ExprKind, NameId, SegmentKind, Stmt, StmtId, StmtKind};
use cidx_ir::{FileId, Name, Punct, Span, Token, TokenKind};

use crate::error::{PResult, ParseError};
use crate::recovery::skip_balanced;
use crate::Parser;

impl Parser<'_> {
    fn describe(&self, token: &Token) -> String {
        if token.is_eof() {
            "end of file".to_owned()
        } else {
            format!("`{}`", self.cursor.text(token))
        }
    }

    /// `expected {what}, found ...` at the current token.
    pub(crate) fn unexpected(&mut self, code: ErrorCode, what: &str) -> ParseError {
        let token = self.cursor.current();
        let found = self.describe(&token);
        ParseError::at(code, format!("expected {what}, found {found}"), &token)
    }

    pub(crate) fn expect(&mut self, p: Punct) -> PResult<Token> {
        if self.cursor.check(p) {
            Ok(self.cursor.advance())
        } else {
            Err(self.unexpected(ErrorCode::E2001, &format!("`{}`", p.as_str())))
        }
    }

    /// Consume the closer matching `open`.
    pub(crate) fn expect_closing(&mut self, open: &Token, close: Punct) -> PResult<Token> {
        if self.cursor.check(close) {
            return Ok(self.cursor.advance());
        }
        if self.cursor.is_at_end() {
            let opener = self.cursor.text(open);
            return Err(ParseError::at(ErrorCode::E2004, format!("unclosed `{opener}`"), open)
                .with_context("opened here"));
        }
        Err(self.unexpected(ErrorCode::E2001, &format!("`{}`", close.as_str())))
    }

    /// Consume the `}` of a body whose contents were already parsed. A
    /// missing brace is reported but does not discard the body.
    pub(crate) fn close_body(&mut self, open: &Token) {
        if let Err(err) = self.expect_closing(open, Punct::RBrace) {
            self.report(&err);
        }
    }

    pub(crate) fn intern(&self, text: &str) -> Name {
        self.cursor.interner().intern(text)
    }

    pub(crate) fn alloc_decl(&mut self, kind: DeclKind, span: Span, file: FileId) -> DeclId {
        self.arena.alloc_decl(Decl { kind, span, file })
    }

    pub(crate) fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.arena.alloc_stmt(Stmt { kind, span })
    }

    pub(crate) fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.arena.alloc_expr(Expr { kind, span })
    }

    /// Qualified spelling of a name without template arguments, for
    /// requestor callbacks: `::a::B::~B`.
    pub(crate) fn name_text(&self, id: NameId) -> String {
        let name = self.arena.name(id);
        let interner = self.cursor.interner();
        let mut out = String::new();
        if name.global {
            out.push_str("::");
        }
        for (i, seg) in name.segments().enumerate() {
            if i > 0 {
                out.push_str("::");
            }
            if seg.kind == SegmentKind::Destructor {
                out.push('~');
            }
            out.push_str(interner.lookup(seg.ident));
        }
        out
    }

    /// Skip `[[...]]`, `__attribute__((...))`, `__declspec(...)` and
    /// `alignas(...)`. Returns true if anything was skipped.
    pub(crate) fn skip_attributes(&mut self) -> bool {
        let mut skipped = false;
        loop {
            let token = self.cursor.current();
            let is_attr = match token.kind {
                TokenKind::Punct(Punct::LBracket) => self.cursor.peek(1).is_punct(Punct::LBracket),
                TokenKind::Ident => {
                    matches!(
                        self.cursor.text(&token),
                        "__attribute__" | "__attribute" | "__declspec" | "alignas" | "_Alignas" | "__asm__" | "__asm"
                    ) && self.cursor.peek(1).is_punct(Punct::LParen)
                }
                _ => false,
            };
            if !is_attr {
                return skipped;
            }
            if token.kind == TokenKind::Ident {
                self.cursor.advance();
            }
            skip_balanced(&mut self.cursor);
            skipped = true;
        }
    }
}
