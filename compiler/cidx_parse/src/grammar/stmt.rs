//! Statements.
//!
//! A statement starting with an identifier or `::` is first tried as a
//! declaration and, if that fails, reparsed as an expression statement.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{DeclKind, ExprId, Handler, Initializer, NameNode, StmtId, StmtKind, VariableDecl};
use cidx_ir::stack::ensure_sufficient_stack;
use cidx_ir::{Keyword, Name, Punct, Span, Token, TokenKind};

use super::ty::DeclaratorKind;
use super::DeclScope;
use crate::context::ParseContext;
use crate::error::{PResult, ParseError};
use crate::recovery::synchronize;
use crate::Parser;

/// Keywords that can only begin a declaration in a block.
fn starts_declaration(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::Class
            | Keyword::Struct
            | Keyword::Union
            | Keyword::Enum
            | Keyword::Typedef
            | Keyword::Static
            | Keyword::Extern
            | Keyword::Const
            | Keyword::Volatile
            | Keyword::Register
            | Keyword::Auto
            | Keyword::Inline
            | Keyword::Using
            | Keyword::Namespace
            | Keyword::Template
            | Keyword::Mutable
            | Keyword::Restrict
            | Keyword::Void
            | Keyword::Bool
            | Keyword::Char
            | Keyword::WcharT
            | Keyword::Short
            | Keyword::Int
            | Keyword::Long
            | Keyword::Signed
            | Keyword::Unsigned
            | Keyword::Float
            | Keyword::Double
    )
}

impl Parser<'_> {
    /// `{ stmt* }`
    pub(crate) fn parse_compound_statement(&mut self) -> PResult<StmtId> {
        let open = self.expect(Punct::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            if self.halted() || self.cursor.check(Punct::RBrace) {
                break;
            }
            let before = self.cursor.position();
            stmts.push(self.parse_statement());
            if self.cursor.position() == before && !self.halted() && !self.cursor.check(Punct::RBrace) {
                self.cursor.advance();
            }
        }
        self.close_body(&open);
        let span = self.span_from(open.span);
        Ok(self.alloc_stmt(StmtKind::Compound(stmts), span))
    }

    /// One statement. Errors become a problem statement.
    pub(crate) fn parse_statement(&mut self) -> StmtId {
        ensure_sufficient_stack(|| match self.parse_statement_inner() {
            Ok(stmt) => stmt,
            Err(err) => self.recover_statement(&err),
        })
    }

    fn recover_statement(&mut self, err: &ParseError) -> StmtId {
        let problem = self.report(err);
        synchronize(&mut self.cursor);
        let span = self.span_from(err.span);
        self.alloc_stmt(StmtKind::Problem(problem), span)
    }

    fn parse_statement_inner(&mut self) -> PResult<StmtId> {
        let token = self.cursor.current();
        let start = token.span;
        match token.kind {
            TokenKind::Punct(Punct::LBrace) => self.parse_compound_statement(),
            TokenKind::Punct(Punct::Semi) => {
                self.cursor.advance();
                Ok(self.alloc_stmt(StmtKind::Empty, start))
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.cursor.advance();
                let value = if self.cursor.check(Punct::Semi) {
                    None
                } else if self.cursor.check(Punct::LBrace) {
                    Some(self.parse_braced_expr()?)
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(Punct::Semi)?;
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::Return(value), span))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(start),
            TokenKind::Keyword(Keyword::While) => {
                self.cursor.advance();
                let cond = self.parse_paren_condition()?;
                let body = self.parse_statement();
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::While { cond, body }, span))
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.cursor.advance();
                let body = self.parse_statement();
                if !self.cursor.eat_keyword(Keyword::While) {
                    return Err(self.unexpected(ErrorCode::E2001, "`while`"));
                }
                let cond = self.parse_paren_condition()?;
                self.expect(Punct::Semi)?;
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::DoWhile { body, cond }, span))
            }
            TokenKind::Keyword(Keyword::For) => self.parse_for(start),
            TokenKind::Keyword(Keyword::Switch) => {
                self.cursor.advance();
                let cond = self.parse_paren_condition()?;
                let body = self.parse_statement();
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::Switch { cond, body }, span))
            }
            TokenKind::Keyword(Keyword::Case) => {
                self.cursor.advance();
                let value = self.parse_conditional_expr()?;
                if self.cursor.eat(Punct::Ellipsis) {
                    // GNU case range `case 1 ... 5:`
                    self.parse_conditional_expr()?;
                }
                self.expect(Punct::Colon)?;
                let body = self.parse_labeled_body();
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::Case { value: Some(value), body }, span))
            }
            TokenKind::Keyword(Keyword::Default) => {
                self.cursor.advance();
                self.expect(Punct::Colon)?;
                let body = self.parse_labeled_body();
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::Case { value: None, body }, span))
            }
            TokenKind::Keyword(Keyword::Break) => self.parse_jump(start, StmtKind::Break),
            TokenKind::Keyword(Keyword::Continue) => self.parse_jump(start, StmtKind::Continue),
            TokenKind::Keyword(Keyword::Goto) => {
                self.cursor.advance();
                let label = self.cursor.current();
                if label.kind != TokenKind::Ident {
                    return Err(self.unexpected(ErrorCode::E2005, "label"));
                }
                self.cursor.advance();
                self.expect(Punct::Semi)?;
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::Goto(label.text), span))
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try(start),
            TokenKind::Ident if self.cursor.peek(1).is_punct(Punct::Colon) => {
                self.cursor.advance();
                self.cursor.advance();
                let body = self.parse_labeled_body();
                let span = self.span_from(start);
                Ok(self.alloc_stmt(StmtKind::Label { label: token.text, body }, span))
            }
            TokenKind::Keyword(kw) if starts_declaration(kw) => self.parse_declaration_statement(),
            TokenKind::Ident | TokenKind::Punct(Punct::ColonColon) => self.parse_ambiguous_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_jump(&mut self, start: Span, kind: StmtKind) -> PResult<StmtId> {
        self.cursor.advance();
        self.expect(Punct::Semi)?;
        let span = self.span_from(start);
        Ok(self.alloc_stmt(kind, span))
    }

    /// Statement after a label; a label directly before `}` labels an empty
    /// statement.
    fn parse_labeled_body(&mut self) -> StmtId {
        if self.cursor.check(Punct::RBrace) {
            let span = Span::point(self.cursor.current().span.start);
            return self.alloc_stmt(StmtKind::Empty, span);
        }
        self.parse_statement()
    }

    fn parse_declaration_statement(&mut self) -> PResult<StmtId> {
        let start = self.cursor.current().span;
        let decls = self.parse_declaration(DeclScope::Block)?;
        let span = self.span_from(start);
        Ok(self.alloc_stmt(StmtKind::Decl(decls), span))
    }

    /// Declaration if it parses as one, else an expression statement.
    fn parse_ambiguous_statement(&mut self) -> PResult<StmtId> {
        let start = self.cursor.current().span;
        if let Some(decls) = self.try_parse(|p| p.parse_declaration(DeclScope::Block).ok()) {
            let span = self.span_from(start);
            return Ok(self.alloc_stmt(StmtKind::Decl(decls), span));
        }
        self.parse_expression_statement()
    }

    fn parse_expression_statement(&mut self) -> PResult<StmtId> {
        let start = self.cursor.current().span;
        let expr = self.parse_expression()?;
        self.expect(Punct::Semi)?;
        let span = self.span_from(start);
        Ok(self.alloc_stmt(StmtKind::Expr(expr), span))
    }

    fn parse_if(&mut self, start: Span) -> PResult<StmtId> {
        self.cursor.advance();
        if self.cursor.check_ident_text("constexpr") {
            self.cursor.advance();
        }
        let cond = self.parse_paren_condition()?;
        let then_branch = self.parse_statement();
        let else_branch = if self.cursor.eat_keyword(Keyword::Else) {
            Some(self.parse_statement())
        } else {
            None
        };
        let span = self.span_from(start);
        Ok(self.alloc_stmt(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    /// `( condition )`. A declaration condition (`if (T* p = f())`)
    /// contributes its initializer as the condition.
    fn parse_paren_condition(&mut self) -> PResult<ExprId> {
        let open = self.expect(Punct::LParen)?;
        let cond = self.without_context(ParseContext::NO_GT, |p| {
            let declared = p.try_parse(|p| {
                let spec = p.parse_decl_specifiers(DeclScope::Block).ok()?;
                spec.base.as_ref()?;
                p.parse_declarator(DeclaratorKind::Named).ok()?;
                if !p.cursor.eat(Punct::Assign) {
                    return None;
                }
                p.parse_assignment_expr().ok()
            });
            match declared {
                Some(init) => Ok(init),
                None => p.parse_expression(),
            }
        })?;
        self.expect_closing(&open, Punct::RParen)?;
        Ok(cond)
    }

    /// `for (init; cond; step) body` or `for (decl : range) body`.
    fn parse_for(&mut self, start: Span) -> PResult<StmtId> {
        self.cursor.advance();
        let open = self.expect(Punct::LParen)?;
        let saved = self.context;
        self.context = self.context.without(ParseContext::NO_GT);
        let result = self.parse_for_header(start, &open);
        self.context = saved;
        result
    }

    fn parse_for_header(&mut self, start: Span, open: &Token) -> PResult<StmtId> {
        let range_decl = self.try_parse(|p| {
            let spec = p.parse_decl_specifiers(DeclScope::Block).ok()?;
            spec.base.as_ref()?;
            let declarator = p.parse_declarator(DeclaratorKind::Named).ok()?;
            p.cursor.check(Punct::Colon).then_some((spec, declarator))
        });
        if let Some((spec, declarator)) = range_decl {
            let decl_start = spec.span;
            let Some(name) = declarator.name else {
                return Err(self.unexpected(ErrorCode::E2005, "identifier"));
            };
            self.cursor.advance();
            let range = if self.cursor.check(Punct::LBrace) {
                self.parse_braced_expr()?
            } else {
                self.parse_assignment_expr()?
            };
            let decl_span = self.span_from(decl_start);
            let variable = VariableDecl {
                name,
                ty: spec.type_with(declarator.ops),
                specifiers: spec.specifiers,
                init: Some(Initializer::Assign(range)),
                bits: None,
            };
            let decl = self.alloc_decl(DeclKind::Variable(variable), decl_span, spec.file);
            let init = self.alloc_stmt(StmtKind::Decl(vec![decl]), decl_span);
            self.expect_closing(open, Punct::RParen)?;
            let body = self.parse_statement();
            let span = self.span_from(start);
            return Ok(self.alloc_stmt(
                StmtKind::For {
                    init: Some(init),
                    cond: None,
                    step: None,
                    body,
                },
                span,
            ));
        }

        let init = if self.cursor.eat(Punct::Semi) {
            None
        } else if matches!(self.cursor.current().kind, TokenKind::Keyword(kw) if starts_declaration(kw)) {
            Some(self.parse_declaration_statement()?)
        } else if self.at_name_start() {
            Some(self.parse_ambiguous_statement()?)
        } else {
            Some(self.parse_expression_statement()?)
        };
        let cond = if self.cursor.check(Punct::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Punct::Semi)?;
        let step = if self.cursor.check(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_closing(open, Punct::RParen)?;
        let body = self.parse_statement();
        let span = self.span_from(start);
        Ok(self.alloc_stmt(StmtKind::For { init, cond, step, body }, span))
    }

    /// `try { } catch (T e) { } catch (...) { }`
    fn parse_try(&mut self, start: Span) -> PResult<StmtId> {
        self.cursor.advance();
        let body = self.parse_compound_statement()?;
        let mut handlers = Vec::new();
        while self.cursor.check_ident_text("catch") {
            self.cursor.advance();
            let open = self.expect(Punct::LParen)?;
            let param = if self.cursor.eat(Punct::Ellipsis) {
                None
            } else {
                let param_start = self.cursor.current().span;
                let spec = self.parse_decl_specifiers(DeclScope::Param)?;
                if spec.base.is_none() {
                    return Err(self.unexpected(ErrorCode::E2006, "exception type"));
                }
                let declarator = self.parse_declarator(DeclaratorKind::Either)?;
                // An unnamed handler parameter still records its type.
                let name = match declarator.name {
                    Some(name) => name,
                    None => self
                        .arena
                        .alloc_name(NameNode::simple(Name::EMPTY, declarator.span, spec.file)),
                };
                let span = self.span_from(param_start);
                let variable = VariableDecl {
                    name,
                    ty: spec.type_with(declarator.ops),
                    specifiers: spec.specifiers,
                    init: None,
                    bits: None,
                };
                Some(self.alloc_decl(DeclKind::Variable(variable), span, spec.file))
            };
            self.expect_closing(&open, Punct::RParen)?;
            let body = self.parse_compound_statement()?;
            handlers.push(Handler { param, body });
        }
        if handlers.is_empty() {
            return Err(self.unexpected(ErrorCode::E2001, "`catch`"));
        }
        let span = self.span_from(start);
        Ok(self.alloc_stmt(StmtKind::Try { body, handlers }, span))
    }
}
