//! Qualified names, template-ids and operator function names.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{NameId, NameNode, NameSegment, SegmentKind, TemplateArg};
use cidx_ir::{Keyword, Punct, TokenKind};

use crate::context::ParseContext;
use crate::error::PResult;
use crate::recovery::TEMPLATE_ID_FOLLOW;
use crate::Parser;

impl Parser<'_> {
    /// Current token can begin an id-expression or a type name.
    pub(crate) fn at_name_start(&mut self) -> bool {
        let token = self.cursor.current();
        match token.kind {
            TokenKind::Ident | TokenKind::Keyword(Keyword::Operator) => true,
            TokenKind::Punct(Punct::ColonColon) => {
                let next = self.cursor.peek(1);
                matches!(
                    next.kind,
                    TokenKind::Ident
                        | TokenKind::Keyword(Keyword::Operator | Keyword::Template)
                        | TokenKind::Punct(Punct::Tilde)
                )
            }
            _ => false,
        }
    }

    /// Parse a possibly qualified name.
    ///
    /// With `as_type` a `<` after an identifier always opens a template
    /// argument list; otherwise the list is kept only when the token after
    /// it confirms a template-id.
    pub(crate) fn parse_name(&mut self, as_type: bool) -> PResult<NameId> {
        let start = self.cursor.current();
        let global = self.cursor.eat(Punct::ColonColon);
        let mut qualifier = Vec::new();
        let last = loop {
            let segment = self.parse_name_segment(as_type)?;
            let continues = segment.kind == SegmentKind::Identifier
                && self.cursor.check(Punct::ColonColon)
                && matches!(
                    self.cursor.peek(1).kind,
                    TokenKind::Ident
                        | TokenKind::Keyword(Keyword::Operator | Keyword::Template)
                        | TokenKind::Punct(Punct::Tilde)
                );
            if !continues {
                break segment;
            }
            self.cursor.advance();
            self.cursor.eat_keyword(Keyword::Template);
            qualifier.push(segment);
        };
        let span = self.span_from(start.span);
        Ok(self.arena.alloc_name(NameNode {
            global,
            qualifier,
            last,
            span,
            file: start.file,
        }))
    }

    fn parse_name_segment(&mut self, as_type: bool) -> PResult<NameSegment> {
        let token = self.cursor.current();
        match token.kind {
            TokenKind::Punct(Punct::Tilde) if self.cursor.peek(1).kind == TokenKind::Ident => {
                self.cursor.advance();
                let ident = self.cursor.advance();
                Ok(NameSegment {
                    ident: ident.text,
                    kind: SegmentKind::Destructor,
                    template_args: None,
                    span: token.span.merge(ident.span),
                })
            }
            TokenKind::Keyword(Keyword::Operator) => {
                self.cursor.advance();
                let spelling = self.parse_operator_spelling()?;
                let span = self.span_from(token.span);
                Ok(NameSegment {
                    ident: self.intern(&spelling),
                    kind: SegmentKind::Operator,
                    template_args: None,
                    span,
                })
            }
            TokenKind::Ident => {
                self.cursor.advance();
                let template_args = if self.cursor.check(Punct::Lt) {
                    self.try_template_args(as_type)
                } else {
                    None
                };
                let span = self.span_from(token.span);
                Ok(NameSegment {
                    ident: token.text,
                    kind: SegmentKind::Identifier,
                    template_args,
                    span,
                })
            }
            _ => Err(self.unexpected(ErrorCode::E2005, "identifier")),
        }
    }

    /// Spelling of an operator function name after `operator`:
    /// `operator+`, `operator()`, `operator new[]`, `operator const char*`.
    fn parse_operator_spelling(&mut self) -> PResult<String> {
        let token = self.cursor.current();
        match token.kind {
            TokenKind::Keyword(kw @ (Keyword::New | Keyword::Delete)) => {
                self.cursor.advance();
                let word = if kw == Keyword::New { "new" } else { "delete" };
                if self.cursor.check(Punct::LBracket) && self.cursor.peek(1).is_punct(Punct::RBracket) {
                    self.cursor.advance();
                    self.cursor.advance();
                    return Ok(format!("operator {word}[]"));
                }
                Ok(format!("operator {word}"))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.cursor.advance();
                self.expect(Punct::RParen)?;
                Ok("operator()".to_owned())
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.cursor.advance();
                self.expect(Punct::RBracket)?;
                Ok("operator[]".to_owned())
            }
            TokenKind::Punct(p) => {
                self.cursor.advance();
                Ok(format!("operator{}", p.as_str()))
            }
            _ => {
                // Conversion function: spell the type as written.
                let from = self.cursor.position();
                self.skip_conversion_type()?;
                let to = self.cursor.position();
                let mut spelling = "operator".to_owned();
                for t in &self.cursor.buffered(to)[from..] {
                    if !matches!(t.kind, TokenKind::Punct(_)) {
                        spelling.push(' ');
                    }
                    spelling.push_str(self.cursor.text(t));
                }
                Ok(spelling)
            }
        }
    }

    /// Speculatively parse `<...>` after a name.
    pub(crate) fn try_template_args(&mut self, as_type: bool) -> Option<Vec<TemplateArg>> {
        self.try_parse(|p| {
            let args = p.parse_template_args().ok()?;
            if as_type {
                return Some(args);
            }
            let next = p.cursor.current();
            let closes_outer = matches!(next.kind, TokenKind::Punct(Punct::Gt | Punct::Shr));
            let confirmed = next.is_eof()
                || TEMPLATE_ID_FOLLOW.contains_kind(next.kind) && (!closes_outer || p.context.gt_closes());
            confirmed.then_some(args)
        })
    }

    /// `< arg, ... >`, splitting a closing `>>` when lists nest.
    pub(crate) fn parse_template_args(&mut self) -> PResult<Vec<TemplateArg>> {
        self.expect(Punct::Lt)?;
        self.with_context(ParseContext::NO_GT, |p| {
            let mut args = Vec::new();
            if p.cursor.eat_closing_angle() {
                return Ok(args);
            }
            loop {
                args.push(p.parse_template_arg()?);
                p.cursor.eat(Punct::Ellipsis);
                if p.cursor.eat(Punct::Comma) {
                    continue;
                }
                if p.cursor.eat_closing_angle() {
                    return Ok(args);
                }
                return Err(p.unexpected(ErrorCode::E2001, "`>`"));
            }
        })
    }

    fn parse_template_arg(&mut self) -> PResult<TemplateArg> {
        let ty = self.try_parse(|p| {
            let ty = p.parse_type_id().ok()?;
            let next = p.cursor.current();
            matches!(
                next.kind,
                TokenKind::Punct(Punct::Comma | Punct::Gt | Punct::Shr | Punct::Ellipsis)
            )
            .then_some(ty)
        });
        if let Some(ty) = ty {
            return Ok(TemplateArg::Type(ty));
        }
        Ok(TemplateArg::Expr(self.parse_conditional_expr()?))
    }
}
