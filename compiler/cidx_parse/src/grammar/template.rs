//! Template declarations, explicit specializations and explicit
//! instantiations.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{DeclId, DeclKind, NameId, NameNode, TemplateDecl, TemplateParam, TemplateParamKind};
use cidx_ir::{FileId, Keyword, Punct, Span, TokenKind};

use super::ty::DeclaratorKind;
use super::DeclScope;
use crate::context::ParseContext;
use crate::error::PResult;
use crate::Parser;

impl Parser<'_> {
    /// `template<...> decl`, `template<> decl` or `template decl;`.
    pub(crate) fn parse_template_declaration(&mut self, scope: DeclScope) -> PResult<Vec<DeclId>> {
        let keyword = self.cursor.advance();
        let file = keyword.file;

        if !self.cursor.check(Punct::Lt) {
            let inner = self.parse_declaration(scope)?;
            let span = self.span_from(keyword.span);
            return Ok(inner
                .into_iter()
                .map(|decl| self.alloc_decl(DeclKind::ExplicitInstantiation(decl), span, file))
                .collect());
        }

        let params = self.parse_template_params()?;
        let inner = self.parse_declaration(scope)?;
        if params.is_empty() {
            for &decl in &inner {
                if let Some(name) = self.declared_name(decl) {
                    let text = self.name_text(name);
                    let span = self.arena.name(name).span;
                    self.notify(|r| r.accept_template_specialization(&text, file, span));
                }
            }
        }
        let span = self.span_from(keyword.span);
        Ok(inner
            .into_iter()
            .map(|decl| {
                let template = TemplateDecl {
                    params: params.clone(),
                    decl,
                };
                self.alloc_decl(DeclKind::Template(template), span, file)
            })
            .collect())
    }

    /// Name introduced by a class, function or variable declaration.
    fn declared_name(&self, decl: DeclId) -> Option<NameId> {
        match &self.arena.decl(decl).kind {
            DeclKind::Class(class) => class.name,
            DeclKind::Function(function) => Some(function.name),
            DeclKind::Variable(variable) => Some(variable.name),
            _ => None,
        }
    }

    /// `< param, ... >`; empty for `template<>`.
    fn parse_template_params(&mut self) -> PResult<Vec<TemplateParam>> {
        self.expect(Punct::Lt)?;
        self.with_context(ParseContext::NO_GT, |p| {
            let mut params = Vec::new();
            if p.cursor.eat_closing_angle() {
                return Ok(params);
            }
            loop {
                params.push(p.parse_template_param()?);
                if p.cursor.eat(Punct::Comma) {
                    continue;
                }
                if p.cursor.eat_closing_angle() {
                    return Ok(params);
                }
                return Err(p.unexpected(ErrorCode::E2001, "`>`"));
            }
        })
    }

    fn parse_template_param(&mut self) -> PResult<TemplateParam> {
        let start = self.cursor.current();
        let file = start.file;

        // Template template parameter: `template<class> class C`.
        if self.cursor.check_keyword(Keyword::Template) {
            self.cursor.advance();
            self.parse_template_params()?;
            if !(self.cursor.eat_keyword(Keyword::Class) || self.cursor.eat_keyword(Keyword::Typename)) {
                return Err(self.unexpected(ErrorCode::E2001, "`class`"));
            }
            return self.finish_type_param(start.span, file);
        }

        let type_param = match start.kind {
            TokenKind::Keyword(Keyword::Class) => true,
            // `typename T::type N` is a non-type parameter.
            TokenKind::Keyword(Keyword::Typename) => {
                !(self.cursor.peek(1).kind == TokenKind::Ident && self.cursor.peek(2).is_punct(Punct::ColonColon))
            }
            _ => false,
        };
        if type_param {
            self.cursor.advance();
            return self.finish_type_param(start.span, file);
        }

        let spec = self.parse_decl_specifiers(DeclScope::Param)?;
        if spec.base.is_none() {
            return Err(self.unexpected(ErrorCode::E2006, "template parameter"));
        }
        let declarator = self.parse_declarator(DeclaratorKind::Either)?;
        let default = if self.cursor.eat(Punct::Assign) {
            Some(self.parse_conditional_expr()?)
        } else {
            None
        };
        Ok(TemplateParam {
            kind: TemplateParamKind::NonType {
                ty: spec.type_with(declarator.ops),
                default,
            },
            name: declarator.name,
            span: self.span_from(start.span),
        })
    }

    /// Rest of `typename [...] [T] [= Default]` after the keyword.
    fn finish_type_param(&mut self, start: Span, file: FileId) -> PResult<TemplateParam> {
        self.cursor.eat(Punct::Ellipsis);
        let name = if self.cursor.check_ident() {
            let ident = self.cursor.advance();
            Some(self.arena.alloc_name(NameNode::simple(ident.text, ident.span, file)))
        } else {
            None
        };
        let default = if self.cursor.eat(Punct::Assign) {
            Some(self.parse_type_id()?)
        } else {
            None
        };
        Ok(TemplateParam {
            kind: TemplateParamKind::Type { default },
            name,
            span: self.span_from(start),
        })
    }
}
