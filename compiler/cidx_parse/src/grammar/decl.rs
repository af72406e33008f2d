//! Declarations: the declaration loop, simple declarations, functions,
//! namespaces, linkage specifications and `using`.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{
    Access, BaseType, DeclId, DeclKind, DeclSpecifiers, FunctionBody, FunctionDecl, Initializer, MemberInit, NameId,
    NameNode, NamespaceDecl, TypeOp, TypeSpec, VariableDecl,
};
use cidx_ir::stack::ensure_sufficient_stack;
use cidx_ir::{FileId, Keyword, Punct, Span, TokenKind};

use super::ty::{DeclSpec, Declarator, DeclaratorKind, FunctionSuffix};
use crate::context::ParseContext;
use crate::error::{PResult, ParseError};
use crate::recovery::{skip_balanced, synchronize};
use crate::{ParseMode, Parser};

/// Where a declaration appears. Decides constructor detection, bit-fields
/// and access labels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DeclScope {
    Namespace,
    Class,
    Block,
    Param,
}

impl Parser<'_> {
    /// Declarations up to end of file, or up to the closing `}` when
    /// `nested`.
    pub(crate) fn parse_declaration_seq(&mut self, scope: DeclScope, nested: bool) -> Vec<DeclId> {
        let mut decls = Vec::new();
        loop {
            if self.halted() {
                break;
            }
            if self.cursor.check(Punct::RBrace) {
                if nested {
                    break;
                }
                let err = self.unexpected(ErrorCode::E2003, "declaration");
                self.report(&err);
                self.cursor.advance();
                continue;
            }
            let before = self.cursor.position();
            match self.parse_declaration(scope) {
                Ok(ids) => decls.extend(ids),
                Err(err) => decls.push(self.recover_declaration(&err)),
            }
            if self.cursor.position() == before && !self.halted() && !self.cursor.check(Punct::RBrace) {
                self.cursor.advance();
            }
        }
        decls
    }

    fn recover_declaration(&mut self, err: &ParseError) -> DeclId {
        let problem = self.report(err);
        synchronize(&mut self.cursor);
        let span = self.span_from(err.span);
        self.alloc_decl(DeclKind::Problem(problem), span, err.file)
    }

    /// One declaration. A simple declaration with several declarators
    /// yields several nodes.
    pub(crate) fn parse_declaration(&mut self, scope: DeclScope) -> PResult<Vec<DeclId>> {
        ensure_sufficient_stack(|| self.parse_declaration_inner(scope))
    }

    fn parse_declaration_inner(&mut self, scope: DeclScope) -> PResult<Vec<DeclId>> {
        self.skip_attributes();
        let token = self.cursor.current();
        let file = token.file;
        match token.kind {
            TokenKind::Punct(Punct::Semi) => {
                self.cursor.advance();
                Ok(vec![self.alloc_decl(DeclKind::Empty, token.span, file)])
            }
            TokenKind::Keyword(Keyword::Namespace) => self.parse_namespace(false).map(|id| vec![id]),
            TokenKind::Keyword(Keyword::Inline) if self.cursor.peek(1).is_keyword(Keyword::Namespace) => {
                self.cursor.advance();
                self.parse_namespace(true).map(|id| vec![id])
            }
            TokenKind::Keyword(Keyword::Using) => self.parse_using().map(|id| vec![id]),
            TokenKind::Keyword(Keyword::Template) => self.parse_template_declaration(scope),
            TokenKind::Keyword(Keyword::Extern) => {
                let next = self.cursor.peek(1);
                if next.kind == TokenKind::StringLiteral {
                    self.parse_linkage(scope).map(|id| vec![id])
                } else if next.is_keyword(Keyword::Template) {
                    self.cursor.advance();
                    self.parse_template_declaration(scope)
                } else {
                    self.parse_simple_declaration(scope)
                }
            }
            TokenKind::Keyword(Keyword::Public | Keyword::Protected | Keyword::Private)
                if scope == DeclScope::Class && self.cursor.peek(1).is_punct(Punct::Colon) =>
            {
                let access = match token.kind {
                    TokenKind::Keyword(Keyword::Public) => Access::Public,
                    TokenKind::Keyword(Keyword::Protected) => Access::Protected,
                    _ => Access::Private,
                };
                self.cursor.advance();
                self.cursor.advance();
                let span = self.span_from(token.span);
                Ok(vec![self.alloc_decl(DeclKind::Access(access), span, file)])
            }
            TokenKind::Ident => match self.cursor.text(&token) {
                "static_assert" | "_Static_assert" | "asm" | "__asm__" | "__asm"
                    if self.cursor.peek(1).is_punct(Punct::LParen) =>
                {
                    self.cursor.advance();
                    skip_balanced(&mut self.cursor);
                    self.expect(Punct::Semi)?;
                    let span = self.span_from(token.span);
                    Ok(vec![self.alloc_decl(DeclKind::Empty, span, file)])
                }
                _ => self.parse_simple_declaration(scope),
            },
            _ => self.parse_simple_declaration(scope),
        }
    }

    /// Specifiers followed by a comma-separated list of declarators.
    pub(crate) fn parse_simple_declaration(&mut self, scope: DeclScope) -> PResult<Vec<DeclId>> {
        let start = self.cursor.current().span;
        let spec = self.parse_decl_specifiers(scope)?;
        let file = spec.file;

        if self.cursor.check(Punct::Semi) {
            if scope == DeclScope::Block && spec.tag.is_none() && matches!(spec.base, Some(BaseType::Named(_))) {
                // `x;` in a block is an expression statement.
                return Err(self.unexpected(ErrorCode::E2005, "identifier"));
            }
            self.cursor.advance();
            let span = self.span_from(start);
            return Ok(match spec.tag {
                Some(tag) if !spec.specifiers.contains(DeclSpecifiers::FRIEND) => vec![tag],
                _ => vec![self.alloc_decl(DeclKind::Empty, span, file)],
            });
        }
        if scope == DeclScope::Class && self.cursor.check(Punct::Colon) {
            // Unnamed bit-field.
            self.cursor.advance();
            self.parse_conditional_expr()?;
            self.expect(Punct::Semi)?;
            let span = self.span_from(start);
            return Ok(vec![self.alloc_decl(DeclKind::Empty, span, file)]);
        }
        if spec.is_empty() {
            let at_declarator = self.at_name_start()
                || matches!(
                    self.cursor.current().kind,
                    TokenKind::Punct(Punct::Tilde | Punct::Star | Punct::Amp | Punct::AmpAmp | Punct::LParen)
                );
            if scope == DeclScope::Block || !at_declarator {
                return Err(self.unexpected(ErrorCode::E2003, "declaration"));
            }
        }

        let mut out = Vec::new();
        if let Some(tag) = spec.tag.filter(|_| spec.tag_defines) {
            out.push(tag);
        }
        loop {
            let declarator = self.parse_declarator(DeclaratorKind::Named)?;
            let (id, has_body) = self.finish_declaration(&spec, declarator, scope, start)?;
            out.push(id);
            if has_body {
                return Ok(out);
            }
            if !self.cursor.eat(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::Semi)?;
        Ok(out)
    }

    /// Build the node for one declarator, consuming its initializer or
    /// function body. Returns whether a function body ended the declaration.
    fn finish_declaration(
        &mut self,
        spec: &DeclSpec,
        declarator: Declarator,
        scope: DeclScope,
        start: Span,
    ) -> PResult<(DeclId, bool)> {
        let file = spec.file;
        let Some(name) = declarator.name else {
            return Err(self.unexpected(ErrorCode::E2005, "identifier"));
        };
        let name_span = self.arena.name(name).span;
        let mut specifiers = spec.specifiers;
        if self.extern_c {
            specifiers |= DeclSpecifiers::EXTERN_C;
        }

        if spec.is_typedef {
            let ty = spec.type_with(declarator.ops);
            let text = self.name_text(name);
            self.notify(|r| r.accept_typedef(&text, file, name_span));
            let span = self.span_from(start);
            return Ok((self.alloc_decl(DeclKind::Typedef { name, ty }, span, file), false));
        }

        if let Some(function) = declarator.function {
            return self.finish_function(spec, specifiers, name, declarator.ops, function, start);
        }

        let bits = if scope == DeclScope::Class && self.cursor.eat(Punct::Colon) {
            Some(self.parse_conditional_expr()?)
        } else {
            None
        };
        let init = self.parse_initializer()?;
        let text = self.name_text(name);
        self.notify(|r| r.accept_variable(&text, file, name_span));
        let span = self.span_from(start);
        let variable = VariableDecl {
            name,
            ty: spec.type_with(declarator.ops),
            specifiers,
            init,
            bits,
        };
        Ok((self.alloc_decl(DeclKind::Variable(variable), span, file), false))
    }

    fn finish_function(
        &mut self,
        spec: &DeclSpec,
        specifiers: DeclSpecifiers,
        name: NameId,
        ops: Vec<TypeOp>,
        function: FunctionSuffix,
        start: Span,
    ) -> PResult<(DeclId, bool)> {
        let file = spec.file;
        let name_span = self.arena.name(name).span;
        let ret = match (&spec.base, function.trailing) {
            (_, Some(trailing)) => Some(trailing),
            (None, None) => None,
            (Some(_), None) => Some(spec.type_with(ops)),
        };
        let text = self.name_text(name);
        self.notify(|r| r.accept_function_declaration(&text, file, name_span));

        let mut body = FunctionBody::None;
        let mut inits = Vec::new();
        if self.cursor.eat(Punct::Assign) {
            let token = self.cursor.current();
            body = if self.cursor.eat_keyword(Keyword::Delete) {
                FunctionBody::Deleted
            } else if self.cursor.eat_keyword(Keyword::Default) {
                FunctionBody::Defaulted
            } else if token.kind == TokenKind::IntLiteral && self.cursor.text(&token) == "0" {
                self.cursor.advance();
                FunctionBody::Pure
            } else {
                return Err(self.unexpected(ErrorCode::E2001, "`0`, `delete` or `default`"));
            };
        } else {
            let function_try = self.cursor.eat_keyword(Keyword::Try);
            if self.cursor.check(Punct::Colon) {
                inits = self.parse_member_inits()?;
            }
            if self.cursor.check(Punct::LBrace) {
                body = self.parse_function_body(&text, file)?;
                if function_try {
                    self.skip_handlers();
                }
            } else if !inits.is_empty() || function_try {
                return Err(self.unexpected(ErrorCode::E2001, "`{`"));
            }
        }

        let has_body = matches!(body, FunctionBody::Skipped(_) | FunctionBody::Parsed(_));
        let span = self.span_from(start);
        let decl = FunctionDecl {
            name,
            ret,
            params: function.params,
            variadic: function.variadic,
            cv: function.cv,
            specifiers,
            inits,
            body,
        };
        Ok((self.alloc_decl(DeclKind::Function(decl), span, file), has_body))
    }

    /// `: base(args), member{args}`
    fn parse_member_inits(&mut self) -> PResult<Vec<MemberInit>> {
        self.expect(Punct::Colon)?;
        let mut inits = Vec::new();
        loop {
            let name = self.parse_name(true)?;
            let args = if self.cursor.check(Punct::LBrace) {
                self.parse_braced_list()?
            } else {
                self.parse_call_args()?
            };
            self.cursor.eat(Punct::Ellipsis);
            inits.push(MemberInit { name, args });
            if !self.cursor.eat(Punct::Comma) {
                return Ok(inits);
            }
        }
    }

    /// `{ ... }` of a function definition: skipped in structural mode,
    /// parsed as a block otherwise.
    fn parse_function_body(&mut self, name: &str, file: FileId) -> PResult<FunctionBody> {
        let open = self.cursor.current();
        self.notify(|r| r.enter_function_body(name, file, open.span));
        let body = match self.mode {
            ParseMode::Structural => {
                skip_balanced(&mut self.cursor);
                Ok(FunctionBody::Skipped(self.span_from(open.span)))
            }
            ParseMode::Complete | ParseMode::Completion { .. } => {
                let saved = std::mem::take(&mut self.class_names);
                let body = self.with_context(ParseContext::IN_BLOCK, Parser::parse_compound_statement);
                self.class_names = saved;
                body.map(FunctionBody::Parsed)
            }
        };
        self.notify(|r| r.exit_function_body());
        body
    }

    /// `catch (...) { }` clauses after a function-try-block.
    fn skip_handlers(&mut self) {
        while self.cursor.check_ident_text("catch") {
            self.cursor.advance();
            skip_balanced(&mut self.cursor);
            if self.cursor.check(Punct::LBrace) {
                skip_balanced(&mut self.cursor);
            }
        }
    }

    /// `= expr`, `= {..}`, `(args)` or `{..}`.
    pub(crate) fn parse_initializer(&mut self) -> PResult<Option<Initializer>> {
        if self.cursor.eat(Punct::Assign) {
            if self.cursor.check(Punct::LBrace) {
                return Ok(Some(Initializer::Braced(self.parse_braced_list()?)));
            }
            return Ok(Some(Initializer::Assign(self.parse_assignment_expr()?)));
        }
        if self.cursor.check(Punct::LParen) {
            return Ok(Some(Initializer::Construct(self.parse_call_args()?)));
        }
        if self.cursor.check(Punct::LBrace) {
            return Ok(Some(Initializer::Braced(self.parse_braced_list()?)));
        }
        Ok(None)
    }

    /// `namespace a { }`, `namespace a::b { }`, `namespace { }` or the
    /// alias `namespace a = b::c;`.
    fn parse_namespace(&mut self, is_inline: bool) -> PResult<DeclId> {
        let keyword = self.cursor.advance();
        let file = keyword.file;
        if self.cursor.check_ident() && self.cursor.peek(1).is_punct(Punct::Assign) {
            let ident = self.cursor.advance();
            self.cursor.advance();
            let name = self.arena.alloc_name(NameNode::simple(ident.text, ident.span, file));
            let target = self.parse_name(true)?;
            self.expect(Punct::Semi)?;
            let span = self.span_from(keyword.span);
            let ty = TypeSpec::named(target);
            return Ok(self.alloc_decl(DeclKind::Alias { name, ty }, span, file));
        }

        let mut names = Vec::new();
        while self.cursor.check_ident() {
            let ident = self.cursor.advance();
            names.push(self.arena.alloc_name(NameNode::simple(ident.text, ident.span, file)));
            if !self.cursor.eat(Punct::ColonColon) {
                break;
            }
            self.cursor.eat_keyword(Keyword::Inline);
        }
        self.skip_attributes();
        let open = self.expect(Punct::LBrace)?;

        for &name in &names {
            let text = self.name_text(name);
            let span = self.arena.name(name).span;
            self.notify(|r| r.enter_namespace(Some(&text), file, span));
        }
        if names.is_empty() {
            self.notify(|r| r.enter_namespace(None, file, keyword.span));
        }
        let body = self.parse_declaration_seq(DeclScope::Namespace, true);
        self.close_body(&open);
        for _ in 0..names.len().max(1) {
            self.notify(|r| r.exit_namespace());
        }

        let span = self.span_from(keyword.span);
        let Some((&innermost, outer)) = names.split_last() else {
            let ns = NamespaceDecl {
                name: None,
                is_inline,
                body,
            };
            return Ok(self.alloc_decl(DeclKind::Namespace(ns), span, file));
        };
        let mut id = self.alloc_decl(
            DeclKind::Namespace(NamespaceDecl {
                name: Some(innermost),
                is_inline,
                body,
            }),
            span,
            file,
        );
        for &name in outer.iter().rev() {
            let ns = NamespaceDecl {
                name: Some(name),
                is_inline: false,
                body: vec![id],
            };
            id = self.alloc_decl(DeclKind::Namespace(ns), span, file);
        }
        Ok(id)
    }

    /// `extern "C" { ... }` or `extern "C" decl`.
    fn parse_linkage(&mut self, scope: DeclScope) -> PResult<DeclId> {
        let keyword = self.cursor.advance();
        let literal = self.cursor.advance();
        let quoted = self.cursor.text(&literal);
        let language = self.intern(quoted.trim_matches('"'));
        let saved = self.extern_c;
        self.extern_c = quoted.trim_matches('"') == "C";
        let body = if self.cursor.check(Punct::LBrace) {
            let open = self.cursor.advance();
            let body = self.parse_declaration_seq(scope, true);
            self.close_body(&open);
            Ok(body)
        } else {
            self.parse_declaration(scope)
        };
        self.extern_c = saved;
        let body = body?;
        let span = self.span_from(keyword.span);
        Ok(self.alloc_decl(DeclKind::LinkageSpec { language, body }, span, keyword.file))
    }

    /// `using namespace N;`, `using X = T;` or `using N::x;`.
    fn parse_using(&mut self) -> PResult<DeclId> {
        let keyword = self.cursor.advance();
        let file = keyword.file;
        let kind = if self.cursor.eat_keyword(Keyword::Namespace) {
            DeclKind::UsingDirective(self.parse_name(true)?)
        } else if self.cursor.check_ident() && self.alias_follows() {
            let ident = self.cursor.advance();
            let name = self.arena.alloc_name(NameNode::simple(ident.text, ident.span, file));
            self.skip_attributes();
            self.expect(Punct::Assign)?;
            let ty = self.parse_type_id()?;
            DeclKind::Alias { name, ty }
        } else {
            self.cursor.eat_keyword(Keyword::Typename);
            DeclKind::UsingDeclaration(self.parse_name(true)?)
        };
        self.expect(Punct::Semi)?;
        let span = self.span_from(keyword.span);
        Ok(self.alloc_decl(kind, span, file))
    }

    /// Identifier, optional attributes, then `=`.
    fn alias_follows(&mut self) -> bool {
        self.look_ahead(|p| {
            p.cursor.advance();
            p.skip_attributes();
            p.cursor.check(Punct::Assign)
        })
    }
}
