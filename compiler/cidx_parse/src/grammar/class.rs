//! Class and enum specifiers.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{Access, BaseSpec, ClassDecl, ClassKey, DeclId, DeclKind, EnumDecl, Enumerator, NameNode};
use cidx_ir::{Keyword, Name, Punct, TokenKind};

use super::DeclScope;
use crate::error::PResult;
use crate::Parser;

impl Parser<'_> {
    /// `class X : public B { ... }` or the elaborated `class X`. Returns the
    /// class node and whether it had a body.
    pub(crate) fn parse_class_specifier(&mut self) -> PResult<(DeclId, bool)> {
        let keyword = self.cursor.advance();
        let file = keyword.file;
        let key = match keyword.kind {
            TokenKind::Keyword(Keyword::Class) => ClassKey::Class,
            TokenKind::Keyword(Keyword::Union) => ClassKey::Union,
            _ => ClassKey::Struct,
        };
        self.skip_attributes();
        let name = if self.at_name_start() {
            Some(self.parse_name(true)?)
        } else {
            None
        };
        if self.cursor.check_ident_text("final") {
            self.cursor.advance();
        }

        let has_body = self.cursor.check(Punct::LBrace) || self.cursor.check(Punct::Colon);
        if !has_body {
            if name.is_none() {
                return Err(self.unexpected(ErrorCode::E2005, "class name"));
            }
            let span = self.span_from(keyword.span);
            let class = ClassDecl {
                key,
                name,
                bases: Vec::new(),
                members: Vec::new(),
                is_definition: false,
            };
            return Ok((self.alloc_decl(DeclKind::Class(class), span, file), false));
        }

        let bases = if self.cursor.eat(Punct::Colon) {
            self.parse_base_clause()?
        } else {
            Vec::new()
        };
        let open = self.expect(Punct::LBrace)?;

        let text = name.map(|n| self.name_text(n));
        let announce_span = name.map_or(keyword.span, |n| self.arena.name(n).span);
        self.notify(|r| r.enter_class(text.as_deref(), key, file, announce_span));
        let simple_name = name.map_or(Name::EMPTY, |n| self.arena.name(n).last.ident);
        self.class_names.push(simple_name);
        let members = self.parse_declaration_seq(DeclScope::Class, true);
        self.class_names.pop();
        self.close_body(&open);
        self.notify(|r| r.exit_class());

        let span = self.span_from(keyword.span);
        let class = ClassDecl {
            key,
            name,
            bases,
            members,
            is_definition: true,
        };
        Ok((self.alloc_decl(DeclKind::Class(class), span, file), true))
    }

    fn parse_base_clause(&mut self) -> PResult<Vec<BaseSpec>> {
        let mut bases = Vec::new();
        loop {
            let start = self.cursor.current().span;
            let mut access = None;
            let mut is_virtual = false;
            loop {
                let token = self.cursor.current();
                match token.kind {
                    TokenKind::Keyword(Keyword::Public) => access = Some(Access::Public),
                    TokenKind::Keyword(Keyword::Protected) => access = Some(Access::Protected),
                    TokenKind::Keyword(Keyword::Private) => access = Some(Access::Private),
                    TokenKind::Keyword(Keyword::Virtual) => is_virtual = true,
                    _ => break,
                }
                self.cursor.advance();
            }
            let name = self.parse_name(true)?;
            self.cursor.eat(Punct::Ellipsis);
            let span = self.span_from(start);
            bases.push(BaseSpec {
                name,
                access,
                is_virtual,
                span,
            });
            if !self.cursor.eat(Punct::Comma) {
                return Ok(bases);
            }
        }
    }

    /// `enum [class] E [: T] { A, B = 2 }` or an opaque/elaborated `enum E`.
    pub(crate) fn parse_enum_specifier(&mut self) -> PResult<(DeclId, bool)> {
        let keyword = self.cursor.advance();
        let file = keyword.file;
        let scoped = self.cursor.eat_keyword(Keyword::Class) || self.cursor.eat_keyword(Keyword::Struct);
        self.skip_attributes();
        let name = if self.at_name_start() {
            Some(self.parse_name(true)?)
        } else {
            None
        };
        let underlying = if self.cursor.eat(Punct::Colon) {
            Some(self.parse_type_id()?)
        } else {
            None
        };

        if !self.cursor.check(Punct::LBrace) {
            if name.is_none() {
                return Err(self.unexpected(ErrorCode::E2005, "enum name"));
            }
            let span = self.span_from(keyword.span);
            let decl = EnumDecl {
                name,
                scoped,
                underlying,
                enumerators: Vec::new(),
                is_definition: false,
            };
            return Ok((self.alloc_decl(DeclKind::Enum(decl), span, file), false));
        }

        let open = self.cursor.advance();
        let mut enumerators = Vec::new();
        while !self.cursor.check(Punct::RBrace) && !self.cursor.is_at_end() {
            let token = self.cursor.current();
            if token.kind != TokenKind::Ident {
                return Err(self.unexpected(ErrorCode::E2005, "enumerator"));
            }
            self.cursor.advance();
            let name = self.arena.alloc_name(NameNode::simple(token.text, token.span, token.file));
            self.skip_attributes();
            let value = if self.cursor.eat(Punct::Assign) {
                Some(self.parse_conditional_expr()?)
            } else {
                None
            };
            let text = self.cursor.text(&token);
            self.notify(|r| r.accept_enumerator(text, token.file, token.span));
            enumerators.push(Enumerator { name, value });
            if !self.cursor.eat(Punct::Comma) {
                break;
            }
        }
        self.expect_closing(&open, Punct::RBrace)?;

        let span = self.span_from(keyword.span);
        let decl = EnumDecl {
            name,
            scoped,
            underlying,
            enumerators,
            is_definition: true,
        };
        Ok((self.alloc_decl(DeclKind::Enum(decl), span, file), true))
    }
}
