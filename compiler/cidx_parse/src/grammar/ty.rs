//! Declaration specifiers, declarators and type-ids.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{BaseType, BuiltinType, CvQualifiers, DeclId, DeclSpecifiers, NameId, Param, SegmentKind, TypeOp, TypeSpec};
use cidx_ir::{FileId, Keyword, Punct, Span, TokenKind};

use super::DeclScope;
use crate::context::ParseContext;
use crate::error::PResult;
use crate::recovery::skip_balanced;
use crate::Parser;

/// The specifier part of a declaration, before any declarator.
#[derive(Clone, Debug)]
pub(crate) struct DeclSpec {
    pub specifiers: DeclSpecifiers,
    pub is_typedef: bool,
    /// `None` when no type was written (constructors, destructors,
    /// conversion functions, C implicit int).
    pub base: Option<BaseType>,
    pub cv: CvQualifiers,
    /// Class or enum specifier appearing in the specifiers.
    pub tag: Option<DeclId>,
    /// Whether `tag` has a body (or is a bare `struct X;`).
    pub tag_defines: bool,
    pub span: Span,
    pub file: FileId,
}

impl DeclSpec {
    /// Nothing at all was written.
    pub fn is_empty(&self) -> bool {
        self.base.is_none() && self.specifiers.is_empty() && !self.is_typedef && self.cv.is_empty()
    }

    /// The declared type with declarator operators applied. A missing base
    /// is `int`.
    pub fn type_with(&self, ops: Vec<TypeOp>) -> TypeSpec {
        TypeSpec {
            base: self.base.clone().unwrap_or(BaseType::Builtin(BuiltinType::Int)),
            cv: self.cv,
            ops,
        }
    }
}

/// Builtin type words seen so far, folded once the run ends.
#[derive(Default, Debug)]
struct BuiltinWords {
    signed: bool,
    unsigned: bool,
    short: bool,
    longs: u8,
    base: Option<Keyword>,
    any: bool,
}

impl BuiltinWords {
    fn add(&mut self, kw: Keyword) {
        self.any = true;
        match kw {
            Keyword::Signed => self.signed = true,
            Keyword::Unsigned => self.unsigned = true,
            Keyword::Short => self.short = true,
            Keyword::Long => self.longs = self.longs.saturating_add(1),
            other => self.base = Some(other),
        }
    }

    fn fold(&self) -> Option<BuiltinType> {
        if !self.any {
            return None;
        }
        let u = self.unsigned;
        Some(match self.base {
            Some(Keyword::Void) => BuiltinType::Void,
            Some(Keyword::Bool) => BuiltinType::Bool,
            Some(Keyword::WcharT) => BuiltinType::WChar,
            Some(Keyword::Float) => BuiltinType::Float,
            Some(Keyword::Double) if self.longs > 0 => BuiltinType::LongDouble,
            Some(Keyword::Double) => BuiltinType::Double,
            Some(Keyword::Char) if u => BuiltinType::UnsignedChar,
            Some(Keyword::Char) if self.signed => BuiltinType::SignedChar,
            Some(Keyword::Char) => BuiltinType::Char,
            _ if self.short && u => BuiltinType::UnsignedShort,
            _ if self.short => BuiltinType::Short,
            _ if self.longs >= 2 && u => BuiltinType::UnsignedLongLong,
            _ if self.longs >= 2 => BuiltinType::LongLong,
            _ if self.longs == 1 && u => BuiltinType::UnsignedLong,
            _ if self.longs == 1 => BuiltinType::Long,
            _ if u => BuiltinType::UnsignedInt,
            _ => BuiltinType::Int,
        })
    }
}

fn is_builtin_word(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::Void
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

/// Parameter list and qualifiers of a function declarator.
#[derive(Clone, Debug)]
pub(crate) struct FunctionSuffix {
    pub params: Vec<Param>,
    pub variadic: bool,
    pub cv: CvQualifiers,
    /// `-> T`
    pub trailing: Option<TypeSpec>,
}

#[derive(Clone, Debug)]
pub(crate) struct Declarator {
    pub name: Option<NameId>,
    /// Operators applied to the specifier type, innermost first.
    pub ops: Vec<TypeOp>,
    pub function: Option<FunctionSuffix>,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DeclaratorKind {
    /// A name is required.
    Named,
    /// No name may appear (type-ids).
    Abstract,
    /// Parameters: the name is optional.
    Either,
}

impl Parser<'_> {
    /// Parse declaration specifiers. Stops before the declarator.
    pub(crate) fn parse_decl_specifiers(&mut self, scope: DeclScope) -> PResult<DeclSpec> {
        let start = self.cursor.current();
        let mut spec = DeclSpec {
            specifiers: DeclSpecifiers::empty(),
            is_typedef: false,
            base: None,
            cv: CvQualifiers::NONE,
            tag: None,
            tag_defines: false,
            span: start.span,
            file: start.file,
        };
        let mut words = BuiltinWords::default();
        loop {
            self.skip_attributes();
            let token = self.cursor.current();
            let has_type = spec.base.is_some() || words.any;
            match token.kind {
                TokenKind::Keyword(kw) if is_builtin_word(kw) => {
                    if spec.base.is_some() {
                        break;
                    }
                    self.cursor.advance();
                    words.add(kw);
                }
                TokenKind::Keyword(Keyword::Auto) => {
                    self.cursor.advance();
                    if !has_type {
                        spec.base = Some(BaseType::Auto);
                    }
                }
                TokenKind::Keyword(Keyword::Static) => self.add_specifier(&mut spec, DeclSpecifiers::STATIC),
                TokenKind::Keyword(Keyword::Extern) => self.add_specifier(&mut spec, DeclSpecifiers::EXTERN),
                TokenKind::Keyword(Keyword::Inline) => self.add_specifier(&mut spec, DeclSpecifiers::INLINE),
                TokenKind::Keyword(Keyword::Virtual) => self.add_specifier(&mut spec, DeclSpecifiers::VIRTUAL),
                TokenKind::Keyword(Keyword::Explicit) => self.add_specifier(&mut spec, DeclSpecifiers::EXPLICIT),
                TokenKind::Keyword(Keyword::Mutable) => self.add_specifier(&mut spec, DeclSpecifiers::MUTABLE),
                TokenKind::Keyword(Keyword::Friend) => self.add_specifier(&mut spec, DeclSpecifiers::FRIEND),
                TokenKind::Keyword(Keyword::Register) => self.add_specifier(&mut spec, DeclSpecifiers::REGISTER),
                TokenKind::Keyword(Keyword::Typedef) => {
                    self.cursor.advance();
                    spec.is_typedef = true;
                }
                TokenKind::Keyword(Keyword::Const | Keyword::Volatile | Keyword::Restrict) => {
                    spec.cv = spec.cv.union(self.parse_cv());
                }
                TokenKind::Keyword(Keyword::Class | Keyword::Struct | Keyword::Union) if !has_type => {
                    let (decl, defines) = self.parse_class_specifier()?;
                    spec.base = Some(BaseType::Inline(decl));
                    spec.tag = Some(decl);
                    spec.tag_defines = defines;
                }
                TokenKind::Keyword(Keyword::Enum) if !has_type => {
                    let (decl, defines) = self.parse_enum_specifier()?;
                    spec.base = Some(BaseType::Inline(decl));
                    spec.tag = Some(decl);
                    spec.tag_defines = defines;
                }
                TokenKind::Keyword(Keyword::Typename) if !has_type => {
                    self.cursor.advance();
                    spec.base = Some(BaseType::Named(self.parse_name(true)?));
                }
                TokenKind::Ident => {
                    let text = self.cursor.text(&token);
                    match text {
                        "constexpr" | "consteval" | "constinit" => {
                            self.add_specifier(&mut spec, DeclSpecifiers::CONSTEXPR);
                        }
                        "thread_local" | "_Thread_local" | "__thread" | "__extension__" | "_Noreturn"
                        | "__inline" | "__inline__" | "__forceinline" => {
                            self.cursor.advance();
                        }
                        "__restrict" | "__restrict__" | "__const" | "__volatile__" => {
                            spec.cv = spec.cv.union(self.parse_cv());
                        }
                        "decltype" | "__typeof__" | "__typeof" | "typeof" if !has_type => {
                            self.cursor.advance();
                            if self.cursor.check(Punct::LParen) {
                                skip_balanced(&mut self.cursor);
                            }
                            spec.base = Some(BaseType::Auto);
                        }
                        _ if has_type => break,
                        _ => {
                            if self.starts_declarator_name(scope) {
                                break;
                            }
                            spec.base = Some(BaseType::Named(self.parse_name(true)?));
                        }
                    }
                }
                TokenKind::Punct(Punct::ColonColon) if !has_type => {
                    if self.starts_declarator_name(scope) {
                        break;
                    }
                    spec.base = Some(BaseType::Named(self.parse_name(true)?));
                }
                _ => break,
            }
        }
        if let Some(builtin) = words.fold() {
            spec.base = Some(BaseType::Builtin(builtin));
        }
        spec.span = self.span_from(start.span);
        Ok(spec)
    }

    fn add_specifier(&mut self, spec: &mut DeclSpec, flag: DeclSpecifiers) {
        self.cursor.advance();
        spec.specifiers |= flag;
    }

    /// At a name that is the declarator of a constructor, destructor or
    /// operator rather than a type.
    fn starts_declarator_name(&mut self, scope: DeclScope) -> bool {
        if !matches!(scope, DeclScope::Namespace | DeclScope::Class) {
            return false;
        }
        self.look_ahead(Parser::constructor_shape)
    }

    /// `A::A(`, `X::~X(`, `X::operator=(`, or `A(` inside class `A`.
    pub(crate) fn constructor_shape(&mut self) -> bool {
        let Ok(name) = self.parse_name(true) else {
            return false;
        };
        if !self.cursor.check(Punct::LParen) {
            return false;
        }
        let node = self.arena.name(name);
        let last = node.last.ident;
        match node.last.kind {
            SegmentKind::Destructor | SegmentKind::Operator => true,
            SegmentKind::Identifier => match node.qualifier.last() {
                Some(q) => q.ident == last,
                None => !node.global && self.class_names.last() == Some(&last),
            },
        }
    }

    pub(crate) fn parse_cv(&mut self) -> CvQualifiers {
        let mut cv = CvQualifiers::NONE;
        loop {
            let token = self.cursor.current();
            match token.kind {
                TokenKind::Keyword(Keyword::Const) => cv.is_const = true,
                TokenKind::Keyword(Keyword::Volatile) => cv.is_volatile = true,
                TokenKind::Keyword(Keyword::Restrict) => {}
                TokenKind::Ident => match self.cursor.text(&token) {
                    "__const" => cv.is_const = true,
                    "__volatile__" => cv.is_volatile = true,
                    "__restrict" | "__restrict__" => {}
                    _ => return cv,
                },
                _ => return cv,
            }
            self.cursor.advance();
        }
    }

    /// `*`, `&`, `&&` with their qualifiers.
    pub(crate) fn parse_ptr_ops(&mut self) -> Vec<TypeOp> {
        let mut ops = Vec::new();
        loop {
            self.skip_attributes();
            if self.cursor.eat(Punct::Star) {
                let cv = self.parse_cv();
                ops.push(TypeOp::Pointer(cv));
            } else if self.cursor.eat(Punct::Amp) {
                ops.push(TypeOp::LValueRef);
            } else if self.cursor.eat(Punct::AmpAmp) {
                ops.push(TypeOp::RValueRef);
            } else {
                return ops;
            }
        }
    }

    /// Current token can start a declarator name.
    fn at_declarator_name(&mut self) -> bool {
        if self.at_name_start() {
            return true;
        }
        self.cursor.check(Punct::Tilde) && self.cursor.peek(1).kind == TokenKind::Ident
    }

    pub(crate) fn parse_declarator(&mut self, kind: DeclaratorKind) -> PResult<Declarator> {
        let start = self.cursor.current().span;
        let mut ops = self.parse_ptr_ops();
        let mut name = None;
        let mut inner_ops = Vec::new();
        let mut nested = false;

        if self.cursor.check(Punct::LParen) && kind != DeclaratorKind::Abstract || self.at_nested_abstract() {
            let inner = self.try_parse(|p| {
                p.cursor.advance();
                let next = p.cursor.current();
                let nests = matches!(next.kind, TokenKind::Punct(Punct::Star | Punct::Amp | Punct::AmpAmp | Punct::LParen))
                    || kind == DeclaratorKind::Named && p.at_declarator_name();
                if !nests {
                    return None;
                }
                let inner = p.parse_declarator(kind).ok()?;
                // `f(x);` in a block is a call, not a declaration of `x`.
                if p.context.in_block() && inner.ops.is_empty() && inner.function.is_none() {
                    return None;
                }
                p.cursor.eat(Punct::RParen).then_some(inner)
            });
            if let Some(inner) = inner {
                nested = true;
                name = inner.name;
                inner_ops = inner.ops;
            }
        }

        if !nested && kind != DeclaratorKind::Abstract && self.at_declarator_name() {
            name = Some(self.parse_name(true)?);
        }
        if name.is_none() && kind == DeclaratorKind::Named {
            return Err(self.unexpected(ErrorCode::E2005, "identifier"));
        }
        self.skip_attributes();

        let mut function = None;
        loop {
            if self.cursor.check(Punct::LParen) && function.is_none() {
                let Some(suffix) = self.try_function_suffix(kind) else {
                    break;
                };
                if inner_ops.is_empty() {
                    function = Some(suffix);
                }
            } else if self.cursor.check(Punct::LBracket) {
                self.parse_array_suffix(&mut ops)?;
            } else {
                break;
            }
        }
        ops.extend(inner_ops);
        self.skip_attributes();
        Ok(Declarator {
            name,
            ops,
            function,
            span: self.span_from(start),
        })
    }

    /// `(*)` or `(&)` in an abstract declarator.
    fn at_nested_abstract(&mut self) -> bool {
        self.cursor.check(Punct::LParen)
            && matches!(
                self.cursor.peek(1).kind,
                TokenKind::Punct(Punct::Star | Punct::Amp | Punct::AmpAmp)
            )
    }

    /// A parameter list after a declarator name, or `None` (nothing consumed)
    /// when the parentheses hold constructor arguments instead.
    fn try_function_suffix(&mut self, kind: DeclaratorKind) -> Option<FunctionSuffix> {
        self.try_parse(|p| {
            let suffix = p.parse_function_suffix().ok()?;
            if kind != DeclaratorKind::Named || !p.context.in_block() {
                return Some(suffix);
            }
            // `T x(a);` in a block: unnamed parameters of bare named types
            // read as constructor arguments.
            let all_bare_names = !suffix.params.is_empty()
                && suffix.params.iter().all(|param| {
                    param.name.is_none() && param.ty.ops.is_empty() && matches!(param.ty.base, BaseType::Named(_))
                });
            (!all_bare_names).then_some(suffix)
        })
    }

    pub(crate) fn parse_function_suffix(&mut self) -> PResult<FunctionSuffix> {
        let open = self.expect(Punct::LParen)?;
        let mut params = Vec::new();
        let mut variadic = false;
        self.without_context(ParseContext::NO_GT, |p| -> PResult<()> {
            if p.cursor.check_keyword(Keyword::Void) && p.cursor.peek(1).is_punct(Punct::RParen) {
                p.cursor.advance();
            }
            while !p.cursor.check(Punct::RParen) {
                if p.cursor.eat(Punct::Ellipsis) {
                    variadic = true;
                    break;
                }
                params.push(p.parse_param()?);
                if p.cursor.eat(Punct::Ellipsis) {
                    variadic = true;
                    break;
                }
                if !p.cursor.eat(Punct::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        self.expect_closing(&open, Punct::RParen)?;

        let mut cv = CvQualifiers::NONE;
        let mut trailing = None;
        loop {
            let token = self.cursor.current();
            match token.kind {
                TokenKind::Keyword(Keyword::Const | Keyword::Volatile) => cv = cv.union(self.parse_cv()),
                TokenKind::Punct(Punct::Amp | Punct::AmpAmp) => {
                    self.cursor.advance();
                }
                TokenKind::Keyword(Keyword::Throw) => {
                    self.cursor.advance();
                    if self.cursor.check(Punct::LParen) {
                        skip_balanced(&mut self.cursor);
                    }
                }
                TokenKind::Ident => match self.cursor.text(&token) {
                    "noexcept" => {
                        self.cursor.advance();
                        if self.cursor.check(Punct::LParen) {
                            skip_balanced(&mut self.cursor);
                        }
                    }
                    "override" | "final" => {
                        self.cursor.advance();
                    }
                    _ if self.skip_attributes() => {}
                    _ => break,
                },
                TokenKind::Punct(Punct::Arrow) => {
                    self.cursor.advance();
                    trailing = Some(self.parse_type_id()?);
                }
                TokenKind::Punct(Punct::LBracket) if self.skip_attributes() => {}
                _ => break,
            }
        }
        Ok(FunctionSuffix {
            params,
            variadic,
            cv,
            trailing,
        })
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let start = self.cursor.current().span;
        let spec = self.parse_decl_specifiers(DeclScope::Param)?;
        if spec.base.is_none() {
            return Err(self.unexpected(ErrorCode::E2006, "parameter type"));
        }
        let declarator = self.parse_declarator(DeclaratorKind::Either)?;
        let default = if self.cursor.eat(Punct::Assign) {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        Ok(Param {
            name: declarator.name,
            ty: spec.type_with(declarator.ops),
            default,
            span: self.span_from(start),
        })
    }

    /// `[expr]` or `[]`.
    pub(crate) fn parse_array_suffix(&mut self, ops: &mut Vec<TypeOp>) -> PResult<()> {
        let open = self.expect(Punct::LBracket)?;
        let size = if self.cursor.check(Punct::RBracket) {
            None
        } else {
            Some(self.without_context(ParseContext::NO_GT, Parser::parse_expression)?)
        };
        self.expect_closing(&open, Punct::RBracket)?;
        ops.push(TypeOp::Array(size));
        Ok(())
    }

    /// A type-id: specifiers and an abstract declarator (`const int*`).
    pub(crate) fn parse_type_id(&mut self) -> PResult<TypeSpec> {
        let spec = self.parse_decl_specifiers(DeclScope::Param)?;
        if spec.base.is_none() || spec.is_typedef {
            return Err(self.unexpected(ErrorCode::E2006, "type"));
        }
        let declarator = self.parse_declarator(DeclaratorKind::Abstract)?;
        Ok(spec.type_with(declarator.ops))
    }

    /// Type after `new`: no parenthesized declarators, array bounds may be
    /// arbitrary expressions.
    pub(crate) fn parse_new_type(&mut self) -> PResult<TypeSpec> {
        let spec = self.parse_decl_specifiers(DeclScope::Param)?;
        if spec.base.is_none() {
            return Err(self.unexpected(ErrorCode::E2006, "type"));
        }
        let mut ops = self.parse_ptr_ops();
        while self.cursor.check(Punct::LBracket) {
            self.parse_array_suffix(&mut ops)?;
        }
        Ok(spec.type_with(ops))
    }

    /// Type named by a conversion function: specifiers and pointer operators.
    pub(crate) fn skip_conversion_type(&mut self) -> PResult<()> {
        let spec = self.parse_decl_specifiers(DeclScope::Param)?;
        if spec.base.is_none() {
            return Err(self.unexpected(ErrorCode::E2006, "conversion type"));
        }
        self.parse_ptr_ops();
        Ok(())
    }
}
