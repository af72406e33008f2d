//! Expressions.
//!
//! Binary operators use precedence climbing. Inside a template argument list
//! (`ParseContext::NO_GT`) a bare `>` or `>>` ends the expression instead of
//! being an operator; parentheses and brackets lift that restriction.

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{BaseType, BinaryOp, ExprId, ExprKind, TypeSpec, UnaryOp};
use cidx_ir::stack::ensure_sufficient_stack;
use cidx_ir::{Keyword, Punct, Span, Token, TokenKind};

use super::DeclScope;
use crate::context::ParseContext;
use crate::error::{PResult, ParseError};
use crate::recovery::{skip_balanced, EXPR_FOLLOW};
use crate::Parser;

/// Binding power of a binary operator, loosest first.
mod prec {
    pub const OR: u8 = 1;
    pub const AND: u8 = 2;
    pub const BIT_OR: u8 = 3;
    pub const BIT_XOR: u8 = 4;
    pub const BIT_AND: u8 = 5;
    pub const EQUALITY: u8 = 6;
    pub const RELATIONAL: u8 = 7;
    pub const SHIFT: u8 = 8;
    pub const ADDITIVE: u8 = 9;
    pub const MULTIPLICATIVE: u8 = 10;
}

fn assign_op(p: Punct) -> Option<Option<BinaryOp>> {
    Some(match p {
        Punct::Assign => None,
        Punct::PlusAssign => Some(BinaryOp::Add),
        Punct::MinusAssign => Some(BinaryOp::Sub),
        Punct::StarAssign => Some(BinaryOp::Mul),
        Punct::SlashAssign => Some(BinaryOp::Div),
        Punct::PercentAssign => Some(BinaryOp::Rem),
        Punct::AmpAssign => Some(BinaryOp::BitAnd),
        Punct::PipeAssign => Some(BinaryOp::BitOr),
        Punct::CaretAssign => Some(BinaryOp::BitXor),
        Punct::ShlAssign => Some(BinaryOp::Shl),
        Punct::ShrAssign => Some(BinaryOp::Shr),
        _ => return None,
    })
}

fn named_cast(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::StaticCast | Keyword::DynamicCast | Keyword::ConstCast | Keyword::ReinterpretCast
    )
}

impl Parser<'_> {
    fn expr_span(&self, id: ExprId) -> Span {
        self.arena.expr(id).span
    }

    /// Expression with the comma operator.
    pub(crate) fn parse_expression(&mut self) -> PResult<ExprId> {
        let mut lhs = self.parse_assignment_expr()?;
        while self.cursor.check(Punct::Comma) {
            self.cursor.advance();
            let rhs = self.parse_assignment_expr()?;
            let span = self.expr_span(lhs).merge(self.expr_span(rhs));
            lhs = self.alloc_expr(
                ExprKind::Binary {
                    op: BinaryOp::Comma,
                    lhs,
                    rhs,
                },
                span,
            );
        }
        Ok(lhs)
    }

    pub(crate) fn parse_assignment_expr(&mut self) -> PResult<ExprId> {
        ensure_sufficient_stack(|| self.parse_assignment_inner())
    }

    fn parse_assignment_inner(&mut self) -> PResult<ExprId> {
        let token = self.cursor.current();
        if token.is_keyword(Keyword::Throw) {
            self.cursor.advance();
            let next = self.cursor.current();
            let operand = if next.is_eof() || EXPR_FOLLOW.contains_kind(next.kind) {
                None
            } else {
                Some(self.parse_assignment_expr()?)
            };
            let span = self.span_from(token.span);
            return Ok(self.alloc_expr(ExprKind::Throw(operand), span));
        }

        let lhs = self.parse_conditional_expr()?;
        let TokenKind::Punct(p) = self.cursor.current().kind else {
            return Ok(lhs);
        };
        let Some(op) = assign_op(p) else {
            return Ok(lhs);
        };
        self.cursor.advance();
        let rhs = if self.cursor.check(Punct::LBrace) {
            self.parse_braced_expr()?
        } else {
            self.parse_assignment_expr()?
        };
        let span = self.expr_span(lhs).merge(self.expr_span(rhs));
        Ok(self.alloc_expr(ExprKind::Assign { op, lhs, rhs }, span))
    }

    pub(crate) fn parse_conditional_expr(&mut self) -> PResult<ExprId> {
        let cond = self.parse_binary(prec::OR)?;
        if !self.cursor.eat(Punct::Question) {
            return Ok(cond);
        }
        let then_expr = self.without_context(ParseContext::NO_GT, Parser::parse_expression)?;
        self.expect(Punct::Colon)?;
        let else_expr = self.parse_assignment_expr()?;
        let span = self.expr_span(cond).merge(self.expr_span(else_expr));
        Ok(self.alloc_expr(
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            },
            span,
        ))
    }

    fn binary_op(&self, token: Token) -> Option<(BinaryOp, u8)> {
        let TokenKind::Punct(p) = token.kind else {
            return None;
        };
        Some(match p {
            Punct::PipePipe => (BinaryOp::Or, prec::OR),
            Punct::AmpAmp => (BinaryOp::And, prec::AND),
            Punct::Pipe => (BinaryOp::BitOr, prec::BIT_OR),
            Punct::Caret => (BinaryOp::BitXor, prec::BIT_XOR),
            Punct::Amp => (BinaryOp::BitAnd, prec::BIT_AND),
            Punct::EqEq => (BinaryOp::Eq, prec::EQUALITY),
            Punct::Ne => (BinaryOp::Ne, prec::EQUALITY),
            Punct::Lt => (BinaryOp::Lt, prec::RELATIONAL),
            Punct::Gt if !self.context.gt_closes() => (BinaryOp::Gt, prec::RELATIONAL),
            Punct::Le => (BinaryOp::Le, prec::RELATIONAL),
            Punct::Ge => (BinaryOp::Ge, prec::RELATIONAL),
            Punct::Shl => (BinaryOp::Shl, prec::SHIFT),
            Punct::Shr if !self.context.gt_closes() => (BinaryOp::Shr, prec::SHIFT),
            Punct::Plus => (BinaryOp::Add, prec::ADDITIVE),
            Punct::Minus => (BinaryOp::Sub, prec::ADDITIVE),
            Punct::Star => (BinaryOp::Mul, prec::MULTIPLICATIVE),
            Punct::Slash => (BinaryOp::Div, prec::MULTIPLICATIVE),
            Punct::Percent => (BinaryOp::Rem, prec::MULTIPLICATIVE),
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<ExprId> {
        let mut lhs = self.parse_unary()?;
        loop {
            let token = self.cursor.current();
            let Some((op, prec)) = self.binary_op(token) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.cursor.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = self.expr_span(lhs).merge(self.expr_span(rhs));
            lhs = self.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<ExprId> {
        ensure_sufficient_stack(|| self.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> PResult<ExprId> {
        let token = self.cursor.current();
        let start = token.span;
        let op = match token.kind {
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Neg),
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Punct(Punct::Star) => Some(UnaryOp::Deref),
            TokenKind::Punct(Punct::Amp) => Some(UnaryOp::AddrOf),
            TokenKind::Punct(Punct::PlusPlus) => Some(UnaryOp::PreInc),
            TokenKind::Punct(Punct::MinusMinus) => Some(UnaryOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.cursor.advance();
            let operand = self.parse_unary()?;
            let span = self.span_from(start);
            return Ok(self.alloc_expr(ExprKind::Unary { op, operand }, span));
        }

        match token.kind {
            TokenKind::Keyword(Keyword::Sizeof) => {
                self.cursor.advance();
                self.cursor.eat(Punct::Ellipsis);
                self.parse_sizeof_operand(start)
            }
            TokenKind::Ident
                if matches!(self.cursor.text(&token), "alignof" | "_Alignof" | "__alignof__")
                    && self.cursor.peek(1).is_punct(Punct::LParen) =>
            {
                self.cursor.advance();
                self.parse_sizeof_operand(start)
            }
            TokenKind::Keyword(Keyword::New) => self.parse_new(start),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(start),
            TokenKind::Punct(Punct::ColonColon) if self.cursor.peek(1).is_keyword(Keyword::New) => {
                self.cursor.advance();
                self.parse_new(start)
            }
            TokenKind::Punct(Punct::ColonColon) if self.cursor.peek(1).is_keyword(Keyword::Delete) => {
                self.cursor.advance();
                self.parse_delete(start)
            }
            TokenKind::Punct(Punct::LParen) => match self.try_parse(Parser::try_cast) {
                Some(cast) => Ok(cast),
                None => self.parse_postfix(),
            },
            _ => self.parse_postfix(),
        }
    }

    /// `sizeof(type)` or `sizeof expr`, after the keyword.
    fn parse_sizeof_operand(&mut self, start: Span) -> PResult<ExprId> {
        if self.cursor.check(Punct::LParen) {
            let ty = self.try_parse(|p| {
                p.cursor.advance();
                let ty = p.without_context(ParseContext::NO_GT, Parser::parse_type_id).ok()?;
                p.cursor.eat(Punct::RParen).then_some(ty)
            });
            if let Some(ty) = ty {
                let span = self.span_from(start);
                return Ok(self.alloc_expr(ExprKind::SizeofType(ty), span));
            }
        }
        let operand = self.parse_unary()?;
        let span = self.span_from(start);
        Ok(self.alloc_expr(ExprKind::SizeofExpr(operand), span))
    }

    /// `new (placement) T(args)`, `new T[n]`, `new (T)`.
    fn parse_new(&mut self, start: Span) -> PResult<ExprId> {
        self.cursor.advance();
        let ty = if self.cursor.check(Punct::LParen) {
            let placed = self.try_parse(|p| {
                p.parse_call_args().ok()?;
                p.parse_new_type().ok()
            });
            match placed {
                Some(ty) => ty,
                None => {
                    let open = self.cursor.advance();
                    let ty = self.parse_type_id()?;
                    self.expect_closing(&open, Punct::RParen)?;
                    ty
                }
            }
        } else {
            self.parse_new_type()?
        };
        let args = if self.cursor.check(Punct::LParen) {
            self.parse_call_args()?
        } else if self.cursor.check(Punct::LBrace) {
            self.parse_braced_list()?
        } else {
            Vec::new()
        };
        let span = self.span_from(start);
        Ok(self.alloc_expr(ExprKind::New { ty, args }, span))
    }

    fn parse_delete(&mut self, start: Span) -> PResult<ExprId> {
        self.cursor.advance();
        let array = self.cursor.check(Punct::LBracket) && self.cursor.peek(1).is_punct(Punct::RBracket);
        if array {
            self.cursor.advance();
            self.cursor.advance();
        }
        let operand = self.parse_unary()?;
        let span = self.span_from(start);
        Ok(self.alloc_expr(ExprKind::Delete { operand, array }, span))
    }

    /// `(T) operand` or the compound literal `(T){...}`. Speculative.
    fn try_cast(&mut self) -> Option<ExprId> {
        let open = self.cursor.advance();
        let ty = self.without_context(ParseContext::NO_GT, Parser::parse_type_id).ok()?;
        if !self.cursor.eat(Punct::RParen) {
            return None;
        }
        if self.cursor.check(Punct::LBrace) {
            let args = self.parse_braced_list().ok()?;
            let span = self.span_from(open.span);
            return Some(self.alloc_expr(ExprKind::Construct { ty, args }, span));
        }
        if !self.at_cast_operand(&ty) {
            return None;
        }
        let operand = self.parse_unary().ok()?;
        let span = self.span_from(open.span);
        Some(self.alloc_expr(ExprKind::Cast { ty, operand }, span))
    }

    /// Whether the token after `(T)` starts a cast operand. Operators that
    /// are also binary (`+ - * &`) and `++`/`--` only count when `T` can
    /// only be a type.
    fn at_cast_operand(&mut self, ty: &TypeSpec) -> bool {
        let token = self.cursor.current();
        let clearly_type = !matches!(ty.base, BaseType::Named(_)) || !ty.ops.is_empty() || !ty.cv.is_empty();
        match token.kind {
            TokenKind::Ident
            | TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral => true,
            TokenKind::Keyword(kw) => {
                matches!(
                    kw,
                    Keyword::This
                        | Keyword::True
                        | Keyword::False
                        | Keyword::Nullptr
                        | Keyword::Sizeof
                        | Keyword::New
                        | Keyword::Delete
                        | Keyword::Operator
                ) || named_cast(kw)
            }
            TokenKind::Punct(Punct::LParen | Punct::ColonColon | Punct::Bang | Punct::Tilde) => true,
            TokenKind::Punct(
                Punct::Plus | Punct::Minus | Punct::Star | Punct::Amp | Punct::PlusPlus | Punct::MinusMinus,
            ) => clearly_type,
            _ => false,
        }
    }

    fn parse_postfix(&mut self) -> PResult<ExprId> {
        let mut expr = self.parse_primary()?;
        loop {
            let token = self.cursor.current();
            match token.kind {
                TokenKind::Punct(Punct::LParen) => {
                    let args = self.parse_call_args()?;
                    let span = self.span_from(self.expr_span(expr));
                    expr = self.alloc_expr(ExprKind::Call { callee: expr, args }, span);
                }
                TokenKind::Punct(Punct::LBracket) => {
                    self.cursor.advance();
                    let index = if self.cursor.check(Punct::LBrace) {
                        self.parse_braced_expr()?
                    } else {
                        self.without_context(ParseContext::NO_GT, Parser::parse_expression)?
                    };
                    self.expect_closing(&token, Punct::RBracket)?;
                    let span = self.span_from(self.expr_span(expr));
                    expr = self.alloc_expr(ExprKind::Index { base: expr, index }, span);
                }
                TokenKind::Punct(p @ (Punct::Dot | Punct::Arrow)) => {
                    self.cursor.advance();
                    self.cursor.eat_keyword(Keyword::Template);
                    let is_name = self.at_name_start()
                        || self.cursor.check(Punct::Tilde) && self.cursor.peek(1).kind == TokenKind::Ident;
                    if !is_name {
                        return Err(self.unexpected(ErrorCode::E2005, "member name"));
                    }
                    let member = self.parse_name(false)?;
                    let span = self.span_from(self.expr_span(expr));
                    expr = self.alloc_expr(
                        ExprKind::Member {
                            object: expr,
                            member,
                            arrow: p == Punct::Arrow,
                        },
                        span,
                    );
                }
                TokenKind::Punct(p @ (Punct::PlusPlus | Punct::MinusMinus)) => {
                    self.cursor.advance();
                    let op = if p == Punct::PlusPlus {
                        UnaryOp::PostInc
                    } else {
                        UnaryOp::PostDec
                    };
                    let span = self.span_from(self.expr_span(expr));
                    expr = self.alloc_expr(ExprKind::Unary { op, operand: expr }, span);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<ExprId> {
        let token = self.cursor.current();
        let start = token.span;
        let literal = match token.kind {
            TokenKind::IntLiteral => Some(ExprKind::IntLit(token.text)),
            TokenKind::FloatLiteral => Some(ExprKind::FloatLit(token.text)),
            TokenKind::CharLiteral => Some(ExprKind::CharLit(token.text)),
            TokenKind::Keyword(Keyword::True) => Some(ExprKind::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Some(ExprKind::Bool(false)),
            TokenKind::Keyword(Keyword::Nullptr) => Some(ExprKind::Nullptr),
            TokenKind::Keyword(Keyword::This) => Some(ExprKind::This),
            _ => None,
        };
        if let Some(kind) = literal {
            self.cursor.advance();
            return Ok(self.alloc_expr(kind, start));
        }

        match token.kind {
            TokenKind::StringLiteral => {
                // Adjacent literals concatenate.
                while self.cursor.current().kind == TokenKind::StringLiteral {
                    self.cursor.advance();
                }
                let span = self.span_from(start);
                Ok(self.alloc_expr(ExprKind::StringLit(token.text), span))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.cursor.advance();
                if self.cursor.check(Punct::LBrace) {
                    // GNU statement expression.
                    skip_balanced(&mut self.cursor);
                    self.expect_closing(&token, Punct::RParen)?;
                    let err = ParseError::at(ErrorCode::E2002, "statement expressions are not supported", &token);
                    let problem = self.report(&err);
                    let span = self.span_from(start);
                    return Ok(self.alloc_expr(ExprKind::Problem(problem), span));
                }
                let inner = self.without_context(ParseContext::NO_GT, Parser::parse_expression)?;
                self.expect_closing(&token, Punct::RParen)?;
                Ok(inner)
            }
            TokenKind::Punct(Punct::LBrace) => self.parse_braced_expr(),
            TokenKind::Punct(Punct::LBracket) => {
                // Lambda: skipped as a whole.
                skip_balanced(&mut self.cursor);
                if self.cursor.check(Punct::LParen) {
                    skip_balanced(&mut self.cursor);
                }
                while !self.cursor.check(Punct::LBrace) && !self.cursor.is_at_end() && !self.cursor.check(Punct::Semi) {
                    self.cursor.advance();
                }
                if self.cursor.check(Punct::LBrace) {
                    skip_balanced(&mut self.cursor);
                }
                let err = ParseError::at(ErrorCode::E2002, "lambda expressions are not supported", &token);
                let problem = self.report(&err);
                let span = self.span_from(start);
                Ok(self.alloc_expr(ExprKind::Problem(problem), span))
            }
            TokenKind::Keyword(kw) if named_cast(kw) => {
                self.cursor.advance();
                self.expect(Punct::Lt)?;
                let ty = self.with_context(ParseContext::NO_GT, Parser::parse_type_id)?;
                if !self.cursor.eat_closing_angle() {
                    return Err(self.unexpected(ErrorCode::E2001, "`>`"));
                }
                let open = self.expect(Punct::LParen)?;
                let operand = self.without_context(ParseContext::NO_GT, Parser::parse_expression)?;
                self.expect_closing(&open, Punct::RParen)?;
                let span = self.span_from(start);
                Ok(self.alloc_expr(ExprKind::Cast { ty, operand }, span))
            }
            TokenKind::Keyword(Keyword::Typename) => {
                self.cursor.advance();
                let name = self.parse_name(true)?;
                self.parse_construct(TypeSpec::named(name), start)
            }
            TokenKind::Keyword(
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
                | Keyword::Double,
            ) => {
                let spec = self.parse_decl_specifiers(DeclScope::Param)?;
                self.parse_construct(spec.type_with(Vec::new()), start)
            }
            TokenKind::Ident
                if self.cursor.text(&token).starts_with("__builtin_") && self.cursor.peek(1).is_punct(Punct::LParen) =>
            {
                // Compiler builtins may take type arguments; keep only the callee.
                let name = self.parse_name(false)?;
                let callee = self.alloc_expr(ExprKind::Name(name), start);
                skip_balanced(&mut self.cursor);
                let span = self.span_from(start);
                Ok(self.alloc_expr(ExprKind::Call { callee, args: Vec::new() }, span))
            }
            _ if self.at_name_start() => {
                let name = self.parse_name(false)?;
                if self.cursor.check(Punct::LBrace) {
                    return self.parse_construct(TypeSpec::named(name), start);
                }
                let span = self.span_from(start);
                Ok(self.alloc_expr(ExprKind::Name(name), span))
            }
            _ if token.is_eof() || EXPR_FOLLOW.contains_kind(token.kind) => {
                // Report without consuming so the enclosing construct can
                // still close.
                let err = self.unexpected(ErrorCode::E2002, "expression");
                let problem = self.report(&err);
                Ok(self.alloc_expr(ExprKind::Problem(problem), Span::point(start.start)))
            }
            _ => Err(self.unexpected(ErrorCode::E2002, "expression")),
        }
    }

    /// `T(args)` or `T{args}` after the type.
    fn parse_construct(&mut self, ty: TypeSpec, start: Span) -> PResult<ExprId> {
        let args = if self.cursor.check(Punct::LBrace) {
            self.parse_braced_list()?
        } else {
            self.parse_call_args()?
        };
        let span = self.span_from(start);
        Ok(self.alloc_expr(ExprKind::Construct { ty, args }, span))
    }

    /// `( arg, ... )`
    pub(crate) fn parse_call_args(&mut self) -> PResult<Vec<ExprId>> {
        let open = self.expect(Punct::LParen)?;
        let args = self.without_context(ParseContext::NO_GT, |p| {
            let mut args = Vec::new();
            if p.cursor.check(Punct::RParen) {
                return Ok(args);
            }
            loop {
                let arg = if p.cursor.check(Punct::LBrace) {
                    p.parse_braced_expr()?
                } else {
                    p.parse_assignment_expr()?
                };
                p.cursor.eat(Punct::Ellipsis);
                args.push(arg);
                if !p.cursor.eat(Punct::Comma) {
                    return Ok(args);
                }
            }
        })?;
        self.expect_closing(&open, Punct::RParen)?;
        Ok(args)
    }

    /// `{ a, .x = b, [2] = c, {nested} }`
    pub(crate) fn parse_braced_list(&mut self) -> PResult<Vec<ExprId>> {
        let open = self.expect(Punct::LBrace)?;
        let items = self.without_context(ParseContext::NO_GT, |p| {
            let mut items = Vec::new();
            while !p.cursor.check(Punct::RBrace) && !p.cursor.is_at_end() {
                p.skip_designators();
                let item = if p.cursor.check(Punct::LBrace) {
                    p.parse_braced_expr()?
                } else {
                    p.parse_assignment_expr()?
                };
                p.cursor.eat(Punct::Ellipsis);
                items.push(item);
                if !p.cursor.eat(Punct::Comma) {
                    break;
                }
            }
            Ok(items)
        })?;
        self.expect_closing(&open, Punct::RBrace)?;
        Ok(items)
    }

    /// C designators `.field =` and `[index] =`.
    fn skip_designators(&mut self) {
        let mut any = false;
        loop {
            if self.cursor.check(Punct::Dot) && self.cursor.peek(1).kind == TokenKind::Ident {
                self.cursor.advance();
                self.cursor.advance();
                any = true;
            } else if self.cursor.check(Punct::LBracket) && self.array_designator_follows() {
                skip_balanced(&mut self.cursor);
                any = true;
            } else {
                break;
            }
        }
        if any {
            self.cursor.eat(Punct::Assign);
        }
    }

    /// `[n] =` or `[n].x` rather than a lambda introducer.
    fn array_designator_follows(&mut self) -> bool {
        self.look_ahead(|p| {
            skip_balanced(&mut p.cursor);
            p.cursor.check(Punct::Assign) || p.cursor.check(Punct::Dot) || p.cursor.check(Punct::LBracket)
        })
    }

    /// Braced initializer list as an expression.
    pub(crate) fn parse_braced_expr(&mut self) -> PResult<ExprId> {
        let start = self.cursor.current().span;
        let items = self.parse_braced_list()?;
        let span = self.span_from(start);
        Ok(self.alloc_expr(ExprKind::InitList(items), span))
    }
}
