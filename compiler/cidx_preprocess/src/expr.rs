//! `#if` constant-expression evaluation.
//!
//! Runs on the controlling expression after `defined` and `__has_include`
//! have been replaced and macros expanded. Arithmetic is done in 64 bits;
//! an operand with a `u` suffix makes the operation unsigned.

use cidx_ir::{Dialect, Punct, Span, StringInterner, Token, TokenKind};

/// Why a controlling expression could not be evaluated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ExprError {
    DivisionByZero(Span),
    Malformed(Span, String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Value {
    v: i64,
    unsigned: bool,
}

impl Value {
    const fn int(v: i64) -> Self {
        Value { v, unsigned: false }
    }

    fn truth(b: bool) -> Self {
        Value::int(i64::from(b))
    }
}

/// Evaluate `tokens` as a controlling expression.
pub(crate) fn evaluate(
    tokens: &[Token],
    interner: &StringInterner,
    dialect: Dialect,
    directive: Span,
) -> Result<bool, ExprError> {
    if tokens.is_empty() {
        return Err(ExprError::Malformed(directive, "#if with no expression".to_owned()));
    }
    let mut eval = Evaluator {
        tokens,
        pos: 0,
        interner,
        dialect,
        fallback: directive,
    };
    let value = eval.conditional(true)?;
    if let Some(extra) = eval.peek() {
        return Err(ExprError::Malformed(
            extra.span,
            format!("missing binary operator before `{}`", interner.lookup(extra.text)),
        ));
    }
    Ok(value.v != 0)
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    pos: usize,
    interner: &'a StringInterner,
    dialect: Dialect,
    fallback: Span,
}

fn precedence(p: Punct) -> Option<u8> {
    Some(match p {
        Punct::PipePipe => 1,
        Punct::AmpAmp => 2,
        Punct::Pipe => 3,
        Punct::Caret => 4,
        Punct::Amp => 5,
        Punct::EqEq | Punct::Ne => 6,
        Punct::Lt | Punct::Gt | Punct::Le | Punct::Ge => 7,
        Punct::Shl | Punct::Shr => 8,
        Punct::Plus | Punct::Minus => 9,
        Punct::Star | Punct::Slash | Punct::Percent => 10,
        _ => return None,
    })
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek()?.kind {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        }
    }

    fn here(&self) -> Span {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(self.fallback, |t| t.span)
    }

    fn malformed<T>(&self, message: impl Into<String>) -> Result<T, ExprError> {
        Err(ExprError::Malformed(self.here(), message.into()))
    }

    fn expect(&mut self, p: Punct) -> Result<(), ExprError> {
        if self.peek_punct() == Some(p) {
            self.pos += 1;
            Ok(())
        } else {
            self.malformed(format!("expected `{}` in preprocessor expression", p.as_str()))
        }
    }

    /// `live` is false inside a branch whose value is discarded, where
    /// division by zero is not an error.
    fn conditional(&mut self, live: bool) -> Result<Value, ExprError> {
        let cond = self.binary(1, live)?;
        if self.peek_punct() != Some(Punct::Question) {
            return Ok(cond);
        }
        self.pos += 1;
        let then_value = self.conditional(live && cond.v != 0)?;
        self.expect(Punct::Colon)?;
        let else_value = self.conditional(live && cond.v == 0)?;
        let picked = if cond.v != 0 { then_value } else { else_value };
        Ok(Value {
            v: picked.v,
            unsigned: then_value.unsigned || else_value.unsigned,
        })
    }

    fn binary(&mut self, min_prec: u8, live: bool) -> Result<Value, ExprError> {
        let mut lhs = self.unary(live)?;
        while let Some((op, prec)) = self.peek_punct().and_then(|p| precedence(p).map(|n| (p, n))) {
            if prec < min_prec {
                break;
            }
            let op_span = self.here();
            self.pos += 1;
            let rhs_live = match op {
                Punct::AmpAmp => live && lhs.v != 0,
                Punct::PipePipe => live && lhs.v == 0,
                _ => live,
            };
            let rhs = self.binary(prec + 1, rhs_live)?;
            lhs = apply(op, lhs, rhs, live, op_span)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self, live: bool) -> Result<Value, ExprError> {
        match self.peek_punct() {
            Some(Punct::Bang) => {
                self.pos += 1;
                let v = self.unary(live)?;
                Ok(Value::truth(v.v == 0))
            }
            Some(Punct::Tilde) => {
                self.pos += 1;
                let v = self.unary(live)?;
                Ok(Value { v: !v.v, ..v })
            }
            Some(Punct::Minus) => {
                self.pos += 1;
                let v = self.unary(live)?;
                Ok(Value {
                    v: v.v.wrapping_neg(),
                    ..v
                })
            }
            Some(Punct::Plus) => {
                self.pos += 1;
                self.unary(live)
            }
            _ => self.primary(live),
        }
    }

    fn primary(&mut self, live: bool) -> Result<Value, ExprError> {
        let Some(&tok) = self.peek() else {
            return self.malformed("expected value in preprocessor expression");
        };
        let text = self.interner.lookup(tok.text);
        match tok.kind {
            TokenKind::Punct(Punct::LParen) => {
                self.pos += 1;
                let v = self.conditional(live)?;
                self.expect(Punct::RParen)?;
                Ok(v)
            }
            TokenKind::IntLiteral => {
                self.pos += 1;
                parse_integer(text)
                    .ok_or_else(|| ExprError::Malformed(tok.span, format!("invalid integer constant `{text}`")))
            }
            TokenKind::CharLiteral => {
                self.pos += 1;
                Ok(Value::int(char_value(text)))
            }
            TokenKind::FloatLiteral => {
                self.malformed("floating constant in preprocessor expression")
            }
            TokenKind::Ident | TokenKind::Keyword(_) => {
                self.pos += 1;
                let truthy = self.dialect.is_cpp() && text == "true";
                Ok(Value::truth(truthy))
            }
            _ => self.malformed(format!("token `{text}` is not valid in preprocessor expressions")),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "two's complement reinterpretation; shift counts are masked to 0..64"
)]
fn apply(op: Punct, l: Value, r: Value, live: bool, span: Span) -> Result<Value, ExprError> {
    let unsigned = l.unsigned || r.unsigned;
    let (lu, ru) = (l.v as u64, r.v as u64);
    let arith = |v: i64| Value { v, unsigned };
    Ok(match op {
        Punct::PipePipe => Value::truth(l.v != 0 || r.v != 0),
        Punct::AmpAmp => Value::truth(l.v != 0 && r.v != 0),
        Punct::Pipe => arith(l.v | r.v),
        Punct::Caret => arith(l.v ^ r.v),
        Punct::Amp => arith(l.v & r.v),
        Punct::EqEq => Value::truth(l.v == r.v),
        Punct::Ne => Value::truth(l.v != r.v),
        Punct::Lt => Value::truth(if unsigned { lu < ru } else { l.v < r.v }),
        Punct::Gt => Value::truth(if unsigned { lu > ru } else { l.v > r.v }),
        Punct::Le => Value::truth(if unsigned { lu <= ru } else { l.v <= r.v }),
        Punct::Ge => Value::truth(if unsigned { lu >= ru } else { l.v >= r.v }),
        Punct::Shl => Value {
            v: l.v.wrapping_shl((r.v & 63) as u32),
            unsigned: l.unsigned,
        },
        Punct::Shr => {
            let count = (r.v & 63) as u32;
            let v = if l.unsigned {
                (lu >> count) as i64
            } else {
                l.v >> count
            };
            Value {
                v,
                unsigned: l.unsigned,
            }
        }
        Punct::Plus => arith(l.v.wrapping_add(r.v)),
        Punct::Minus => arith(l.v.wrapping_sub(r.v)),
        Punct::Star => arith(l.v.wrapping_mul(r.v)),
        Punct::Slash | Punct::Percent => {
            if r.v == 0 {
                if live {
                    return Err(ExprError::DivisionByZero(span));
                }
                return Ok(arith(0));
            }
            let v = match (op, unsigned) {
                (Punct::Slash, true) => (lu / ru) as i64,
                (Punct::Slash, false) => l.v.wrapping_div(r.v),
                (_, true) => (lu % ru) as i64,
                (_, false) => l.v.wrapping_rem(r.v),
            };
            arith(v)
        }
        _ => Value::int(0),
    })
}

/// Value of an integer literal with optional `u`/`l` suffixes and digit
/// separators. Values above `i64::MAX` are unsigned.
fn parse_integer(text: &str) -> Option<Value> {
    let body = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let suffix = &text[body.len()..];
    let mut unsigned = suffix.contains(['u', 'U']);
    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (bin, 2)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: u64 = 0;
    for c in digits.chars().filter(|&c| c != '\'') {
        let d = c.to_digit(radix)?;
        value = value.wrapping_mul(u64::from(radix)).wrapping_add(u64::from(d));
    }
    if i64::try_from(value).is_err() {
        unsigned = true;
    }
    #[expect(clippy::cast_possible_wrap, reason = "two's complement reinterpretation")]
    let v = value as i64;
    Some(Value {
        v,
        unsigned,
    })
}

/// Value of a character literal; multi-character literals pack bytes
/// big-endian like common compilers do.
fn char_value(text: &str) -> i64 {
    let start = text.find('\'').map_or(0, |i| i + 1);
    let inner = text[start..].strip_suffix('\'').unwrap_or(&text[start..]);
    let mut chars = inner.chars().peekable();
    let mut values = Vec::new();
    while let Some(c) = chars.next() {
        if c != '\\' {
            values.push(i64::from(u32::from(c)));
            continue;
        }
        let Some(esc) = chars.next() else { break };
        let v = match esc {
            'n' => 10,
            't' => 9,
            'r' => 13,
            'a' => 7,
            'b' => 8,
            'f' => 12,
            'v' => 11,
            'x' => {
                let mut v = 0i64;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                    v = v.wrapping_mul(16) + i64::from(d);
                    chars.next();
                }
                v
            }
            '0'..='7' => {
                let mut v = i64::from(u32::from(esc) - u32::from('0'));
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            v = v * 8 + i64::from(d);
                            chars.next();
                        }
                        None => break,
                    }
                }
                v
            }
            other => i64::from(u32::from(other)),
        };
        values.push(v);
    }
    match values.as_slice() {
        [single] => *single,
        many => many
            .iter()
            .fold(0i64, |acc, &v| acc.wrapping_shl(8) | (v & 0xff)),
    }
}

#[cfg(test)]
mod tests;
