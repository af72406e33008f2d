//! Directive handling: definitions, conditionals and the line-oriented
//! directives. `#include` lives in `include.rs`.

use std::sync::Arc;

use cidx_diagnostic::{Diagnostic, ErrorCode};
use cidx_ir::{Canceled, FileId, Name, Punct, Span, Token, TokenFlags, TokenKind};

use super::expand::PpToken;
use super::{Conditional, Preprocessor};
use crate::expr::{self, ExprError};
use crate::lexer::GuardState;
use crate::log::{ConditionalKind, DirectiveKind, LogEntry};
use crate::macros::{MacroDef, MacroKind};

impl Preprocessor {
    /// Process the directive introduced by `hash`, consuming its line.
    pub(super) fn directive(&mut self, hash: Token) -> Result<(), Canceled> {
        let file = hash.file;
        let Some(lexer) = self.files.last_mut() else {
            return Ok(());
        };
        let name_tok = lexer.directive_name(&self.interner, &mut self.lex_problems);
        self.drain_lex_problems();
        let Some(name_tok) = name_tok else {
            self.note_directive(false);
            return Ok(());
        };

        // `# 33 "file.c" 2` is a GNU line marker.
        if name_tok.kind == TokenKind::IntLiteral {
            let (mut tokens, end) = self.read_directive_line(false);
            tokens.insert(0, name_tok);
            self.note_directive(false);
            self.line_directive(file, Span::new(hash.span.start, end), &tokens, true);
            return Ok(());
        }

        let name = self.interner.lookup(name_tok.text);
        let header = matches!(name, "include" | "include_next");
        let (tokens, end) = self.read_directive_line(header);
        let span = Span::new(hash.span.start, end);
        self.note_directive(matches!(name, "ifndef" | "if"));

        match name {
            "define" => {
                if let Some(def) = self.parse_define(&tokens, file, span) {
                    self.install_macro(def, true);
                }
            }
            "undef" => self.undef_directive(file, span, &tokens),
            "include" => self.include_directive(file, span, &tokens, false)?,
            "include_next" => self.include_directive(file, span, &tokens, true)?,
            "if" => {
                self.open_if_guard(&tokens);
                let taken = self.eval_if(&tokens, file, span)?;
                self.open_conditional(ConditionalKind::If, file, span, taken)?;
            }
            "ifdef" | "ifndef" => self.ifdef_directive(file, span, &tokens, name == "ifdef")?,
            "elif" => self.elif_directive(file, span)?,
            "else" => self.else_directive(file, span)?,
            "endif" => self.endif_directive(file, span),
            "pragma" => {
                if tokens.first().is_some_and(|t| t.text == self.names.once) {
                    if let Some(lexer) = self.files.last() {
                        self.once.insert(lexer.path.clone());
                    }
                }
                self.emit(LogEntry::Directive {
                    kind: DirectiveKind::Pragma,
                    file,
                    directive: span,
                });
            }
            "error" | "warning" => {
                let (code, kind) = if name == "error" {
                    (ErrorCode::P1004, DirectiveKind::Error)
                } else {
                    (ErrorCode::P1013, DirectiveKind::Warning)
                };
                let text = self.spell(&tokens);
                self.report(
                    Diagnostic::error(code)
                        .with_message(format!("#{name} {text}"))
                        .in_file(file)
                        .with_label(span, format!("#{name} directive")),
                );
                self.emit(LogEntry::Directive {
                    kind,
                    file,
                    directive: span,
                });
            }
            "line" => self.line_directive(file, span, &tokens, false),
            "ident" | "sccs" => {}
            _ => self.report(
                Diagnostic::error(ErrorCode::P1002)
                    .with_message(format!("invalid preprocessing directive `#{name}`"))
                    .in_file(file)
                    .with_label(name_tok.span, "unknown directive"),
            ),
        }
        Ok(())
    }

    fn read_directive_line(&mut self, header: bool) -> (Vec<Token>, u32) {
        let Some(lexer) = self.files.last_mut() else {
            return (Vec::new(), 0);
        };
        let line = lexer.read_line(&self.interner, &mut self.lex_problems, header);
        self.drain_lex_problems();
        line
    }

    /// Spelling of `tokens` with single spaces where the source had any.
    fn spell(&self, tokens: &[Token]) -> String {
        let mut s = String::new();
        for (i, t) in tokens.iter().enumerate() {
            if i > 0 && t.flags.has_leading_space() {
                s.push(' ');
            }
            s.push_str(self.interner.lookup(t.text));
        }
        s
    }

    /// Parse the operands of `#define` into a definition, reporting and
    /// returning `None` when they are malformed.
    pub(super) fn parse_define(&mut self, tokens: &[Token], file: FileId, span: Span) -> Option<MacroDef> {
        let Some(&name_tok) = tokens.first() else {
            return self.bad_define(file, span, "macro name missing");
        };
        if name_tok.kind != TokenKind::Ident {
            return self.bad_define(file, name_tok.span, "macro names must be identifiers");
        }
        if name_tok.text == self.names.defined {
            return self.bad_define(file, name_tok.span, "`defined` cannot be used as a macro name");
        }

        let mut rest = &tokens[1..];
        let mut kind = MacroKind::Object;
        if rest
            .first()
            .is_some_and(|t| t.is_punct(Punct::LParen) && !t.flags.has_leading_space())
        {
            let mut params: Vec<Name> = Vec::new();
            let mut variadic = false;
            let mut i = 1;
            loop {
                let Some(&t) = rest.get(i) else {
                    return self.bad_define(file, span, "missing `)` in macro parameter list");
                };
                i += 1;
                if t.is_punct(Punct::RParen) && i == 2 {
                    break;
                }
                if t.is_punct(Punct::Ellipsis) {
                    params.push(self.names.va_args);
                    variadic = true;
                } else if t.kind == TokenKind::Ident {
                    if t.text == self.names.va_args {
                        return self.bad_define(
                            file,
                            t.span,
                            "`__VA_ARGS__` can only appear in the expansion of a variadic macro",
                        );
                    }
                    if params.contains(&t.text) {
                        let param = self.interner.lookup(t.text);
                        return self.bad_define(file, t.span, format!("duplicate macro parameter `{param}`"));
                    }
                    params.push(t.text);
                    if rest.get(i).is_some_and(|n| n.is_punct(Punct::Ellipsis)) {
                        variadic = true;
                        i += 1;
                    }
                } else {
                    return self.bad_define(file, t.span, "expected parameter name");
                }
                match rest.get(i) {
                    Some(c) if c.is_punct(Punct::Comma) && !variadic => i += 1,
                    Some(c) if c.is_punct(Punct::RParen) => {
                        i += 1;
                        break;
                    }
                    _ => {
                        return self.bad_define(file, span, "expected `,` or `)` in macro parameter list");
                    }
                }
            }
            rest = &rest[i..];
            kind = MacroKind::Function { params, variadic };
        }

        let mut body = rest.to_vec();
        if let Some(first) = body.first_mut() {
            first.flags.clear(TokenFlags::LEADING_SPACE);
        }
        let paste_at_edge = body.first().is_some_and(|t| t.is_punct(Punct::HashHash))
            || body.last().is_some_and(|t| t.is_punct(Punct::HashHash));
        if paste_at_edge {
            return self.bad_define(file, span, "`##` cannot appear at either end of a macro expansion");
        }
        if let MacroKind::Function { params, .. } = &kind {
            let stray_hash = body.iter().enumerate().any(|(i, t)| {
                t.is_punct(Punct::Hash)
                    && !body
                        .get(i + 1)
                        .is_some_and(|n| n.kind == TokenKind::Ident && params.contains(&n.text))
            });
            if stray_hash {
                return self.bad_define(file, span, "`#` is not followed by a macro parameter");
            }
        }

        Some(MacroDef {
            name: name_tok.text,
            kind,
            body,
            file,
            name_span: name_tok.span,
            span,
        })
    }

    fn bad_define(&mut self, file: FileId, span: Span, message: impl Into<String>) -> Option<MacroDef> {
        let message = message.into();
        self.report(
            Diagnostic::error(ErrorCode::P1003)
                .with_message(message.clone())
                .in_file(file)
                .with_label(span, message),
        );
        None
    }

    /// Make `def` visible, warning when it silently changes an existing
    /// definition. `log` controls whether the definition is announced.
    pub(super) fn install_macro(&mut self, def: MacroDef, log: bool) {
        if let Some(prev) = self.macros.get(def.name) {
            if !matches!(prev.kind, MacroKind::Dynamic(_)) && !prev.is_equivalent(&def) {
                let name = self.interner.lookup(def.name);
                let mut diag = Diagnostic::warning(ErrorCode::P1005)
                    .with_message(format!("`{name}` redefined"))
                    .in_file(def.file)
                    .with_label(def.name_span, "redefined here");
                if prev.file == def.file {
                    diag = diag.with_secondary_label(prev.name_span, "previous definition");
                }
                self.report(diag);
            }
        }
        let def = Arc::new(def);
        self.macros.insert(Arc::clone(&def));
        if log {
            if let Some(requestor) = self.requestor.as_deref_mut() {
                requestor.accept_macro(
                    self.interner.lookup(def.name),
                    def.file,
                    def.name_span,
                    def.is_function_like(),
                );
            }
            self.emit(LogEntry::Define(def));
        }
    }

    fn undef_directive(&mut self, file: FileId, span: Span, tokens: &[Token]) {
        let Some(name) = tokens.first().filter(|t| t.kind == TokenKind::Ident) else {
            self.report(
                Diagnostic::error(ErrorCode::P1003)
                    .with_message("no macro name given in #undef directive")
                    .in_file(file)
                    .with_label(span, "expected a macro name"),
            );
            return;
        };
        let was_defined = self.macros.undefine(name.text);
        self.emit(LogEntry::Undef {
            file,
            directive: span,
            name: name.text,
            was_defined,
        });
    }

    pub(super) fn is_defined_name(&self, name: Name) -> bool {
        name == self.names.has_include || self.macros.is_defined(name)
    }

    fn ifdef_directive(&mut self, file: FileId, span: Span, tokens: &[Token], ifdef: bool) -> Result<(), Canceled> {
        let directive = if ifdef { "#ifdef" } else { "#ifndef" };
        let Some(name) = tokens.first().filter(|t| t.kind == TokenKind::Ident).map(|t| t.text) else {
            self.report(
                Diagnostic::error(ErrorCode::P1002)
                    .with_message(format!("no macro name given in {directive} directive"))
                    .in_file(file)
                    .with_label(span, "expected a macro name"),
            );
            let kind = if ifdef {
                ConditionalKind::Ifdef(Name::EMPTY)
            } else {
                ConditionalKind::Ifndef(Name::EMPTY)
            };
            return self.open_conditional(kind, file, span, false);
        };
        let defined = self.is_defined_name(name);
        let (kind, taken) = if ifdef {
            (ConditionalKind::Ifdef(name), defined)
        } else {
            self.open_guard(name);
            (ConditionalKind::Ifndef(name), !defined)
        };
        self.open_conditional(kind, file, span, taken)
    }

    /// Value of an `#if`/`#elif` line. Problems make the branch untaken.
    fn eval_if(&mut self, tokens: &[Token], file: FileId, span: Span) -> Result<bool, Canceled> {
        let replaced = self.replace_defined(tokens, file)?;
        let expanded = self.expand_list(replaced)?;
        let expanded: Vec<Token> = expanded.into_iter().map(|pp| pp.tok).collect();
        let result = expr::evaluate(&expanded, &self.interner, self.dialect, span);
        Ok(match result {
            Ok(value) => value,
            Err(ExprError::DivisionByZero(at)) => {
                self.report(
                    Diagnostic::error(ErrorCode::P1008)
                        .with_message("division by zero in preprocessor expression")
                        .in_file(file)
                        .with_label(at, "divisor is zero"),
                );
                false
            }
            Err(ExprError::Malformed(at, message)) => {
                self.report(
                    Diagnostic::error(ErrorCode::P1007)
                        .with_message(message.clone())
                        .in_file(file)
                        .with_label(at, message),
                );
                false
            }
        })
    }

    /// Replace `defined X`, `defined(X)` and `__has_include(...)` with `1`
    /// or `0` before macro expansion.
    fn replace_defined(&mut self, tokens: &[Token], file: FileId) -> Result<Vec<PpToken>, Canceled> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let t = tokens[i];
            if t.kind == TokenKind::Ident && t.text == self.names.defined {
                let operand = match (tokens.get(i + 1), tokens.get(i + 2), tokens.get(i + 3)) {
                    (Some(n), _, _) if n.kind == TokenKind::Ident => Some((n.text, 2)),
                    (Some(l), Some(n), Some(r))
                        if l.is_punct(Punct::LParen) && n.kind == TokenKind::Ident && r.is_punct(Punct::RParen) =>
                    {
                        Some((n.text, 4))
                    }
                    _ => None,
                };
                let (value, consumed) = match operand {
                    Some((name, consumed)) => (self.is_defined_name(name), consumed),
                    None => {
                        self.report(
                            Diagnostic::error(ErrorCode::P1007)
                                .with_message("operator `defined` requires an identifier")
                                .in_file(file)
                                .with_label(t.span, "missing macro name"),
                        );
                        (false, 1)
                    }
                };
                out.push(PpToken::new(self.truth_token(value, &t)));
                i += consumed;
                continue;
            }
            if t.kind == TokenKind::Ident && t.text == self.names.has_include {
                let (value, consumed) = self.has_include(&tokens[i + 1..], file, t.span)?;
                out.push(PpToken::new(self.truth_token(value, &t)));
                i += 1 + consumed;
                continue;
            }
            out.push(PpToken::new(t));
            i += 1;
        }
        Ok(out)
    }

    /// `__has_include("f")` or `__has_include(<f>)`. Returns the answer and
    /// how many tokens after the operator name were consumed.
    fn has_include(&mut self, rest: &[Token], file: FileId, at: Span) -> Result<(bool, usize), Canceled> {
        let malformed = |pp: &mut Preprocessor| {
            pp.report(
                Diagnostic::error(ErrorCode::P1007)
                    .with_message("`__has_include` requires a header name in parentheses")
                    .in_file(file)
                    .with_label(at, "malformed operand"),
            );
        };
        if !rest.first().is_some_and(|t| t.is_punct(Punct::LParen)) {
            malformed(self);
            return Ok((false, 0));
        }
        let mut i = 1;
        let operand = match rest.get(i) {
            Some(t) if t.kind == TokenKind::StringLiteral => {
                i += 1;
                let text = self.interner.lookup(t.text);
                text.strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .map(|s| (s.to_owned(), false))
            }
            Some(t) if t.is_punct(Punct::Lt) => {
                i += 1;
                let mut header = String::new();
                let mut closed = false;
                while let Some(t) = rest.get(i) {
                    i += 1;
                    if t.is_punct(Punct::Gt) {
                        closed = true;
                        break;
                    }
                    header.push_str(self.interner.lookup(t.text));
                }
                closed.then_some((header, true))
            }
            _ => None,
        };
        let Some((header, system)) = operand.filter(|_| rest.get(i).is_some_and(|t| t.is_punct(Punct::RParen)))
        else {
            malformed(self);
            return Ok((false, i.min(rest.len())));
        };
        self.cancel.check()?;
        let found = self.resolve_include(&header, system, false).is_some();
        Ok((found, i + 1))
    }

    fn truth_token(&self, value: bool, at: &Token) -> Token {
        let text = self.interner.intern(if value { "1" } else { "0" });
        let mut tok = Token::new(TokenKind::IntLiteral, text, at.span, at.file);
        tok.flags = at.flags;
        tok
    }

    fn open_conditional(&mut self, kind: ConditionalKind, file: FileId, span: Span, taken: bool) -> Result<(), Canceled> {
        self.conditionals.push(Conditional {
            file,
            directive: span,
            taken,
            seen_else: false,
        });
        self.emit(LogEntry::Conditional {
            kind,
            file,
            directive: span,
            taken,
        });
        if taken {
            Ok(())
        } else {
            self.skip_group()
        }
    }

    /// The top conditional, when it was opened in the current file.
    fn own_conditional(&mut self) -> Option<&mut Conditional> {
        let base = self.files.last().map_or(0, |f| f.cond_base);
        if self.conditionals.len() > base {
            self.conditionals.last_mut()
        } else {
            None
        }
    }

    fn unbalanced(&mut self, file: FileId, span: Span, message: &str) {
        self.report(
            Diagnostic::error(ErrorCode::P1006)
                .with_message(message.to_owned())
                .in_file(file)
                .with_label(span, message.to_owned()),
        );
    }

    /// `#elif` after a taken group: nothing further is taken.
    fn elif_directive(&mut self, file: FileId, span: Span) -> Result<(), Canceled> {
        let Some(top) = self.own_conditional() else {
            self.unbalanced(file, span, "#elif without #if");
            return Ok(());
        };
        let seen_else = top.seen_else;
        top.taken = true;
        if seen_else {
            self.unbalanced(file, span, "#elif after #else");
        }
        self.guard_branch();
        self.emit(LogEntry::Conditional {
            kind: ConditionalKind::Elif,
            file,
            directive: span,
            taken: false,
        });
        self.skip_group()
    }

    fn else_directive(&mut self, file: FileId, span: Span) -> Result<(), Canceled> {
        let Some(top) = self.own_conditional() else {
            self.unbalanced(file, span, "#else without #if");
            return Ok(());
        };
        let seen_else = std::mem::replace(&mut top.seen_else, true);
        top.taken = true;
        if seen_else {
            self.unbalanced(file, span, "#else after #else");
        }
        self.guard_branch();
        self.emit(LogEntry::Conditional {
            kind: ConditionalKind::Else,
            file,
            directive: span,
            taken: false,
        });
        self.skip_group()
    }

    fn endif_directive(&mut self, file: FileId, span: Span) {
        if self.own_conditional().is_none() {
            self.unbalanced(file, span, "#endif without #if");
            return;
        }
        self.pop_conditional();
        self.emit(LogEntry::Conditional {
            kind: ConditionalKind::Endif,
            file,
            directive: span,
            taken: true,
        });
    }

    fn pop_conditional(&mut self) {
        self.conditionals.pop();
        let depth = self.conditionals.len();
        if let Some(lexer) = self.files.last_mut() {
            if let GuardState::Open { name, depth: open_at } = lexer.guard {
                if open_at == depth {
                    lexer.guard = GuardState::Closed(name);
                }
            }
        }
    }

    /// Skip the rest of an untaken group: up to the `#endif`, or to an
    /// `#elif`/`#else` whose branch is taken.
    fn skip_group(&mut self) -> Result<(), Canceled> {
        let file = self.current_file();
        let region_start = self.files.last().map_or(0, |f| f.pos());
        let mut depth = 0usize;
        loop {
            self.cancel.check()?;
            let Some(lexer) = self.files.last_mut() else {
                return Ok(());
            };
            let Some(hash_at) = lexer.skip_to_directive() else {
                let end = lexer.len();
                self.location_map.add_skipped(file, Span::new(region_start, end));
                return Ok(());
            };
            // Lexical problems inside skipped text are not reported.
            let mut ignored = Vec::new();
            let Some(name_tok) = lexer.directive_name(&self.interner, &mut ignored) else {
                continue;
            };
            let name = self.interner.lookup(name_tok.text);
            match name {
                "if" | "ifdef" | "ifndef" => {
                    depth += 1;
                    lexer.skip_line();
                }
                "endif" if depth > 0 => {
                    depth -= 1;
                    lexer.skip_line();
                }
                "elif" | "else" if depth > 0 => {
                    lexer.skip_line();
                }
                "endif" => {
                    let end = lexer.skip_line();
                    self.location_map.add_skipped(file, Span::new(region_start, hash_at));
                    self.pop_conditional();
                    self.emit(LogEntry::Conditional {
                        kind: ConditionalKind::Endif,
                        file,
                        directive: Span::new(hash_at, end),
                        taken: true,
                    });
                    return Ok(());
                }
                "else" => {
                    let end = lexer.skip_line();
                    let span = Span::new(hash_at, end);
                    let Some(top) = self.conditionals.last_mut() else {
                        return Ok(());
                    };
                    let seen_else = std::mem::replace(&mut top.seen_else, true);
                    let taken = !top.taken;
                    top.taken = true;
                    if seen_else {
                        self.unbalanced(file, span, "#else after #else");
                    }
                    self.guard_branch();
                    self.emit(LogEntry::Conditional {
                        kind: ConditionalKind::Else,
                        file,
                        directive: span,
                        taken,
                    });
                    if taken {
                        self.location_map.add_skipped(file, Span::new(region_start, hash_at));
                        return Ok(());
                    }
                }
                "elif" => {
                    let (tokens, end) = lexer.read_line(&self.interner, &mut self.lex_problems, false);
                    self.drain_lex_problems();
                    let span = Span::new(hash_at, end);
                    let Some(top) = self.conditionals.last() else {
                        return Ok(());
                    };
                    let (already, seen_else) = (top.taken, top.seen_else);
                    if seen_else {
                        self.unbalanced(file, span, "#elif after #else");
                    }
                    let taken = !already && !seen_else && self.eval_if(&tokens, file, span)?;
                    if let Some(top) = self.conditionals.last_mut() {
                        top.taken |= taken;
                    }
                    self.guard_branch();
                    self.emit(LogEntry::Conditional {
                        kind: ConditionalKind::Elif,
                        file,
                        directive: span,
                        taken,
                    });
                    if taken {
                        self.location_map.add_skipped(file, Span::new(region_start, hash_at));
                        return Ok(());
                    }
                }
                _ => {
                    lexer.skip_line();
                }
            }
        }
    }

    fn line_directive(&mut self, file: FileId, span: Span, tokens: &[Token], marker: bool) {
        let number = tokens
            .first()
            .filter(|t| t.kind == TokenKind::IntLiteral)
            .map(|t| self.interner.lookup(t.text))
            .filter(|text| text.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|text| text.parse::<u32>().ok());
        let file_ok = tokens.get(1).is_none_or(|t| t.kind == TokenKind::StringLiteral);
        if let (Some(number), true) = (number, file_ok) {
            // The line after the directive is presumed to be `number`.
            let next = i64::from(self.location_map.line_number(file, span.start)) + 1;
            if let Some(lexer) = self.files.iter_mut().rev().find(|f| f.file == file) {
                lexer.line_delta = i64::from(number) - next;
            }
        } else {
            let what = if marker { "line marker" } else { "#line directive" };
            self.report(
                Diagnostic::error(ErrorCode::P1014)
                    .with_message(format!("malformed {what}"))
                    .in_file(file)
                    .with_label(span, "expected a line number and optional file name"),
            );
        }
        self.emit(LogEntry::Directive {
            kind: DirectiveKind::Line,
            file,
            directive: span,
        });
    }

    /// A directive was seen; `candidate` when it may open an include guard.
    fn note_directive(&mut self, candidate: bool) {
        let Some(lexer) = self.files.last_mut() else {
            return;
        };
        match lexer.guard {
            GuardState::Start if candidate => {}
            GuardState::Start | GuardState::Closed(_) => lexer.guard = GuardState::NotGuarded,
            GuardState::Open { .. } | GuardState::NotGuarded => {}
        }
    }

    /// A token outside any directive was returned from the current file.
    pub(super) fn note_significant_token(&mut self) {
        if let Some(lexer) = self.files.last_mut() {
            if matches!(lexer.guard, GuardState::Start | GuardState::Closed(_)) {
                lexer.guard = GuardState::NotGuarded;
            }
        }
    }

    fn open_guard(&mut self, name: Name) {
        let depth = self.conditionals.len();
        if let Some(lexer) = self.files.last_mut() {
            if lexer.guard == GuardState::Start {
                lexer.guard = GuardState::Open { name, depth };
            }
        }
    }

    /// `#if !defined G` or `#if !defined(G)` as the first directive.
    fn open_if_guard(&mut self, tokens: &[Token]) {
        if self.files.last().is_none_or(|f| f.guard != GuardState::Start) {
            return;
        }
        let name = match tokens {
            [bang, defined, name]
                if bang.is_punct(Punct::Bang) && defined.text == self.names.defined && name.kind == TokenKind::Ident =>
            {
                Some(name.text)
            }
            [bang, defined, l, name, r]
                if bang.is_punct(Punct::Bang)
                    && defined.text == self.names.defined
                    && l.is_punct(Punct::LParen)
                    && name.kind == TokenKind::Ident
                    && r.is_punct(Punct::RParen) =>
            {
                Some(name.text)
            }
            _ => None,
        };
        match name {
            Some(name) => self.open_guard(name),
            None => {
                if let Some(lexer) = self.files.last_mut() {
                    lexer.guard = GuardState::NotGuarded;
                }
            }
        }
    }

    /// An `#elif`/`#else` on the guard conditional disqualifies it.
    fn guard_branch(&mut self) {
        let depth = self.conditionals.len();
        if let Some(lexer) = self.files.last_mut() {
            if let GuardState::Open { depth: open_at, .. } = lexer.guard {
                if open_at + 1 == depth {
                    lexer.guard = GuardState::NotGuarded;
                }
            }
        }
    }
}
