//! Macro expansion.
//!
//! Rescanning follows Prosser's hide-set algorithm: every token carries the
//! set of macro names whose expansion produced it, and an identifier is never
//! expanded inside its own hide set. Such an identifier is painted blue and
//! stays unexpanded even if it is rescanned later.

use std::path::Path;

use cidx_diagnostic::{Diagnostic, ErrorCode};
use cidx_ir::stack::ensure_sufficient_stack;
use cidx_ir::{Canceled, ExpansionId, ExpansionInfo, FileId, Name, Punct, Span, Token, TokenFlags, TokenKind};
use cidx_lexer_core::{RawScanner, RawTag, SourceBuffer};
use smallvec::SmallVec;

use super::Preprocessor;
use crate::lexer::classify;
use crate::log::LogEntry;
use crate::macros::{DynamicMacro, MacroDef, MacroKind};

pub(crate) type HideSet = SmallVec<[Name; 2]>;

/// A token on its way through expansion.
#[derive(Clone, Debug)]
pub(crate) struct PpToken {
    pub(crate) tok: Token,
    pub(crate) hide: HideSet,
}

impl PpToken {
    pub(crate) fn new(tok: Token) -> Self {
        PpToken {
            tok,
            hide: HideSet::new(),
        }
    }

    /// Stand-in for an empty argument next to `##`.
    fn placemarker(at: &Token) -> Self {
        PpToken::new(Token::new(TokenKind::Other, Name::EMPTY, at.span, at.file))
    }

    fn is_placemarker(&self) -> bool {
        self.tok.kind == TokenKind::Other && self.tok.text == Name::EMPTY
    }
}

fn hide_union(set: &mut HideSet, other: &[Name]) {
    for &name in other {
        if !set.contains(&name) {
            set.push(name);
        }
    }
}

fn hide_intersection(a: &[Name], b: &[Name]) -> HideSet {
    a.iter().copied().filter(|n| b.contains(n)).collect()
}

fn from_argument(mut pp: PpToken) -> PpToken {
    pp.tok.flags.set(TokenFlags::FROM_ARGUMENT);
    pp
}

/// Where the expander pulls tokens from.
pub(crate) trait PpInput {
    fn pull(&mut self, pp: &mut Preprocessor) -> Result<Option<PpToken>, Canceled>;

    /// Push `tokens` back so the next pulls return them in order.
    fn unread(&mut self, pp: &mut Preprocessor, tokens: Vec<PpToken>);
}

/// The live token stream: pushed-back tokens, then the include stack.
pub(crate) struct StreamInput;

impl PpInput for StreamInput {
    fn pull(&mut self, pp: &mut Preprocessor) -> Result<Option<PpToken>, Canceled> {
        if let Some(t) = pp.pending.pop() {
            return Ok(Some(t));
        }
        pp.next_file_token().map(Some)
    }

    fn unread(&mut self, pp: &mut Preprocessor, tokens: Vec<PpToken>) {
        pp.pending.extend(tokens.into_iter().rev());
    }
}

/// A closed list, used to pre-expand arguments and `#if` lines.
pub(crate) struct ListInput {
    rev: Vec<PpToken>,
}

impl ListInput {
    pub(crate) fn new(mut tokens: Vec<PpToken>) -> Self {
        tokens.reverse();
        ListInput { rev: tokens }
    }
}

impl PpInput for ListInput {
    fn pull(&mut self, _pp: &mut Preprocessor) -> Result<Option<PpToken>, Canceled> {
        Ok(self.rev.pop())
    }

    fn unread(&mut self, _pp: &mut Preprocessor, tokens: Vec<PpToken>) {
        self.rev.extend(tokens.into_iter().rev());
    }
}

/// One expansion in progress.
struct Invocation {
    name: Name,
    file: FileId,
    span: Span,
    id: ExpansionId,
    function_style: bool,
}

impl Preprocessor {
    /// Next token from `input` that is not a macro invocation. Invocations
    /// are replaced and their output rescanned.
    pub(super) fn expand_next<I: PpInput>(&mut self, input: &mut I) -> Result<Option<PpToken>, Canceled> {
        loop {
            let Some(mut t) = input.pull(self)? else {
                return Ok(None);
            };
            if t.tok.kind != TokenKind::Ident || t.tok.flags.is_painted_blue() {
                return Ok(Some(t));
            }
            let name = t.tok.text;
            let Some(def) = self.macros.get(name).cloned() else {
                return Ok(Some(t));
            };
            if t.hide.contains(&name) {
                t.tok.flags.set(TokenFlags::PAINTED_BLUE);
                return Ok(Some(t));
            }
            match def.kind {
                MacroKind::Object => {
                    let inv = self.begin_expansion(&def, &t, None);
                    let mut hs = t.hide.clone();
                    hide_union(&mut hs, &[name]);
                    let out = self.substitute(&def, &[], &hs, &inv, t.tok.flags)?;
                    self.end_expansion(&inv);
                    input.unread(self, out);
                }
                MacroKind::Function { .. } => {
                    let Some(lparen) = input.pull(self)? else {
                        return Ok(Some(t));
                    };
                    if !lparen.tok.is_punct(Punct::LParen) {
                        input.unread(self, vec![lparen]);
                        return Ok(Some(t));
                    }
                    let Some((args, rparen)) = self.collect_args(input, &def, &t, lparen)? else {
                        return Ok(Some(t));
                    };
                    let inv = self.begin_expansion(&def, &t, Some(&rparen.tok));
                    let mut hs = hide_intersection(&t.hide, &rparen.hide);
                    hide_union(&mut hs, &[name]);
                    let out = self.substitute(&def, &args, &hs, &inv, t.tok.flags)?;
                    self.end_expansion(&inv);
                    input.unread(self, out);
                }
                MacroKind::Dynamic(which) => {
                    let inv = self.begin_expansion(&def, &t, None);
                    let out = self.dynamic_token(which, &t, &inv);
                    self.end_expansion(&inv);
                    return Ok(Some(out));
                }
            }
        }
    }

    /// Fully expand a closed token list.
    pub(super) fn expand_list(&mut self, tokens: Vec<PpToken>) -> Result<Vec<PpToken>, Canceled> {
        ensure_sufficient_stack(|| {
            let mut input = ListInput::new(tokens);
            let mut out = Vec::new();
            while let Some(t) = self.expand_next(&mut input)? {
                out.push(t);
            }
            Ok(out)
        })
    }

    /// Gather the arguments of a function-like invocation after its `(`.
    /// On failure everything consumed is pushed back and `None` returned,
    /// leaving the macro name as an ordinary identifier.
    fn collect_args<I: PpInput>(
        &mut self,
        input: &mut I,
        def: &MacroDef,
        name_tok: &PpToken,
        lparen: PpToken,
    ) -> Result<Option<(Vec<Vec<PpToken>>, PpToken)>, Canceled> {
        let nparams = def.params().len();
        let variadic = def.is_variadic();
        let mut args: Vec<Vec<PpToken>> = vec![Vec::new()];
        let mut consumed = vec![lparen];
        let mut depth = 0u32;
        let rparen = loop {
            let next = input.pull(self)?;
            let t = match next {
                Some(t) if !t.tok.is_eof() => t,
                other => {
                    let (file, span) = self.origin(&name_tok.tok);
                    let name = self.interner.lookup(def.name);
                    self.report(
                        Diagnostic::error(ErrorCode::P1012)
                            .with_message(format!("unterminated argument list invoking macro `{name}`"))
                            .in_file(file)
                            .with_label(span, "macro invoked here"),
                    );
                    consumed.extend(other);
                    input.unread(self, consumed);
                    return Ok(None);
                }
            };
            consumed.push(t.clone());
            match t.tok.kind {
                TokenKind::Punct(Punct::LParen) => depth += 1,
                TokenKind::Punct(Punct::RParen) if depth == 0 => break t,
                TokenKind::Punct(Punct::RParen) => depth -= 1,
                TokenKind::Punct(Punct::Comma) if depth == 0 && !(variadic && args.len() == nparams) => {
                    args.push(Vec::new());
                    continue;
                }
                _ => {}
            }
            if let Some(current) = args.last_mut() {
                current.push(t);
            }
        };

        if nparams == 0 && args.len() == 1 && args[0].is_empty() {
            args.clear();
        }
        if variadic && args.len() + 1 == nparams {
            args.push(Vec::new());
        }
        if args.len() != nparams {
            let (file, span) = self.origin(&name_tok.tok);
            let name = self.interner.lookup(def.name);
            self.report(
                Diagnostic::error(ErrorCode::P1011)
                    .with_message(format!(
                        "macro `{name}` requires {nparams} argument(s), but {} given",
                        args.len()
                    ))
                    .in_file(file)
                    .with_label(span, "macro invoked here"),
            );
            input.unread(self, consumed);
            return Ok(None);
        }
        Ok(Some((args, rparen)))
    }

    /// Register an expansion of `def` invoked by `name_tok`, ending at `end`
    /// for function-like macros.
    fn begin_expansion(&mut self, def: &MacroDef, name_tok: &PpToken, end: Option<&Token>) -> Invocation {
        let tok = &name_tok.tok;
        let enclosing = tok
            .expansion
            .and_then(|id| self.location_map.expansion(id).map(|info| (id, *info)));
        let (file, span, parent, depth) = match enclosing {
            Some((id, info)) => (info.file, info.invocation, Some(id), info.depth.saturating_add(1)),
            None => {
                let mut span = tok.span;
                if let Some(end) = end.filter(|e| !e.is_expanded() && e.file == tok.file) {
                    span = span.merge(end.span);
                }
                (tok.file, span, None, 0)
            }
        };
        let id = self.location_map.add_expansion(ExpansionInfo {
            macro_name: def.name,
            parent,
            depth,
            file,
            invocation: span,
        });
        let function_style = def.is_function_like();
        self.emit(LogEntry::StartExpansion {
            name: def.name,
            file,
            invocation: span,
            function_style,
        });
        if depth == 0 {
            if let Some(requestor) = self.requestor.as_deref_mut() {
                requestor.accept_macro_use(self.interner.lookup(def.name), file, tok.span);
            }
        }
        Invocation {
            name: def.name,
            file,
            span,
            id,
            function_style,
        }
    }

    fn end_expansion(&mut self, inv: &Invocation) {
        self.emit(LogEntry::EndExpansion {
            name: inv.name,
            file: inv.file,
            invocation: inv.span,
            function_style: inv.function_style,
        });
    }

    /// Replacement list of `def` with `args` substituted, before rescanning.
    fn substitute(
        &mut self,
        def: &MacroDef,
        args: &[Vec<PpToken>],
        hs: &[Name],
        inv: &Invocation,
        lead: TokenFlags,
    ) -> Result<Vec<PpToken>, Canceled> {
        let body = &def.body;
        let function_like = def.is_function_like();
        let param_of = |tok: &Token| -> Option<usize> {
            if function_like && tok.kind == TokenKind::Ident {
                def.param_index(tok.text)
            } else {
                None
            }
        };
        let mut expanded: Vec<Option<Vec<PpToken>>> = vec![None; args.len()];
        let mut out: Vec<PpToken> = Vec::with_capacity(body.len());
        let mut i = 0;
        while i < body.len() {
            let tok = body[i];

            if function_like && tok.is_punct(Punct::Hash) {
                if let Some(p) = body.get(i + 1).and_then(|n| param_of(n)) {
                    let s = self.stringize(&args[p], &tok);
                    out.push(PpToken::new(s));
                    i += 2;
                    continue;
                }
            }

            if tok.is_punct(Punct::HashHash) {
                let Some(rhs) = body.get(i + 1) else {
                    i += 1;
                    continue;
                };
                let rhs_param = param_of(rhs);
                // GNU `, ## __VA_ARGS__`: the comma goes away when the
                // variadic argument is empty and is never pasted otherwise.
                let gnu_comma = def.is_variadic()
                    && rhs_param.is_some_and(|p| p + 1 == args.len())
                    && out.last().is_some_and(|l| l.tok.is_punct(Punct::Comma));
                if let (true, Some(p)) = (gnu_comma, rhs_param) {
                    if args[p].is_empty() {
                        out.pop();
                    } else {
                        out.extend(args[p].iter().cloned().map(from_argument));
                    }
                    i += 2;
                    continue;
                }
                let rhs_items: Vec<PpToken> = match rhs_param {
                    Some(p) if args[p].is_empty() => vec![PpToken::placemarker(rhs)],
                    Some(p) => args[p].iter().cloned().map(from_argument).collect(),
                    None => vec![PpToken::new(*rhs)],
                };
                let lhs = out.pop().unwrap_or_else(|| PpToken::placemarker(&tok));
                let mut rest = rhs_items.into_iter();
                match rest.next() {
                    Some(first) => match self.paste(&lhs, &first, inv) {
                        Some(glued) => out.push(glued),
                        None => {
                            out.push(lhs);
                            out.push(first);
                        }
                    },
                    None => out.push(lhs),
                }
                out.extend(rest);
                i += 2;
                continue;
            }

            if let Some(p) = param_of(&tok) {
                let pasted = body.get(i + 1).is_some_and(|n| n.is_punct(Punct::HashHash));
                let mut items: Vec<PpToken> = if pasted {
                    if args[p].is_empty() {
                        vec![PpToken::placemarker(&tok)]
                    } else {
                        args[p].iter().cloned().map(from_argument).collect()
                    }
                } else {
                    let list = match &expanded[p] {
                        Some(list) => list.clone(),
                        None => {
                            let list = self.expand_list(args[p].clone())?;
                            expanded[p] = Some(list.clone());
                            list
                        }
                    };
                    list.into_iter().map(from_argument).collect()
                };
                if let Some(first) = items.first_mut() {
                    if tok.flags.has_leading_space() {
                        first.tok.flags.set(TokenFlags::LEADING_SPACE);
                    } else {
                        first.tok.flags.clear(TokenFlags::LEADING_SPACE);
                    }
                }
                out.extend(items);
                i += 1;
                continue;
            }

            out.push(PpToken::new(tok));
            i += 1;
        }

        out.retain(|t| !t.is_placemarker());
        for (idx, pp) in out.iter_mut().enumerate() {
            hide_union(&mut pp.hide, hs);
            pp.tok.span = inv.span;
            pp.tok.file = inv.file;
            pp.tok.expansion = Some(inv.id);
            pp.tok.flags.clear(TokenFlags::LINE_START);
            if idx == 0 {
                if lead.has_leading_space() {
                    pp.tok.flags.set(TokenFlags::LEADING_SPACE);
                } else {
                    pp.tok.flags.clear(TokenFlags::LEADING_SPACE);
                }
            }
        }
        Ok(out)
    }

    /// `#param`: spell the unexpanded argument as a string literal.
    fn stringize(&self, arg: &[PpToken], hash: &Token) -> Token {
        let mut s = String::with_capacity(16);
        s.push('"');
        for (i, pp) in arg.iter().enumerate() {
            if i > 0 && pp.tok.flags.has_leading_space() {
                s.push(' ');
            }
            let text = self.interner.lookup(pp.tok.text);
            if matches!(pp.tok.kind, TokenKind::StringLiteral | TokenKind::CharLiteral) {
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        s.push('\\');
                    }
                    s.push(c);
                }
            } else {
                s.push_str(text);
            }
        }
        s.push('"');
        let mut tok = Token::new(TokenKind::StringLiteral, self.interner.intern(&s), hash.span, hash.file);
        tok.flags = hash.flags;
        tok
    }

    /// `lhs ## rhs`. `None` when the spellings do not form one token.
    fn paste(&mut self, lhs: &PpToken, rhs: &PpToken, inv: &Invocation) -> Option<PpToken> {
        if lhs.is_placemarker() {
            return Some(rhs.clone());
        }
        if rhs.is_placemarker() {
            return Some(lhs.clone());
        }
        let left = self.interner.lookup(lhs.tok.text);
        let right = self.interner.lookup(rhs.tok.text);
        let text = format!("{left}{right}");
        let buffer = SourceBuffer::new(&text);
        let raw = RawScanner::new(buffer.cursor()).next_token();
        let single = usize::try_from(raw.len).is_ok_and(|len| len == text.len())
            && !raw.tag.is_trivia()
            && !matches!(
                raw.tag,
                RawTag::Other
                    | RawTag::Eof
                    | RawTag::Newline
                    | RawTag::UnterminatedString
                    | RawTag::UnterminatedChar
                    | RawTag::UnterminatedComment
            );
        if !single {
            self.report(
                Diagnostic::error(ErrorCode::P1009)
                    .with_message(format!(
                        "pasting `{left}` and `{right}` does not give a valid preprocessing token"
                    ))
                    .in_file(inv.file)
                    .with_label(inv.span, "in this expansion"),
            );
            return None;
        }
        let mut tok = Token::new(classify(raw.tag, &text), self.interner.intern(&text), lhs.tok.span, lhs.tok.file);
        tok.flags = lhs.tok.flags;
        Some(PpToken {
            tok,
            hide: hide_intersection(&lhs.hide, &rhs.hide),
        })
    }

    fn dynamic_token(&mut self, which: DynamicMacro, name_tok: &PpToken, inv: &Invocation) -> PpToken {
        let (kind, text) = match which {
            DynamicMacro::File => {
                let path = self.files.last().map(|f| f.path.clone()).unwrap_or_default();
                (TokenKind::StringLiteral, quote_path(&path))
            }
            DynamicMacro::BaseFile => {
                let path = self.location_map.path(FileId::MAIN).map(Path::to_path_buf).unwrap_or_default();
                (TokenKind::StringLiteral, quote_path(&path))
            }
            DynamicMacro::Line => {
                let physical = i64::from(self.location_map.line_number(inv.file, inv.span.start));
                let delta = self
                    .files
                    .iter()
                    .rev()
                    .find(|f| f.file == inv.file)
                    .map_or(0, |f| f.line_delta);
                (TokenKind::IntLiteral, (physical + delta).max(0).to_string())
            }
            DynamicMacro::Counter => {
                let n = self.counter;
                self.counter = self.counter.wrapping_add(1);
                (TokenKind::IntLiteral, n.to_string())
            }
            DynamicMacro::IncludeLevel => (
                TokenKind::IntLiteral,
                self.files.len().saturating_sub(1).to_string(),
            ),
        };
        let mut tok = Token::new(kind, self.interner.intern(&text), inv.span, inv.file);
        tok.flags = name_tok.tok.flags;
        tok.flags.clear(TokenFlags::LINE_START);
        tok.expansion = Some(inv.id);
        PpToken {
            tok,
            hide: name_tok.hide.clone(),
        }
    }
}

fn quote_path(path: &Path) -> String {
    let shown = path.display().to_string();
    format!("\"{}\"", shown.replace('\\', "\\\\").replace('"', "\\\""))
}
