//! Recursive descent parser for C and C++.
//!
//! Pulls preprocessed tokens from a [`TokenSource`] and builds a
//! [`TranslationUnit`] in an arena. Syntax errors never abort the parse: each
//! becomes a problem node (`DeclKind::Problem`, `StmtKind::Problem` or
//! `ExprKind::Problem`) and parsing resumes at the next declaration or
//! statement boundary.
//!
//! Ambiguities that need more than a token of lookahead (template-id versus
//! less-than, declaration versus expression statement, cast versus
//! parenthesized expression) are settled by speculative parsing; see
//! [`snapshot`].

mod completion;
mod context;
mod cursor;
mod error;
mod grammar;
mod recovery;
mod selector;
mod snapshot;

#[cfg(test)]
mod tests;

pub use context::ParseContext;
pub use error::ParseError;
pub use selector::NodeSelector;
pub use snapshot::ParserSnapshot;

use cidx_diagnostic::Diagnostic;
use cidx_ir::ast::{AstArena, ProblemId, TranslationUnit};
use cidx_ir::{CancellationToken, Canceled, Name, SharedInterner, Span, Token};
use cidx_preprocess::{Preprocessor, SourceElementRequestor};

use cursor::Cursor;
use grammar::DeclScope;

/// A pull-based stream of preprocessed tokens.
pub trait TokenSource {
    /// Next token; `Eof` repeats once the stream is exhausted.
    fn next_token(&mut self) -> Result<Token, Canceled>;

    /// Interner that spells the tokens' `Name`s.
    fn interner(&self) -> SharedInterner;

    /// Receiver for declaration events, if one is attached.
    fn requestor(&mut self) -> Option<&mut (dyn SourceElementRequestor + 'static)> {
        None
    }
}

impl TokenSource for Preprocessor {
    fn next_token(&mut self) -> Result<Token, Canceled> {
        Preprocessor::next_token(self)
    }

    fn interner(&self) -> SharedInterner {
        Preprocessor::interner(self).clone()
    }

    fn requestor(&mut self) -> Option<&mut (dyn SourceElementRequestor + 'static)> {
        self.requestor_mut()
    }
}

/// How much of the translation unit to build.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ParseMode {
    /// Declarations only; function bodies are skipped by brace matching.
    #[default]
    Structural,
    /// Everything, including function bodies.
    Complete,
    /// Complete parse that stops at the caret and records what is being
    /// completed there.
    Completion { offset: u32 },
}

/// Parse result: the translation unit plus its syntax problems.
///
/// `ProblemId`s in problem nodes index into `problems`.
#[derive(Clone, Debug, Default)]
pub struct ParseResult {
    pub unit: TranslationUnit,
    pub problems: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(Diagnostic::is_error)
    }

    pub fn problem(&self, id: ProblemId) -> Option<&Diagnostic> {
        self.problems.get(id.index())
    }
}

/// Parse a whole translation unit.
///
/// Returns `Err(Canceled)` as soon as `cancel` is observed, whether by the
/// token source or at a declaration or statement boundary.
#[tracing::instrument(level = "debug", skip_all, fields(mode = ?mode))]
pub fn parse(
    source: &mut impl TokenSource,
    mode: ParseMode,
    cancel: &CancellationToken,
) -> Result<ParseResult, Canceled> {
    let parser = Parser::new(source, mode, cancel.clone());
    parser.parse_translation_unit()
}

/// Parser state.
pub(crate) struct Parser<'s> {
    cursor: Cursor<'s>,
    arena: AstArena,
    problems: Vec<Diagnostic>,
    mode: ParseMode,
    context: ParseContext,
    /// Depth of nested speculative attempts.
    speculating: u32,
    /// Names of the enclosing class bodies, innermost last.
    class_names: Vec<Name>,
    /// Inside an `extern "C"` block.
    extern_c: bool,
}

impl<'s> Parser<'s> {
    pub(crate) fn new(source: &'s mut dyn TokenSource, mode: ParseMode, cancel: CancellationToken) -> Self {
        let caret = match mode {
            ParseMode::Completion { offset } => Some(offset),
            ParseMode::Structural | ParseMode::Complete => None,
        };
        Parser {
            cursor: Cursor::new(source, cancel, caret),
            arena: AstArena::new(),
            problems: Vec::new(),
            mode,
            context: ParseContext::new(),
            speculating: 0,
            class_names: Vec::new(),
            extern_c: false,
        }
    }

    fn parse_translation_unit(mut self) -> Result<ParseResult, Canceled> {
        let decls = self.parse_declaration_seq(DeclScope::Namespace, false);
        if self.cursor.is_canceled() {
            return Err(Canceled);
        }
        let completion = self.completion_node();
        tracing::debug!(
            decls = decls.len(),
            problems = self.problems.len(),
            "parsed translation unit"
        );
        Ok(ParseResult {
            unit: TranslationUnit {
                arena: self.arena,
                decls,
                completion,
            },
            problems: self.problems,
        })
    }

    // Snapshots

    pub(crate) fn snapshot(&self) -> ParserSnapshot {
        ParserSnapshot {
            cursor_pos: self.cursor.position(),
            splits: self.cursor.split_count(),
            arena: self.arena.mark(),
            problems: self.problems.len(),
            context: self.context,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: ParserSnapshot) {
        self.cursor.rewind(snapshot.cursor_pos, snapshot.splits);
        self.arena.truncate(snapshot.arena);
        self.problems.truncate(snapshot.problems);
        self.context = snapshot.context;
    }

    /// Run `f`; on `None`, or when `f` reported a problem, restore the state
    /// from before the attempt.
    pub(crate) fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let snapshot = self.snapshot();
        self.speculating += 1;
        let result = f(self);
        self.speculating -= 1;
        match result {
            Some(value) if self.problems.len() == snapshot.problems => Some(value),
            _ => {
                self.restore(snapshot);
                None
            }
        }
    }

    /// Evaluate a predicate that may consume tokens, then restore.
    pub(crate) fn look_ahead(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let snapshot = self.snapshot();
        self.speculating += 1;
        let result = f(self);
        self.speculating -= 1;
        self.restore(snapshot);
        result
    }

    /// Run `f` with `flag` added to the context.
    pub(crate) fn with_context<T>(&mut self, flag: ParseContext, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.context;
        self.context = self.context.with(flag);
        let result = f(self);
        self.context = saved;
        result
    }

    /// Run `f` with `flag` removed from the context.
    pub(crate) fn without_context<T>(&mut self, flag: ParseContext, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.context;
        self.context = self.context.without(flag);
        let result = f(self);
        self.context = saved;
        result
    }

    // Problems and notifications

    /// Record a problem and return its id.
    pub(crate) fn report(&mut self, error: &ParseError) -> ProblemId {
        let id = ProblemId::new(u32::try_from(self.problems.len()).unwrap_or(u32::MAX));
        let diag = error.to_diagnostic();
        tracing::trace!(code = %diag.code, message = %diag.message, "syntax problem");
        if self.speculating == 0 {
            if let Some(requestor) = self.cursor.requestor() {
                requestor.accept_problem(&diag);
            }
        }
        self.problems.push(diag);
        id
    }

    /// Deliver a declaration event unless parsing speculatively or inside a
    /// function body.
    pub(crate) fn notify(&mut self, f: impl FnOnce(&mut dyn SourceElementRequestor)) {
        if self.speculating > 0 || self.context.in_block() {
            return;
        }
        if let Some(requestor) = self.cursor.requestor() {
            f(requestor);
        }
    }

    /// True when the parse must stop: canceled or out of tokens.
    pub(crate) fn halted(&mut self) -> bool {
        self.cursor.is_canceled() || self.cursor.is_at_end()
    }

    /// Span from `start` through the last consumed token.
    pub(crate) fn span_from(&mut self, start: Span) -> Span {
        let end = self.cursor.previous_span();
        if end.end < start.start {
            start
        } else {
            start.merge(end)
        }
    }
}
