//! The scanner: directive processing plus macro expansion over a stack of
//! files.
//!
//! Tokens flow from the top [`FileLexer`] through directive handling
//! (`directives.rs`) into the expansion engine (`expand.rs`). Every directive
//! and expansion is recorded in the [`LocationMap`] and forwarded to the
//! optional [`PreprocessorLog`].

mod directives;
mod expand;
mod include;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cidx_diagnostic::Diagnostic;
use cidx_ir::{
    CancellationToken, Canceled, Dialect, FileId, Name, SharedInterner, Span, Token, TokenKind,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ScannerInfo;
use crate::keywords;
use crate::lexer::FileLexer;
use crate::location_map::LocationMap;
use crate::log::{LogEntry, PreprocessorLog};
use crate::macros::{builtin_macros, DynamicMacro, MacroDef, MacroTable, BUILTIN_FILE};
use crate::provider::FileContentProvider;
use crate::requestor::SourceElementRequestor;

use expand::{PpToken, StreamInput};

/// Shared services a scan needs.
#[derive(Clone)]
pub struct ScanContext {
    pub interner: SharedInterner,
    pub provider: Arc<dyn FileContentProvider>,
    pub cancel: CancellationToken,
}

impl ScanContext {
    pub fn new(interner: SharedInterner, provider: Arc<dyn FileContentProvider>) -> Self {
        ScanContext {
            interner,
            provider,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Open conditional directive.
#[derive(Copy, Clone, Debug)]
struct Conditional {
    file: FileId,
    directive: Span,
    /// Some branch of this conditional has been taken.
    taken: bool,
    seen_else: bool,
}

/// Pre-interned spellings the scanner compares against.
struct WellKnown {
    defined: Name,
    has_include: Name,
    va_args: Name,
    once: Name,
}

/// Preprocessor for one translation unit.
pub struct Preprocessor {
    interner: SharedInterner,
    provider: Arc<dyn FileContentProvider>,
    cancel: CancellationToken,
    dialect: Dialect,
    info: ScannerInfo,
    names: WellKnown,
    macros: MacroTable,
    /// Include stack; the bottom entry is the main file once scanning starts.
    files: Vec<FileLexer>,
    /// Main file, parked until the first token is requested.
    main: Option<FileLexer>,
    forced: VecDeque<PathBuf>,
    conditionals: Vec<Conditional>,
    /// Tokens pushed back by macro expansion, next token last.
    pending: Vec<PpToken>,
    location_map: LocationMap,
    log: Option<Box<dyn PreprocessorLog + Send>>,
    requestor: Option<Box<dyn SourceElementRequestor>>,
    problems: Vec<Diagnostic>,
    lex_problems: Vec<Diagnostic>,
    once: FxHashSet<PathBuf>,
    guards: FxHashMap<PathBuf, Name>,
    counter: u32,
    started: bool,
    finished: bool,
}

impl Preprocessor {
    /// Prepare to scan `source`, the text of `path`. Nothing is read until the
    /// first call to [`next_token`](Self::next_token), so definitions, include
    /// paths, the log and the requestor can still be configured.
    pub fn new(
        ctx: ScanContext,
        info: &ScannerInfo,
        dialect: Dialect,
        path: impl Into<PathBuf>,
        source: Arc<str>,
    ) -> Self {
        let path = path.into();
        let mut location_map = LocationMap::new();
        let main_id = location_map.add_file(&path, source.clone());
        let main = FileLexer::new(main_id, path, &source);
        let names = WellKnown {
            defined: ctx.interner.intern("defined"),
            has_include: ctx.interner.intern("__has_include"),
            va_args: ctx.interner.intern("__VA_ARGS__"),
            once: ctx.interner.intern("once"),
        };
        Preprocessor {
            interner: ctx.interner,
            provider: ctx.provider,
            cancel: ctx.cancel,
            dialect,
            info: info.clone(),
            names,
            macros: MacroTable::new(),
            files: Vec::new(),
            main: Some(main),
            forced: info.include_files.iter().cloned().collect(),
            conditionals: Vec::new(),
            pending: Vec::new(),
            location_map,
            log: None,
            requestor: None,
            problems: Vec::new(),
            lex_problems: Vec::new(),
            once: FxHashSet::default(),
            guards: FxHashMap::default(),
            counter: 0,
            started: false,
            finished: false,
        }
    }

    /// Next fully preprocessed token. Returns `Eof` forever once the main file
    /// is exhausted.
    pub fn next_token(&mut self) -> Result<Token, Canceled> {
        self.cancel.check()?;
        self.ensure_started()?;
        if self.finished {
            return Ok(self.eof_token());
        }
        let next = self.expand_next(&mut StreamInput)?;
        match next {
            Some(pp) if !pp.tok.is_eof() => Ok(self.classify_output(pp.tok)),
            _ => {
                self.finished = true;
                let eof = self.eof_token();
                self.emit(LogEntry::EndTranslationUnit {
                    file: FileId::MAIN,
                    offset: eof.span.start,
                });
                Ok(eof)
            }
        }
    }

    /// Install `def`, replacing any definition of the same name.
    pub fn add_definition(&mut self, def: MacroDef) {
        self.install_macro(def, true);
    }

    /// Define `name` (which may carry a parameter list, `F(x)`) as `value`,
    /// as `-D name=value` would.
    pub fn add_definition_str(&mut self, name: &str, value: &str) {
        self.define_from_text(name, value, true);
    }

    pub fn get_definition(&self, name: &str) -> Option<&MacroDef> {
        let name = self.interner.get(name)?;
        self.macros.get(name).map(AsRef::as_ref)
    }

    /// Remove a definition; true when one existed.
    pub fn undefine(&mut self, name: &str) -> bool {
        self.interner
            .get(name)
            .is_some_and(|name| self.macros.undefine(name))
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) {
        self.info.include_paths.push(path.into());
    }

    /// Replace the `-I` search path.
    pub fn overwrite_include_paths(&mut self, paths: Vec<PathBuf>) {
        self.info.include_paths = paths;
    }

    pub fn set_requestor(&mut self, requestor: Box<dyn SourceElementRequestor>) {
        self.requestor = Some(requestor);
    }

    pub fn take_requestor(&mut self) -> Option<Box<dyn SourceElementRequestor>> {
        self.requestor.take()
    }

    /// Requestor for declaration callbacks from the parser.
    pub fn requestor_mut(&mut self) -> Option<&mut (dyn SourceElementRequestor + 'static)> {
        self.requestor.as_deref_mut()
    }

    pub fn set_log(&mut self, log: Box<dyn PreprocessorLog + Send>) {
        self.log = Some(log);
    }

    pub fn take_log(&mut self) -> Option<Box<dyn PreprocessorLog + Send>> {
        self.log.take()
    }

    /// 1-based line of `offset` in the main file.
    pub fn line_number_for_offset(&self, offset: u32) -> u32 {
        self.location_map.line_number(FileId::MAIN, offset)
    }

    pub fn location_map(&self) -> &LocationMap {
        &self.location_map
    }

    pub fn problems(&self) -> &[Diagnostic] {
        &self.problems
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Give up the scan, keeping its location map and problems.
    pub fn finish(self) -> (LocationMap, Vec<Diagnostic>) {
        (self.location_map, self.problems)
    }

    fn eof_token(&self) -> Token {
        let len = self
            .location_map
            .source(FileId::MAIN)
            .map_or(0, |s| u32::try_from(s.len()).unwrap_or(u32::MAX));
        Token::eof(FileId::MAIN, len)
    }

    /// Resolve keywords and C++ alternative operator spellings.
    fn classify_output(&self, mut tok: Token) -> Token {
        if tok.kind == TokenKind::Ident {
            let text = self.interner.lookup(tok.text);
            if let Some(kw) = keywords::keyword(self.dialect, text) {
                tok.kind = TokenKind::Keyword(kw);
            } else if let Some(p) = keywords::alternative_token(self.dialect, text) {
                tok.kind = TokenKind::Punct(p);
            }
        }
        tok
    }

    /// Install built-ins and command-line definitions, scan macro files, and
    /// open the main file and the first forced include.
    #[tracing::instrument(level = "debug", skip_all)]
    fn ensure_started(&mut self) -> Result<(), Canceled> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        for &(name, value) in builtin_macros(self.dialect) {
            self.define_from_text(name, value, false);
        }
        for (spelling, which) in DynamicMacro::ALL {
            let name = self.interner.intern(spelling);
            self.macros.define(MacroDef::dynamic(name, which));
        }
        for (name, value) in std::mem::take(&mut self.info.defines) {
            self.define_from_text(&name, &value, true);
        }
        for name in std::mem::take(&mut self.info.undefines) {
            self.undefine(&name);
        }

        let Some(main) = self.main.take() else {
            return Ok(());
        };
        self.emit(LogEntry::StartTranslationUnit {
            file: main.file,
            path: main.path.clone(),
        });

        for path in self.info.macro_files.clone() {
            self.scan_macro_file(&main.path, &path)?;
        }

        self.files.push(main);
        self.open_next_forced_include();
        Ok(())
    }

    /// Scan a macro file for its definitions, discarding its tokens.
    fn scan_macro_file(&mut self, main_path: &Path, path: &Path) -> Result<(), Canceled> {
        let Some((path, source)) = self.read_command_line_file(main_path, path) else {
            self.report_missing_command_line_file(path);
            return Ok(());
        };
        tracing::debug!(path = %path.display(), "scanning macro file");
        let id = self.location_map.add_file(&path, source.clone());
        self.files.push(FileLexer::new(id, path, &source));
        loop {
            let tok = self.next_file_token()?;
            if tok.tok.is_eof() {
                break;
            }
        }
        self.files.clear();
        self.pending.clear();
        Ok(())
    }

    fn open_next_forced_include(&mut self) {
        let Some(path) = self.forced.pop_front() else {
            return;
        };
        let main_path = self
            .location_map
            .path(FileId::MAIN)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let Some((path, source)) = self.read_command_line_file(&main_path, &path) else {
            self.report_missing_command_line_file(&path);
            self.open_next_forced_include();
            return;
        };
        self.push_file(path, source, None, (FileId::MAIN, Span::point(0)));
    }

    /// Locate a `-include`/`-imacros` file: as given, next to the main file,
    /// then along the include path.
    fn read_command_line_file(&self, main_path: &Path, path: &Path) -> Option<(PathBuf, Arc<str>)> {
        let mut candidates = vec![path.to_path_buf()];
        if path.is_relative() {
            if let Some(dir) = main_path.parent() {
                candidates.push(dir.join(path));
            }
            candidates.extend(self.info.include_paths.iter().map(|d| d.join(path)));
        }
        candidates.into_iter().find_map(|candidate| {
            let candidate = include::normalize(&candidate);
            self.provider.read(&candidate).map(|s| (candidate, s))
        })
    }

    fn report_missing_command_line_file(&mut self, path: &Path) {
        let diag = Diagnostic::error(cidx_diagnostic::ErrorCode::P1001)
            .with_message(format!("{}: no such file", path.display()))
            .in_file(FileId::MAIN);
        self.report(diag);
    }

    /// Push `path` onto the include stack.
    fn push_file(
        &mut self,
        path: PathBuf,
        source: Arc<str>,
        found_in: Option<usize>,
        from: (FileId, Span),
    ) {
        let id = self.location_map.add_file(&path, source.clone());
        let mut lexer = FileLexer::new(id, path.clone(), &source);
        lexer.found_in = found_in;
        lexer.cond_base = self.conditionals.len();
        lexer.included_from = Some(from);
        self.emit(LogEntry::StartInclusion {
            file: from.0,
            directive: from.1,
            included: id,
            path: path.clone(),
        });
        if let Some(requestor) = self.requestor.as_deref_mut() {
            requestor.enter_inclusion(&path, id, from.1);
        }
        tracing::trace!(path = %path.display(), depth = self.files.len(), "enter file");
        self.files.push(lexer);
    }

    /// Next token after directive processing, before macro expansion. At the
    /// end of an included file, pops back to the includer.
    fn next_file_token(&mut self) -> Result<PpToken, Canceled> {
        loop {
            self.cancel.check()?;
            let Some(lexer) = self.files.last_mut() else {
                return Ok(PpToken::new(self.eof_token()));
            };
            let tok = lexer.next(&self.interner, &mut self.lex_problems);
            self.drain_lex_problems();
            if tok.is_eof() {
                if self.end_of_file() {
                    return Ok(PpToken::new(tok));
                }
                continue;
            }
            if tok.is_punct(cidx_ir::Punct::Hash) && tok.flags.is_line_start() {
                self.directive(tok)?;
                continue;
            }
            self.note_significant_token();
            return Ok(PpToken::new(tok));
        }
    }

    /// Close the top file. Returns true when it is the bottom of the stack,
    /// which stays open and keeps producing `Eof`.
    fn end_of_file(&mut self) -> bool {
        let Some(lexer) = self.files.last() else {
            return true;
        };
        let cond_base = lexer.cond_base;
        let file = lexer.file;
        while self.conditionals.len() > cond_base {
            if let Some(open) = self.conditionals.pop() {
                let diag = Diagnostic::error(cidx_diagnostic::ErrorCode::P1006)
                    .with_message("unterminated conditional directive")
                    .in_file(open.file)
                    .with_label(open.directive, "conditional opened here");
                self.report(diag);
            }
        }
        if let Some(lexer) = self.files.last() {
            if let crate::lexer::GuardState::Closed(guard) = lexer.guard {
                self.guards.insert(lexer.path.clone(), guard);
            }
        }
        if self.files.len() <= 1 {
            return true;
        }
        if let Some(lexer) = self.files.pop() {
            let offset = lexer.len();
            self.emit(LogEntry::EndInclusion {
                included: file,
                offset,
            });
            if let Some(requestor) = self.requestor.as_deref_mut() {
                requestor.exit_inclusion(file);
            }
            tracing::trace!(path = %lexer.path.display(), "leave file");
        }
        if self.files.len() == 1 {
            self.open_next_forced_include();
        }
        false
    }

    fn drain_lex_problems(&mut self) {
        if self.lex_problems.is_empty() {
            return;
        }
        for diag in std::mem::take(&mut self.lex_problems) {
            self.report(diag);
        }
    }

    /// Record a problem everywhere it is observable.
    fn report(&mut self, diag: Diagnostic) {
        tracing::debug!(code = %diag.code, message = %diag.message, "preprocessor problem");
        if let Some(requestor) = self.requestor.as_deref_mut() {
            requestor.accept_problem(&diag);
        }
        self.emit(LogEntry::Problem(diag.clone()));
        self.problems.push(diag);
    }

    fn emit(&mut self, entry: LogEntry) {
        if let Some(log) = self.log.as_deref_mut() {
            entry.dispatch(log);
        }
        self.location_map.record(entry);
    }

    /// File and span a problem about `tok` should point at.
    fn origin(&self, tok: &Token) -> (FileId, Span) {
        match tok.expansion.and_then(|e| self.location_map.expansion(e)) {
            Some(info) => (info.file, info.invocation),
            None => (tok.file, tok.span),
        }
    }

    fn current_file(&self) -> FileId {
        self.files.last().map_or(FileId::MAIN, |f| f.file)
    }

    fn define_from_text(&mut self, name: &str, value: &str, log: bool) {
        let text = format!("{name} {value}");
        let mut lexer = FileLexer::new(BUILTIN_FILE, PathBuf::from("<command line>"), &text);
        let mut problems = Vec::new();
        let (tokens, end) = lexer.read_line(&self.interner, &mut problems, false);
        let span = Span::new(0, end);
        if let Some(def) = self.parse_define(&tokens, BUILTIN_FILE, span) {
            self.install_macro(def, log);
        }
    }
}

#[cfg(test)]
mod tests;
