//! Collects problems, drops duplicates and enforces a limit.

use cidx_ir::FileId;

use crate::Diagnostic;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors kept (0 = unlimited). Warnings do not count.
    pub error_limit: usize,
    /// Drop a problem identical in code, file and line to one already kept.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 100,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct QueuedDiagnostic {
    diagnostic: Diagnostic,
    file: FileId,
    line: u32,
    column: u32,
}

/// Problems of one translation unit, sorted by position on flush.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<QueuedDiagnostic>,
    error_count: usize,
    suppressed: usize,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..Self::default()
        }
    }

    /// Queue `diag` at a 1-based position. Returns `false` if it was filtered.
    pub fn add(&mut self, diag: Diagnostic, line: u32, column: u32) -> bool {
        let is_error = diag.is_error();
        if is_error && self.limit_reached() {
            self.suppressed += 1;
            return false;
        }
        let file = diag.primary_file();
        if self.config.deduplicate && self.is_duplicate(&diag, file, line) {
            return false;
        }
        if is_error {
            self.error_count += 1;
        }
        self.diagnostics.push(QueuedDiagnostic {
            diagnostic: diag,
            file,
            line,
            column,
        });
        true
    }

    fn is_duplicate(&self, diag: &Diagnostic, file: FileId, line: u32) -> bool {
        self.diagnostics.iter().rev().take(16).any(|q| {
            q.file == file
                && q.line == line
                && q.diagnostic.code == diag.code
                && q.diagnostic.message == diag.message
        })
    }

    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Errors dropped because the limit was reached.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Drain problems sorted by (file, line, column).
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by_key(|d| (d.file.raw(), d.line, d.column));
        self.error_count = 0;
        self.suppressed = 0;
        self.diagnostics.drain(..).map(|d| d.diagnostic).collect()
    }

    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().map(|d| &d.diagnostic)
    }
}

#[cfg(test)]
mod tests;
