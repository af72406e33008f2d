//! Human-readable problem output.

use std::io::{self, Write};

use cidx_ir::FileId;

use crate::span_utils::LineOffsetTable;
use crate::{Diagnostic, Severity};

/// Resolves a [`FileId`] to its display path and text.
pub trait SourceLookup {
    fn path(&self, file: FileId) -> Option<String>;
    fn text(&self, file: FileId) -> Option<&str>;
}

/// Lookup for emitting without any source text; positions print as spans.
pub struct NoSources;

impl SourceLookup for NoSources {
    fn path(&self, _file: FileId) -> Option<String> {
        None
    }

    fn text(&self, _file: FileId) -> Option<&str> {
        None
    }
}

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const NOTE: &str = "\x1b[1;36m";
    pub const RESET: &str = "\x1b[0m";
}

/// Writes `severity[CODE]: message` followed by `--> path:line:col` labels.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colors: bool) -> Self {
        TerminalEmitter { writer, colors }
    }

    pub fn emit(&mut self, diagnostic: &Diagnostic, sources: &dyn SourceLookup) -> io::Result<()> {
        let color = match diagnostic.severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Note => colors::NOTE,
        };
        if self.colors {
            write!(self.writer, "{color}{}{}", diagnostic.severity, colors::RESET)?;
        } else {
            write!(self.writer, "{}", diagnostic.severity)?;
        }
        writeln!(self.writer, "[{}]: {}", diagnostic.code, diagnostic.message)?;

        for label in &diagnostic.labels {
            let marker = if label.is_primary { "-->" } else { "   " };
            let path = sources
                .path(label.file)
                .unwrap_or_else(|| format!("{:?}", label.file));
            match sources.text(label.file) {
                Some(text) => {
                    let table = LineOffsetTable::build(text);
                    let (line, col) = table.offset_to_line_col(text, label.span.start);
                    writeln!(self.writer, "  {marker} {path}:{line}:{col}: {}", label.message)?;
                    if label.is_primary {
                        if let Some(source_line) = line_text(&table, text, line) {
                            writeln!(self.writer, "   | {source_line}")?;
                        }
                    }
                }
                None => {
                    writeln!(self.writer, "  {marker} {path} {}: {}", label.span, label.message)?;
                }
            }
        }
        for note in &diagnostic.notes {
            writeln!(self.writer, "  = note: {note}")?;
        }
        Ok(())
    }

    pub fn emit_all(
        &mut self,
        diagnostics: &[Diagnostic],
        sources: &dyn SourceLookup,
    ) -> io::Result<()> {
        for d in diagnostics {
            self.emit(d, sources)?;
        }
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn line_text<'a>(table: &LineOffsetTable, text: &'a str, line: u32) -> Option<&'a str> {
    let start = table.line_start_offset(line)? as usize;
    let rest = text.get(start..)?;
    Some(rest.split('\n').next().unwrap_or(rest).trim_end_matches('\r'))
}
