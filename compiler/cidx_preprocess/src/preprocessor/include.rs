//! `#include` and `#include_next`: header lookup and file entry.

use std::path::{Component, Path, PathBuf};

use cidx_diagnostic::{Diagnostic, ErrorCode};
use cidx_ir::{Canceled, FileId, Punct, Span, Token, TokenKind};

use super::expand::PpToken;
use super::Preprocessor;
use crate::log::LogEntry;

/// Resolve `.` and `..` components without touching the file system.
pub(super) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !matches!(out.components().next_back(), Some(Component::RootDir)) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `"name"` or `<name>` spelled as one token.
fn header_literal(text: &str) -> Option<(String, bool)> {
    if let Some(inner) = text.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return Some((inner.to_owned(), true));
    }
    text.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(|inner| (inner.to_owned(), false))
}

impl Preprocessor {
    pub(super) fn include_directive(
        &mut self,
        file: FileId,
        span: Span,
        tokens: &[Token],
        next: bool,
    ) -> Result<(), Canceled> {
        let Some((header, system)) = self.header_operand(tokens)? else {
            self.report(
                Diagnostic::error(ErrorCode::P1002)
                    .with_message("#include expects \"FILENAME\" or <FILENAME>")
                    .in_file(file)
                    .with_label(span, "malformed include"),
            );
            return Ok(());
        };

        if self.files.len() >= self.info.max_include_depth {
            self.report(
                Diagnostic::error(ErrorCode::P1010)
                    .with_message(format!(
                        "#include nested too deeply (limit is {})",
                        self.info.max_include_depth
                    ))
                    .in_file(file)
                    .with_label(span, "include not entered"),
            );
            self.emit(LogEntry::Include {
                file,
                directive: span,
                header,
                system,
                resolved: None,
            });
            return Ok(());
        }

        let resolved = self.resolve_include(&header, system, next);
        self.emit(LogEntry::Include {
            file,
            directive: span,
            header: header.clone(),
            system,
            resolved: resolved.as_ref().map(|(path, _)| path.clone()),
        });
        let Some((path, found_in)) = resolved else {
            self.report(
                Diagnostic::error(ErrorCode::P1001)
                    .with_message(format!("`{header}`: no such file"))
                    .in_file(file)
                    .with_label(span, "included here"),
            );
            return Ok(());
        };

        if self.once.contains(&path) {
            tracing::trace!(path = %path.display(), "skipping #pragma once file");
            return Ok(());
        }
        if let Some(&guard) = self.guards.get(&path) {
            if self.macros.is_defined(guard) {
                tracing::trace!(path = %path.display(), "skipping guarded file");
                return Ok(());
            }
        }
        let Some(source) = self.provider.read(&path) else {
            self.report(
                Diagnostic::error(ErrorCode::P1001)
                    .with_message(format!("`{}`: cannot read file", path.display()))
                    .in_file(file)
                    .with_label(span, "included here"),
            );
            return Ok(());
        };
        self.push_file(path, source, found_in, (file, span));
        Ok(())
    }

    /// Header named by an include line, expanding macros when it is not
    /// written literally. The flag is true for `<...>`.
    fn header_operand(&mut self, tokens: &[Token]) -> Result<Option<(String, bool)>, Canceled> {
        let Some(first) = tokens.first() else {
            return Ok(None);
        };
        if first.kind == TokenKind::StringLiteral {
            if let Some(found) = header_literal(self.interner.lookup(first.text)) {
                return Ok(Some(found));
            }
        }
        let expanded = self.expand_list(tokens.iter().copied().map(PpToken::new).collect())?;
        let Some(first) = expanded.first() else {
            return Ok(None);
        };
        if first.tok.kind == TokenKind::StringLiteral {
            return Ok(header_literal(self.interner.lookup(first.tok.text)));
        }
        if first.tok.is_punct(Punct::Lt) {
            let mut header = String::new();
            for (i, pp) in expanded.iter().enumerate().skip(1) {
                if pp.tok.is_punct(Punct::Gt) {
                    return Ok(Some((header, true)));
                }
                if i > 1 && pp.tok.flags.has_leading_space() {
                    header.push(' ');
                }
                header.push_str(self.interner.lookup(pp.tok.text));
            }
        }
        Ok(None)
    }

    /// Find `header` along the search path. Returns the normalized path and
    /// the index of the search directory it was found in, if any.
    pub(super) fn resolve_include(&self, header: &str, system: bool, next: bool) -> Option<(PathBuf, Option<usize>)> {
        let header_path = Path::new(header);
        if header_path.is_absolute() {
            let path = normalize(header_path);
            return self.provider.exists(&path).then_some((path, None));
        }
        let current = self.files.last();
        if !system && !next {
            if let Some(dir) = current.and_then(|f| f.path.parent()) {
                let candidate = normalize(&dir.join(header_path));
                if self.provider.exists(&candidate) {
                    return Some((candidate, None));
                }
            }
        }
        let mut start = if system {
            self.info.quote_include_paths.len()
        } else {
            0
        };
        if next {
            if let Some(found_in) = current.and_then(|f| f.found_in) {
                start = start.max(found_in + 1);
            }
        }
        self.info
            .quote_include_paths
            .iter()
            .chain(&self.info.include_paths)
            .enumerate()
            .skip(start)
            .find_map(|(idx, dir)| {
                let candidate = normalize(&dir.join(header_path));
                self.provider.exists(&candidate).then_some((candidate, Some(idx)))
            })
    }
}
