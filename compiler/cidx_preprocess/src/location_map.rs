//! Mapping from preprocessed tokens back to unexpanded source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cidx_diagnostic::emitter::SourceLookup;
use cidx_diagnostic::span_utils::LineOffsetTable;
use cidx_ir::{ExpansionId, ExpansionInfo, FileId, Span};
use rustc_hash::FxHashMap;

use crate::log::LogEntry;

struct FileEntry {
    path: PathBuf,
    source: Arc<str>,
    lines: LineOffsetTable,
}

/// Files, expansions, skipped regions and the full event log of one scan.
#[derive(Default)]
pub struct LocationMap {
    files: Vec<FileEntry>,
    by_path: FxHashMap<PathBuf, FileId>,
    expansions: Vec<ExpansionInfo>,
    entries: Vec<LogEntry>,
    skipped: Vec<(FileId, Span)>,
}

impl LocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `path`, registering it on first sight. The first file
    /// registered is [`FileId::MAIN`].
    pub(crate) fn add_file(&mut self, path: &Path, source: Arc<str>) -> FileId {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }
        let id = FileId::new(u32::try_from(self.files.len()).unwrap_or(u32::MAX));
        self.files.push(FileEntry {
            path: path.to_path_buf(),
            lines: LineOffsetTable::build(&source),
            source,
        });
        self.by_path.insert(path.to_path_buf(), id);
        id
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn path(&self, file: FileId) -> Option<&Path> {
        self.files.get(file.index()).map(|f| f.path.as_path())
    }

    pub fn source(&self, file: FileId) -> Option<&str> {
        self.files.get(file.index()).map(|f| &*f.source)
    }

    /// Every file seen during the scan, in order of first inclusion.
    pub fn files(&self) -> impl Iterator<Item = (FileId, &Path)> {
        self.files.iter().enumerate().map(|(i, f)| {
            (
                FileId::new(u32::try_from(i).unwrap_or(u32::MAX)),
                f.path.as_path(),
            )
        })
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// 1-based line of `offset` in `file`; 0 for an unknown file.
    pub fn line_number(&self, file: FileId, offset: u32) -> u32 {
        self.files
            .get(file.index())
            .map_or(0, |f| f.lines.line_from_offset(offset))
    }

    pub(crate) fn record(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub(crate) fn add_expansion(&mut self, info: ExpansionInfo) -> ExpansionId {
        let id = ExpansionId::new(u32::try_from(self.expansions.len()).unwrap_or(u32::MAX));
        self.expansions.push(info);
        id
    }

    pub fn expansion(&self, id: ExpansionId) -> Option<&ExpansionInfo> {
        self.expansions.get(id.index())
    }

    /// `id` and its enclosing expansions, innermost first.
    pub fn expansion_chain(&self, id: ExpansionId) -> Vec<&ExpansionInfo> {
        let mut chain = Vec::new();
        let mut next = Some(id);
        while let Some(current) = next {
            let Some(info) = self.expansion(current) else {
                break;
            };
            chain.push(info);
            next = info.parent;
        }
        chain
    }

    /// Outermost expansions whose invocation overlaps `range` in `file`.
    pub fn expansions_in(&self, file: FileId, range: Span) -> impl Iterator<Item = &ExpansionInfo> {
        self.expansions.iter().filter(move |info| {
            info.parent.is_none()
                && info.file == file
                && info.invocation.start < range.end.max(range.start + 1)
                && range.start < info.invocation.end.max(info.invocation.start + 1)
        })
    }

    pub(crate) fn add_skipped(&mut self, file: FileId, span: Span) {
        if !span.is_empty() {
            self.skipped.push((file, span));
        }
    }

    /// Source regions of `file` excluded by untaken conditional branches.
    pub fn skipped_ranges(&self, file: FileId) -> impl Iterator<Item = Span> + '_ {
        self.skipped
            .iter()
            .filter(move |(f, _)| *f == file)
            .map(|&(_, span)| span)
    }
}

impl SourceLookup for LocationMap {
    fn path(&self, file: FileId) -> Option<String> {
        LocationMap::path(self, file).map(|p| p.display().to_string())
    }

    fn text(&self, file: FileId) -> Option<&str> {
        self.source(file)
    }
}
