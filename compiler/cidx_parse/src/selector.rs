//! Finding the names a source range selects.
//!
//! Editors ask "what is at this selection": every name enclosed by the range,
//! or, when the range sits inside a single name, that name. Macro expansions
//! overlapping the range come from the preprocessor's location map.

use cidx_ir::ast::{NameId, TranslationUnit};
use cidx_ir::{ExpansionInfo, FileId, Span};
use cidx_preprocess::LocationMap;

/// Selects name nodes of one file of a translation unit by offset.
pub struct NodeSelector<'a> {
    unit: &'a TranslationUnit,
    file: FileId,
}

impl<'a> NodeSelector<'a> {
    /// Selector over the main file.
    pub fn new(unit: &'a TranslationUnit) -> Self {
        NodeSelector {
            unit,
            file: FileId::MAIN,
        }
    }

    #[must_use]
    pub fn in_file(mut self, file: FileId) -> Self {
        self.file = file;
        self
    }

    /// Names lying completely inside `[start, start + len)`, in source
    /// order. If there are none, the innermost name enclosing the range.
    pub fn names_in_range(&self, start: u32, len: u32) -> Vec<NameId> {
        let range = Span::new(start, start.saturating_add(len));
        let mut enclosed: Vec<(NameId, Span)> = self
            .unit
            .arena
            .names()
            .filter(|(_, name)| name.file == self.file && !name.span.is_empty())
            .filter(|(_, name)| range.contains_span(name.span))
            .map(|(id, name)| (id, name.span))
            .collect();
        if !enclosed.is_empty() {
            enclosed.sort_by_key(|&(id, span)| (span.start, std::cmp::Reverse(span.end), id.index()));
            enclosed.dedup_by_key(|(id, _)| *id);
            return enclosed.into_iter().map(|(id, _)| id).collect();
        }
        self.innermost_enclosing(range).into_iter().collect()
    }

    /// The innermost name covering `offset`.
    pub fn name_at(&self, offset: u32) -> Option<NameId> {
        self.innermost_enclosing(Span::point(offset))
    }

    fn innermost_enclosing(&self, range: Span) -> Option<NameId> {
        self.unit
            .arena
            .names()
            .filter(|(_, name)| name.file == self.file)
            .filter(|(_, name)| name.span.start <= range.start && range.end <= name.span.end)
            .min_by_key(|(id, name)| (name.span.len(), std::cmp::Reverse(id.index())))
            .map(|(id, _)| id)
    }

    /// Outermost macro expansions overlapping the range.
    pub fn macro_expansions_in_range<'m>(
        &self,
        map: &'m LocationMap,
        start: u32,
        len: u32,
    ) -> Vec<&'m ExpansionInfo> {
        let range = Span::new(start, start.saturating_add(len));
        map.expansions_in(self.file, range).collect()
    }
}
