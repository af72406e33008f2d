//! Parser snapshots for speculative parsing.
//!
//! C and C++ need real speculation in two places: template-id versus
//! less-than, and declaration versus expression statement. The parser takes a
//! snapshot, tries one interpretation, and on failure restores and tries the
//! other.
//!
//! Unlike a lookahead-only snapshot, this one also records the arena and
//! problem-list lengths. Restoring truncates both, so only nodes of the
//! winning interpretation stay allocated and a failed attempt leaves no
//! problems behind.
//!
//! ```ignore
//! // Full attempt with automatic restore on failure.
//! if let Some(decl) = self.try_parse(|p| p.parse_declaration(DeclScope::Block).ok()) {
//!     // declaration won
//! }
//!
//! // Token-only predicate; always restores.
//! let is_ctor = self.look_ahead(|p| p.constructor_shape());
//! ```

use cidx_ir::ast::ArenaMark;

use crate::context::ParseContext;

/// Everything needed to undo a speculative parse.
#[derive(Clone, Copy, Debug)]
pub struct ParserSnapshot {
    pub(crate) cursor_pos: usize,
    /// Number of `>>` splits in effect.
    pub(crate) splits: usize,
    pub(crate) arena: ArenaMark,
    pub(crate) problems: usize,
    pub(crate) context: ParseContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_small() {
        assert!(
            std::mem::size_of::<ParserSnapshot>() <= 72,
            "ParserSnapshot should be small (got {} bytes)",
            std::mem::size_of::<ParserSnapshot>()
        );
    }
}
