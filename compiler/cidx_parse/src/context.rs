//! Parse context flags for context-sensitive parsing.
//!
//! C++ reuses `>` both as an operator and as the closer of a template
//! argument list, and declarations inside function bodies are locals. The
//! parser threads these flags through recursive calls and saves
//! them in snapshots.

/// Context flags for parsing. Multiple flags combine with [`with`](Self::with).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseContext(u16);

impl ParseContext {
    pub const NONE: Self = Self(0);

    /// Inside a template argument list: a bare `>` or `>>` closes the list
    /// instead of being a relational or shift operator.
    pub const NO_GT: Self = Self(1 << 0);

    /// Inside a function body. Declarations here are locals and are not
    /// announced to the requestor.
    pub const IN_BLOCK: Self = Self(1 << 1);

    #[inline]
    pub const fn new() -> Self {
        Self::NONE
    }

    #[inline]
    pub const fn has(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }

    #[inline]
    #[must_use]
    pub const fn without(self, flag: Self) -> Self {
        Self(self.0 & !flag.0)
    }

    #[inline]
    pub const fn gt_closes(self) -> bool {
        self.has(Self::NO_GT)
    }

    #[inline]
    pub const fn in_block(self) -> bool {
        self.has(Self::IN_BLOCK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_clear() {
        let ctx = ParseContext::new()
            .with(ParseContext::NO_GT)
            .with(ParseContext::IN_BLOCK);
        assert!(ctx.gt_closes());
        assert!(ctx.in_block());
        assert!(!ParseContext::new().in_block());
        let ctx = ctx.without(ParseContext::NO_GT);
        assert!(!ctx.gt_closes());
        assert!(ctx.in_block());
    }
}
