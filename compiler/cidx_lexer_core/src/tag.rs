/// Raw token classification.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RawTag {
    Ident,
    /// A preprocessing number: `42`, `0x1Fu`, `1.5e-3f`, `1'000`.
    Number,
    CharLit,
    StringLit,
    /// Any punctuator, including `#` and `##`. The spelling decides which.
    Punct,
    /// Spaces, tabs, form feeds, lone `\r`, and backslash-newline splices.
    Whitespace,
    Newline,
    LineComment,
    BlockComment,
    /// `<stdio.h>`; produced only by [`crate::RawScanner::header_name`].
    HeaderName,
    /// A byte that starts no token.
    Other,
    UnterminatedString,
    UnterminatedChar,
    UnterminatedComment,
    Eof,
}

impl RawTag {
    /// Tokens the preprocessor skips between significant tokens.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            RawTag::Whitespace | RawTag::LineComment | RawTag::BlockComment
        )
    }
}

/// One scanned token: its tag and byte length.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RawToken {
    pub tag: RawTag,
    pub len: u32,
}

const _: () = assert!(std::mem::size_of::<RawToken>() <= 8);
