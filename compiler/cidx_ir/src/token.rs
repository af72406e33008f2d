//! Preprocessed tokens and their macro-expansion provenance.

use std::fmt;

use crate::{FileId, Name, Span};

/// C/C++ punctuators, including the preprocessor pseudo-tokens `#` and `##`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semi,
    Comma,
    Colon,
    ColonColon,
    Dot,
    Ellipsis,
    Arrow,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Assign,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
    AmpAmp,
    PipePipe,
    Shl,
    Shr,
    PlusPlus,
    MinusMinus,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    /// `#` (stringize / directive introducer).
    Hash,
    /// `##` (token paste).
    HashHash,
}

impl Punct {
    /// Spelling of the punctuator.
    pub const fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Semi => ";",
            Punct::Comma => ",",
            Punct::Colon => ":",
            Punct::ColonColon => "::",
            Punct::Dot => ".",
            Punct::Ellipsis => "...",
            Punct::Arrow => "->",
            Punct::Question => "?",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Amp => "&",
            Punct::Pipe => "|",
            Punct::Caret => "^",
            Punct::Tilde => "~",
            Punct::Bang => "!",
            Punct::Assign => "=",
            Punct::Lt => "<",
            Punct::Gt => ">",
            Punct::Le => "<=",
            Punct::Ge => ">=",
            Punct::EqEq => "==",
            Punct::Ne => "!=",
            Punct::AmpAmp => "&&",
            Punct::PipePipe => "||",
            Punct::Shl => "<<",
            Punct::Shr => ">>",
            Punct::PlusPlus => "++",
            Punct::MinusMinus => "--",
            Punct::PlusAssign => "+=",
            Punct::MinusAssign => "-=",
            Punct::StarAssign => "*=",
            Punct::SlashAssign => "/=",
            Punct::PercentAssign => "%=",
            Punct::AmpAssign => "&=",
            Punct::PipeAssign => "|=",
            Punct::CaretAssign => "^=",
            Punct::ShlAssign => "<<=",
            Punct::ShrAssign => ">>=",
            Punct::Hash => "#",
            Punct::HashHash => "##",
        }
    }

    /// Punctuator with exactly this spelling, if any.
    pub fn from_spelling(text: &str) -> Option<Punct> {
        PUNCTS.iter().copied().find(|p| p.as_str() == text)
    }
}

const PUNCTS: [Punct; 49] = [
    Punct::LParen,
    Punct::RParen,
    Punct::LBracket,
    Punct::RBracket,
    Punct::LBrace,
    Punct::RBrace,
    Punct::Semi,
    Punct::Comma,
    Punct::Colon,
    Punct::ColonColon,
    Punct::Dot,
    Punct::Ellipsis,
    Punct::Arrow,
    Punct::Question,
    Punct::Plus,
    Punct::Minus,
    Punct::Star,
    Punct::Slash,
    Punct::Percent,
    Punct::Amp,
    Punct::Pipe,
    Punct::Caret,
    Punct::Tilde,
    Punct::Bang,
    Punct::Assign,
    Punct::Lt,
    Punct::Gt,
    Punct::Le,
    Punct::Ge,
    Punct::EqEq,
    Punct::Ne,
    Punct::AmpAmp,
    Punct::PipePipe,
    Punct::Shl,
    Punct::Shr,
    Punct::PlusPlus,
    Punct::MinusMinus,
    Punct::PlusAssign,
    Punct::MinusAssign,
    Punct::StarAssign,
    Punct::SlashAssign,
    Punct::PercentAssign,
    Punct::AmpAssign,
    Punct::PipeAssign,
    Punct::CaretAssign,
    Punct::ShlAssign,
    Punct::ShrAssign,
    Punct::Hash,
    Punct::HashHash,
];

/// Reserved words of C and C++.
///
/// Which spellings are keywords depends on the dialect; see
/// `cidx_preprocess::keywords`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Keyword {
    Auto,
    Bool,
    Break,
    Case,
    Char,
    Class,
    Const,
    ConstCast,
    Continue,
    Default,
    Delete,
    Do,
    Double,
    DynamicCast,
    Else,
    Enum,
    Explicit,
    Extern,
    False,
    Float,
    For,
    Friend,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Mutable,
    Namespace,
    New,
    Nullptr,
    Operator,
    Private,
    Protected,
    Public,
    Register,
    ReinterpretCast,
    Restrict,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    StaticCast,
    Struct,
    Switch,
    Template,
    This,
    Throw,
    True,
    Try,
    Typedef,
    Typename,
    Union,
    Unsigned,
    Using,
    Virtual,
    Void,
    Volatile,
    WcharT,
    While,
}

/// Token classification after preprocessing.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TokenKind {
    Ident,
    Keyword(Keyword),
    IntLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,
    Punct(Punct),
    /// A byte that starts no valid token (`@`, `` ` ``, stray `\`).
    Other,
    Eof,
}

impl TokenKind {
    #[inline]
    pub fn is_punct(self, p: Punct) -> bool {
        self == TokenKind::Punct(p)
    }

    #[inline]
    pub fn is_keyword(self, kw: Keyword) -> bool {
        self == TokenKind::Keyword(kw)
    }
}

/// Per-token whitespace and expansion flags.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TokenFlags(u8);

impl TokenFlags {
    /// Whitespace or a comment preceded this token.
    pub const LEADING_SPACE: u8 = 1 << 0;
    /// Token is the first on its logical line.
    pub const LINE_START: u8 = 1 << 1;
    /// Identifier named a macro that was being expanded when it was
    /// produced; it must never be expanded again.
    pub const PAINTED_BLUE: u8 = 1 << 2;
    /// Token was substituted from a macro argument.
    pub const FROM_ARGUMENT: u8 = 1 << 3;

    pub const EMPTY: Self = TokenFlags(0);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    #[inline]
    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    #[inline]
    pub const fn has_leading_space(self) -> bool {
        self.contains(Self::LEADING_SPACE)
    }

    #[inline]
    pub const fn is_line_start(self) -> bool {
        self.contains(Self::LINE_START)
    }

    #[inline]
    pub const fn is_painted_blue(self) -> bool {
        self.contains(Self::PAINTED_BLUE)
    }
}

impl fmt::Debug for TokenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenFlags({:#06b})", self.0)
    }
}

/// Index of an [`ExpansionInfo`] in the preprocessor's location map.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExpansionId(u32);

impl ExpansionId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ExpansionId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One macro expansion: which macro, where it was invoked, and the enclosing
/// expansion (for macros expanded while rescanning another macro's output).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ExpansionInfo {
    pub macro_name: Name,
    pub parent: Option<ExpansionId>,
    /// 0 for an expansion written directly in source text.
    pub depth: u16,
    /// File containing the outermost invocation.
    pub file: FileId,
    /// Span of the outermost invocation in the unexpanded source.
    pub invocation: Span,
}

/// A preprocessed token.
///
/// `span` and `file` always point into unexpanded source text. Tokens produced
/// by macro expansion report the span of the outermost macro invocation and
/// carry the expansion id that produced them.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    /// Interned spelling.
    pub text: Name,
    pub span: Span,
    pub file: FileId,
    pub flags: TokenFlags,
    pub expansion: Option<ExpansionId>,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, text: Name, span: Span, file: FileId) -> Self {
        Token {
            kind,
            text,
            span,
            file,
            flags: TokenFlags::EMPTY,
            expansion: None,
        }
    }

    /// End-of-file token positioned at `offset` of `file`.
    pub fn eof(file: FileId, offset: u32) -> Self {
        Token::new(TokenKind::Eof, Name::EMPTY, Span::point(offset), file)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    #[inline]
    pub fn is_punct(&self, p: Punct) -> bool {
        self.kind.is_punct(p)
    }

    #[inline]
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind.is_keyword(kw)
    }

    /// True when this token came out of a macro expansion.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expansion.is_some()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}:{}", self.kind, self.file, self.span)?;
        if let Some(exp) = self.expansion {
            write!(f, " (exp {})", exp.index())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punct_spelling_round_trips() {
        for p in PUNCTS {
            assert_eq!(Punct::from_spelling(p.as_str()), Some(p));
        }
        assert_eq!(Punct::from_spelling("@"), None);
    }

    #[test]
    fn token_flags_set_and_clear() {
        let mut flags = TokenFlags::EMPTY;
        flags.set(TokenFlags::PAINTED_BLUE);
        assert!(flags.is_painted_blue());
        assert!(!flags.has_leading_space());
        flags.clear(TokenFlags::PAINTED_BLUE);
        assert_eq!(flags, TokenFlags::EMPTY);
    }

    #[test]
    fn eof_token_is_point() {
        let tok = Token::eof(FileId::MAIN, 12);
        assert!(tok.is_eof());
        assert!(tok.span.is_empty());
        assert!(!tok.is_expanded());
    }
}
