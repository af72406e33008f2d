//! Keyword, built-in type and directive name tables.
//!
//! Built once per process and immutable afterwards. Which spellings are
//! reserved depends on the dialect: `class` is an identifier in C, `restrict`
//! an identifier in C++.

use std::sync::OnceLock;

use cidx_ir::{Dialect, Keyword, Punct};
use rustc_hash::FxHashMap;

const SHARED: &[(&str, Keyword)] = &[
    ("auto", Keyword::Auto),
    ("break", Keyword::Break),
    ("case", Keyword::Case),
    ("char", Keyword::Char),
    ("const", Keyword::Const),
    ("continue", Keyword::Continue),
    ("default", Keyword::Default),
    ("do", Keyword::Do),
    ("double", Keyword::Double),
    ("else", Keyword::Else),
    ("enum", Keyword::Enum),
    ("extern", Keyword::Extern),
    ("float", Keyword::Float),
    ("for", Keyword::For),
    ("goto", Keyword::Goto),
    ("if", Keyword::If),
    ("inline", Keyword::Inline),
    ("int", Keyword::Int),
    ("long", Keyword::Long),
    ("register", Keyword::Register),
    ("return", Keyword::Return),
    ("short", Keyword::Short),
    ("signed", Keyword::Signed),
    ("sizeof", Keyword::Sizeof),
    ("static", Keyword::Static),
    ("struct", Keyword::Struct),
    ("switch", Keyword::Switch),
    ("typedef", Keyword::Typedef),
    ("union", Keyword::Union),
    ("unsigned", Keyword::Unsigned),
    ("void", Keyword::Void),
    ("volatile", Keyword::Volatile),
    ("while", Keyword::While),
];

const C_ONLY: &[(&str, Keyword)] = &[("restrict", Keyword::Restrict), ("_Bool", Keyword::Bool)];

const CPP_ONLY: &[(&str, Keyword)] = &[
    ("bool", Keyword::Bool),
    ("class", Keyword::Class),
    ("const_cast", Keyword::ConstCast),
    ("delete", Keyword::Delete),
    ("dynamic_cast", Keyword::DynamicCast),
    ("explicit", Keyword::Explicit),
    ("false", Keyword::False),
    ("friend", Keyword::Friend),
    ("mutable", Keyword::Mutable),
    ("namespace", Keyword::Namespace),
    ("new", Keyword::New),
    ("nullptr", Keyword::Nullptr),
    ("operator", Keyword::Operator),
    ("private", Keyword::Private),
    ("protected", Keyword::Protected),
    ("public", Keyword::Public),
    ("reinterpret_cast", Keyword::ReinterpretCast),
    ("static_cast", Keyword::StaticCast),
    ("template", Keyword::Template),
    ("this", Keyword::This),
    ("throw", Keyword::Throw),
    ("true", Keyword::True),
    ("try", Keyword::Try),
    ("typename", Keyword::Typename),
    ("using", Keyword::Using),
    ("virtual", Keyword::Virtual),
    ("wchar_t", Keyword::WcharT),
];

/// C++ alternative spellings of operators (`and`, `not_eq`, ...).
const ALTERNATIVE_TOKENS: &[(&str, Punct)] = &[
    ("and", Punct::AmpAmp),
    ("and_eq", Punct::AmpAssign),
    ("bitand", Punct::Amp),
    ("bitor", Punct::Pipe),
    ("compl", Punct::Tilde),
    ("not", Punct::Bang),
    ("not_eq", Punct::Ne),
    ("or", Punct::PipePipe),
    ("or_eq", Punct::PipeAssign),
    ("xor", Punct::Caret),
    ("xor_eq", Punct::CaretAssign),
];

const C_BUILTIN_TYPES: &[&str] = &[
    "char", "double", "float", "int", "long", "short", "signed", "unsigned", "void", "_Bool",
];

const CPP_BUILTIN_TYPES: &[&str] = &[
    "bool", "char", "double", "float", "int", "long", "short", "signed", "unsigned", "void",
    "wchar_t",
];

const PREPROCESSOR_KEYWORDS: &[&str] = &[
    "define",
    "elif",
    "else",
    "endif",
    "error",
    "if",
    "ifdef",
    "ifndef",
    "include",
    "include_next",
    "line",
    "pragma",
    "undef",
    "warning",
    "ident",
    "sccs",
];

type KeywordTable = FxHashMap<&'static str, Keyword>;

fn build(extra: &[(&'static str, Keyword)]) -> KeywordTable {
    SHARED.iter().chain(extra).copied().collect()
}

/// Reserved words of `dialect`.
pub fn keywords(dialect: Dialect) -> &'static KeywordTable {
    static C: OnceLock<KeywordTable> = OnceLock::new();
    static CPP: OnceLock<KeywordTable> = OnceLock::new();
    match dialect {
        Dialect::C => C.get_or_init(|| build(C_ONLY)),
        Dialect::Cpp => CPP.get_or_init(|| build(CPP_ONLY)),
    }
}

/// Keyword spelled `text` in `dialect`, if any.
#[inline]
pub fn keyword(dialect: Dialect, text: &str) -> Option<Keyword> {
    keywords(dialect).get(text).copied()
}

/// Operator spelled by a C++ alternative token such as `and`.
pub fn alternative_token(dialect: Dialect, text: &str) -> Option<Punct> {
    if !dialect.is_cpp() {
        return None;
    }
    ALTERNATIVE_TOKENS
        .iter()
        .find(|(spelling, _)| *spelling == text)
        .map(|&(_, p)| p)
}

/// Type keywords usable as simple type specifiers.
pub fn builtin_types(dialect: Dialect) -> &'static [&'static str] {
    match dialect {
        Dialect::C => C_BUILTIN_TYPES,
        Dialect::Cpp => CPP_BUILTIN_TYPES,
    }
}

/// Directive names recognized after `#`.
pub fn preprocessor_keywords() -> &'static [&'static str] {
    PREPROCESSOR_KEYWORDS
}
