//! Shared intermediate representation for the cidx indexer.
//!
//! - [`Span`] and [`FileId`] locate text in unexpanded source files
//! - [`Name`] and [`StringInterner`] intern every spelling
//! - [`Token`] is the preprocessor's output and the parser's input
//! - [`ast`] holds the arena-allocated syntax tree and [`visitor`] walks it
//! - [`CancellationToken`] lets another thread stop a scan or parse

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
mod cancel;
mod dialect;
mod interner;
mod name;
mod span;
pub mod stack;
mod token;
pub mod visitor;

pub use cancel::{CancellationToken, Canceled};
pub use dialect::Dialect;
pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use name::Name;
pub use span::{FileId, Span};
pub use token::{ExpansionId, ExpansionInfo, Keyword, Punct, Token, TokenFlags, TokenKind};
pub use visitor::{AstVisitor, VisitAction};

static_assert_size!(Token, 28);
