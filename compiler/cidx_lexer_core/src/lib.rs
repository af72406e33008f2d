//! Raw tokenizer for C and C++ source text.
//!
//! Produces `(RawTag, len)` pairs from a sentinel-terminated buffer. It knows
//! nothing about keywords, macros or directives; the preprocessor layers those
//! on top. Malformed input (an unterminated string, a stray byte) is encoded as
//! a tag, never as an error value, so scanning always makes progress.

mod cursor;
mod raw_scanner;
mod source_buffer;
mod tag;

pub use cursor::Cursor;
pub use raw_scanner::RawScanner;
pub use source_buffer::SourceBuffer;
pub use tag::{RawTag, RawToken};
