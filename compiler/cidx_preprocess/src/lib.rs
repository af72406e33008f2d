//! C and C++ preprocessor.
//!
//! [`Preprocessor`] turns one translation unit into a stream of fully
//! expanded [`Token`](cidx_ir::Token)s. Every output token points back into
//! unexpanded source: tokens produced by a macro carry the span of the
//! outermost invocation and an expansion id resolvable through the
//! [`LocationMap`].
//!
//! Problems never stop the scan. They are collected as diagnostics, recorded
//! in the event log, and forwarded to an attached [`SourceElementRequestor`].
//!
//! File contents come from a [`FileContentProvider`], so callers decide
//! whether headers are read from disk, from editor buffers, or from memory.

mod config;
mod expr;
pub mod keywords;
mod lexer;
mod location_map;
mod log;
mod macros;
mod preprocessor;
mod provider;
mod requestor;

pub use config::{split_define, ScannerInfo, DEFAULT_MAX_INCLUDE_DEPTH};
pub use location_map::LocationMap;
pub use log::{ConditionalKind, DirectiveKind, LogEntry, PreprocessorLog};
pub use macros::{builtin_macros, DynamicMacro, MacroDef, MacroKind, MacroTable, BUILTIN_FILE};
pub use preprocessor::{Preprocessor, ScanContext};
pub use provider::{FileContentProvider, FsContentProvider, InMemoryProvider};
pub use requestor::SourceElementRequestor;
