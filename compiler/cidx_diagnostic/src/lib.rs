//! Problems found while scanning, parsing and binding C/C++ source.
//!
//! Every problem is a [`Diagnostic`] with an [`ErrorCode`] whose prefix names
//! the phase that found it:
//! - `L0xxx` lexical
//! - `P1xxx` preprocessor
//! - `E2xxx` syntax
//! - `S3xxx` semantic and lookup
//!
//! Problems are advisory. They ride alongside a best-effort result and never
//! stop the scan, parse or bind that reported them.

mod diagnostic;
pub mod emitter;
mod error_code;
pub mod queue;
pub mod span_utils;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
