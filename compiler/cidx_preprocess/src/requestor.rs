//! Push-style callbacks for source elements.
//!
//! A requestor is told about inclusions and macro definitions by the scanner
//! and about declarations by the parser, in source order. Outline views and
//! lightweight indexers use it instead of walking the AST.

use std::path::Path;

use cidx_diagnostic::Diagnostic;
use cidx_ir::ast::ClassKey;
use cidx_ir::{FileId, Span};

/// Receiver of source-element events. Every callback defaults to a no-op.
#[allow(unused_variables)]
pub trait SourceElementRequestor: Send {
    fn enter_inclusion(&mut self, path: &Path, included: FileId, directive: Span) {}
    fn exit_inclusion(&mut self, included: FileId) {}

    fn accept_macro(&mut self, name: &str, file: FileId, span: Span, function_style: bool) {}
    fn accept_macro_use(&mut self, name: &str, file: FileId, span: Span) {}

    fn enter_namespace(&mut self, name: Option<&str>, file: FileId, span: Span) {}
    fn exit_namespace(&mut self) {}
    fn enter_class(&mut self, name: Option<&str>, key: ClassKey, file: FileId, span: Span) {}
    fn exit_class(&mut self) {}
    fn enter_function_body(&mut self, name: &str, file: FileId, span: Span) {}
    fn exit_function_body(&mut self) {}

    fn accept_variable(&mut self, name: &str, file: FileId, span: Span) {}
    fn accept_function_declaration(&mut self, name: &str, file: FileId, span: Span) {}
    fn accept_typedef(&mut self, name: &str, file: FileId, span: Span) {}
    fn accept_enumerator(&mut self, name: &str, file: FileId, span: Span) {}
    fn accept_template_specialization(&mut self, name: &str, file: FileId, span: Span) {}

    fn accept_problem(&mut self, problem: &Diagnostic) {}
}
