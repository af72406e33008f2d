//! Source-element callbacks delivered during the parse.

use std::sync::Arc;

use cidx_diagnostic::Diagnostic;
use cidx_ir::ast::ClassKey;
use cidx_ir::{CancellationToken, FileId, Span};
use cidx_preprocess::SourceElementRequestor;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::VecSource;
use crate::{parse, ParseMode};

/// Records every event as one line.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn push(&self, line: String) {
        self.0.lock().push(line);
    }

    fn lines(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

impl SourceElementRequestor for Recorder {
    fn enter_namespace(&mut self, name: Option<&str>, _: FileId, _: Span) {
        self.push(format!("enter namespace {}", name.unwrap_or("<anonymous>")));
    }

    fn exit_namespace(&mut self) {
        self.push("exit namespace".to_owned());
    }

    fn enter_class(&mut self, name: Option<&str>, key: ClassKey, _: FileId, _: Span) {
        self.push(format!("enter {} {}", key.as_str(), name.unwrap_or("<anonymous>")));
    }

    fn exit_class(&mut self) {
        self.push("exit class".to_owned());
    }

    fn enter_function_body(&mut self, name: &str, _: FileId, _: Span) {
        self.push(format!("enter body {name}"));
    }

    fn exit_function_body(&mut self) {
        self.push("exit body".to_owned());
    }

    fn accept_variable(&mut self, name: &str, _: FileId, _: Span) {
        self.push(format!("variable {name}"));
    }

    fn accept_function_declaration(&mut self, name: &str, _: FileId, _: Span) {
        self.push(format!("function {name}"));
    }

    fn accept_typedef(&mut self, name: &str, _: FileId, _: Span) {
        self.push(format!("typedef {name}"));
    }

    fn accept_enumerator(&mut self, name: &str, _: FileId, _: Span) {
        self.push(format!("enumerator {name}"));
    }

    fn accept_template_specialization(&mut self, name: &str, _: FileId, _: Span) {
        self.push(format!("specialization {name}"));
    }

    fn accept_problem(&mut self, problem: &Diagnostic) {
        self.push(format!("problem {}", problem.code));
    }
}

fn record(text: &str, mode: ParseMode) -> Vec<String> {
    let recorder = Recorder::default();
    let mut source = VecSource::new(text);
    source.set_requestor(Box::new(recorder.clone()));
    parse(&mut source, mode, &CancellationToken::new()).unwrap();
    recorder.lines()
}

#[test]
fn declaration_events_in_source_order() {
    let lines = record(
        "namespace n {\n\
           class C { void m(); };\n\
           int v;\n\
           typedef int T;\n\
           enum E { A };\n\
         }\n\
         void f() { int local; }",
        ParseMode::Complete,
    );
    assert_eq!(
        lines,
        vec![
            "enter namespace n",
            "enter class C",
            "function m",
            "exit class",
            "variable v",
            "typedef T",
            "enumerator A",
            "exit namespace",
            "function f",
            "enter body f",
            "exit body",
        ]
    );
}

#[test]
fn speculation_does_not_leak_events() {
    // Block statements are parsed speculatively; none of their trial
    // declarations or problems may be reported.
    let lines = record("void f() { a * b; g(x); std::vector<int> v; }", ParseMode::Complete);
    assert_eq!(lines, vec!["function f", "enter body f", "exit body"]);
}

#[test]
fn specialization_and_problems_are_reported() {
    let lines = record("template <> void swap<int>(int&, int&);\nint = 3;", ParseMode::Structural);
    assert_eq!(
        lines,
        vec!["function swap", "specialization swap", "problem E2005"]
    );
}

#[test]
fn nested_namespace_definition_enters_each_level() {
    let lines = record("namespace a::b { }", ParseMode::Structural);
    assert_eq!(
        lines,
        vec!["enter namespace a", "enter namespace b", "exit namespace", "exit namespace"]
    );
}
