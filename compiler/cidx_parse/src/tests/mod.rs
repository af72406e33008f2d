//! Parser tests.
//!
//! - `declarations`: namespaces, classes, functions, templates, `using`
//! - `statements`: block contents and declaration/expression ambiguity
//! - `expressions`: precedence, casts, template-ids, `new`/`delete`
//! - `recovery`: problem nodes and resynchronization
//! - `modes`: structural, completion and cancellation
//! - `requestor`: source-element callbacks
//! - `selector`: node selection by offset

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod declarations;
mod expressions;
mod recovery;
mod requestor;
mod selector;

use std::sync::Arc;

use cidx_ir::ast::{Decl, DeclId, DeclKind, Expr, ExprId, FunctionDecl, NameId, Stmt, StmtId, StmtKind};
use cidx_ir::{CancellationToken, Canceled, Dialect, SharedInterner, Token};
use cidx_preprocess::{
    InMemoryProvider, LocationMap, Preprocessor, ScanContext, ScannerInfo, SourceElementRequestor,
};

use crate::{parse, ParseMode, ParseResult, TokenSource};

pub(crate) const MAIN: &str = "/src/main.cpp";

/// Token source over in-memory text, preprocessed as C++.
pub(crate) struct VecSource {
    pp: Preprocessor,
}

impl VecSource {
    pub fn new(text: &str) -> Self {
        Self::with_files(text, &[])
    }

    /// Main file `text` plus headers reachable through `#include`.
    pub fn with_files(text: &str, headers: &[(&str, &str)]) -> Self {
        let mut provider = InMemoryProvider::new();
        for (path, contents) in headers {
            provider.add(*path, contents);
        }
        let ctx = ScanContext::new(SharedInterner::new(), Arc::new(provider));
        let mut pp = Preprocessor::new(ctx, &ScannerInfo::default(), Dialect::Cpp, MAIN, Arc::from(text));
        pp.add_include_path("/inc");
        VecSource { pp }
    }

    pub fn set_requestor(&mut self, requestor: Box<dyn SourceElementRequestor>) {
        self.pp.set_requestor(requestor);
    }

    pub fn location_map(&self) -> &LocationMap {
        self.pp.location_map()
    }
}

impl TokenSource for VecSource {
    fn next_token(&mut self) -> Result<Token, Canceled> {
        self.pp.next_token()
    }

    fn interner(&self) -> SharedInterner {
        self.pp.interner().clone()
    }

    fn requestor(&mut self) -> Option<&mut (dyn SourceElementRequestor + 'static)> {
        self.pp.requestor_mut()
    }
}

/// A finished parse with its interner, for spelling names in assertions.
pub(crate) struct Parsed {
    pub result: ParseResult,
    pub interner: SharedInterner,
}

pub(crate) fn parse_mode(text: &str, mode: ParseMode) -> Parsed {
    let mut source = VecSource::new(text);
    let interner = source.interner();
    let result = parse(&mut source, mode, &CancellationToken::new()).unwrap();
    Parsed { result, interner }
}

/// Complete parse.
pub(crate) fn parse_text(text: &str) -> Parsed {
    parse_mode(text, ParseMode::Complete)
}

/// Complete parse that must not report problems.
pub(crate) fn parse_clean(text: &str) -> Parsed {
    let parsed = parse_text(text);
    assert!(
        parsed.result.problems.is_empty(),
        "unexpected problems in {text:?}: {:?}",
        parsed.result.problems
    );
    parsed
}

impl Parsed {
    pub fn decls(&self) -> &[DeclId] {
        &self.result.unit.decls
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        self.result.unit.arena.decl(id)
    }

    pub fn top(&self, index: usize) -> &DeclKind {
        &self.decl(self.decls()[index]).kind
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        self.result.unit.arena.stmt(id)
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        self.result.unit.arena.expr(id)
    }

    /// `a::b::c` without template arguments.
    pub fn name(&self, id: NameId) -> String {
        let node = self.result.unit.arena.name(id);
        let mut out = String::new();
        if node.global {
            out.push_str("::");
        }
        for (i, segment) in node.segments().enumerate() {
            if i > 0 {
                out.push_str("::");
            }
            if segment.kind == cidx_ir::ast::SegmentKind::Destructor {
                out.push('~');
            }
            out.push_str(self.interner.lookup(segment.ident));
        }
        out
    }

    /// Function declared at top-level position `index`.
    pub fn function(&self, index: usize) -> &FunctionDecl {
        match self.top(index) {
            DeclKind::Function(function) => function,
            other => panic!("expected a function, found {other:?}"),
        }
    }

    /// Statements of the body of the function at top-level `index`.
    pub fn body(&self, index: usize) -> Vec<StmtId> {
        let cidx_ir::ast::FunctionBody::Parsed(body) = self.function(index).body else {
            panic!("function has no parsed body");
        };
        match &self.stmt(body).kind {
            StmtKind::Compound(stmts) => stmts.clone(),
            other => panic!("expected a compound body, found {other:?}"),
        }
    }

    /// Expression of an expression statement.
    pub fn expr_of(&self, stmt: StmtId) -> &Expr {
        match &self.stmt(stmt).kind {
            StmtKind::Expr(expr) => self.expr(*expr),
            other => panic!("expected an expression statement, found {other:?}"),
        }
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.result.problems.iter().map(|p| p.code.as_str()).collect()
    }
}
