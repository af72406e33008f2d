//! Binder tests over real source text.
//!
//! - `scopes`: lookup order, namespaces, `using`, classes and bases
//! - `overloads`: call resolution, constructors, ambiguity
//! - `templates`: specializations, deduction, dependent names
//! - `redeclarations`: merging, conflicts, out-of-line definitions

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod overloads;
mod redeclarations;
mod templates;

use std::sync::Arc;

use cidx_ir::{CancellationToken, Dialect, SharedInterner};
use cidx_parse::{parse, ParseMode};
use cidx_preprocess::{InMemoryProvider, Preprocessor, ScanContext, ScannerInfo};

use crate::{bind, BindingId, BindingKind, BoundUnit, ScopeId};

pub(crate) struct Bound {
    pub unit: BoundUnit,
    pub interner: SharedInterner,
}

fn bind_dialect(text: &str, dialect: Dialect) -> Bound {
    let interner = SharedInterner::new();
    let ctx = ScanContext::new(interner.clone(), Arc::new(InMemoryProvider::new()));
    let path = if dialect.is_cpp() { "/src/main.cpp" } else { "/src/main.c" };
    let mut pp = Preprocessor::new(ctx, &ScannerInfo::default(), dialect, path, Arc::from(text));
    let parsed = parse(&mut pp, ParseMode::Complete, &CancellationToken::new()).unwrap();
    assert!(
        parsed.problems.is_empty(),
        "unexpected syntax problems in {text:?}: {:?}",
        parsed.problems
    );
    let unit = bind(&parsed.unit, &interner, dialect);
    Bound { unit, interner }
}

/// Bind C++ source.
pub(crate) fn bind_text(text: &str) -> Bound {
    bind_dialect(text, Dialect::Cpp)
}

/// Bind C source.
pub(crate) fn bind_c(text: &str) -> Bound {
    bind_dialect(text, Dialect::C)
}

/// C++ source that must bind without problems.
pub(crate) fn bind_clean(text: &str) -> Bound {
    let bound = bind_text(text);
    assert!(
        bound.unit.problems.is_empty(),
        "unexpected problems in {text:?}: {:?}",
        bound.unit.problems
    );
    bound
}

impl Bound {
    /// Every binding named by the `::`-separated `path`.
    pub fn all(&self, path: &str) -> Vec<BindingId> {
        let names: Vec<_> = path.split("::").map(|s| self.interner.intern(s)).collect();
        let (last, prefix) = names.split_last().unwrap();
        let scope = if prefix.is_empty() {
            ScopeId::GLOBAL
        } else {
            let owner = self.unit.find_path(prefix).unwrap_or_else(|| panic!("no scope {path}"));
            self.unit.binding(owner).scope.unwrap()
        };
        self.unit.lookup_local(scope, *last).to_vec()
    }

    /// The single binding named by `path`.
    pub fn get(&self, path: &str) -> BindingId {
        match self.all(path).as_slice() {
            [only] => *only,
            other => panic!("expected one binding for {path}, found {other:?}"),
        }
    }

    /// Bindings named `name` anywhere in the unit.
    pub fn named(&self, name: &str) -> Vec<BindingId> {
        let name = self.interner.intern(name);
        self.unit
            .bindings
            .iter()
            .filter(|(_, b)| b.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Member `name` of `owner`'s scope.
    pub fn member(&self, owner: BindingId, name: &str) -> BindingId {
        let scope = self.unit.binding(owner).scope.unwrap();
        match self.unit.lookup_local(scope, self.interner.intern(name)) {
            [only] => *only,
            other => panic!("expected one member {name}, found {other:?}"),
        }
    }

    /// Overloads of `path` taking `arity` parameters.
    pub fn with_arity(&self, path: &str, arity: usize) -> BindingId {
        self.all(path)
            .into_iter()
            .find(|&b| match &self.unit.binding(b).ty {
                Some(crate::Type::Function(sig)) => sig.params.len() == arity,
                _ => false,
            })
            .unwrap_or_else(|| panic!("no overload of {path} taking {arity} parameters"))
    }

    pub fn kind(&self, path: &str) -> BindingKind {
        self.unit.binding(self.get(path)).kind
    }

    /// Explicit references to `binding`.
    pub fn refs(&self, binding: BindingId) -> usize {
        self.unit.references_to(binding).filter(|r| !r.implicit).count()
    }

    /// Constructor calls recorded for `binding`.
    pub fn implicit_refs(&self, binding: BindingId) -> usize {
        self.unit.references_to(binding).filter(|r| r.implicit).count()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.unit.problems.iter().map(|p| p.code.as_str()).collect()
    }

    /// Overload of `path` whose first parameter is `param`.
    pub fn overload(&self, path: &str, param: crate::Type<BindingId>) -> BindingId {
        self.all(path)
            .into_iter()
            .find(|&b| match &self.unit.binding(b).ty {
                Some(crate::Type::Function(sig)) => sig.params.first() == Some(&param),
                _ => false,
            })
            .unwrap_or_else(|| panic!("no overload of {path} taking {param:?}"))
    }
}
