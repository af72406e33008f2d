//! Name resolution for C and C++.
//!
//! [`bind`] walks a parsed [`TranslationUnit`] and produces a [`BoundUnit`]:
//! every declared entity becomes a [`Binding`], every name node gets a
//! [`Resolution`], and each declaration and use site is recorded for the
//! index store.
//!
//! Overload resolution ([`overload`]) and template argument deduction work on
//! [`Type`]s, which are generic over how bindings are referenced so the
//! index store can persist the same shape.

mod binder;
mod binding;
pub mod overload;
mod output;
mod scope;
mod types;

#[cfg(test)]
mod tests;

pub use binding::{Binding, BindingArena, BindingId, BindingKind, Specialization};
pub use output::{BoundUnit, Declaration, Reference, Resolution};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};
pub use types::{ArgMap, Base, FunctionType, TemplateArgument, Type};

use cidx_ir::ast::TranslationUnit;
use cidx_ir::{Dialect, StringInterner};

use binder::Binder;

/// Resolve every name in `unit`.
///
/// Problems (undeclared names, ambiguous calls, conflicting redeclarations)
/// are reported in [`BoundUnit::problems`]; binding never fails outright.
#[tracing::instrument(level = "debug", skip_all, fields(dialect = ?dialect))]
pub fn bind(unit: &TranslationUnit, interner: &StringInterner, dialect: Dialect) -> BoundUnit {
    let mut binder = Binder::new(&unit.arena, interner, dialect);
    binder.declare_all(&unit.decls);
    binder.bind_deferred();
    binder.finish()
}
