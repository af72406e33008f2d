//! What binding a translation unit produces.

use cidx_diagnostic::Diagnostic;
use cidx_ir::ast::NameId;
use cidx_ir::{FileId, Name, Span};

use crate::binding::{Binding, BindingArena, BindingId};
use crate::scope::{ScopeId, ScopeTree};

/// What a name node resolved to.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Resolution {
    Binding(BindingId),
    /// Depends on a template argument; resolution waits for instantiation.
    Dependent,
    /// Several equally good candidates; none was picked.
    Ambiguous(Vec<BindingId>),
    #[default]
    Unresolved,
}

impl Resolution {
    pub fn binding(&self) -> Option<BindingId> {
        match self {
            Resolution::Binding(id) => Some(*id),
            _ => None,
        }
    }
}

/// A site that declares or defines a binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub binding: BindingId,
    pub name: NameId,
    pub span: Span,
    pub file: FileId,
    pub is_definition: bool,
}

/// A site that uses a binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub binding: BindingId,
    pub name: NameId,
    pub span: Span,
    pub file: FileId,
    /// Not spelled in source: the constructor a declaration or `new` calls.
    pub implicit: bool,
}

/// Bindings, scopes and per-name resolutions of one translation unit.
#[derive(Clone, Debug)]
pub struct BoundUnit {
    pub bindings: BindingArena,
    pub scopes: ScopeTree,
    /// Indexed by `NameId`.
    pub(crate) resolutions: Vec<Resolution>,
    pub declarations: Vec<Declaration>,
    pub references: Vec<Reference>,
    pub problems: Vec<Diagnostic>,
}

impl BoundUnit {
    pub fn resolution(&self, name: NameId) -> &Resolution {
        static UNRESOLVED: Resolution = Resolution::Unresolved;
        self.resolutions.get(name.index()).unwrap_or(&UNRESOLVED)
    }

    /// Binding a name resolved to, if it resolved to exactly one.
    pub fn resolve(&self, name: NameId) -> Option<BindingId> {
        self.resolution(name).binding()
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        self.bindings.get(id)
    }

    pub fn declarations_of(&self, binding: BindingId) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(move |d| d.binding == binding)
    }

    pub fn references_to(&self, binding: BindingId) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(move |r| r.binding == binding)
    }

    /// Bindings named `name` directly in `scope`.
    pub fn lookup_local(&self, scope: ScopeId, name: Name) -> &[BindingId] {
        self.scopes.local(scope, name)
    }

    /// Follow a `::`-separated path of names from the global scope, taking
    /// the first binding at each step.
    pub fn find_path(&self, path: &[Name]) -> Option<BindingId> {
        let mut scope = ScopeId::GLOBAL;
        let mut found = None;
        for (i, &name) in path.iter().enumerate() {
            let id = *self.scopes.local(scope, name).first()?;
            found = Some(id);
            if i + 1 < path.len() {
                scope = self.bindings.get(id).scope?;
            }
        }
        found
    }

    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(Diagnostic::is_error)
    }
}
