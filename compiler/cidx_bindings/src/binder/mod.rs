//! The binder.
//!
//! # Passes
//!
//! ```text
//! Pass 1: Declarations
//!   - namespaces, classes, enums, typedefs, functions and variables in
//!     source order, resolving the names in their types as they are met
//!   - function bodies, member initializers and in-class initializers are
//!     queued
//!
//! Pass 2: Deferred bodies
//!   - every queued body sees the complete class it belongs to
//!   - local declarations are added to block scopes as they are met
//! ```
//!
//! Each name node gets exactly one [`Resolution`]; each declaration site a
//! [`Declaration`] and each use a [`Reference`].

mod declare;
mod exprs;
mod lookup;
mod typing;

use rustc_hash::FxHashMap;

use cidx_diagnostic::{Diagnostic, ErrorCode};
use cidx_ir::ast::{Access, AstArena, Decl, DeclId, Expr, ExprId, NameId, NameNode, Stmt, StmtId};
use cidx_ir::{Dialect, Name, Span, StringInterner};

use crate::binding::{Binding, BindingArena, BindingId, BindingKind};
use crate::output::{BoundUnit, Declaration, Reference, Resolution};
use crate::scope::{ScopeId, ScopeKind, ScopeTree};

pub(crate) use lookup::Want;

/// Work postponed to pass 2.
#[derive(Copy, Clone, Debug)]
enum Deferred {
    /// Parameter defaults, member initializers and body of a function.
    Function {
        function: BindingId,
        decl: DeclId,
        scope: ScopeId,
    },
    /// Initializer of a class member.
    Initializer {
        variable: BindingId,
        decl: DeclId,
        scope: ScopeId,
    },
}

/// The `template<...>` header a declaration sits under.
#[derive(Clone, Debug)]
struct TemplateHeader {
    params: Vec<BindingId>,
}

impl TemplateHeader {
    /// `template<>`
    fn is_explicit(&self) -> bool {
        self.params.is_empty()
    }
}

pub(crate) struct Binder<'a> {
    arena: &'a AstArena,
    interner: &'a StringInterner,
    dialect: Dialect,
    bindings: BindingArena,
    scopes: ScopeTree,
    resolutions: Vec<Resolution>,
    declarations: Vec<Declaration>,
    references: Vec<Reference>,
    problems: Vec<Diagnostic>,
    deferred: Vec<Deferred>,
    /// Bindings of class and enum declarations already declared.
    decl_bindings: FxHashMap<DeclId, BindingId>,

    // Context of the declaration or statement being bound.
    scope: ScopeId,
    access: Option<Access>,
    linkage: Dialect,
    /// Function whose body is being bound.
    function: Option<BindingId>,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(arena: &'a AstArena, interner: &'a StringInterner, dialect: Dialect) -> Self {
        Binder {
            arena,
            interner,
            dialect,
            bindings: BindingArena::new(),
            scopes: ScopeTree::new(),
            resolutions: vec![Resolution::Unresolved; arena.name_count()],
            declarations: Vec::new(),
            references: Vec::new(),
            problems: Vec::new(),
            deferred: Vec::new(),
            decl_bindings: FxHashMap::default(),
            scope: ScopeId::GLOBAL,
            access: None,
            linkage: dialect,
            function: None,
        }
    }

    pub(crate) fn finish(self) -> BoundUnit {
        tracing::debug!(
            bindings = self.bindings.len(),
            references = self.references.len(),
            problems = self.problems.len(),
            "bound translation unit"
        );
        BoundUnit {
            bindings: self.bindings,
            scopes: self.scopes,
            resolutions: self.resolutions,
            declarations: self.declarations,
            references: self.references,
            problems: self.problems,
        }
    }

    // Context

    fn in_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.scope, scope);
        let out = f(self);
        self.scope = saved;
        out
    }

    /// Scope new declarations land in: the current one, skipping template
    /// headers.
    fn decl_scope(&self) -> ScopeId {
        self.scopes
            .chain(self.scope)
            .find(|&s| self.scopes.kind(s) != ScopeKind::TemplateParams)
            .unwrap_or(ScopeId::GLOBAL)
    }

    /// Binding owning `scope` or the nearest scope around it.
    fn owner_of(&self, scope: ScopeId) -> Option<BindingId> {
        self.scopes.chain(scope).find_map(|s| self.scopes.get(s).owner)
    }

    fn name_node(&self, id: NameId) -> &'a NameNode {
        self.arena.name(id)
    }

    fn decl(&self, id: DeclId) -> &'a Decl {
        self.arena.decl(id)
    }

    fn stmt(&self, id: StmtId) -> &'a Stmt {
        self.arena.stmt(id)
    }

    fn expr(&self, id: ExprId) -> &'a Expr {
        self.arena.expr(id)
    }

    fn text(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// `a::b::c` as written, for messages.
    fn spelled(&self, id: NameId) -> String {
        let node = self.name_node(id);
        let mut out = String::new();
        if node.global {
            out.push_str("::");
        }
        for (i, segment) in node.segments().enumerate() {
            if i > 0 {
                out.push_str("::");
            }
            out.push_str(self.text(self.segment_name(segment)));
        }
        out
    }

    // Bindings

    /// Allocate a binding owned by the scope it is declared in. Invisible
    /// bindings (specializations, anonymous entities) are not entered in the
    /// scope.
    fn new_binding(&mut self, kind: BindingKind, name: Name, scope: ScopeId, visible: bool) -> BindingId {
        // `extern "C"` gives functions and variables C linkage.
        let linkage = match kind {
            BindingKind::Function | BindingKind::Variable => self.linkage,
            _ => self.dialect,
        };
        let mut binding = Binding::new(kind, name, self.owner_of(scope), linkage);
        if self.scopes.kind(scope) == ScopeKind::Class {
            binding.access = self.access;
        }
        let id = self.bindings.alloc(binding);
        if visible && name != Name::EMPTY {
            self.scopes.add(scope, name, id);
        }
        tracing::trace!(kind = %kind, name = self.text(name), "new binding");
        id
    }

    /// Make `owner` the owner of `child`, moving it out of its previous
    /// owner's members.
    fn adopt(&mut self, child: BindingId, owner: BindingId) {
        if let Some(previous) = self.bindings.get(child).owner {
            self.bindings.get_mut(previous).members.retain(|&m| m != child);
        }
        self.bindings.get_mut(child).owner = Some(owner);
        let members = &mut self.bindings.get_mut(owner).members;
        if !members.contains(&child) {
            members.push(child);
        }
    }

    // Resolutions

    fn set_resolution(&mut self, name: NameId, resolution: Resolution) {
        if let Some(slot) = self.resolutions.get_mut(name.index()) {
            *slot = resolution;
        }
    }

    fn declared(&mut self, binding: BindingId, name: NameId, is_definition: bool) {
        let node = self.name_node(name);
        self.declarations.push(Declaration {
            binding,
            name,
            span: node.span,
            file: node.file,
            is_definition,
        });
        self.set_resolution(name, Resolution::Binding(binding));
        if is_definition {
            self.bindings.get_mut(binding).is_defined = true;
        }
    }

    fn referenced(&mut self, binding: BindingId, name: NameId) {
        let node = self.name_node(name);
        self.references.push(Reference {
            binding,
            name,
            span: node.last.span,
            file: node.file,
            implicit: false,
        });
        self.set_resolution(name, Resolution::Binding(binding));
    }

    /// A qualifier segment (`ns` in `ns::f`) naming `binding`.
    fn segment_referenced(&mut self, binding: BindingId, name: NameId, span: Span) {
        self.references.push(Reference {
            binding,
            name,
            span,
            file: self.name_node(name).file,
            implicit: false,
        });
    }

    /// A call not spelled in source, such as a constructor selected by a
    /// declaration.
    fn implicitly_referenced(&mut self, binding: BindingId, name: NameId) {
        let node = self.name_node(name);
        self.references.push(Reference {
            binding,
            name,
            span: node.span,
            file: node.file,
            implicit: true,
        });
    }

    fn mark_dependent(&mut self, name: NameId) {
        self.set_resolution(name, Resolution::Dependent);
    }

    // Problems

    fn problem(&mut self, code: ErrorCode, name: NameId, message: String, label: &str) {
        let node = self.name_node(name);
        tracing::debug!(code = %code, %message, "binding problem");
        self.problems.push(
            Diagnostic::error(code)
                .with_message(message)
                .in_file(node.file)
                .with_label(node.span, label),
        );
    }

    /// A name found no binding. Inside a template the name may come from a
    /// dependent base and is left for instantiation instead.
    fn report_missing(&mut self, name: NameId, scope: ScopeId) {
        if self.scopes.in_template(scope) {
            self.mark_dependent(name);
            return;
        }
        let spelled = self.spelled(name);
        self.problem(
            ErrorCode::S3001,
            name,
            format!("`{spelled}` is not declared"),
            "not found in this scope",
        );
        self.set_resolution(name, Resolution::Unresolved);
    }
}
