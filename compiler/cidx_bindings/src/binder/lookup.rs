//! Name lookup.
//!
//! Unqualified lookup walks scopes outward from the point of use (block,
//! function, class, namespace, global) and stops at the first scope with a
//! match. Within one scope a class consults its bases when it declares
//! nothing under the name, and any scope consults the namespaces its
//! `using namespace` directives nominate. Qualified lookup resolves the
//! qualifier to a scope first and then looks in that scope only.

use smallvec::SmallVec;

use cidx_diagnostic::ErrorCode;
use cidx_ir::ast::{NameId, NameSegment, SegmentKind};
use cidx_ir::Name;

use super::Binder;
use crate::binding::{BindingId, BindingKind};
use crate::output::Resolution;
use crate::scope::{Found, ScopeId, ScopeKind};
use crate::types::{ArgMap, TemplateArgument, Type};

/// What kind of binding a name position accepts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Want {
    Any,
    Type,
    /// A qualifier: namespace, class, enumeration or a typedef to one.
    Scope,
    Namespace,
}

pub(super) enum Lookup {
    Found(Found),
    Dependent,
    Missing,
    /// The qualifier did not resolve; already reported.
    Failed,
}

pub(super) enum ScopeOf {
    Scope(ScopeId),
    Dependent,
    None,
}

fn is_tag(kind: BindingKind) -> bool {
    kind.is_class() || kind == BindingKind::Enumeration
}

impl Binder<'_> {
    /// Name a segment declares or looks up; destructors are `~X`.
    pub(super) fn segment_name(&self, segment: &NameSegment) -> Name {
        match segment.kind {
            SegmentKind::Destructor => self
                .interner
                .intern(&format!("~{}", self.interner.lookup(segment.ident))),
            SegmentKind::Identifier | SegmentKind::Operator => segment.ident,
        }
    }

    fn accepts(&self, binding: BindingId, want: Want) -> bool {
        let b = self.bindings.get(binding);
        match want {
            Want::Any => true,
            Want::Type => b.kind.is_type(),
            Want::Scope => b.kind.is_type() || b.kind == BindingKind::Namespace,
            Want::Namespace => match b.kind {
                BindingKind::Namespace => true,
                BindingKind::Typedef => b
                    .ty
                    .as_ref()
                    .and_then(Type::class_ref)
                    .is_some_and(|t| self.bindings.get(t).kind == BindingKind::Namespace),
                _ => false,
            },
        }
    }

    fn filter(&self, found: &[BindingId], want: Want) -> Found {
        let mut out: Found = found
            .iter()
            .copied()
            .filter(|&b| self.accepts(b, want))
            .collect();
        // A class or enum is hidden by an object or function of the same name.
        if want == Want::Any && out.iter().any(|&b| !is_tag(self.bindings.get(b).kind)) {
            out.retain(|b| !is_tag(self.bindings.get(*b).kind));
        }
        out
    }

    /// Scopes of the classes `class` derives from directly.
    fn base_scopes(&self, class: BindingId) -> SmallVec<[ScopeId; 4]> {
        self.bindings
            .get(class)
            .bases
            .iter()
            .filter_map(|base| base.ty.class_ref())
            .filter_map(|base| self.bindings.get(base).scope)
            .collect()
    }

    /// Lookup in `scope` alone, with its bases and nominated namespaces.
    pub(super) fn lookup_in(&self, scope: ScopeId, name: Name, want: Want) -> Found {
        let mut visited = SmallVec::<[ScopeId; 8]>::new();
        self.lookup_in_inner(scope, name, want, &mut visited)
    }

    fn lookup_in_inner(
        &self,
        scope: ScopeId,
        name: Name,
        want: Want,
        visited: &mut SmallVec<[ScopeId; 8]>,
    ) -> Found {
        if visited.contains(&scope) {
            return Found::new();
        }
        visited.push(scope);
        let mut found = self.filter(self.scopes.local(scope, name), want);
        if found.is_empty() && self.scopes.kind(scope) == ScopeKind::Class {
            if let Some(class) = self.scopes.get(scope).owner {
                for base in self.base_scopes(class) {
                    for b in self.lookup_in_inner(base, name, want, visited) {
                        if !found.contains(&b) {
                            found.push(b);
                        }
                    }
                }
            }
        }
        if found.is_empty() {
            for &nominated in self.scopes.using(scope) {
                for b in self.lookup_in_inner(nominated, name, want, visited) {
                    if !found.contains(&b) {
                        found.push(b);
                    }
                }
            }
        }
        found
    }

    /// Lookup from `scope` outward.
    pub(super) fn lookup_unqualified(&self, scope: ScopeId, name: Name, want: Want) -> Found {
        self.scopes
            .chain(scope)
            .map(|s| self.lookup_in(s, name, want))
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    /// Resolve the qualifier of `id` to the scope its last segment is looked
    /// up in, recording a reference for every qualifier segment.
    pub(super) fn resolve_qualifier(&mut self, id: NameId, scope: ScopeId) -> ScopeOf {
        let node = self.name_node(id);
        let mut current = node.global.then_some(ScopeId::GLOBAL);
        for segment in &node.qualifier {
            let found = match current {
                None => self.lookup_unqualified(scope, segment.ident, Want::Scope),
                Some(s) => self.lookup_in(s, segment.ident, Want::Scope),
            };
            let Some(&binding) = found.first() else {
                if self.scopes.in_template(scope) {
                    return ScopeOf::Dependent;
                }
                let text = self.text(segment.ident);
                self.problem(
                    ErrorCode::S3001,
                    id,
                    format!("`{text}` does not name a namespace or class"),
                    "unknown qualifier",
                );
                return ScopeOf::None;
            };
            self.segment_referenced(binding, id, segment.span);
            let args = segment
                .template_args
                .as_ref()
                .map(|args| self.in_scope(scope, |this| this.template_arguments(args)));
            match self.scope_of(binding, args.as_deref()) {
                ScopeOf::Scope(s) => current = Some(s),
                ScopeOf::Dependent => return ScopeOf::Dependent,
                ScopeOf::None => {
                    let text = self.text(segment.ident);
                    self.problem(
                        ErrorCode::S3001,
                        id,
                        format!("`{text}` is not a namespace or class"),
                        "cannot be used as a qualifier",
                    );
                    return ScopeOf::None;
                }
            }
        }
        ScopeOf::Scope(current.unwrap_or(scope))
    }

    /// Scope to continue qualified lookup in after `binding`.
    pub(super) fn scope_of(&self, binding: BindingId, args: Option<&[TemplateArgument<BindingId>]>) -> ScopeOf {
        let b = self.bindings.get(binding);
        let scope = |s: Option<ScopeId>| s.map_or(ScopeOf::None, ScopeOf::Scope);
        match b.kind {
            BindingKind::Namespace
            | BindingKind::Class
            | BindingKind::ClassSpecialization
            | BindingKind::Enumeration => scope(b.scope),
            BindingKind::ClassTemplate => match args {
                Some(args) => {
                    if let Some((spec, _)) = self.matching_specialization(binding, args) {
                        scope(self.bindings.get(spec).scope)
                    } else if args.iter().any(TemplateArgument::is_dependent)
                        && !self.is_own_params(binding, args)
                    {
                        ScopeOf::Dependent
                    } else {
                        scope(b.scope)
                    }
                }
                None => scope(b.scope),
            },
            BindingKind::Typedef => match &b.ty {
                Some(ty) if ty.is_dependent() => ScopeOf::Dependent,
                Some(ty) => scope(ty.class_ref().and_then(|c| self.bindings.get(c).scope)),
                None => ScopeOf::None,
            },
            BindingKind::TemplateParameter => ScopeOf::Dependent,
            _ => ScopeOf::None,
        }
    }

    /// `X<T, U>` written inside `X`'s own definition names `X` itself.
    pub(super) fn is_own_params(&self, template: BindingId, args: &[TemplateArgument<BindingId>]) -> bool {
        let params = &self.bindings.get(template).template_params;
        params.len() == args.len()
            && args.iter().enumerate().all(|(i, arg)| match arg {
                TemplateArgument::Type(Type::TemplateParam(p)) => {
                    usize::from(self.bindings.get(*p).position) == i
                }
                _ => false,
            })
    }

    /// Explicit specialization with exactly these arguments, else the first
    /// partial specialization whose pattern matches them.
    pub(super) fn matching_specialization(
        &self,
        template: BindingId,
        args: &[TemplateArgument<BindingId>],
    ) -> Option<(BindingId, ArgMap<BindingId>)> {
        let t = self.bindings.get(template);
        let wanted = ArgMap::from_pairs(&t.template_params, args.to_vec());
        let explicit = t.specializations.iter().copied().find(|&spec| {
            let s = self.bindings.get(spec);
            !s.is_templated() && s.specialization.as_ref().is_some_and(|sp| sp.args == wanted)
        });
        if let Some(spec) = explicit {
            return Some((spec, ArgMap::new()));
        }
        if args.iter().any(TemplateArgument::is_dependent) {
            return None;
        }
        t.specializations.iter().copied().find_map(|spec| {
            let s = self.bindings.get(spec);
            let pattern = s.specialization.as_ref()?;
            if !s.is_templated() || pattern.args.len() != args.len() {
                return None;
            }
            let mut map = ArgMap::new();
            let matched = pattern
                .args
                .args()
                .zip(args)
                .all(|(p, a)| super::typing::deduce_arg(p, a, &mut map));
            (matched && s.template_params.iter().all(|&p| map.get(p).is_some())).then_some((spec, map))
        })
    }

    /// Look `id` up without recording its resolution.
    pub(super) fn lookup_name(&mut self, id: NameId, scope: ScopeId, want: Want) -> Lookup {
        let node = self.name_node(id);
        let ident = self.segment_name(&node.last);
        let found = if node.is_qualified() {
            match self.resolve_qualifier(id, scope) {
                ScopeOf::Scope(s) => self.lookup_in(s, ident, want),
                ScopeOf::Dependent => return Lookup::Dependent,
                ScopeOf::None => return Lookup::Failed,
            }
        } else {
            self.lookup_unqualified(scope, ident, want)
        };
        if found.is_empty() {
            Lookup::Missing
        } else {
            Lookup::Found(found)
        }
    }

    /// Reduce a lookup result to one entity. Several bindings are fine when
    /// they are overloads, or a tag and typedefs naming it; anything else is
    /// ambiguous. Overload sets come back whole.
    pub(super) fn single_entity(&self, found: &[BindingId]) -> Option<BindingId> {
        let [first, rest @ ..] = found else {
            return None;
        };
        if rest.is_empty() {
            return Some(*first);
        }
        let canonical = |b: BindingId| {
            let binding = self.bindings.get(b);
            match (binding.kind, &binding.ty) {
                (BindingKind::Typedef, Some(ty)) => ty.class_ref().unwrap_or(b),
                _ => b,
            }
        };
        let target = canonical(*first);
        if rest.iter().all(|&b| canonical(b) == target) {
            // Prefer the typedef spelling over the tag.
            let chosen = found
                .iter()
                .copied()
                .find(|&b| self.bindings.get(b).kind == BindingKind::Typedef)
                .unwrap_or(*first);
            return Some(chosen);
        }
        None
    }

    /// Resolve `id` to a single binding and record the use.
    pub(super) fn resolve_single(&mut self, id: NameId, scope: ScopeId, want: Want) -> Option<BindingId> {
        let lookup = self.lookup_name(id, scope, want);
        self.settle(id, scope, lookup)
    }

    /// Record the outcome of a lookup for `id`.
    pub(super) fn settle(&mut self, id: NameId, scope: ScopeId, lookup: Lookup) -> Option<BindingId> {
        match lookup {
            Lookup::Found(found) => {
                if let Some(binding) = self.single_entity(&found) {
                    self.referenced(binding, id);
                    return Some(binding);
                }
                let all_functions = found.iter().all(|&b| self.bindings.get(b).kind.is_function());
                if !all_functions {
                    let spelled = self.spelled(id);
                    self.problem(
                        ErrorCode::S3005,
                        id,
                        format!("reference to `{spelled}` is ambiguous"),
                        "found in more than one scope",
                    );
                }
                self.set_resolution(id, Resolution::Ambiguous(found.to_vec()));
                None
            }
            Lookup::Dependent => {
                self.mark_dependent(id);
                None
            }
            Lookup::Missing => {
                self.report_missing(id, scope);
                None
            }
            Lookup::Failed => None,
        }
    }
}
